/* infoowl - an analytics.js-style integration for Infoowl collectors
 * Copyright (C) 2023 Withings
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>. */

//! Infoowl integration for analytics.js-style hosts.
//!
//! Page, identify, group, track and alias events handed over by a host are
//! normalised into collector envelopes (write key, context, identity, message
//! id, ad attribution) and posted to an Infoowl collector, by beacon when
//! enabled and possible, by HTTP otherwise.

pub mod config;
pub mod events;
pub mod host;
pub mod integration;
pub mod logging;
pub mod params;
pub mod platform;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod testing;

pub use crate::host::{Analytics, Host, Integration, User};
pub use crate::integration::Infoowl;
pub use crate::integration::options::Options;
pub use crate::platform::Platform;

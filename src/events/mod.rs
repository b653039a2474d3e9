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

pub mod alias;
pub mod any;
pub mod common;
pub mod context;
pub mod de;
pub mod envelope;
pub mod group;
pub mod identify;
pub mod page;
pub mod screen;
pub mod track;

use crate::events::envelope::Envelope;

use serde::Serialize;
use serde_json::Value;

/// An event as handed over by the host, convertible to its JSON form
pub trait Message: Serialize {
    /// The action name, also used as the `type` field
    const ACTION: &'static str;

    /// Returns the JSON form of the event, ready to be shaped and sent
    fn json(&self) -> serde_json::Result<Envelope> {
        let mut envelope: Envelope = serde_json::from_value(serde_json::to_value(self)?)?;
        envelope.fields.insert("type".into(), Value::String(Self::ACTION.into()));
        Ok(envelope)
    }
}

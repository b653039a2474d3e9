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

use crate::events::alias::Alias;
use crate::events::group::Group;
use crate::events::identify::Identify;
use crate::events::page::Page;
use crate::events::screen::Screen;
use crate::events::track::Track;
use crate::events::Message;

use serde::{Deserialize, Serialize};

/// Convenience enum: can accept any event
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum AnyEvent {
    #[serde(rename = "alias")]
    Alias(Alias),
    #[serde(rename = "group")]
    Group(Group),
    #[serde(rename = "identify")]
    Identify(Identify),
    #[serde(rename = "page")]
    Page(Page),
    #[serde(rename = "screen")]
    Screen(Screen),
    #[serde(rename = "track")]
    Track(Track),
}

impl AnyEvent {
    /// The action name integrations dispatch on
    pub fn action(&self) -> &'static str {
        match self {
            AnyEvent::Alias(_) => Alias::ACTION,
            AnyEvent::Group(_) => Group::ACTION,
            AnyEvent::Identify(_) => Identify::ACTION,
            AnyEvent::Page(_) => Page::ACTION,
            AnyEvent::Screen(_) => Screen::ACTION,
            AnyEvent::Track(_) => Track::ACTION,
        }
    }
}

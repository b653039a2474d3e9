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

use crate::events::common::CommonFields;
use crate::events::Message;
use crate::transport::Callback;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A track event
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(flatten)]
    pub common: CommonFields,

    #[serde(default, deserialize_with = "crate::events::de::identifier", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub event: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Identify traits some callers attach to track calls, never forwarded
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub traits: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Completion callback for the send, the JSON equivalent of options.callback
    #[serde(skip)]
    pub callback: Option<Callback>,
}

impl Track {
    /// Attaches a completion callback
    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl Message for Track {
    const ACTION: &'static str = "track";
}

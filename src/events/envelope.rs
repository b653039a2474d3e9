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

use crate::events::context::Context;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bundled/unbundled integration names, reported when addBundledMetadata is on
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub bundled: Vec<String>,
    pub unbundled: Vec<String>,
}

/// The JSON object posted to the collector for one event.
///
/// The fields the integration manipulates are typed, everything else the
/// event carried (traits, properties, event name, previousId...) lives in
/// `fields` and is sent back untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub write_key: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    /// Legacy alias for `context`, folded into it on normalisation
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub options: Option<Context>,
    #[serde(default, deserialize_with = "crate::events::de::identifier", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub anonymous_id: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(rename = "_metadata", default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Removes a field and returns it if it is a non-empty string
    pub fn take_str(&mut self, key: &str) -> Option<String> {
        match self.fields.remove(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

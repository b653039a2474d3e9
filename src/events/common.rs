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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields common to all events
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommonFields {
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub anonymous_id: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub options: Option<Context>,
    /// Passed through as given, ISO 8601 string or epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub integrations: Map<String, Value>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

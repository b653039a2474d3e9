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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Library descriptor, defaults to analytics.js
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// AMP session identifier
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Amp {
    pub id: String,
}

/// Context fields
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub library: Option<Library>,
    /// UTM parameters from the page's query string
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Map<String, Value>>,
    /// Ad/referrer attribution
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub referrer: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "crate::events::de::replaced", skip_serializing_if = "Option::is_none")]
    pub amp: Option<Amp>,
    /// Anything else the caller put in there (page, traits, locale, ...)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Context {
    /// Looks up a caller-supplied string field, ignoring empty values
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.other.get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

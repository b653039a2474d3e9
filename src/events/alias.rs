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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An alias event
///
/// `from`/`to` are the analytics.js spellings of `previousId`/`userId`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
    #[serde(flatten)]
    pub common: CommonFields,

    #[serde(default, deserialize_with = "crate::events::de::identifier", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::identifier", skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::identifier", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "crate::events::de::identifier", skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message for Alias {
    const ACTION: &'static str = "alias";
}

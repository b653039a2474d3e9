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

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Query keys carrying ad click identifiers, with the network they belong to
const AD_QUERY_IDS: &[(&str, &str)] = &[
    ("btid", "dataxu"),
    ("urid", "millennial-media"),
];

/// Splits a query string into decoded pairs, in order.
///
/// A leading `?` is ignored and any further `?` acts as a separator, which
/// copes with URLs that had parameters appended twice.
fn parse(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query).replace('?', "&");
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Extracts `utm_*` parameters, prefix stripped and `campaign` renamed to `name`
pub fn utm(query: &str) -> Map<String, Value> {
    parse(query).into_iter()
        .filter_map(|(key, value)| {
            let param = key.strip_prefix("utm_")?;
            let param = match param {
                "campaign" => "name",
                other => other,
            };
            Some((param.to_string(), Value::String(value)))
        })
        .collect()
}

/// Extracts the first ad click identifier as `{id, type}`
pub fn ads(query: &str) -> Option<Map<String, Value>> {
    parse(query).into_iter()
        .find_map(|(key, value)| {
            AD_QUERY_IDS.iter()
                .find(|(id, _)| *id == key)
                .map(|(_, network)| {
                    let mut ad = Map::new();
                    ad.insert("id".into(), Value::String(value));
                    ad.insert("type".into(), Value::String(network.to_string()));
                    ad
                })
        })
}

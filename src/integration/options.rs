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

/// Option defaults
pub mod defaults {
    pub fn api_host() -> String { String::from("localhost:8080") }
}

/// Options recognised by the Infoowl integration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// The write key, copied into every envelope
    #[serde(default)]
    pub api_key: String,
    /// https when true, http otherwise
    #[serde(default)]
    pub secure_connection: bool,
    /// Collector host and port
    #[serde(default = "defaults::api_host")]
    pub api_host: String,
    /// Try a beacon before falling back to a regular request
    #[serde(default)]
    pub beacon: bool,
    #[serde(default)]
    pub add_bundled_metadata: bool,
    #[serde(default)]
    pub unbundled_integrations: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secure_connection: false,
            api_host: defaults::api_host(),
            beacon: false,
            add_bundled_metadata: false,
            unbundled_integrations: vec!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_yaml() {
        let options: Options = serde_yaml::from_str("apiKey: abc\nbeacon: true\n").unwrap();
        assert_eq!(options.api_key, "abc");
        assert!(options.beacon);
        assert_eq!(options.api_host, "localhost:8080");
        assert!(!options.secure_connection);
        assert!(!options.add_bundled_metadata);
        assert!(options.unbundled_integrations.is_empty());
    }
}

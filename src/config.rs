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

use crate::integration::options::Options;

use serde::{Serialize, Deserialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use flexi_logger::writers::SyslogFacility;
use serde_with::{DisplayFromStr, serde_as};
use byte_unit::Byte as ByteSize;
use thiserror::Error;
use url::Url;
use serde_yaml;
use log;

/// Configuration defaults
pub mod defaults {
    use byte_unit::Byte as ByteSize;
    use url::Url;

    pub fn logging_level() -> log::LevelFilter { log::LevelFilter::Info }

    pub fn syslog_port() -> u16 { 514 }
    pub fn syslog_protocol() -> String { String::from("udp") }

    pub fn transport_timeout() -> humantime::Duration { std::time::Duration::from_secs(10).into() }
    pub fn transport_beacon_payload_limit() -> ByteSize { ByteSize::from_u64(64 * 1024) }

    pub fn platform_url() -> Url { Url::parse("http://localhost/").expect("invalid default page URL") }
    pub fn platform_user_agent() -> String { format!("infoowl/{}", env!("CARGO_PKG_VERSION")) }
}

/// Errors while locating or reading the configuration file
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("{0}: {1}")]
    Io(String, std::io::Error),
    #[error("{0}: {1}")]
    Format(String, serde_yaml::Error),
    #[error("no valid configuration file found")]
    NotFound,
}

/// Syslog block
#[derive(Serialize, Deserialize)]
pub struct Syslog {
    pub host: String,
    #[serde(default = "defaults::syslog_port")]
    pub port: u16,
    /// tcp or udp
    #[serde(default = "defaults::syslog_protocol")]
    pub protocol: String,
    #[serde(deserialize_with = "crate::logging::parse_facility", skip_serializing)]
    pub facility: SyslogFacility,
}

/// Logging block
#[derive(Serialize, Deserialize)]
pub struct Logging {
    #[serde(default = "defaults::logging_level")]
    pub level: log::LevelFilter,
    /// Log to syslog instead of stdout
    #[serde(default)]
    pub syslog: Option<Syslog>,
}

impl Default for Logging {
    /// Builds a default logging block in case none is provided
    fn default() -> Self {
        return Self {
            level: defaults::logging_level(),
            syslog: None,
        }
    }
}

/// Transport block
#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    /// HTTP request timeout, eg. "10s"
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "defaults::transport_timeout")]
    pub timeout: humantime::Duration,
    /// Largest body a beacon accepts, 0 to disable the limit
    #[serde(default = "defaults::transport_beacon_payload_limit")]
    pub beacon_payload_limit: ByteSize,
}

impl Default for Transport {
    /// Builds a default transport block in case none is provided
    fn default() -> Self {
        return Self {
            timeout: defaults::transport_timeout(),
            beacon_payload_limit: defaults::transport_beacon_payload_limit(),
        }
    }
}

/// Platform block: the page events are sent from
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePlatform {
    #[serde(default = "defaults::platform_url")]
    pub url: Url,
    #[serde(default = "defaults::platform_user_agent")]
    pub user_agent: String,
}

impl Default for PagePlatform {
    /// Builds a default platform block in case none is provided
    fn default() -> Self {
        return Self {
            url: defaults::platform_url(),
            user_agent: defaults::platform_user_agent(),
        }
    }
}

/// Storage block
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    /// Where cookies and local storage are kept, XDG data dir if unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Only send stored cookies over https
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Storage {
    /// The configured directory, or the XDG data directory
    pub fn directory(&self) -> Option<PathBuf> {
        self.directory.clone().or_else(|| {
            ProjectDirs::from("com", "withings", "infoowl").map(|dirs| dirs.data_dir().to_path_buf())
        })
    }
}

/// The overall configuration file
#[derive(Serialize, Deserialize)]
pub struct Configuration {
    /// The integration's own options
    #[serde(default)]
    pub integration: Options,
    /// A logging block
    #[serde(default)]
    pub logging: Logging,
    /// A transport block
    #[serde(default)]
    pub transport: Transport,
    /// A platform block
    #[serde(default)]
    pub platform: PagePlatform,
    /// A storage block
    #[serde(default)]
    pub storage: Storage,
}

/// Parse a configuration file given a path
fn parse_configuration_file(path: &Path) -> Result<Configuration, ConfigurationError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|e| ConfigurationError::Io(path_str.clone(), e))?;
    let configuration = serde_yaml::from_reader(file).map_err(|e| ConfigurationError::Format(path_str, e))?;
    Ok(configuration)
}

/// Locates and parses the configuration file
pub fn get_configuration(cmd_arg: Option<&String>) -> Result<Configuration, ConfigurationError> {
    let given_location = cmd_arg
        .map(|s| PathBuf::from(s))
        .or(std::env::var("INFOOWL_CONFIG").map(|s| PathBuf::from(s)).ok());

    /* If a path was given on the command line, ignore all other options */
    if let Some(path) = given_location {
        return parse_configuration_file(path.as_path());
    }

    /* Otherwise, try and guess */
    let xdg_dirs = ProjectDirs::from("com", "withings", "infoowl");
    let inferred_locations = [
        Some(PathBuf::from("/etc/withings/infoowl.yml")),
        Some(PathBuf::from("/etc/withings/infoowl.yaml")),
        xdg_dirs.as_ref().map(|dirs| PathBuf::from(dirs.config_dir()).join("infoowl.yml")),
        xdg_dirs.as_ref().map(|dirs| PathBuf::from(dirs.config_dir()).join("infoowl.yaml")),
        std::env::current_dir().map(|p| p.join("infoowl.yml")).ok(),
        std::env::current_dir().map(|p| p.join("infoowl.yaml")).ok(),
    ];

    let configuration = inferred_locations.iter()
        .flatten()
        .filter(|p| p.as_path().is_file())
        .map(|p| parse_configuration_file(p))
        .flatten()
        .next();

    configuration.ok_or(ConfigurationError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_full_file() {
        let yaml = "
integration:
  apiKey: write-key
  apiHost: collect.example.com
  secureConnection: true
  beacon: true
  addBundledMetadata: true
  unbundledIntegrations: [Mixpanel]
logging:
  level: debug
transport:
  timeout: 2s 500ms
  beaconPayloadLimit: 32 KiB
platform:
  url: https://www.example.com/landing?utm_source=cli
  userAgent: test-agent
storage:
  directory: /tmp/infoowl
  secureCookies: true
";
        let configuration: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(configuration.integration.api_key, "write-key");
        assert!(configuration.integration.secure_connection);
        assert_eq!(configuration.integration.unbundled_integrations, vec!["Mixpanel"]);
        assert_eq!(configuration.logging.level, log::LevelFilter::Debug);
        assert_eq!(*configuration.transport.timeout, std::time::Duration::from_millis(2500));
        assert_eq!(configuration.transport.beacon_payload_limit.as_u64(), 32 * 1024);
        assert_eq!(configuration.platform.url.query(), Some("utm_source=cli"));
        assert_eq!(configuration.platform.user_agent, "test-agent");
        assert_eq!(configuration.storage.directory(), Some(PathBuf::from("/tmp/infoowl")));
        assert!(configuration.storage.secure_cookies);
    }

    #[test]
    fn test_defaults() {
        let configuration: Configuration = serde_yaml::from_str("integration:\n  apiKey: k\n").unwrap();
        assert_eq!(configuration.integration.api_host, "localhost:8080");
        assert_eq!(configuration.logging.level, log::LevelFilter::Info);
        assert!(configuration.logging.syslog.is_none());
        assert_eq!(*configuration.transport.timeout, std::time::Duration::from_secs(10));
        assert_eq!(configuration.transport.beacon_payload_limit.as_u64(), 64 * 1024);
        assert_eq!(configuration.platform.url.as_str(), "http://localhost/");
        assert!(!configuration.storage.secure_cookies);
    }

    #[test]
    fn test_explicit_path() {
        let file = std::env::temp_dir().join(format!("infoowl-{}.yml", Uuid::new_v4()));
        std::fs::write(&file, "integration:\n  apiKey: from-file\n").unwrap();
        let configuration = get_configuration(Some(&file.display().to_string())).unwrap();
        assert_eq!(configuration.integration.api_key, "from-file");
        let _ = std::fs::remove_file(file);

        let missing = get_configuration(Some(&String::from("/nonexistent/infoowl.yml")));
        assert!(matches!(missing, Err(ConfigurationError::Io(_, _))));
    }
}

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

use crate::config;

use flexi_logger::{DeferredNow, FlexiLoggerError, LogSpecification, Logger, LoggerHandle};
use flexi_logger::writers::{SyslogWriter, SyslogConnection, SyslogLineHeader, SyslogFacility};
use serde::de;

/// Starts the logger as per the logging block, to syslog or stdout
pub fn init_logger(log_config: &config::Logging) -> Result<LoggerHandle, FlexiLoggerError> {
    let mut spec = LogSpecification::builder();
    spec.module("infoowl", log_config.level);
    let logger = Logger::with(spec.build());

    let logger = match &log_config.syslog {
        Some(syslog_config) => {
            let addr = (syslog_config.host.clone(), syslog_config.port);
            let connection = match syslog_config.protocol.as_str() {
                "tcp" => SyslogConnection::try_tcp(addr),
                _ => SyslogConnection::try_udp(("0.0.0.0".to_string(), 0), addr),
            }?;

            let writer = SyslogWriter::builder(
                connection,
                SyslogLineHeader::Rfc3164,
                syslog_config.facility
            )
                .format(record_formatter)
                .build()?;

            logger.log_to_writer(writer)
        },
        None => logger.log_to_stdout().format(record_formatter)
    };

    logger.start()
}

/// Timestamp, level, module, message id when there is one, message
pub fn record_formatter(
    writer: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record) -> Result<(), std::io::Error> {
    writeln!(
        writer,
        "{} {} [{}]{} {}",
        now.format_rfc3339(),
        record.level(),
        record.module_path().unwrap_or("infoowl::<unknown>"),
        record.key_values().get("mid".into()).map(|i| format!(" [{}]", i)).unwrap_or("".into()),
        record.args(),
    )
}

pub fn parse_facility<'de, D>(deserializer: D) -> Result<SyslogFacility, D::Error>
where
    D: de::Deserializer<'de>,
{
    let v: serde_json::Value = de::Deserialize::deserialize(deserializer)?;
    let facility_str = v.as_str().ok_or(de::Error::custom("the syslog facility type should be a string"))?;

    Ok(match facility_str {
        "user" => SyslogFacility::UserLevel,
        "daemon" => SyslogFacility::SystemDaemons,
        "syslog" => SyslogFacility::SyslogD,
        "local0" => SyslogFacility::LocalUse0,
        "local1" => SyslogFacility::LocalUse1,
        "local2" => SyslogFacility::LocalUse2,
        "local3" => SyslogFacility::LocalUse3,
        "local4" => SyslogFacility::LocalUse4,
        "local5" => SyslogFacility::LocalUse5,
        "local6" => SyslogFacility::LocalUse6,
        "local7" => SyslogFacility::LocalUse7,
        _ => return Err(de::Error::custom("unknown syslog facility")),
    })
}

#[cfg(test)]
mod tests {
    use crate::config::Logging;

    #[test]
    fn test_syslog_block() {
        let logging: Logging = serde_yaml::from_str("
level: warn
syslog:
  host: logs.example.com
  facility: local3
").unwrap();
        let syslog = logging.syslog.unwrap();
        assert_eq!(syslog.port, 514);
        assert_eq!(syslog.protocol, "udp");
        assert!(matches!(syslog.facility, flexi_logger::writers::SyslogFacility::LocalUse3));
    }

    #[test]
    fn test_unknown_facility() {
        let logging = serde_yaml::from_str::<Logging>("syslog:\n  host: h\n  facility: nope\n");
        assert!(logging.is_err());
    }
}

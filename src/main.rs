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

use infoowl::config;
use infoowl::events::any::AnyEvent;
use infoowl::host::Analytics;
use infoowl::integration::Infoowl;
use infoowl::logging;
use infoowl::platform::Platform;
use infoowl::storage::{CookieOptions, Store};
use infoowl::storage::cookie::CookieJar;
use infoowl::storage::local::LocalStorage;
use infoowl::transport::{Callback, QueuedBeacon, ReqwestTransport, SendResult};

use std::sync::Arc;
use clap::Parser;
use parking_lot::Mutex;
use url::Url;
use uuid::Uuid;
use tokio;
use log;

/// Local storage key the anonymous id is kept under between runs
const ANONYMOUS_ID_KEY: &str = "ajs_anonymous_id";

/// Sends one event, read as JSON on stdin, to an Infoowl collector
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Page URL the event is sent from, overrides the configuration
    #[arg(long)]
    url: Option<Url>,
    /// Identified user id
    #[arg(long)]
    user_id: Option<String>,
    /// Anonymous id, generated and remembered if not given
    #[arg(long)]
    anonymous_id: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    /* Locate and parse the configuration file, see config.rs */
    let configuration = match config::get_configuration(args.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to process configuration file: {}", e);
            std::process::exit(1);
        }
    };

    let _logger = match logging::init_logger(&configuration.logging) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to start logger: {}", e);
            std::process::exit(1);
        }
    };

    let input = match std::io::read_to_string(std::io::stdin()) {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to read stdin: {}", e);
            std::process::exit(1);
        }
    };

    let mut event: AnyEvent = match serde_json::from_str(&input) {
        Ok(e) => e,
        Err(e) => {
            log::error!("invalid event: {}", e);
            std::process::exit(1);
        }
    };

    /* Transport and beacon share one HTTP client */
    let transport = match ReqwestTransport::new(*configuration.transport.timeout) {
        Ok(t) => t,
        Err(e) => {
            log::error!("failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let beacon = Arc::new(QueuedBeacon::new(transport.client(), configuration.transport.beacon_payload_limit));

    let location = args.url.unwrap_or(configuration.platform.url.clone());
    let platform = Arc::new(build_platform(&configuration, location, transport, beacon.clone()));

    let mut analytics = Analytics::new();
    analytics.register(Arc::new(Infoowl::new(configuration.integration.clone(), platform.clone())));
    analytics.identify_user(args.user_id);
    analytics.set_anonymous_id(Some(anonymous_id(platform.as_ref(), args.anonymous_id)));
    analytics.initialize();

    /* Only track events carry a completion callback */
    let outcome: Arc<Mutex<Option<SendResult>>> = Arc::new(Mutex::new(None));
    if let AnyEvent::Track(track) = &mut event {
        let outcome_clone = outcome.clone();
        track.callback = Some(Callback::new(move |result| *outcome_clone.lock() = Some(result)));
    }

    analytics.invoke(&event).await;
    beacon.drain().await;

    let outcome = outcome.lock().take();
    match outcome {
        Some(Ok(Some(response))) => log::info!("{} answered {}", response.url, response.status),
        Some(Ok(None)) => log::info!("{} event sent by beacon", event.action()),
        Some(Err(e)) => {
            log::error!("failed to send {} event: {}", event.action(), e);
            std::process::exit(1);
        },
        None => log::info!("{} event handed over", event.action()),
    }
}

/// Platform with storage persisted in the configured directory, volatile if that fails
fn build_platform(configuration: &config::Configuration, location: Url, transport: ReqwestTransport, beacon: Arc<QueuedBeacon>) -> Platform {
    let host = location.host_str().unwrap_or("").to_string();
    let cookie_defaults = CookieOptions { secure: configuration.storage.secure_cookies, ..Default::default() };
    let mut platform = Platform::new(location, &configuration.platform.user_agent, Arc::new(transport))
        .with_beacon(beacon)
        .with_cookie_defaults(cookie_defaults);

    if let Some(directory) = configuration.storage.directory() {
        match CookieJar::open(&host, directory.join("cookies.json")) {
            Ok(jar) => platform = platform.with_cookies(Arc::new(jar)),
            Err(e) => log::warn!("using volatile cookies: {}", e),
        }
        match LocalStorage::open(directory.join("local_storage.json")) {
            Ok(storage) => platform = platform.with_local_storage(Arc::new(storage)),
            Err(e) => log::warn!("using volatile local storage: {}", e),
        }
    }

    platform
}

/// The given anonymous id, else the remembered one, else a new one
fn anonymous_id(platform: &Platform, given: Option<String>) -> String {
    let storage = platform.local_storage();
    let anonymous_id = given
        .or_else(|| storage.get(ANONYMOUS_ID_KEY))
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    storage.set(ANONYMOUS_ID_KEY, &anonymous_id, &CookieOptions::default());
    anonymous_id
}

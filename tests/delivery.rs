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

use infoowl::events::any::AnyEvent;
use infoowl::events::page::Page;
use infoowl::events::track::Track;
use infoowl::events::Message;
use infoowl::transport::{Callback, QueuedBeacon, ReqwestTransport, SendError, SendResult};
use infoowl::{Analytics, Infoowl, Options, Platform};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use byte_unit::Byte as ByteSize;
use parking_lot::Mutex;
use serde_json::{json, Value};
use url::Url;
use warp::Filter;

/// A request as received by the fake collector
#[derive(Debug, Clone)]
struct Received {
    path: String,
    content_type: Option<String>,
    body: Value,
}

/// Starts a collector on an ephemeral port, /fail answers 500
fn collector() -> (SocketAddr, Arc<Mutex<Vec<Received>>>) {
    let received: Arc<Mutex<Vec<Received>>> = Arc::new(Mutex::new(vec!()));
    let received_clone = received.clone();

    let fail = warp::post()
        .and(warp::path!("fail"))
        .map(|| warp::reply::with_status("KO", warp::http::StatusCode::INTERNAL_SERVER_ERROR));

    let any = warp::post()
        .and(warp::path::full())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::body::bytes())
        .map(move |path: warp::path::FullPath, content_type: Option<String>, body: warp::hyper::body::Bytes| {
            received_clone.lock().push(Received {
                path: path.as_str().to_string(),
                content_type,
                body: serde_json::from_slice(&body).unwrap_or(Value::Null),
            });
            warp::reply::with_status("OK", warp::http::StatusCode::OK)
        });

    let (addr, server) = warp::serve(fail.or(any)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, received)
}

fn options(addr: SocketAddr) -> Options {
    Options {
        api_key: "write-key".into(),
        api_host: addr.to_string(),
        ..Default::default()
    }
}

fn platform(transport: ReqwestTransport) -> Platform {
    let location = Url::parse("https://www.example.com/landing?utm_source=tests").unwrap();
    Platform::new(location, "integration-tests", Arc::new(transport))
}

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(5)).unwrap()
}

/// Host with a known visitor and no integrations, for direct sends
fn host() -> Analytics {
    let analytics = Analytics::with_version("4.1.0");
    analytics.identify_user(Some("u1".into()));
    analytics.set_anonymous_id(Some("anon".into()));
    analytics
}

fn analytics(infoowl: Arc<Infoowl>) -> Analytics {
    let mut analytics = host();
    analytics.register(infoowl);
    analytics.initialize();
    analytics
}

#[tokio::test]
async fn test_track_reaches_collector() {
    let (addr, received) = collector();
    let infoowl = Arc::new(Infoowl::new(options(addr), Arc::new(platform(transport()))));
    let analytics = analytics(infoowl);
    assert!(analytics.is_ready("Infoowl"));

    let outcome: Arc<Mutex<Option<SendResult>>> = Arc::new(Mutex::new(None));
    let outcome_clone = outcome.clone();
    let track: Track = serde_json::from_value(json!({
        "event": "Signed Up",
        "properties": {"plan": "pro"},
        "traits": {"email": "someone@example.com"}
    })).unwrap();
    let track = track.with_callback(Callback::new(move |result| *outcome_clone.lock() = Some(result)));

    analytics.invoke(&AnyEvent::Track(track)).await;

    let response = outcome.lock().clone().unwrap().unwrap().unwrap();
    assert_eq!(response.url, format!("http://{}/track", addr));
    assert_eq!(response.status, 200);

    let received = received.lock().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/track");
    assert_eq!(received[0].content_type.as_deref(), Some("application/json"));

    let body = &received[0].body;
    assert_eq!(body["writeKey"], "write-key");
    assert_eq!(body["event"], "Signed Up");
    assert_eq!(body["type"], "track");
    assert_eq!(body["properties"], json!({"plan": "pro"}));
    assert_eq!(body["userId"], "u1");
    assert_eq!(body["anonymousId"], "anon");
    assert_eq!(body["context"]["userAgent"], "integration-tests");
    assert_eq!(body["context"]["library"], json!({"name": "analytics.js", "version": "4.1.0"}));
    assert_eq!(body["context"]["campaign"], json!({"source": "tests"}));
    assert!(body["messageId"].as_str().unwrap().starts_with("ajs-"));
    assert!(body["sentAt"].is_string());
    assert!(body.get("traits").is_none());
}

#[tokio::test]
async fn test_collector_error() {
    let (addr, received) = collector();
    let infoowl = Infoowl::new(options(addr), Arc::new(platform(transport())));
    let host = host();

    let track = Track { event: "Clicked".into(), ..Default::default() };
    let result = infoowl.send(&host, "/fail", track.json().unwrap(), None).await;

    assert_eq!(result, Err(SendError::Status(500, format!("http://{}/fail", addr))));
    assert!(received.lock().is_empty());
}

#[tokio::test]
async fn test_unreachable_collector() {
    let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
    let infoowl = Infoowl::new(options(addr), Arc::new(platform(transport())));
    let host = host();

    let result = infoowl.send(&host, "/page", Page::default().json().unwrap(), None).await;
    assert!(matches!(result, Err(SendError::Connectivity(_))));
}

#[tokio::test]
async fn test_beacon_delivery() {
    let (addr, received) = collector();
    let transport = transport();
    let beacon = Arc::new(QueuedBeacon::new(transport.client(), ByteSize::from_u64(64 * 1024)));
    let platform = platform(transport).with_beacon(beacon.clone());
    let infoowl = Infoowl::new(Options { beacon: true, ..options(addr) }, Arc::new(platform));
    let host = host();

    let result = infoowl.send(&host, "/page", Page::default().json().unwrap(), None).await;
    assert_eq!(result, Ok(None));

    beacon.drain().await;
    let received = received.lock().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/page");
    assert_eq!(received[0].body["writeKey"], "write-key");
}

#[tokio::test]
async fn test_oversized_beacon_falls_back() {
    let (addr, received) = collector();
    let transport = transport();
    let beacon = Arc::new(QueuedBeacon::new(transport.client(), ByteSize::from_u64(16)));
    let platform = platform(transport).with_beacon(beacon.clone());
    let infoowl = Infoowl::new(Options { beacon: true, ..options(addr) }, Arc::new(platform));
    let host = host();

    let result = infoowl.send(&host, "/page", Page::default().json().unwrap(), None).await;
    let response = result.unwrap().unwrap();
    assert_eq!(response.url, format!("http://{}/page", addr));

    beacon.drain().await;
    let received = received.lock().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].content_type.as_deref(), Some("application/json"));
}

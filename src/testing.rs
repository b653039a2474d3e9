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

//! Test doubles for the platform and the host

use crate::host::{Host, User};
use crate::platform::Platform;
use crate::transport::{Beacon, HttpTransport, Response, SendError};

use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) infoowl-tests";
pub const HOST_VERSION: &str = "4.1.0";

/// A POST as seen by the recording transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Records every request and answers 200, or the configured error
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    failure: Option<SendError>,
}

impl RecordingTransport {
    pub fn failing(error: SendError) -> Self {
        Self { requests: Mutex::new(vec!()), failure: Some(error) }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn post_json(&self, url: &str, headers: &[(&str, &str)], body: String) -> Result<Response, SendError> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body,
        });
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(Response { url: url.to_string(), status: 200, body: String::from("OK") }),
        }
    }
}

/// Records beacon calls, accepts or refuses all of them
pub struct RecordingBeacon {
    accept: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingBeacon {
    pub fn accepting(accept: bool) -> Self {
        Self { accept, calls: Mutex::new(vec!()) }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

impl Beacon for RecordingBeacon {
    fn send_beacon(&self, url: &str, body: &str) -> bool {
        self.calls.lock().push((url.to_string(), body.to_string()));
        self.accept
    }
}

/// Host with a fixed visitor, counts readiness signals
pub struct StaticHost {
    user: User,
    ready: Mutex<usize>,
}

impl StaticHost {
    pub fn identified(id: &str, anonymous_id: &str) -> Self {
        Self {
            user: User { id: Some(id.into()), anonymous_id: Some(anonymous_id.into()) },
            ready: Mutex::new(0),
        }
    }

    pub fn anonymous(anonymous_id: &str) -> Self {
        Self {
            user: User { id: None, anonymous_id: Some(anonymous_id.into()) },
            ready: Mutex::new(0),
        }
    }

    pub fn ready_count(&self) -> usize {
        *self.ready.lock()
    }
}

impl Host for StaticHost {
    fn user(&self) -> User {
        self.user.clone()
    }

    fn integration_names(&self) -> Vec<String> {
        vec!["Infoowl".into(), "Google Analytics".into()]
    }

    fn version(&self) -> String {
        HOST_VERSION.into()
    }

    fn ready(&self, _integration: &str) {
        *self.ready.lock() += 1;
    }
}

/// Platform for a page URL, in-memory storage, recording transport, no beacon
pub fn platform(location: &str) -> Platform {
    let location = Url::parse(location).expect("invalid test URL");
    Platform::new(location, USER_AGENT, Arc::new(RecordingTransport::default()))
}

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

mod normalize;
pub mod options;

pub use crate::integration::normalize::{AMP_COOKIE, LIBRARY_NAME, REFERRER_KEY};

use crate::events::Message;
use crate::events::alias::Alias;
use crate::events::any::AnyEvent;
use crate::events::envelope::Envelope;
use crate::events::group::Group;
use crate::events::identify::Identify;
use crate::events::page::Page;
use crate::events::track::Track;
use crate::host::{Host, Integration};
use crate::integration::options::Options;
use crate::platform::Platform;
use crate::storage::Storage;
use crate::transport::{Callback, SendError, SendResult};

use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;
use log;

/// Name the integration registers under
pub const NAME: &str = "Infoowl";

/// Forwards host events to an Infoowl collector
pub struct Infoowl {
    options: Options,
    platform: Arc<Platform>,
}

impl Infoowl {
    pub fn new(options: Options, platform: Arc<Platform>) -> Self {
        Self { options, platform }
    }

    fn storage(&self) -> Storage<'_> {
        Storage::new(&self.platform)
    }

    /// Collector URL for a path
    pub fn url(&self, path: &str) -> String {
        let scheme = match self.options.secure_connection {
            true => "https",
            false => "http",
        };
        format!("{}://{}{}", scheme, self.options.api_host, path)
    }

    async fn on_page(&self, host: &dyn Host, page: &Page) {
        if let Ok(json) = to_json(page) {
            self.send(host, "/page", json, None).await;
        }
    }

    async fn on_identify(&self, host: &dyn Host, identify: &Identify) {
        if let Ok(json) = to_json(identify) {
            self.send(host, "/identify", json, None).await;
        }
    }

    async fn on_group(&self, host: &dyn Host, group: &Group) {
        if let Ok(json) = to_json(group) {
            self.send(host, "/group", json, None).await;
        }
    }

    async fn on_track(&self, host: &dyn Host, track: &Track) {
        let json = match to_json(track) {
            Ok(json) => json,
            Err(e) => {
                if let Some(callback) = &track.callback {
                    callback.call(Err(e));
                }
                return;
            }
        };
        let (path, json) = shape_track(json);
        self.send(host, &path, json, track.callback.clone()).await;
    }

    async fn on_alias(&self, host: &dyn Host, alias: &Alias) {
        if let Ok(json) = to_json(alias) {
            let json = shape_alias(host, json);
            self.send(host, "/alias", json, None).await;
        }
    }

    /// Normalises an envelope and delivers it, by beacon if possible, by
    /// HTTP otherwise. The outcome goes to the callback and is returned.
    pub async fn send(&self, host: &dyn Host, path: &str, envelope: Envelope, callback: Option<Callback>) -> SendResult {
        let url = self.url(path);
        let callback = callback.unwrap_or_else(Callback::noop);
        let msg = self.normalize(host, envelope);
        let mid = msg.message_id.clone().unwrap_or_default();

        let body = match serde_json::to_string(&msg) {
            Ok(b) => b,
            Err(e) => {
                let error = SendError::Serialisation(e.to_string());
                callback.call(Err(error.clone()));
                return Err(error);
            }
        };

        if self.options.beacon {
            if let Some(beacon) = self.platform.beacon() {
                /* a beacon refuses payloads it cannot queue, eg. too large */
                if beacon.send_beacon(&url, &body) {
                    log::debug!(mid = mid.as_str(); "beacon sent to {}", url);
                    callback.call(Ok(None));
                    return Ok(None);
                }
                log::debug!(mid = mid.as_str(); "beacon failed, falling back to http");
            }
        }

        let headers = [("Content-Type", "application/json")];
        let result = self.platform.http().post_json(&url, &headers, body).await
            .map(|mut response| {
                response.url = url.clone();
                Some(response)
            });

        match &result {
            Ok(_) => log::debug!(mid = mid.as_str(); "http sent to {}", url),
            Err(e) => log::debug!(mid = mid.as_str(); "http send to {} failed: {}", url, e),
        }
        callback.call(result.clone());
        result
    }
}

#[async_trait]
impl Integration for Infoowl {
    fn name(&self) -> &str {
        NAME
    }

    /// Ready straight away, there is nothing to load
    fn initialize(&self, host: &dyn Host) {
        host.ready(NAME);
    }

    async fn handle(&self, host: &dyn Host, event: &AnyEvent) {
        log::debug!("{} {:?}", event.action(), event);
        match event {
            AnyEvent::Page(page) => self.on_page(host, page).await,
            AnyEvent::Identify(identify) => self.on_identify(host, identify).await,
            AnyEvent::Group(group) => self.on_group(host, group).await,
            AnyEvent::Track(track) => self.on_track(host, track).await,
            AnyEvent::Alias(alias) => self.on_alias(host, alias).await,
            AnyEvent::Screen(_) => (),
        }
        host.ready(NAME);
    }

    fn is_loaded(&self) -> bool {
        true
    }
}

/// JSON form of an event, logged when it cannot be converted
fn to_json<M: Message>(message: &M) -> Result<Envelope, SendError> {
    message.json().map_err(|e| {
        log::warn!("could not convert {} event: {}", M::ACTION, e);
        SendError::Serialisation(e.to_string())
    })
}

/// Drops traits and picks the destination path, options.url wins over /track
fn shape_track(mut json: Envelope) -> (String, Envelope) {
    json.fields.remove("traits");
    let path = json.options.as_ref()
        .and_then(|options| options.get_str("url"))
        .unwrap_or("/track")
        .to_string();
    (path, json)
}

/// Resolves previousId and userId, from/to are dropped
fn shape_alias(host: &dyn Host, mut json: Envelope) -> Envelope {
    let user = host.user();
    let from = json.take_str("from");
    let to = json.take_str("to");

    let previous_id = json.take_str("previousId")
        .or(from)
        .or(user.id.filter(|id| !id.is_empty()))
        .or(user.anonymous_id.filter(|id| !id.is_empty()));
    if let Some(previous_id) = previous_id {
        json.fields.insert("previousId".into(), Value::String(previous_id));
    }

    json.user_id = json.user_id.filter(|id| !id.is_empty()).or(to);
    json
}

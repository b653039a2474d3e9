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

use crate::events::context::{Amp, Context, Library};
use crate::events::envelope::{Envelope, Metadata};
use crate::host::Host;
use crate::integration::Infoowl;
use crate::params;

use std::hash::Hasher;
use chrono::Utc;
use serde_json::{Map, Value};
use twox_hash::XxHash64;
use uuid::Uuid;
use log;

/// Storage key for the last known ad/referrer attribution
pub const REFERRER_KEY: &str = "s:context.referrer";
/// Cookie set by AMP pages, read only
pub const AMP_COOKIE: &str = "segment_amp_id";
/// Reported as context.library.name unless the caller set a library
pub const LIBRARY_NAME: &str = "analytics.js";
const MESSAGE_ID_PREFIX: &str = "ajs-";

impl Infoowl {
    /// Fills in everything the collector expects on top of the event itself
    pub fn normalize(&self, host: &dyn Host, mut msg: Envelope) -> Envelope {
        log::debug!("normalize {:?}", msg);
        let user = host.user();
        let query = self.platform.search();

        let mut ctx = msg.context.take().or(msg.options.take()).unwrap_or_default();
        msg.options = None;
        msg.write_key = Some(self.options.api_key.clone());
        ctx.user_agent = Some(self.platform.user_agent().to_string());
        if ctx.library.is_none() {
            ctx.library = Some(Library { name: LIBRARY_NAME.into(), version: host.version() });
        }
        if !query.is_empty() {
            ctx.campaign = Some(params::utm(&query));
        }
        self.referrer_id(&query, &mut ctx);
        msg.context = Some(ctx);

        msg.user_id = msg.user_id.filter(|id| !id.is_empty()).or(user.id);
        msg.anonymous_id = user.anonymous_id;
        msg.sent_at = Some(Utc::now());
        if self.options.add_bundled_metadata {
            msg.metadata = Some(Metadata {
                bundled: host.integration_names(),
                unbundled: self.options.unbundled_integrations.clone(),
            });
        }

        msg.message_id = Some(message_id(&msg));
        log::debug!(mid = msg.message_id.as_deref().unwrap_or(""); "normalized {:?}", msg);
        if let Some(ctx) = msg.context.as_mut() {
            self.amp_id(ctx);
        }
        msg
    }

    /// Merges ad attribution into context.referrer and remembers it.
    ///
    /// Fresh query parameters win over the stored attribution, but keys the
    /// caller already put in context.referrer are never overwritten.
    fn referrer_id(&self, query: &str, ctx: &mut Context) {
        let storage = self.storage();
        let stored = storage.read(REFERRER_KEY).and_then(|s| {
            match serde_json::from_str::<Map<String, Value>>(&s) {
                Ok(ad) => Some(ad),
                Err(e) => {
                    log::warn!("ignoring unreadable stored referrer: {}", e);
                    None
                }
            }
        });
        let fresh = match query.is_empty() {
            true => None,
            false => params::ads(query),
        };

        let ad = match fresh.or(stored) {
            Some(ad) => ad,
            None => return,
        };

        let referrer = ctx.referrer.get_or_insert_with(Map::new);
        for (key, value) in ad.iter() {
            referrer.entry(key.clone()).or_insert_with(|| value.clone());
        }

        match serde_json::to_string(&ad) {
            Ok(serialised) => storage.write(REFERRER_KEY, &serialised),
            Err(e) => log::warn!("failed to serialise referrer: {}", e),
        }
    }

    /// Copies the AMP id into the context, if there is one
    fn amp_id(&self, ctx: &mut Context) {
        if let Some(id) = self.storage().read(AMP_COOKIE) {
            ctx.amp = Some(Amp { id });
        }
    }
}

/// Checksum of the serialised envelope plus a random token, so that two
/// identical events still get different ids
fn message_id(msg: &Envelope) -> String {
    let serialised = serde_json::to_string(msg).unwrap_or_default();
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(serialised.as_bytes());
    hasher.write(Uuid::new_v4().to_string().as_bytes());
    format!("{}{:016x}", MESSAGE_ID_PREFIX, hasher.finish())
}

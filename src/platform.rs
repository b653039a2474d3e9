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

use crate::storage::{CookieOptions, Store, StorageBackend};
use crate::storage::cookie::CookieJar;
use crate::storage::local::LocalStorage;
use crate::transport::{Beacon, HttpTransport};

use std::sync::Arc;
use parking_lot::RwLock;
use url::Url;

/// Everything a browser page would offer as globals: location, user agent,
/// cookies, localStorage, sendBeacon and XHR
pub struct Platform {
    location: RwLock<Url>,
    user_agent: String,
    cookies: Arc<dyn Store>,
    local_storage: Arc<dyn Store>,
    beacon: Option<Arc<dyn Beacon>>,
    http: Arc<dyn HttpTransport>,
    /// Lifetime, secure flag and path applied to storage writes
    cookie_defaults: CookieOptions,
}

impl Platform {
    /// Builds a platform with in-memory storage and no beacon support
    pub fn new(location: Url, user_agent: &str, http: Arc<dyn HttpTransport>) -> Self {
        let host = location.host_str().unwrap_or("").to_string();
        Self {
            location: RwLock::new(location),
            user_agent: user_agent.to_string(),
            cookies: Arc::new(CookieJar::in_memory(&host)),
            local_storage: Arc::new(LocalStorage::in_memory()),
            beacon: None,
            http,
            cookie_defaults: CookieOptions::default(),
        }
    }

    pub fn with_cookies(mut self, cookies: Arc<dyn Store>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_local_storage(mut self, local_storage: Arc<dyn Store>) -> Self {
        self.local_storage = local_storage;
        self
    }

    pub fn with_http(mut self, http: Arc<dyn HttpTransport>) -> Self {
        self.http = http;
        self
    }

    pub fn with_beacon(mut self, beacon: Arc<dyn Beacon>) -> Self {
        self.beacon = Some(beacon);
        self
    }

    /// Overrides the write defaults, the domain attribute is always computed
    pub fn with_cookie_defaults(mut self, defaults: CookieOptions) -> Self {
        self.cookie_defaults = CookieOptions { domain: None, ..defaults };
        self
    }

    /// Current page URL
    pub fn location(&self) -> Url {
        self.location.read().clone()
    }

    /// Client-side navigation: same page, new URL
    pub fn navigate(&self, location: Url) {
        *self.location.write() = location;
    }

    /// The query string with its leading `?`, empty when there is none
    pub fn search(&self) -> String {
        match self.location.read().query() {
            Some(q) if !q.is_empty() => format!("?{}", q),
            _ => String::new(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Backend used by the storage accessor, picked from the URL scheme
    pub fn storage_backend(&self) -> StorageBackend {
        StorageBackend::for_scheme(self.location.read().scheme())
    }

    pub fn cookies(&self) -> Arc<dyn Store> {
        self.cookies.clone()
    }

    pub fn local_storage(&self) -> Arc<dyn Store> {
        self.local_storage.clone()
    }

    pub fn beacon(&self) -> Option<Arc<dyn Beacon>> {
        self.beacon.clone()
    }

    pub fn http(&self) -> Arc<dyn HttpTransport> {
        self.http.clone()
    }

    pub fn cookie_defaults(&self) -> &CookieOptions {
        &self.cookie_defaults
    }
}

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

use crate::storage::{CookieOptions, Store, StorageError, load_json_file, save_json_file};

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use log;

/// Registrable-domain suffixes a cookie cannot be scoped to, on top of single labels
pub const DEFAULT_PUBLIC_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk",
    "com.au", "net.au", "org.au",
    "co.jp", "ne.jp", "or.jp",
    "com.br", "com.cn", "com.mx", "co.nz", "co.za",
    "github.io", "herokuapp.com", "appspot.com",
];

/// A single stored cookie
#[derive(Serialize, Deserialize, Debug, Clone)]
struct Cookie {
    value: String,
    #[serde(default)]
    domain: Option<String>,
    path: String,
    secure: bool,
    expires: DateTime<Utc>,
}

/// Cookie jar for one page host, in memory or backed by a JSON file.
///
/// Domain attributes are checked the way browsers do: the page host must
/// domain-match them and they cannot be a public suffix, otherwise the write
/// is dropped without error.
pub struct CookieJar {
    host: String,
    public_suffixes: HashSet<String>,
    cookies: Mutex<HashMap<String, Cookie>>,
    file: Option<PathBuf>,
}

impl CookieJar {
    /// Volatile jar for the given page host
    pub fn in_memory(host: &str) -> Self {
        Self {
            host: host.to_lowercase(),
            public_suffixes: DEFAULT_PUBLIC_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            cookies: Mutex::new(HashMap::new()),
            file: None,
        }
    }

    /// Jar persisted to a JSON file, loaded now and rewritten after each change
    pub fn open(host: &str, file: PathBuf) -> Result<Self, StorageError> {
        let cookies: HashMap<String, Cookie> = load_json_file(&file)?;
        log::debug!("loaded {} cookie(s) from {}", cookies.len(), file.display());
        let mut jar = Self::in_memory(host);
        jar.cookies = Mutex::new(cookies);
        jar.file = Some(file);
        Ok(jar)
    }

    /// Replaces the list of suffixes cookies cannot be scoped to
    pub fn with_public_suffixes(mut self, suffixes: &[&str]) -> Self {
        self.public_suffixes = suffixes.iter().map(|s| s.to_lowercase()).collect();
        self
    }

    /// The domain attribute a cookie was stored with
    pub fn domain_of(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).and_then(|c| c.domain.clone())
    }

    /// Whether a cookie for this page can be scoped to the given domain
    fn accepts_domain(&self, domain: &str) -> bool {
        let domain = domain.trim_start_matches('.').to_lowercase();
        if domain.is_empty() || !domain.contains('.') || self.public_suffixes.contains(&domain) {
            return false;
        }
        self.host == domain || self.host.ends_with(&format!(".{}", domain))
    }

    fn persist(&self, cookies: &HashMap<String, Cookie>) {
        if let Some(file) = &self.file {
            if let Err(e) = save_json_file(file, cookies) {
                log::warn!("failed to persist cookies: {}", e);
            }
        }
    }
}

impl Store for CookieJar {
    fn get(&self, key: &str) -> Option<String> {
        let mut cookies = self.cookies.lock();
        match cookies.get(key) {
            Some(cookie) if cookie.expires <= Utc::now() => {
                cookies.remove(key);
                self.persist(&cookies);
                None
            },
            Some(cookie) => Some(cookie.value.clone()),
            None => None,
        }
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) {
        if let Some(domain) = &options.domain {
            if !self.accepts_domain(domain) {
                log::debug!("cookie {} rejected for domain {} on {}", key, domain, self.host);
                return;
            }
        }

        let mut cookies = self.cookies.lock();
        if options.max_age.is_zero() {
            cookies.remove(key);
        } else {
            cookies.insert(key.to_string(), Cookie {
                value: value.to_string(),
                domain: options.domain.clone(),
                path: options.path.clone(),
                secure: options.secure,
                expires: Duration::from_std(options.max_age).ok()
                    .and_then(|max_age| Utc::now().checked_add_signed(max_age))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            });
        }
        self.persist(&cookies);
    }

    fn remove(&self, key: &str, options: &CookieOptions) {
        let mut expired = options.clone();
        expired.max_age = std::time::Duration::ZERO;
        self.set(key, "", &expired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scoped(domain: &str) -> CookieOptions {
        CookieOptions { domain: Some(domain.into()), ..Default::default() }
    }

    #[test]
    fn test_host_only_cookies() {
        let jar = CookieJar::in_memory("www.example.com");
        jar.set("a", "1", &CookieOptions::default());
        assert_eq!(jar.get("a"), Some("1".into()));
        assert_eq!(jar.domain_of("a"), None);
    }

    #[test]
    fn test_domain_matching() {
        let jar = CookieJar::in_memory("shop.example.co.uk");
        jar.set("parent", "1", &scoped(".example.co.uk"));
        jar.set("suffix", "1", &scoped(".co.uk"));
        jar.set("tld", "1", &scoped(".uk"));
        jar.set("foreign", "1", &scoped(".other.com"));

        assert_eq!(jar.get("parent"), Some("1".into()));
        assert_eq!(jar.get("suffix"), None);
        assert_eq!(jar.get("tld"), None);
        assert_eq!(jar.get("foreign"), None);
    }

    #[test]
    fn test_custom_public_suffixes() {
        let jar = CookieJar::in_memory("app.example.com").with_public_suffixes(&["example.com"]);
        jar.set("a", "1", &scoped(".example.com"));
        assert_eq!(jar.get("a"), None);
        jar.set("a", "1", &scoped(".app.example.com"));
        assert_eq!(jar.get("a"), Some("1".into()));
    }

    #[test]
    fn test_remove_and_expiry() {
        let jar = CookieJar::in_memory("example.com");
        jar.set("a", "1", &CookieOptions::default());
        jar.remove("a", &CookieOptions::default());
        assert_eq!(jar.get("a"), None);

        let short = CookieOptions { max_age: std::time::Duration::from_nanos(1), ..Default::default() };
        jar.set("b", "1", &short);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(jar.get("b"), None);
    }

    #[test]
    fn test_persistence() {
        let file = std::env::temp_dir().join(format!("infoowl-cookies-{}.json", Uuid::new_v4()));
        {
            let jar = CookieJar::open("www.example.com", file.clone()).unwrap();
            jar.set("s:context.referrer", "{\"id\":\"1\"}", &scoped(".example.com"));
        }

        let jar = CookieJar::open("www.example.com", file.clone()).unwrap();
        assert_eq!(jar.get("s:context.referrer"), Some("{\"id\":\"1\"}".into()));
        assert_eq!(jar.domain_of("s:context.referrer"), Some(".example.com".into()));
        let _ = std::fs::remove_file(file);
    }

    #[test]
    fn test_expired_cookies_leave_the_file() {
        let file = std::env::temp_dir().join(format!("infoowl-cookies-{}.json", Uuid::new_v4()));
        let short = CookieOptions { max_age: std::time::Duration::from_nanos(1), ..Default::default() };
        {
            let jar = CookieJar::open("www.example.com", file.clone()).unwrap();
            jar.set("keep", "1", &CookieOptions::default());
            jar.set("stale", "1", &short);
            std::thread::sleep(std::time::Duration::from_millis(5));
            assert_eq!(jar.get("stale"), None);
        }

        let saved: HashMap<String, Cookie> = load_json_file(&file).unwrap();
        assert!(saved.contains_key("keep"));
        assert!(!saved.contains_key("stale"));
        let _ = std::fs::remove_file(file);
    }
}

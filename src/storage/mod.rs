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

pub mod cookie;
pub mod local;
pub mod top_domain;

use crate::platform::Platform;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use log;

/// Cookie lifetime: one year
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(31_536_000_000);

/// Errors when loading or persisting a storage backend to disk
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to access {0}: {1}")]
    Io(String, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Format(String, serde_json::Error),
}

/// Attributes attached to a write
#[derive(Debug, Clone, PartialEq)]
pub struct CookieOptions {
    pub max_age: Duration,
    pub secure: bool,
    pub path: String,
    /// Domain attribute, host-only cookie when None
    pub domain: Option<String>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            secure: false,
            path: String::from("/"),
            domain: None,
        }
    }
}

/// A key-value backend provided by the platform (cookie jar, local storage)
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, options: &CookieOptions);
    fn remove(&self, key: &str, options: &CookieOptions);
}

/// Which backend the accessor reads and writes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Cookie,
    LocalStore,
}

impl StorageBackend {
    /// Cookies do not work on file: and chrome-extension: pages
    pub fn for_scheme(scheme: &str) -> Self {
        match scheme.trim_end_matches(':') {
            "file" | "chrome-extension" => StorageBackend::LocalStore,
            _ => StorageBackend::Cookie,
        }
    }
}

/// Gets and sets values on the appropriate backend and domain
pub struct Storage<'a> {
    platform: &'a Platform,
}

impl<'a> Storage<'a> {
    pub fn new(platform: &'a Platform) -> Self {
        Self { platform }
    }

    fn store(&self) -> Arc<dyn Store> {
        match self.platform.storage_backend() {
            StorageBackend::Cookie => self.platform.cookies(),
            StorageBackend::LocalStore => self.platform.local_storage(),
        }
    }

    /// Reads a value, empty values count as unset
    pub fn read(&self, key: &str) -> Option<String> {
        self.store().get(key).filter(|v| !v.is_empty())
    }

    /// Writes a value scoped to the top-level domain, falls back to a
    /// host-only write when the scoped one does not stick
    pub fn write(&self, key: &str, value: &str) {
        let store = self.store();
        let location = self.platform.location();
        let domain = format!(".{}", top_domain::top_domain(&location, self.platform.cookies().as_ref()));
        log::debug!("store domain {} -> {}", location, domain);

        let mut options = self.platform.cookie_defaults().clone();
        options.domain = match domain.as_str() {
            "." => None,
            _ => Some(domain),
        };

        log::debug!("store {}, {}, {:?}", key, value, options);
        store.set(key, value, &options);
        if self.read(key).is_some() {
            return;
        }

        options.domain = None;
        log::debug!("fallback store {}, {}, {:?}", key, value, options);
        store.set(key, value, &options);
    }
}

/// Loads a JSON file into a backend's state, missing files yield the default
pub fn load_json_file<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    let path_str = path.display().to_string();
    if !path.exists() {
        return Ok(T::default());
    }
    let file = File::open(path).map_err(|e| StorageError::Io(path_str.clone(), e))?;
    serde_json::from_reader(file).map_err(|e| StorageError::Format(path_str, e))
}

/// Writes a backend's state to a JSON file
pub fn save_json_file<T: Serialize>(path: &Path, state: &T) -> Result<(), StorageError> {
    let path_str = path.display().to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(path_str.clone(), e))?;
    }
    let file = File::create(path).map_err(|e| StorageError::Io(path_str.clone(), e))?;
    serde_json::to_writer(file, state).map_err(|e| StorageError::Format(path_str, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::cookie::CookieJar;
    use crate::testing;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Accepts the top-domain probe but drops any other domain-scoped write
    #[derive(Default)]
    struct HostOnlyStore {
        values: Mutex<HashMap<String, String>>,
        writes: Mutex<Vec<(String, CookieOptions)>>,
    }

    impl Store for HostOnlyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.values.lock().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str, options: &CookieOptions) {
            self.writes.lock().push((key.into(), options.clone()));
            if options.domain.is_none() || key == top_domain::PROBE_COOKIE {
                self.values.lock().insert(key.into(), value.into());
            }
        }

        fn remove(&self, key: &str, _options: &CookieOptions) {
            self.values.lock().remove(key);
        }
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(StorageBackend::for_scheme("file:"), StorageBackend::LocalStore);
        assert_eq!(StorageBackend::for_scheme("chrome-extension"), StorageBackend::LocalStore);
        assert_eq!(StorageBackend::for_scheme("https"), StorageBackend::Cookie);
        assert_eq!(StorageBackend::for_scheme("http:"), StorageBackend::Cookie);
    }

    #[test]
    fn test_domain_scoped_write() {
        let jar = Arc::new(CookieJar::in_memory("www.example.com"));
        let platform = testing::platform("https://www.example.com/").with_cookies(jar.clone());
        let storage = Storage::new(&platform);

        storage.write("key", "value");
        assert_eq!(storage.read("key"), Some("value".into()));
        assert_eq!(jar.domain_of("key"), Some(".example.com".into()));
    }

    #[test]
    fn test_host_only_fallback() {
        let store = Arc::new(HostOnlyStore::default());
        let platform = testing::platform("https://www.example.com/").with_cookies(store.clone());
        let storage = Storage::new(&platform);

        storage.write("key", "value");
        assert_eq!(storage.read("key"), Some("value".into()));

        let writes = store.writes.lock();
        let key_writes: Vec<&CookieOptions> = writes.iter()
            .filter(|(k, _)| k == "key")
            .map(|(_, o)| o)
            .collect();
        assert_eq!(key_writes.len(), 2);
        assert_eq!(key_writes[0].domain, Some(".example.com".into()));
        assert_eq!(key_writes[1].domain, None);
        assert_eq!(key_writes[1].path, "/");
        assert_eq!(key_writes[1].max_age, DEFAULT_MAX_AGE);
        assert!(!key_writes[1].secure);
    }

    #[test]
    fn test_no_domain_on_localhost() {
        let jar = Arc::new(CookieJar::in_memory("localhost"));
        let platform = testing::platform("http://localhost:3000/").with_cookies(jar.clone());
        let storage = Storage::new(&platform);

        storage.write("key", "value");
        assert_eq!(storage.read("key"), Some("value".into()));
        assert_eq!(jar.domain_of("key"), None);
    }

    #[test]
    fn test_local_storage_on_file_pages() {
        let platform = testing::platform("file:///home/user/index.html");
        let storage = Storage::new(&platform);

        storage.write("key", "value");
        assert_eq!(storage.read("key"), Some("value".into()));
        assert_eq!(platform.local_storage().get("key"), Some("value".into()));
        assert_eq!(platform.cookies().get("key"), None);
    }

    #[test]
    fn test_platform_write_defaults() {
        let store = Arc::new(HostOnlyStore::default());
        let platform = testing::platform("https://www.example.com/")
            .with_cookies(store.clone())
            .with_cookie_defaults(CookieOptions { secure: true, ..Default::default() });
        Storage::new(&platform).write("key", "value");

        let writes = store.writes.lock();
        assert!(writes.iter().filter(|(k, _)| k == "key").all(|(_, o)| o.secure && o.path == "/"));
    }
}

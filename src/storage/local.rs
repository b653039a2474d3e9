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

use std::collections::HashMap;
use std::path::PathBuf;
use parking_lot::Mutex;
use log;

/// localStorage equivalent: plain key-value pairs, cookie options are ignored
pub struct LocalStorage {
    values: Mutex<HashMap<String, String>>,
    file: Option<PathBuf>,
}

impl LocalStorage {
    pub fn in_memory() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            file: None,
        }
    }

    /// Storage persisted to a JSON file, loaded now and rewritten after each change
    pub fn open(file: PathBuf) -> Result<Self, StorageError> {
        let values: HashMap<String, String> = load_json_file(&file)?;
        Ok(Self {
            values: Mutex::new(values),
            file: Some(file),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) {
        if let Some(file) = &self.file {
            if let Err(e) = save_json_file(file, values) {
                log::warn!("failed to persist local storage: {}", e);
            }
        }
    }
}

impl Store for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str, _options: &CookieOptions) {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }

    fn remove(&self, key: &str, _options: &CookieOptions) {
        let mut values = self.values.lock();
        values.remove(key);
        self.persist(&values);
    }
}

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

use crate::events::any::AnyEvent;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use log;

/// The current visitor, as known by the host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<String>,
    pub anonymous_id: Option<String>,
}

/// What an integration can ask of the analytics host
pub trait Host: Send + Sync {
    /// Identified and anonymous ids of the current visitor
    fn user(&self) -> User;
    /// Names of every integration the host knows about
    fn integration_names(&self) -> Vec<String>;
    /// Version reported as context.library.version
    fn version(&self) -> String;
    /// Signals that an integration is ready to take events
    fn ready(&self, integration: &str);
}

/// The Integration trait, all integrations must implement this
#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;
    /// Called once when the host starts
    fn initialize(&self, host: &dyn Host);
    /// Called for every event invoked on the host
    async fn handle(&self, host: &dyn Host, event: &AnyEvent);
    fn is_loaded(&self) -> bool;
}

/// A minimal analytics host: identity, a registry of integrations, and event
/// invocation
pub struct Analytics {
    version: String,
    user: RwLock<User>,
    integrations: Vec<Arc<dyn Integration>>,
    ready: Mutex<HashSet<String>>,
    initialized: AtomicBool,
}

impl Analytics {
    pub fn new() -> Self {
        Self::with_version(env!("CARGO_PKG_VERSION"))
    }

    pub fn with_version(version: &str) -> Self {
        Self {
            version: version.to_string(),
            user: RwLock::new(User::default()),
            integrations: vec!(),
            ready: Mutex::new(HashSet::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Adds an integration to the registry
    pub fn register(&mut self, integration: Arc<dyn Integration>) {
        log::debug!("registering integration {}", integration.name());
        self.integrations.push(integration);
    }

    /// Sets the identified user id
    pub fn identify_user(&self, id: Option<String>) {
        self.user.write().id = id;
    }

    pub fn set_anonymous_id(&self, anonymous_id: Option<String>) {
        self.user.write().anonymous_id = anonymous_id;
    }

    /// Initialises every registered integration, events are only delivered afterwards
    pub fn initialize(&self) {
        for integration in self.integrations.iter() {
            integration.initialize(self);
        }
        self.initialized.store(true, Ordering::SeqCst);
    }

    /// Whether the named integration has signalled readiness
    pub fn is_ready(&self, integration: &str) -> bool {
        self.ready.lock().contains(integration)
    }

    /// Hands an event over to every integration
    pub async fn invoke(&self, event: &AnyEvent) {
        if !self.initialized.load(Ordering::SeqCst) {
            log::warn!("dropping {} event: analytics not initialised", event.action());
            return;
        }

        for integration in self.integrations.iter() {
            if !integration.is_loaded() {
                log::debug!("skipping {}: not loaded", integration.name());
                continue;
            }
            integration.handle(self, event).await;
        }
    }
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for Analytics {
    fn user(&self) -> User {
        self.user.read().clone()
    }

    fn integration_names(&self) -> Vec<String> {
        self.integrations.iter().map(|i| i.name().to_string()).collect()
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    fn ready(&self, integration: &str) {
        self.ready.lock().insert(integration.to_string());
    }
}

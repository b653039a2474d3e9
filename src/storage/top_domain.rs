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

use crate::storage::{CookieOptions, Store};

use url::{Host, Url};

/// Throwaway cookie written while probing domain levels
pub const PROBE_COOKIE: &str = "__tld__";

/// Candidate cookie domains for a URL, shortest first.
///
/// `www.example.co.uk` gives `co.uk`, `example.co.uk`, `www.example.co.uk`.
/// IP addresses and single-label hosts have no candidates.
pub fn levels(url: &Url) -> Vec<String> {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_lowercase(),
        _ => return vec!(),
    };

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() <= 1 {
        return vec!();
    }

    (0..parts.len() - 1).rev()
        .map(|i| parts[i..].join("."))
        .collect()
}

/// Finds the top-level registrable domain of a URL by asking the cookie jar.
///
/// A probe cookie is scoped to each level in turn, the first one the jar
/// keeps is the answer. Returns an empty string when none sticks.
pub fn top_domain(url: &Url, cookies: &dyn Store) -> String {
    for level in levels(url) {
        let options = CookieOptions {
            domain: Some(format!(".{}", level)),
            ..Default::default()
        };
        cookies.set(PROBE_COOKIE, "1", &options);
        if cookies.get(PROBE_COOKIE).is_some() {
            cookies.remove(PROBE_COOKIE, &options);
            return level;
        }
    }
    String::new()
}

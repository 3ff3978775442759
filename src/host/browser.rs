// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Browser, OS, and device classification from a user-agent string.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::BrowserInfo;

use super::Host;

static MOBILE_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)Mobi|Android").ok());
static TABLET_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)Tablet|iPad").ok());

/// Browser family. `Edg` is checked first since Edge also advertises Chrome,
/// and Chrome before Safari for the same reason.
pub fn detect_browser(ua: &str) -> &'static str {
    if ua.contains("Edg") {
        "Edge"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") {
        "Safari"
    } else {
        "Unknown"
    }
}

/// Operating system family.
pub fn detect_os(ua: &str) -> &'static str {
    if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") || ua.contains("iOS") {
        "iOS"
    } else if ua.contains("Mac") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

/// Device class.
pub fn detect_device(ua: &str) -> &'static str {
    let matches = |re: &Lazy<Option<Regex>>| re.as_ref().is_some_and(|r| r.is_match(ua));
    if matches(&MOBILE_REGEX) {
        "Mobile"
    } else if matches(&TABLET_REGEX) {
        "Tablet"
    } else {
        "Desktop"
    }
}

impl BrowserInfo {
    /// Derive the environment description from a host.
    pub fn detect(host: &dyn Host) -> Self {
        let ua = host.user_agent();
        Self {
            browser: detect_browser(&ua).to_string(),
            os: detect_os(&ua).to_string(),
            device: detect_device(&ua).to_string(),
            language: host.language(),
            cookie_enabled: host.cookie_enabled(),
            on_line: host.online(),
            screen: host.screen().unwrap_or_default(),
            viewport: host.viewport().unwrap_or_default(),
        }
    }
}

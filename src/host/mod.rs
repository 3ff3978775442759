// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The host environment the agent reports on.
//!
//! A [`Host`] answers the questions a browser page would: where are we, who
//! is the user agent, how big is the screen, how long did the load take,
//! how much memory is in use. Every enrichment method is optional; a host
//! that cannot answer returns `None` and the envelope carries `null`.
//!
//! Two implementations are provided:
//!
//! - [`StaticHost`] - fixed values with a mutable current address, for
//!   embedders that forward real client data and for tests
//! - [`ProcessHost`] - the current native process

mod browser;

pub use browser::{detect_browser, detect_device, detect_os};

use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use crate::types::{NavigationTiming, ScreenInfo, Viewport};

/// Source of environment data for envelope enrichment.
pub trait Host: Send + Sync {
    /// Address of the current page or route.
    fn current_url(&self) -> String;

    /// User-agent string used for browser/OS/device detection.
    fn user_agent(&self) -> String;

    fn language(&self) -> Option<String> {
        None
    }

    fn cookie_enabled(&self) -> bool {
        false
    }

    fn online(&self) -> bool {
        true
    }

    fn screen(&self) -> Option<ScreenInfo> {
        None
    }

    fn viewport(&self) -> Option<Viewport> {
        None
    }

    /// Load timings, once the page has finished loading.
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        None
    }

    /// Heap or resident memory in bytes.
    fn memory_usage_bytes(&self) -> Option<u64> {
        None
    }

    /// Called after a navigation breadcrumb is recorded.
    fn navigate(&self, _url: &str) {}
}

/// Host with fixed values set by the embedder.
#[derive(Debug)]
pub struct StaticHost {
    url: RwLock<String>,
    user_agent: String,
    language: Option<String>,
    cookie_enabled: bool,
    online: bool,
    screen: Option<ScreenInfo>,
    viewport: Option<Viewport>,
    timing: Option<NavigationTiming>,
    memory_bytes: Option<u64>,
}

impl StaticHost {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            url: RwLock::new(url.into()),
            user_agent: user_agent.into(),
            language: None,
            cookie_enabled: true,
            online: true,
            screen: None,
            viewport: None,
            timing: None,
            memory_bytes: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn with_screen(mut self, screen: ScreenInfo) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_timing(mut self, timing: NavigationTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_memory_bytes(mut self, bytes: u64) -> Self {
        self.memory_bytes = Some(bytes);
        self
    }
}

impl Host for StaticHost {
    fn current_url(&self) -> String {
        self.url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn language(&self) -> Option<String> {
        self.language.clone()
    }

    fn cookie_enabled(&self) -> bool {
        self.cookie_enabled
    }

    fn online(&self) -> bool {
        self.online
    }

    fn screen(&self) -> Option<ScreenInfo> {
        self.screen
    }

    fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.timing
    }

    fn memory_usage_bytes(&self) -> Option<u64> {
        self.memory_bytes
    }

    fn navigate(&self, url: &str) {
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.to_string();
    }
}

/// Host describing the running native process.
#[derive(Debug)]
pub struct ProcessHost {
    url: RwLock<String>,
    user_agent: String,
    started: Instant,
    loaded_ms: RwLock<Option<u64>>,
}

impl ProcessHost {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: RwLock::new(url.into()),
            user_agent: process_user_agent(),
            started: Instant::now(),
            loaded_ms: RwLock::new(None),
        }
    }

    /// Record that startup finished; the elapsed time becomes the load time.
    pub fn mark_loaded(&self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        *self.loaded_ms.write().unwrap_or_else(PoisonError::into_inner) = Some(elapsed);
    }
}

impl Host for ProcessHost {
    fn current_url(&self) -> String {
        self.url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn language(&self) -> Option<String> {
        std::env::var("LANG").ok().and_then(|lang| locale_to_language(&lang))
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        let loaded = *self.loaded_ms.read().unwrap_or_else(PoisonError::into_inner);
        loaded.map(|load_ms| NavigationTiming {
            load_ms,
            ..Default::default()
        })
    }

    fn memory_usage_bytes(&self) -> Option<u64> {
        resident_memory_bytes()
    }

    fn navigate(&self, url: &str) {
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.to_string();
    }
}

fn process_user_agent() -> String {
    let os = match std::env::consts::OS {
        "linux" => "X11; Linux",
        "macos" => "Macintosh; Mac OS X",
        "windows" => "Windows NT",
        "android" => "Linux; Android",
        "ios" => "iPhone; iOS",
        other => other,
    };
    format!(
        "pulse/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        os,
        std::env::consts::ARCH
    )
}

/// `en_US.UTF-8` -> `en-US`. `C` and `POSIX` carry no language.
fn locale_to_language(locale: &str) -> Option<String> {
    let base = locale.split('.').next()?.trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

/// `VmRSS:  12345 kB` from `/proc/<pid>/status`, in bytes. Reported in kB
/// regardless of the kernel page size.
#[cfg(any(target_os = "linux", test))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let kb: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(kb * 1024),
        Some(_) => None,
    }
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> Option<u64> {
    None
}

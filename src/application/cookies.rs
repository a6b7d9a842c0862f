use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::Platform;
use crate::domain::Browser;

/// Chooses the browser whose cookies the engine should read for a run.
pub trait CookieResolver: Send + Sync {
    fn resolve(&self) -> Option<Browser>;
}

/// Probes the real host environment. Evaluated again on every call.
#[derive(Debug, Clone, Copy)]
pub struct HostCookieResolver {
    platform: Platform,
}

impl HostCookieResolver {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

impl CookieResolver for HostCookieResolver {
    fn resolve(&self) -> Option<Browser> {
        let browser = resolve_cookie_browser(self.platform, &|key| std::env::var_os(key));
        tracing::debug!(?browser, "cookie source probed");
        browser
    }
}

/// Returns the first browser, in platform order, whose profile directory exists.
///
/// Only checks for directory existence; cookie databases are never opened.
pub fn resolve_cookie_browser(
    platform: Platform,
    env: &dyn Fn(&str) -> Option<OsString>,
) -> Option<Browser> {
    candidates(platform, env)
        .into_iter()
        .find(|(_, profile_dir)| profile_dir.is_dir())
        .map(|(browser, _)| browser)
}

fn candidates(
    platform: Platform,
    env: &dyn Fn(&str) -> Option<OsString>,
) -> Vec<(Browser, PathBuf)> {
    let root = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    match platform {
        Platform::Windows => {
            let mut found = Vec::new();
            if let Some(local) = root("LOCALAPPDATA") {
                found.push((Browser::Chrome, local.join("Google").join("Chrome").join("User Data")));
                found.push((Browser::Edge, local.join("Microsoft").join("Edge").join("User Data")));
            }
            if let Some(roaming) = root("APPDATA") {
                found.push((
                    Browser::Firefox,
                    roaming.join("Mozilla").join("Firefox").join("Profiles"),
                ));
            }
            found
        }
        Platform::MacOs => {
            let Some(home) = root("HOME") else {
                return Vec::new();
            };
            let support = home.join("Library").join("Application Support");
            vec![
                (Browser::Chrome, support.join("Google").join("Chrome")),
                (Browser::Firefox, support.join("Firefox").join("Profiles")),
                (Browser::Edge, support.join("Microsoft Edge")),
                (Browser::Brave, support.join("BraveSoftware").join("Brave-Browser")),
            ]
        }
        Platform::Linux => {
            let home = root("HOME");
            let config = root("XDG_CONFIG_HOME").or_else(|| home.as_ref().map(|h| h.join(".config")));

            let mut found = Vec::new();
            if let Some(home) = &home {
                found.push((Browser::Firefox, home.join(".mozilla").join("firefox")));
            }
            if let Some(config) = config {
                found.push((Browser::Chrome, config.join("google-chrome")));
                found.push((Browser::Chromium, config.join("chromium")));
                found.push((Browser::Brave, config.join("BraveSoftware").join("Brave-Browser")));
                found.push((Browser::Edge, config.join("microsoft-edge")));
            }
            found
        }
    }
}

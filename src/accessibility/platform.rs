//! Platform detection and enablement
//!
//! Whether accessibility is on is decided once, at startup, from the build
//! target, the config file and the `AXTERM_ACCESSIBILITY` environment
//! variable. The result travels into every session as an
//! [`AccessibilitySettings`] value.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::debounce::DEFAULT_DEBOUNCE;

/// Environment variable that forces accessibility on (`1`) or off (`0`)
pub const ENABLE_ENV: &str = "AXTERM_ACCESSIBILITY";

/// Host platform as far as accessibility is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    /// macOS, where Voice Control reads NSAccessibility attributes
    MacOs,
    Unsupported,
}

impl Platform {
    /// Platform of the current build target
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unsupported
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
            Platform::Unsupported => "unsupported",
        }
    }

    pub const fn supports_voice_control(&self) -> bool {
        matches!(self, Platform::MacOs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configured enablement policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enablement {
    /// On where the platform supports Voice Control
    #[default]
    Auto,
    On,
    Off,
}

impl Enablement {
    pub fn resolve(self, platform: Platform) -> bool {
        match self {
            Enablement::Auto => platform.supports_voice_control(),
            Enablement::On => true,
            Enablement::Off => false,
        }
    }
}

/// Resolved accessibility settings handed to each session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessibilitySettings {
    pub enabled: bool,
    pub debounce: Duration,
}

impl Default for AccessibilitySettings {
    fn default() -> Self {
        Self {
            enabled: Platform::current().supports_voice_control(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl AccessibilitySettings {
    pub fn enabled(debounce: Duration) -> Self {
        Self {
            enabled: true,
            debounce,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Combine the configured policy with an optional environment override
    pub fn resolve(
        enablement: Enablement,
        debounce: Duration,
        platform: Platform,
        env_override: Option<&str>,
    ) -> Self {
        let enabled = match env_override.and_then(parse_toggle) {
            Some(forced) => {
                debug!("{} overrides accessibility: {}", ENABLE_ENV, forced);
                forced
            }
            None => enablement.resolve(platform),
        };
        Self { enabled, debounce }
    }

    /// [`resolve`](Self::resolve) for the current platform and process environment
    pub fn from_env(enablement: Enablement, debounce: Duration) -> Self {
        let env_value = std::env::var(ENABLE_ENV).ok();
        Self::resolve(enablement, debounce, Platform::current(), env_value.as_deref())
    }
}

/// Parse an on/off environment value; anything unrecognized is ignored
pub fn parse_toggle(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::MacOs.name(), "macos");
        assert_eq!(Platform::Unsupported.to_string(), "unsupported");
    }

    #[test]
    fn test_auto_follows_platform() {
        assert!(Enablement::Auto.resolve(Platform::MacOs));
        assert!(!Enablement::Auto.resolve(Platform::Unsupported));
        assert!(Enablement::On.resolve(Platform::Unsupported));
        assert!(!Enablement::Off.resolve(Platform::MacOs));
    }

    #[test]
    fn test_env_override_wins() {
        let settings = AccessibilitySettings::resolve(
            Enablement::Off,
            DEFAULT_DEBOUNCE,
            Platform::MacOs,
            Some("1"),
        );
        assert!(settings.enabled);

        let settings = AccessibilitySettings::resolve(
            Enablement::On,
            DEFAULT_DEBOUNCE,
            Platform::MacOs,
            Some("off"),
        );
        assert!(!settings.enabled);
    }

    #[test]
    fn test_garbage_env_value_is_ignored() {
        let settings = AccessibilitySettings::resolve(
            Enablement::Auto,
            DEFAULT_DEBOUNCE,
            Platform::Unsupported,
            Some("maybe"),
        );
        assert!(!settings.enabled);
    }

    #[test]
    fn test_parse_toggle() {
        assert_eq!(parse_toggle(" TRUE "), Some(true));
        assert_eq!(parse_toggle("no"), Some(false));
        assert_eq!(parse_toggle(""), None);
    }
}

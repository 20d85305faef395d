//! Platform accessibility bridge
//!
//! Attribute and notification names belong to the host framework
//! (NSAccessibility on macOS). They are kept here as fixed tags and passed
//! through untouched.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::info;

use super::platform::Platform;
use super::surface::TextRange;

/// Role every terminal session reports
pub const TEXT_AREA_ROLE: &str = "AXTextArea";

/// Change notifications the facade posts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Notification {
    ValueChanged,
    SelectedTextChanged,
    FocusedElementChanged,
}

impl Notification {
    /// Platform tag for the notification
    pub const fn tag(&self) -> &'static str {
        match self {
            Notification::ValueChanged => "AXValueChanged",
            Notification::SelectedTextChanged => "AXSelectedTextChanged",
            Notification::FocusedElementChanged => "AXFocusedUIElementChanged",
        }
    }

    /// Debouncer kind, `None` for notifications that always go out
    pub const fn debounce_key(&self) -> Option<&'static str> {
        match self {
            Notification::ValueChanged => Some("value_changed"),
            Notification::SelectedTextChanged => Some("selection_changed"),
            Notification::FocusedElementChanged => None,
        }
    }
}

/// Attributes a dictation client queries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Role,
    Value,
    SelectedText,
    SelectedTextRange,
    NumberOfCharacters,
    VisibleCharacterRange,
    InsertionPointLineNumber,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::Role,
        Attribute::Value,
        Attribute::SelectedText,
        Attribute::SelectedTextRange,
        Attribute::NumberOfCharacters,
        Attribute::VisibleCharacterRange,
        Attribute::InsertionPointLineNumber,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Attribute::Role => "AXRole",
            Attribute::Value => "AXValue",
            Attribute::SelectedText => "AXSelectedText",
            Attribute::SelectedTextRange => "AXSelectedTextRange",
            Attribute::NumberOfCharacters => "AXNumberOfCharacters",
            Attribute::VisibleCharacterRange => "AXVisibleCharacterRange",
            Attribute::InsertionPointLineNumber => "AXInsertionPointLineNumber",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.name() == name)
    }

    /// Whether the client may write this attribute
    pub const fn is_settable(&self) -> bool {
        matches!(self, Attribute::Value | Attribute::SelectedTextRange)
    }
}

/// Attribute payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Integer(usize),
    Range(TextRange),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BridgeError {
    #[error("accessibility bridge is not connected")]
    Unavailable,

    #[error("platform rejected {tag}: {reason}")]
    Rejected { tag: &'static str, reason: String },
}

/// Native side of the accessibility API
pub trait PlatformBridge: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether the native side is reachable; checked once per session
    fn connect(&self) -> bool;

    fn post_notification(&self, notification: Notification) -> Result<(), BridgeError>;
}

/// Bridge that reports notifications as tracing events
pub struct LogBridge {
    platform: Platform,
    force: bool,
}

impl LogBridge {
    pub fn new() -> Self {
        Self {
            platform: Platform::current(),
            force: false,
        }
    }

    /// Connect even where the platform has no Voice Control
    pub fn forced() -> Self {
        Self {
            platform: Platform::current(),
            force: true,
        }
    }
}

impl Default for LogBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for LogBridge {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn connect(&self) -> bool {
        self.force || self.platform.supports_voice_control()
    }

    fn post_notification(&self, notification: Notification) -> Result<(), BridgeError> {
        info!(notification = notification.tag(), "accessibility notification");
        Ok(())
    }
}

/// Bridge that records notifications in order
#[derive(Default)]
pub struct MemoryBridge {
    posted: Mutex<Vec<Notification>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications posted so far
    pub fn posted(&self) -> Vec<Notification> {
        self.posted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, notification: Notification) -> usize {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|&&n| n == notification)
            .count()
    }

    /// Drain the recorded notifications
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.posted.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl PlatformBridge for MemoryBridge {
    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn connect(&self) -> bool {
        true
    }

    fn post_notification(&self, notification: Notification) -> Result<(), BridgeError> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

/// Bridge for builds without native accessibility support
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedBridge;

impl PlatformBridge for DisconnectedBridge {
    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn connect(&self) -> bool {
        false
    }

    fn post_notification(&self, _notification: Notification) -> Result<(), BridgeError> {
        Err(BridgeError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_tags() {
        assert_eq!(Notification::ValueChanged.tag(), "AXValueChanged");
        assert_eq!(Notification::SelectedTextChanged.debounce_key(), Some("selection_changed"));
        assert_eq!(Notification::FocusedElementChanged.debounce_key(), None);
    }

    #[test]
    fn test_attribute_names_round_trip() {
        for attr in Attribute::ALL {
            assert_eq!(Attribute::from_name(attr.name()), Some(attr));
        }
        assert_eq!(Attribute::from_name("AXTitle"), None);
    }

    #[test]
    fn test_memory_bridge_records_in_order() {
        let bridge = MemoryBridge::new();
        bridge.post_notification(Notification::ValueChanged).unwrap();
        bridge.post_notification(Notification::FocusedElementChanged).unwrap();

        assert_eq!(bridge.count(Notification::ValueChanged), 1);
        assert_eq!(
            bridge.take(),
            vec![Notification::ValueChanged, Notification::FocusedElementChanged]
        );
        assert!(bridge.posted().is_empty());
    }

    #[test]
    fn test_disconnected_bridge() {
        let bridge = DisconnectedBridge;
        assert!(!bridge.connect());
        assert_eq!(
            bridge.post_notification(Notification::ValueChanged),
            Err(BridgeError::Unavailable)
        );
    }
}

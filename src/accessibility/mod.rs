//! Voice Control accessibility
//!
//! Exposes a terminal surface to the platform accessibility API as a single
//! text area. Dictation clients read the buffer and cursor through
//! [`AccessibleSession`], insert text through it, and learn about changes from
//! the notifications it posts.

mod bridge;
mod debounce;
mod dictation;
mod manager;
mod platform;
mod surface;

pub use bridge::{
    Attribute, AttributeValue, BridgeError, DisconnectedBridge, LogBridge, MemoryBridge,
    Notification, PlatformBridge, TEXT_AREA_ROLE,
};
pub use debounce::{Clock, Debouncer, ManualClock, SystemClock, DEFAULT_DEBOUNCE};
pub use dictation::DictationSimulator;
pub use manager::AccessibleSession;
pub use platform::{parse_toggle, AccessibilitySettings, Enablement, Platform, ENABLE_ENV};
pub use surface::{TerminalSurface, TextRange};

//! Accessibility facade
//!
//! [`AccessibleSession`] answers accessibility queries for one terminal
//! surface and posts change notifications through the platform bridge.
//!
//! A session is either live or degraded. It is degraded when accessibility
//! was disabled at startup, when the bridge did not connect, or once the
//! surface has been dropped. Degraded sessions answer every query with an
//! empty value and ignore every command; callers cannot tell that apart from
//! an empty buffer, and nothing ever errors or panics.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, trace};

use super::bridge::{Attribute, AttributeValue, Notification, PlatformBridge, TEXT_AREA_ROLE};
use super::debounce::{Clock, Debouncer, SystemClock};
use super::platform::{AccessibilitySettings, Platform};
use super::surface::{TerminalSurface, TextRange};

/// Mutable state shared by the platform and render call sources
struct ChangeTracker {
    debouncer: Debouncer,
    last_fingerprint: Option<u64>,
    last_cursor_offset: Option<usize>,
}

/// Accessibility binding for one terminal surface
pub struct AccessibleSession {
    surface: Option<Weak<dyn TerminalSurface>>,
    bridge: Arc<dyn PlatformBridge>,
    enabled: bool,
    tracker: Mutex<ChangeTracker>,
}

impl AccessibleSession {
    /// Bind to `surface` without taking ownership of it
    pub fn new<S>(
        surface: &Arc<S>,
        bridge: Arc<dyn PlatformBridge>,
        settings: AccessibilitySettings,
    ) -> Self
    where
        S: TerminalSurface + 'static,
    {
        Self::with_clock(surface, bridge, settings, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) with an explicit debounce clock
    pub fn with_clock<S>(
        surface: &Arc<S>,
        bridge: Arc<dyn PlatformBridge>,
        settings: AccessibilitySettings,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        S: TerminalSurface + 'static,
    {
        let weak = Arc::downgrade(surface);
        let weak: Weak<dyn TerminalSurface> = weak;
        Self::build(Some(weak), bridge, settings, clock)
    }

    /// Session with no surface; always degraded
    pub fn detached(bridge: Arc<dyn PlatformBridge>, settings: AccessibilitySettings) -> Self {
        Self::build(None, bridge, settings, Arc::new(SystemClock))
    }

    fn build(
        surface: Option<Weak<dyn TerminalSurface>>,
        bridge: Arc<dyn PlatformBridge>,
        settings: AccessibilitySettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let connected = settings.enabled && bridge.connect();
        let debouncer = Debouncer::with_clock(settings.debounce, clock);
        info!(
            platform = %bridge.platform(),
            requested = settings.enabled,
            connected,
            debounce_ms = debouncer.interval().as_millis() as u64,
            "accessibility session created"
        );

        Self {
            surface,
            bridge,
            enabled: connected,
            tracker: Mutex::new(ChangeTracker {
                debouncer,
                last_fingerprint: None,
                last_cursor_offset: None,
            }),
        }
    }

    /// Whether the session is live (enabled and bridge connected)
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn platform(&self) -> Platform {
        self.bridge.platform()
    }

    pub fn role(&self) -> &'static str {
        TEXT_AREA_ROLE
    }

    /// The surface, or `None` whenever the session is degraded
    fn surface(&self) -> Option<Arc<dyn TerminalSurface>> {
        if !self.enabled {
            return None;
        }
        self.surface.as_ref()?.upgrade()
    }

    /// Whether a live surface is bound and the session is enabled
    pub(crate) fn has_surface(&self) -> bool {
        self.surface().is_some()
    }

    fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Entire buffer contents including scrollback
    pub fn get_full_text(&self) -> String {
        match self.surface() {
            Some(surface) => surface.full_text(),
            None => String::new(),
        }
    }

    /// Character offset of the cursor within [`get_full_text`](Self::get_full_text)
    pub fn get_cursor_offset(&self) -> usize {
        self.surface().map_or(0, |s| s.cursor_character_offset())
    }

    pub fn get_character_count(&self) -> usize {
        self.surface().map_or(0, |s| s.character_count())
    }

    /// Range of the text currently inside the viewport
    pub fn get_visible_range(&self) -> TextRange {
        self.surface().map_or_else(TextRange::default, |s| s.visible_range())
    }

    /// Selection if any, otherwise an empty range at the cursor
    pub fn get_selected_text_range(&self) -> TextRange {
        let Some(surface) = self.surface() else {
            return TextRange::default();
        };
        surface
            .selected_range()
            .unwrap_or_else(|| TextRange::caret(surface.cursor_character_offset()))
    }

    pub fn get_selected_text(&self) -> String {
        self.surface().map_or_else(String::new, |s| s.selected_text())
    }

    /// 0-based line holding the cursor
    pub fn get_insertion_point_line(&self) -> usize {
        let Some(surface) = self.surface() else {
            return 0;
        };
        let offset = surface.cursor_character_offset();
        surface
            .full_text()
            .chars()
            .take(offset)
            .filter(|&c| c == '\n')
            .count()
    }

    /// Type `text` into the program at the live cursor, byte for byte
    pub fn insert_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(surface) = self.surface() else {
            return;
        };
        trace!(chars = text.chars().count(), "inserting dictated text");
        surface.deliver_input(text);
    }

    /// Ask the surface to move its cursor; the offset is not re-validated here
    pub fn set_cursor_offset(&self, offset: usize) {
        if let Some(surface) = self.surface() {
            surface.request_cursor_move(offset);
        }
    }

    pub fn notify_text_changed(&self) {
        self.post_debounced(Notification::ValueChanged);
    }

    pub fn notify_selection_changed(&self) {
        self.post_debounced(Notification::SelectedTextChanged);
    }

    /// Posted immediately; focus changes are never debounced
    pub fn notify_focus_changed(&self) {
        if self.enabled {
            self.post(Notification::FocusedElementChanged);
        }
    }

    /// Called by the surface after anything that may have changed the text or
    /// the cursor; the one place change detection happens
    pub fn on_screen_update(&self) {
        let Some(surface) = self.surface() else {
            return;
        };
        let fingerprint = fingerprint(&surface.full_text());
        let cursor_offset = surface.cursor_character_offset();
        drop(surface);

        let (text_changed, cursor_moved) = {
            let mut tracker = self.tracker();
            let text_changed = tracker.last_fingerprint != Some(fingerprint);
            if text_changed {
                tracker.last_fingerprint = Some(fingerprint);
            }
            let cursor_moved = tracker.last_cursor_offset != Some(cursor_offset);
            if cursor_moved {
                tracker.last_cursor_offset = Some(cursor_offset);
            }
            (text_changed, cursor_moved)
        };

        if text_changed {
            self.notify_text_changed();
        }
        if cursor_moved {
            self.notify_selection_changed();
        }
    }

    /// Answer an attribute query; `None` when degraded
    pub fn attribute_value(&self, attribute: Attribute) -> Option<AttributeValue> {
        self.surface()?;
        let value = match attribute {
            Attribute::Role => AttributeValue::Text(self.role().to_string()),
            Attribute::Value => AttributeValue::Text(self.get_full_text()),
            Attribute::SelectedText => AttributeValue::Text(self.get_selected_text()),
            Attribute::SelectedTextRange => AttributeValue::Range(self.get_selected_text_range()),
            Attribute::NumberOfCharacters => AttributeValue::Integer(self.get_character_count()),
            Attribute::VisibleCharacterRange => AttributeValue::Range(self.get_visible_range()),
            Attribute::InsertionPointLineNumber => {
                AttributeValue::Integer(self.get_insertion_point_line())
            }
        };
        Some(value)
    }

    /// Apply an attribute write from the client.
    ///
    /// Writing `AXValue` types the given text at the cursor; writing
    /// `AXSelectedTextRange` moves the cursor to the range start.
    pub fn set_attribute_value(&self, attribute: Attribute, value: AttributeValue) {
        if !self.enabled {
            return;
        }
        if !attribute.is_settable() {
            debug!("{} is read-only", attribute.name());
            return;
        }
        match (attribute, value) {
            (Attribute::Value, AttributeValue::Text(text)) => self.insert_text(&text),
            (Attribute::SelectedTextRange, AttributeValue::Range(range)) => {
                self.set_cursor_offset(range.location)
            }
            (attribute, value) => {
                debug!("ignoring write of {:?} to {}", value, attribute.name());
            }
        }
    }

    fn post_debounced(&self, notification: Notification) {
        if !self.enabled {
            return;
        }
        let permitted = match notification.debounce_key() {
            Some(kind) => self.tracker().debouncer.should_post(kind),
            None => true,
        };
        if permitted {
            self.post(notification);
        } else {
            trace!(notification = notification.tag(), "debounced");
        }
    }

    fn post(&self, notification: Notification) {
        if let Err(e) = self.bridge.post_notification(notification) {
            debug!("failed to post {}: {}", notification.tag(), e);
        }
    }
}

/// Cheap content summary used to detect text changes
fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

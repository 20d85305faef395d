//! Scripted dictation
//!
//! Drives a session the way Voice Control does when the user speaks a phrase:
//! the text is inserted at the cursor and a value change is announced.

use tracing::debug;

use super::manager::AccessibleSession;

/// Feeds phrases into a session as if dictated
pub struct DictationSimulator<'a> {
    session: &'a AccessibleSession,
}

impl<'a> DictationSimulator<'a> {
    pub fn new(session: &'a AccessibleSession) -> Self {
        Self { session }
    }

    /// Insert `text` and announce the change. Returns whether anything was sent.
    pub fn dictate(&self, text: &str) -> bool {
        if text.is_empty() || !self.session.has_surface() {
            debug!("dictation skipped");
            return false;
        }
        self.session.insert_text(text);
        self.session.notify_text_changed();
        true
    }

    /// Dictate each phrase in order
    pub fn dictate_all<I, S>(&self, phrases: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        phrases
            .into_iter()
            .filter(|phrase| self.dictate(phrase.as_ref()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::bridge::{MemoryBridge, Notification};
    use crate::accessibility::platform::AccessibilitySettings;
    use crate::accessibility::surface::{TerminalSurface, TextRange};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Sink {
        input: Mutex<String>,
    }

    impl TerminalSurface for Sink {
        fn full_text(&self) -> String {
            String::new()
        }

        fn cursor_character_offset(&self) -> usize {
            0
        }

        fn character_count(&self) -> usize {
            0
        }

        fn visible_range(&self) -> TextRange {
            TextRange::default()
        }

        fn deliver_input(&self, text: &str) {
            self.input.lock().unwrap().push_str(text);
        }

        fn request_cursor_move(&self, _offset: usize) {}
    }

    #[test]
    fn test_dictate_inserts_and_notifies() {
        let sink = Arc::new(Sink::default());
        let bridge = Arc::new(MemoryBridge::new());
        let session = AccessibleSession::new(
            &sink,
            bridge.clone(),
            AccessibilitySettings::enabled(Duration::from_millis(100)),
        );

        assert!(DictationSimulator::new(&session).dictate("echo hello"));
        assert_eq!(*sink.input.lock().unwrap(), "echo hello");
        assert_eq!(bridge.posted(), vec![Notification::ValueChanged]);
    }

    #[test]
    fn test_dictate_all_counts_sent_phrases() {
        let sink = Arc::new(Sink::default());
        let session = AccessibleSession::new(
            &sink,
            Arc::new(MemoryBridge::new()),
            AccessibilitySettings::enabled(Duration::from_millis(100)),
        );

        let sent = DictationSimulator::new(&session).dictate_all(["ls ", "", "-la"]);
        assert_eq!(sent, 2);
        assert_eq!(*sink.input.lock().unwrap(), "ls -la");
    }

    #[test]
    fn test_dictate_without_terminal_reports_nothing_sent() {
        let sink = Arc::new(Sink::default());
        let bridge = Arc::new(MemoryBridge::new());
        let session = AccessibleSession::new(
            &sink,
            bridge.clone(),
            AccessibilitySettings::enabled(Duration::from_millis(100)),
        );
        drop(sink);

        assert!(session.is_enabled());
        assert!(!DictationSimulator::new(&session).dictate("ls"));
        assert!(bridge.posted().is_empty());
    }

    #[test]
    fn test_dictate_disabled_does_nothing() {
        let sink = Arc::new(Sink::default());
        let session = AccessibleSession::new(
            &sink,
            Arc::new(MemoryBridge::new()),
            AccessibilitySettings::disabled(),
        );

        assert!(!DictationSimulator::new(&session).dictate("rm -rf"));
        assert!(sink.input.lock().unwrap().is_empty());
    }
}

//! Presentation capability used by check-ins and the tray app.
//!
//! Dialogs, the live preview window and the settings editor belong to the
//! frontend (GUI, console, tests). The core only sees [`Presenter`], so a
//! check-in never depends on a concrete toolkit.

use crate::capture::Preview;
use crate::settings::Settings;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// User response to a live preview frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewControl {
    /// Keep measuring.
    Continue,
    /// The user closed the preview window or pressed the quit key.
    Close,
}

/// Dialog and preview operations provided by the frontend.
pub trait Presenter: Send + Sync {
    /// Ask a yes/no question. Returns `true` for yes.
    fn confirm(&self, title: &str, message: &str) -> bool;

    /// Show a neutral, non-blocking notice.
    fn inform(&self, title: &str, message: &str);

    /// Show a warning notice.
    fn warn(&self, title: &str, message: &str);

    /// Render one preview frame with its overlay.
    fn show_preview(&self, _preview: &Preview) -> PreviewControl {
        PreviewControl::Continue
    }

    /// Close the preview window if one is open.
    fn close_preview(&self) {}

    /// Let the user edit `current`. `None` means the editor was dismissed.
    fn edit_settings(&self, _current: &Settings) -> Option<Settings> {
        None
    }
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Shown via [`Presenter::inform`].
    Info,
    /// Shown via [`Presenter::warn`].
    Warning,
}

/// A notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Window title.
    pub title: String,
    /// Body text.
    pub message: String,
}

/// Presenter for running without a frontend.
///
/// Answers every consent prompt with a fixed value, logs notices through
/// `tracing` and keeps them for inspection.
#[derive(Debug)]
pub struct HeadlessPresenter {
    consent: bool,
    notices: Mutex<Vec<Notice>>,
}

impl HeadlessPresenter {
    /// Presenter answering consent prompts with `consent`.
    pub fn new(consent: bool) -> Self {
        Self {
            consent,
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Notices shown so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, level: NoticeLevel, title: &str, message: &str) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notice {
                level,
                title: title.to_owned(),
                message: message.to_owned(),
            });
    }
}

impl Presenter for HeadlessPresenter {
    fn confirm(&self, title: &str, message: &str) -> bool {
        debug!(title, message, answer = self.consent, "auto-answered consent prompt");
        self.consent
    }

    fn inform(&self, title: &str, message: &str) {
        info!(title, "{message}");
        self.record(NoticeLevel::Info, title, message);
    }

    fn warn(&self, title: &str, message: &str) {
        warn!(title, "{message}");
        self.record(NoticeLevel::Warning, title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_presenter_records_notices_in_order() {
        let presenter = HeadlessPresenter::new(true);
        presenter.inform("A", "first");
        presenter.warn("B", "second");

        let notices = presenter.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert_eq!(notices[1].level, NoticeLevel::Warning);
        assert_eq!(notices[1].message, "second");
    }

    #[test]
    fn headless_presenter_uses_fixed_consent_and_default_hooks() {
        let yes = HeadlessPresenter::new(true);
        let no = HeadlessPresenter::new(false);
        assert!(yes.confirm("t", "m"));
        assert!(!no.confirm("t", "m"));

        let preview = Preview::new(&crate::capture::Frame::new(1, 1), None);
        assert_eq!(yes.show_preview(&preview), PreviewControl::Continue);
        assert!(yes.edit_settings(&Settings::default()).is_none());
    }
}

//! Shared test utilities used across multiple test modules.

use crate::capture::Preview;
use crate::presenter::{Notice, NoticeLevel, PreviewControl, Presenter};
use crate::settings::Settings;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Presenter with scripted answers that records everything it is asked.
#[derive(Debug, Default)]
pub struct ScriptedPresenter {
    consent: bool,
    close_preview_after: Option<usize>,
    edited: Option<Settings>,
    prompts: AtomicUsize,
    previews: AtomicUsize,
    preview_closes: AtomicUsize,
    labels: Mutex<Vec<String>>,
    notices: Mutex<Vec<Notice>>,
}

impl ScriptedPresenter {
    pub fn consenting() -> Self {
        Self {
            consent: true,
            ..Self::default()
        }
    }

    pub fn declining() -> Self {
        Self::default()
    }

    /// Report [`PreviewControl::Close`] on the `n`th preview frame.
    pub fn closing_preview_after(mut self, n: usize) -> Self {
        self.close_preview_after = Some(n);
        self
    }

    pub fn editing_to(mut self, settings: Settings) -> Self {
        self.edited = Some(settings);
        self
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn previews(&self) -> usize {
        self.previews.load(Ordering::SeqCst)
    }

    pub fn preview_closes(&self) -> usize {
        self.preview_closes.load(Ordering::SeqCst)
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner()).clone()
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

impl Presenter for ScriptedPresenter {
    fn confirm(&self, _title: &str, _message: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.consent
    }

    fn inform(&self, title: &str, message: &str) {
        self.record(NoticeLevel::Info, title, message);
    }

    fn warn(&self, title: &str, message: &str) {
        self.record(NoticeLevel::Warning, title, message);
    }

    fn show_preview(&self, preview: &Preview) -> PreviewControl {
        let shown = self.previews.fetch_add(1, Ordering::SeqCst) + 1;
        self.labels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(preview.label.clone());
        match self.close_preview_after {
            Some(n) if shown >= n => PreviewControl::Close,
            _ => PreviewControl::Continue,
        }
    }

    fn close_preview(&self) {
        self.preview_closes.fetch_add(1, Ordering::SeqCst);
    }

    fn edit_settings(&self, _current: &Settings) -> Option<Settings> {
        self.edited
    }
}

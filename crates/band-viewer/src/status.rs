//! Visible status area of the viewer.

use band_common::ViewerError;

pub const DEFAULT_TITLE: &str = "Visor de Bandas";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Inline problem; the previous image stays on screen.
    Error,
    /// The viewer was reset.
    Fatal,
}

/// Message shown in the error box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn from_error(err: &ViewerError) -> Self {
        let level = if err.resets_viewer() || matches!(err, ViewerError::NoBands(_)) {
            NoticeLevel::Fatal
        } else {
            NoticeLevel::Error
        };
        Self {
            level,
            message: err.user_message(),
        }
    }
}

/// Title, loading text, band info line and notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerStatus {
    pub title: String,
    pub loading: Option<String>,
    pub info: Option<String>,
    pub notice: Option<Notice>,
}

impl Default for ViewerStatus {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            loading: None,
            info: None,
            notice: None,
        }
    }
}

impl ViewerStatus {
    pub fn uploading(&mut self, file_name: &str) {
        self.loading = Some(format!("Subiendo {}...", file_name));
    }

    pub fn analyzing(&mut self, token: &str) {
        self.title = format!("Visor: {}", token);
        self.loading = Some("Analizando metadatos...".to_string());
    }

    pub fn processing(&mut self, label: &str) {
        self.loading = Some(format!("Procesando {}...", label));
        self.notice = None;
    }

    pub fn showing(&mut self, label: &str) {
        self.loading = None;
        self.info = Some(format!("Mostrando: {}", label));
    }

    pub fn idle(&mut self) {
        self.loading = None;
    }

    pub fn report(&mut self, err: &ViewerError) {
        self.loading = None;
        self.notice = Some(Notice::from_error(err));
    }
}

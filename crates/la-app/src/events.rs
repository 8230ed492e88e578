use uuid::Uuid;
use crate::generator::backend::schemas::LoraInfo;
use crate::job::JobUpdate;
use crate::ui::UiEvent;

#[derive(Debug, Clone)]
pub enum LaEvent {
    Ui(UiEvent),
    App(AppEvent),
    Gen(GenEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Notice(Notice),
    PromptAnalyzed(String),
    PromptAnalysisFailed,

    JobQueued,
    JobComplete,
}

/// Results coming back from the generation worker thread.
#[derive(Debug, Clone)]
pub enum GenEvent {
    JobStatus {
        id: Uuid,
        update: JobUpdate,
    },
    PromptAnalyzed(Result<String, String>),
    LorasLoaded(Result<Vec<LoraInfo>, String>),
}

// Story, builder and storage errors. Messages are shown to JS as-is.

use thiserror::Error;

/// Everything fallible in the crate reports one of these.
#[derive(Error, Debug)]
pub enum StoryError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid story: {0}")]
    InvalidStory(String),

    #[error("No book is open")]
    NoBook,

    #[error("Page index {index} out of range for {len} pages")]
    PageOutOfRange { index: usize, len: usize },

    #[error("Panel not found: {0}")]
    PanelNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Project name must not be empty")]
    EmptyProjectName,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Audio playback failed for {url}: {message}")]
    Audio { url: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoryError {
    fn from(err: serde_json::Error) -> Self {
        StoryError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoryError::PageOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Page index 4 out of range for 2 pages");
    }

    #[test]
    fn serde_errors_convert() {
        let err: StoryError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, StoryError::Serialization(_)));
    }
}

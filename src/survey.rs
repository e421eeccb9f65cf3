//! Survey prompt loading

use std::path::Path;
use std::sync::Arc;

/// Errors loading the survey prompt
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("failed to read prompt file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("prompt file {0} is empty")]
    Empty(String),
}

/// The fixed survey prompt, loaded once and shared read-only across all
/// trials.
#[derive(Debug, Clone)]
pub struct Survey {
    pub prompt: String,
    pub question_count: usize,
}

impl Survey {
    pub fn new(prompt: impl Into<String>, question_count: usize) -> Self {
        Self {
            prompt: prompt.into(),
            question_count,
        }
    }

    /// Load the survey text from a prompt file
    pub fn from_file<P: AsRef<Path>>(path: P, question_count: usize) -> Result<Arc<Self>, SurveyError> {
        let path = path.as_ref();
        let prompt = std::fs::read_to_string(path).map_err(|source| SurveyError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if prompt.trim().is_empty() {
            return Err(SurveyError::Empty(path.display().to_string()));
        }

        Ok(Arc::new(Self::new(prompt, question_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Q1: Would you choose A or B?").unwrap();

        let survey = Survey::from_file(file.path(), 14).unwrap();
        assert!(survey.prompt.contains("A or B"));
        assert_eq!(survey.question_count, 14);
    }

    #[test]
    fn test_missing_file() {
        let result = Survey::from_file("/nonexistent/prompt.txt", 14);
        assert!(matches!(result, Err(SurveyError::Io { .. })));
    }

    #[test]
    fn test_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = Survey::from_file(file.path(), 14);
        assert!(matches!(result, Err(SurveyError::Empty(_))));
    }
}

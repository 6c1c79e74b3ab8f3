use std::path::PathBuf;

use serde::Serialize;

/// A failed file and the reason shown to the user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

/// Tally of one completed run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub success: usize,
    /// Includes files that received a placeholder.
    pub error: usize,
    pub placeholders: usize,
    pub total: usize,
    pub errors: Vec<FileError>,
}

impl BatchSummary {
    pub fn has_errors(&self) -> bool {
        self.error > 0
    }

    /// `"2 of 3 files unlocked"` style line for UI shells.
    pub fn headline(&self) -> String {
        let noun = if self.total == 1 { "file" } else { "files" };
        format!("{} of {} {} unlocked", self.success, self.total, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline() {
        let summary = BatchSummary {
            success: 2,
            error: 1,
            placeholders: 1,
            total: 3,
            errors: vec![FileError {
                path: PathBuf::from("c.pdf"),
                message: "File already exists".to_string(),
            }],
        };
        assert_eq!(summary.headline(), "2 of 3 files unlocked");
        assert!(summary.has_errors());
    }

    #[test]
    fn test_single_file_headline() {
        let summary = BatchSummary {
            success: 1,
            total: 1,
            ..Default::default()
        };
        assert_eq!(summary.headline(), "1 of 1 file unlocked");
        assert!(!summary.has_errors());
    }
}

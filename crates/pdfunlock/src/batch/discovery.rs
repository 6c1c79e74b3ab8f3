use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

/// Expands the given inputs into candidate PDF paths.
///
/// Files are kept as given, whatever their extension, so admission can report
/// what is wrong with them. Directories are walked recursively and contribute
/// every file with a `.pdf` extension (any case), sorted by path. Inputs that
/// do not exist are passed through for admission to reject.
pub fn discover_pdfs<P: AsRef<Path>>(inputs: &[P]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        if !input.is_dir() {
            found.push(input.to_path_buf());
            continue;
        }

        let mut in_directory: Vec<PathBuf> = WalkDir::new(input)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", input.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        in_directory.sort();
        found.extend(in_directory);
    }

    found
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_directory_expands_to_sorted_pdfs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.pdf"), b"").unwrap();
        fs::write(root.join("a.PDF"), b"").unwrap();
        fs::write(root.join("notes.txt"), b"").unwrap();
        fs::write(root.join("nested/c.pdf"), b"").unwrap();

        let found = discover_pdfs(&[root]);
        assert_eq!(
            found,
            vec![root.join("a.PDF"), root.join("b.pdf"), root.join("nested/c.pdf")]
        );
    }

    #[test]
    fn test_files_are_kept_as_given() {
        let temp_dir = TempDir::new().unwrap();
        let text = temp_dir.path().join("readme.txt");
        fs::write(&text, b"").unwrap();
        let missing = temp_dir.path().join("missing.pdf");

        let found = discover_pdfs(&[text.clone(), missing.clone()]);
        assert_eq!(found, vec![text, missing]);
    }

    #[test]
    fn test_empty_input() {
        let inputs: Vec<PathBuf> = Vec::new();
        assert!(discover_pdfs(&inputs).is_empty());
    }
}

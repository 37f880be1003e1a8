use std::fs;
use std::path::Path;

use crate::error::{ExtractionError, Result};

/// Create `path` and any missing ancestors.
///
/// An existing directory is reused as is. Anything else already sitting at
/// `path` is an error.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| ExtractionError::from_io(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_ancestors() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn existing_directory_is_reused() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keep");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("inside.txt"), b"still here").unwrap();

        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert_eq!(fs::read(dir.join("inside.txt")).unwrap(), b"still here");
    }

    #[test]
    fn regular_file_in_the_way_is_an_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("taken");
        fs::write(&file, b"x").unwrap();

        let err = ensure_dir(&file).unwrap_err();
        assert!(matches!(err, ExtractionError::Io { .. }));
        assert!(file.is_file());
    }
}

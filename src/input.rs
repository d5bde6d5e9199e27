//! Input validation for local PDF paths.
//!
//! pdfium gives poor diagnostics for files that are missing, unreadable, or
//! not PDFs at all, so those are caught here first and reported with the
//! path and the offending magic bytes.

use crate::error::PageMdError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Check that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_pdf_path(path: &Path) -> Result<(), PageMdError> {
    if !path.is_file() {
        return Err(PageMdError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PageMdError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(PageMdError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    if &magic != b"%PDF" {
        return Err(PageMdError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Validated PDF input: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file() {
        let err = validate_pdf_path(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, PageMdError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_pdf_path(dir.path()),
            Err(PageMdError::FileNotFound { .. })
        ));
    }

    #[test]
    fn wrong_magic_is_reported() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 not a pdf").unwrap();
        match validate_pdf_path(f.path()) {
            Err(PageMdError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn truncated_file_is_not_a_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(matches!(
            validate_pdf_path(f.path()),
            Err(PageMdError::NotAPdf { .. })
        ));
    }

    #[test]
    fn pdf_header_passes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        assert!(validate_pdf_path(f.path()).is_ok());
    }
}

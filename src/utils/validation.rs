use crate::config::UploadConfig;
use crate::models::UploadName;
use crate::services::error::{TransportError, UploadError};
use std::path::Path;

/// Longest upload name accepted, in bytes
pub const MAX_NAME_LEN: usize = 255;

const RESERVED_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', ';'];

/// Limits applied to every upload before it is stored
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub blocked_extensions: Vec<String>,
    pub max_file_size: usize,
    pub max_total_parts: u32,
}

impl ValidationRules {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            blocked_extensions: config.blocked_extensions.clone(),
            max_file_size: config.max_file_size,
            max_total_parts: config.max_total_parts,
        }
    }
}

/// Validates a client-supplied upload name and turns it into a safe path segment.
///
/// Unlike a display name, an upload name addresses files directly, so anything
/// that could escape the upload directory is rejected outright instead of rewritten.
pub fn sanitize_upload_name(raw: &str) -> Result<UploadName, UploadError> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(UploadError::invalid("Filename cannot be empty"));
    }

    if name.contains("..") || name.contains('/') || name.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {:?}", raw);
        return Err(UploadError::invalid(
            "Filename must not contain path separators or '..'",
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| c.is_control() || RESERVED_CHARS.contains(c))
    {
        return Err(UploadError::invalid(format!(
            "Filename contains a forbidden character: {:?}",
            c
        )));
    }

    if name.starts_with('.') {
        return Err(UploadError::invalid(
            "Hidden files (starting with '.') are not allowed",
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(UploadError::invalid(format!(
            "Filename exceeds {} bytes",
            MAX_NAME_LEN
        )));
    }

    // Must survive a round trip through Path as exactly one normal component
    if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
        return Err(UploadError::invalid("Filename is not a single path segment"));
    }

    // `<name>.<digits>` is where parts are stored
    if let Some((_, suffix)) = name.rsplit_once('.')
        && !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(UploadError::invalid(
            "Filename must not end in a numeric extension",
        ));
    }

    Ok(UploadName::from_sanitized(name.to_string()))
}

pub fn check_extension(name: &UploadName, rules: &ValidationRules) -> Result<(), TransportError> {
    if let Some(ext) = Path::new(name.as_str())
        .extension()
        .and_then(|e| e.to_str())
    {
        let ext_lower = ext.to_lowercase();
        if rules.blocked_extensions.contains(&ext_lower) {
            return Err(TransportError::Extension(ext_lower));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        assert_eq!(sanitize_upload_name("test.txt").unwrap().as_str(), "test.txt");
        assert_eq!(
            sanitize_upload_name("  report 2024.pdf ").unwrap().as_str(),
            "report 2024.pdf"
        );
        assert_eq!(sanitize_upload_name("данные.csv").unwrap().as_str(), "данные.csv");
    }

    #[test]
    fn test_rejects_traversal() {
        for raw in ["../etc/passwd", "..", "a/b.txt", "a\\b.txt", "/abs", "x..y"] {
            let err = sanitize_upload_name(raw).unwrap_err();
            assert!(
                matches!(err, UploadError::InvalidRequest(_)),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_empty_hidden_and_reserved() {
        assert!(sanitize_upload_name("").is_err());
        assert!(sanitize_upload_name("   ").is_err());
        assert!(sanitize_upload_name(".env").is_err());
        assert!(sanitize_upload_name("a:b").is_err());
        assert!(sanitize_upload_name("bad\0name").is_err());
        assert!(sanitize_upload_name("line\nbreak").is_err());
    }

    #[test]
    fn test_rejects_names_shaped_like_parts() {
        for raw in ["report.1", "backup.2024", "archive.tar.0", "x.00"] {
            let err = sanitize_upload_name(raw).unwrap_err();
            assert!(
                matches!(err, UploadError::InvalidRequest(_)),
                "{raw} should be rejected"
            );
        }
        assert!(sanitize_upload_name("2024").is_ok());
        assert!(sanitize_upload_name("v1.2.tar").is_ok());
        assert!(sanitize_upload_name("notes.v2").is_ok());
    }

    #[test]
    fn test_rejects_overlong_names() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(sanitize_upload_name(&long).is_err());
        let fits = "a".repeat(MAX_NAME_LEN);
        assert!(sanitize_upload_name(&fits).is_ok());
    }

    #[test]
    fn test_blocked_extension() {
        let rules = ValidationRules {
            blocked_extensions: vec!["exe".to_string()],
            max_file_size: 1024,
            max_total_parts: 100,
        };
        let name = sanitize_upload_name("setup.EXE").unwrap();
        assert_eq!(
            check_extension(&name, &rules),
            Err(TransportError::Extension("exe".to_string()))
        );

        let name = sanitize_upload_name("notes.txt").unwrap();
        assert!(check_extension(&name, &rules).is_ok());
    }
}

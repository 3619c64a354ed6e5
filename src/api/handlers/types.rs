use crate::models::{UploadName, UploadRequest};
use crate::services::error::{TransportError, UploadError};
use crate::utils::validation::{ValidationRules, check_extension, sanitize_upload_name};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// Text fields of an upload form as they arrive over the wire.
#[derive(Debug, Default)]
pub struct RawUploadForm {
    pub filename: Option<String>,
    pub multipart: Option<String>,
    pub current_part: Option<String>,
    pub total_parts: Option<String>,
    pub max_file_size: Option<String>,
}

impl RawUploadForm {
    /// Records a form field. Returns false for fields the endpoint does not know.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "filename" => &mut self.filename,
            "multipart" => &mut self.multipart,
            "currentPart" => &mut self.current_part,
            "totalParts" => &mut self.total_parts,
            "MAX_FILE_SIZE" => &mut self.max_file_size,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    pub fn parse(self) -> Result<UploadForm, UploadError> {
        Ok(UploadForm {
            filename: self.filename.filter(|s| !s.trim().is_empty()),
            multipart: self.multipart.as_deref().is_some_and(is_truthy),
            current_part: parse_number(self.current_part, "currentPart")?,
            total_parts: parse_number(self.total_parts, "totalParts")?,
            max_file_size: parse_number(self.max_file_size, "MAX_FILE_SIZE")?,
        })
    }
}

/// Upload form after numeric parsing.
#[derive(Debug, Validate)]
pub struct UploadForm {
    #[validate(length(min = 1, max = 255, message = "filename must be between 1 and 255 bytes"))]
    pub filename: Option<String>,

    pub multipart: bool,

    #[validate(range(min = 1, message = "currentPart must be a positive integer"))]
    pub current_part: Option<i64>,

    #[validate(range(min = 1, message = "totalParts must be a positive integer"))]
    pub total_parts: Option<i64>,

    #[validate(range(min = 1, message = "MAX_FILE_SIZE must be a positive integer"))]
    pub max_file_size: Option<i64>,
}

impl UploadForm {
    /// Builds the coordinator request. `client_name` is the file name the browser
    /// sent with the payload, used when a single upload has no `filename` field.
    pub fn into_request(
        self,
        client_name: Option<&str>,
        rules: &ValidationRules,
    ) -> Result<UploadRequest, UploadError> {
        self.validate()
            .map_err(|e| UploadError::invalid(e.to_string()))?;

        let request = if self.multipart {
            let filename = self
                .filename
                .as_deref()
                .ok_or_else(|| UploadError::invalid("filename is required for multipart uploads"))?;
            let total = self
                .total_parts
                .ok_or_else(|| UploadError::invalid("totalParts is required for multipart uploads"))?;
            let index = self
                .current_part
                .ok_or_else(|| UploadError::invalid("currentPart is required for multipart uploads"))?;

            let total = to_u32(total, "totalParts")?;
            if total > rules.max_total_parts {
                return Err(UploadError::invalid(format!(
                    "totalParts must not exceed {}",
                    rules.max_total_parts
                )));
            }

            UploadRequest::multipart(
                self.checked_name(filename, rules)?,
                to_u32(index, "currentPart")?,
                total,
            )?
        } else {
            let filename = self
                .filename
                .as_deref()
                .or(client_name)
                .ok_or_else(|| UploadError::invalid("filename is required"))?;
            UploadRequest::single(self.checked_name(filename, rules)?)
        };

        Ok(request)
    }

    /// Rejects a payload larger than the limit the form itself declared.
    pub fn check_declared_size(&self, size: u64) -> Result<(), TransportError> {
        match self.max_file_size {
            Some(limit) if size > limit as u64 => Err(TransportError::FormSize {
                limit: limit as u64,
            }),
            _ => Ok(()),
        }
    }

    fn checked_name(&self, raw: &str, rules: &ValidationRules) -> Result<UploadName, UploadError> {
        let name = sanitize_upload_name(raw)?;
        check_extension(&name, rules)?;
        Ok(name)
    }
}

/// Field layout of `POST /upload`, for the API docs only.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadFormSchema {
    /// File payload (whole file or one part)
    #[schema(value_type = String, format = Binary)]
    file: String,
    /// Upload name; required for multipart uploads
    filename: Option<String>,
    /// Set to a true value when sending one numbered part
    multipart: Option<bool>,
    /// 1-based index of this part
    current_part: Option<u32>,
    /// Total number of parts
    total_parts: Option<u32>,
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

fn parse_number(value: Option<String>, field: &str) -> Result<Option<i64>, UploadError> {
    value
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| UploadError::invalid(format!("{} must be an integer", field)))
        })
        .transpose()
}

fn to_u32(value: i64, field: &str) -> Result<u32, UploadError> {
    u32::try_from(value).map_err(|_| UploadError::invalid(format!("{} is out of range", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> RawUploadForm {
        let mut raw = RawUploadForm::default();
        for (name, value) in fields {
            assert!(raw.set(name, value.to_string()));
        }
        raw
    }

    fn rules() -> ValidationRules {
        ValidationRules {
            blocked_extensions: vec!["exe".to_string()],
            max_file_size: 1024,
            max_total_parts: 100,
        }
    }

    #[test]
    fn test_multipart_flag_values() {
        assert!(is_truthy("true"));
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("False"));
    }

    #[test]
    fn test_single_upload_falls_back_to_client_name() {
        let request = form(&[])
            .parse()
            .unwrap()
            .into_request(Some("test.txt"), &rules())
            .unwrap();
        assert_eq!(request.name.as_str(), "test.txt");
        assert!(request.part.is_none());
    }

    #[test]
    fn test_multipart_request() {
        let request = form(&[
            ("filename", "big.iso"),
            ("multipart", "true"),
            ("currentPart", "2"),
            ("totalParts", "7"),
        ])
        .parse()
        .unwrap()
        .into_request(Some("blob"), &rules())
        .unwrap();

        assert_eq!(request.name.as_str(), "big.iso");
        let part = request.part.unwrap();
        assert_eq!((part.index, part.total), (2, 7));
    }

    #[test]
    fn test_zero_total_parts_is_invalid() {
        let err = form(&[
            ("filename", "big.iso"),
            ("multipart", "1"),
            ("currentPart", "1"),
            ("totalParts", "0"),
        ])
        .parse()
        .unwrap()
        .into_request(None, &rules())
        .unwrap_err();
        assert!(matches!(err, UploadError::InvalidRequest(_)));
    }

    #[test]
    fn test_total_parts_above_limit_is_invalid() {
        let parse = |total: &str| {
            form(&[
                ("filename", "big.iso"),
                ("multipart", "true"),
                ("currentPart", "1"),
                ("totalParts", total),
            ])
            .parse()
            .unwrap()
            .into_request(None, &rules())
        };

        assert!(parse("100").is_ok());
        let err = parse("101").unwrap_err();
        assert!(matches!(err, UploadError::InvalidRequest(_)));
        assert!(err.to_string().contains("100"));
        assert!(parse("4294967295").is_err());
    }

    #[test]
    fn test_multipart_requires_part_fields() {
        let err = form(&[("filename", "big.iso"), ("multipart", "true")])
            .parse()
            .unwrap()
            .into_request(None, &rules())
            .unwrap_err();
        assert!(err.to_string().contains("totalParts"));
    }

    #[test]
    fn test_non_numeric_part_is_invalid() {
        let err = form(&[("currentPart", "two")]).parse().unwrap_err();
        assert!(matches!(err, UploadError::InvalidRequest(_)));
    }

    #[test]
    fn test_blocked_extension_is_transport_error() {
        let err = form(&[("filename", "setup.exe")])
            .parse()
            .unwrap()
            .into_request(None, &rules())
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Transport(TransportError::Extension(_))
        ));
    }

    #[test]
    fn test_declared_size() {
        let parsed = form(&[("MAX_FILE_SIZE", "5")]).parse().unwrap();
        assert!(parsed.check_declared_size(5).is_ok());
        assert_eq!(
            parsed.check_declared_size(6),
            Err(TransportError::FormSize { limit: 5 })
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut raw = RawUploadForm::default();
        assert!(!raw.set("somethingElse", "x".to_string()));
        assert!(raw.set("totalParts", "3".to_string()));
    }
}

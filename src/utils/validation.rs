use crate::utils::error::{BuildError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(BuildError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Reverse-domain identifiers such as `com.example.app`.
pub fn validate_package_name(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;

    let valid_segment = |segment: &str| {
        let mut chars = segment.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    if !value.contains('.') || !value.split('.').all(valid_segment) {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Expected a reverse-domain identifier like com.example.app".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(BuildError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("endpoints.staging", "https://example.com").is_ok());
        assert!(validate_url("endpoints.staging", "http://example.com:8080/api").is_ok());
        assert!(validate_url("endpoints.staging", "").is_err());
        assert!(validate_url("endpoints.staging", "invalid-url").is_err());
        assert!(validate_url("endpoints.staging", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_package_name() {
        assert!(validate_package_name("package_name", "com.example.app").is_ok());
        assert!(validate_package_name("package_name", "io.ionic.starter_2").is_ok());
        assert!(validate_package_name("package_name", "app").is_err());
        assert!(validate_package_name("package_name", "com.1example").is_err());
        assert!(validate_package_name("package_name", "com..app").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("version.minor_digits", 2, 1, 4).is_ok());
        assert!(validate_range("version.minor_digits", 0, 1, 4).is_err());
        assert!(validate_range("version.minor_digits", 5, 1, 4).is_err());
    }
}

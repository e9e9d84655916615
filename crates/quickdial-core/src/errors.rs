//! Error types for contact validation and configuration loading.

use thiserror::Error;

/// Why a contact draft was rejected before any write was attempted.
///
/// These never reach the store: the presentation layer renders them as a
/// local "please fill both fields" state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Neither a name nor a phone number was entered.
    #[error("name and phone number are both required")]
    MissingFields,
    /// The name is empty or whitespace.
    #[error("name is required")]
    BlankName,
    /// The phone number is empty, whitespace, or hyphens only.
    #[error("phone number is required")]
    BlankPhone,
    /// The phone number contains something other than digits and hyphens.
    #[error("phone number may only contain digits and '-', found {0:?}")]
    InvalidPhoneCharacter(char),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the config file.
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages() {
        assert_eq!(
            ValidationError::MissingFields.to_string(),
            "name and phone number are both required"
        );
        assert_eq!(
            ValidationError::InvalidPhoneCharacter('x').to_string(),
            "phone number may only contain digits and '-', found 'x'"
        );
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: ConfigError = json_err.into();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("parse config JSON"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

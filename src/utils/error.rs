use crate::core::lua_table::DecodeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("{sink} sink failed: {message}")]
    SinkError { sink: &'static str, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Decode,
    Sink,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn sink(sink: &'static str, err: impl std::fmt::Display) -> Self {
        EtlError::SinkError {
            sink,
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::Decode(_) => ErrorCategory::Decode,
            EtlError::SinkError { .. } | EtlError::SerializationError(_) => ErrorCategory::Sink,
            EtlError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Decode => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::High,
            ErrorCategory::Sink => ErrorSeverity::Critical,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Sink => 3,
            ErrorCategory::Decode | ErrorCategory::Io => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ConfigError { .. } => {
                "Check that the config file exists and is valid TOML or JSON"
            }
            EtlError::MissingConfigError { .. } => "Add the missing field to the config file",
            EtlError::InvalidConfigValueError { .. } => {
                "Fix the value named above in the config file"
            }
            EtlError::Decode(_) => {
                "Log in with the character once so the addon rewrites its SavedVariables file"
            }
            EtlError::SinkError { .. } => {
                "Check the output location or database credentials and retry; the destination was not updated"
            }
            EtlError::IoError(_) => "Check that the paths exist and are readable",
            EtlError::SerializationError(_) => "Report this as a bug; the records could not be serialized",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Decode => format!("Could not read bank data: {}", self),
            ErrorCategory::Sink => format!("Could not write results: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_non_zero_for_fatal_errors() {
        let config = EtlError::MissingConfigError {
            field: "wowInfo.realmName".to_string(),
        };
        let sink = EtlError::sink("csv", "disk full");
        let io = EtlError::IoError(std::io::Error::other("boom"));

        assert_eq!(config.exit_code(), 2);
        assert_eq!(sink.exit_code(), 3);
        assert_eq!(io.exit_code(), 1);
        assert_eq!(sink.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_decode_error_converts() {
        let err: EtlError = DecodeError::VariableNotFound {
            name: "MyBankData".to_string(),
        }
        .into();

        assert_eq!(err.category(), ErrorCategory::Decode);
        assert!(err.to_string().contains("MyBankData"));
    }

    #[test]
    fn test_user_friendly_message_mentions_cause() {
        let err = EtlError::sink("mariadb", "access denied");
        let message = err.user_friendly_message();
        assert!(message.starts_with("Could not write results"));
        assert!(message.contains("access denied"));
    }
}

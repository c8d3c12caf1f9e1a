use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Unsupported list type \"{kind}\"")]
    UnsupportedListType { kind: String },

    #[error("Backend query failed: {message}")]
    BackendQueryFailed { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，用於日誌輸出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Backend,
    Data,
}

impl AggregatorError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendQueryFailed {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::BackendQueryFailed { .. } | Self::IoError(_) => ErrorCategory::Backend,
            Self::UnsupportedListType { .. } | Self::SerializationError(_) => ErrorCategory::Data,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_list_type_message() {
        let err = AggregatorError::UnsupportedListType {
            kind: "weird".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported list type \"weird\"");
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn test_backend_helper() {
        let err = AggregatorError::backend("connection reset");
        assert!(matches!(err, AggregatorError::BackendQueryFailed { .. }));
        assert_eq!(err.category(), ErrorCategory::Backend);
    }
}

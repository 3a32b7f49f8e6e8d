use thiserror::Error;

#[derive(Error, Debug)]
pub enum FillError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

/// 錯誤分類，供 CLI 決定退出碼及 UI 顯示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Unauthorized,
    Validation,
    Conflict,
    Configuration,
    System,
}

impl FillError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Unauthorized { .. } => ErrorCategory::Unauthorized,
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// 給使用者看的訊息，不暴露內部細節
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { entity, .. } => format!("The requested {} does not exist", entity),
            Self::Unauthorized { message } => format!("Not allowed: {}", message),
            Self::ValidationError { message } => message.clone(),
            Self::Conflict { message } => format!("Already exists: {}", message),
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            Self::IoError(_) | Self::SerializationError(_) => {
                "Could not read or write the data file".to_string()
            }
        }
    }

    /// 是否屬於可直接回報給呼叫端的業務錯誤
    pub fn is_user_facing(&self) -> bool {
        !matches!(self.category(), ErrorCategory::System)
    }
}

pub type Result<T> = std::result::Result<T, FillError>;

use thiserror::Error;

/// Errors raised while rendering tracking code.
///
/// Only configuration problems are errors. Missing context variables,
/// anonymous users and the like resolve to absent values instead.
#[derive(Debug, Error)]
pub enum AnalyticalError {
    #[error("{0} setting: not found")]
    SettingNotFound(String),

    #[error("{0} setting is set to None")]
    SettingIsNone(String),

    #[error("{0} setting is not set")]
    SettingNotSet(String),

    #[error("{setting} setting: {message}: '{value}'")]
    InvalidSetting {
        setting: String,
        message: String,
        value: String,
    },

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalyticalError {
    /// True when a required setting is simply absent. Services treat this as
    /// "not configured" and render nothing.
    pub fn is_missing(&self) -> bool {
        matches!(self, AnalyticalError::SettingNotFound(_))
    }

    /// True for every kind raised by required-setting validation.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            AnalyticalError::SettingNotFound(_)
                | AnalyticalError::SettingIsNone(_)
                | AnalyticalError::SettingNotSet(_)
                | AnalyticalError::InvalidSetting { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalyticalError>;

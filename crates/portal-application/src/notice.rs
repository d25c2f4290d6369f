//! The single transient message surface.

use chrono::{DateTime, Utc};
use portal_core::PortalError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Outcome message of the most recent operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Severity::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    /// Auth prompts and stale data are warnings; everything else is an error.
    pub fn from_error(err: &PortalError) -> Self {
        let severity = match err {
            PortalError::AuthRequired | PortalError::StaleData(_) => Severity::Warning,
            _ => Severity::Error,
        };
        Self::new(severity, err.user_message())
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EchoNestError>;

/// Status code reported for bodies that could not be decoded.
pub const UNKNOWN_ERROR_CODE: i64 = -1;
/// Status code the service uses for rate limiting; reused for local rejections.
pub const RATE_LIMIT_CODE: i64 = 3;
/// Remote codes that mean the API key is missing, invalid or not allowed.
pub const API_KEY_ERROR_CODES: &[i64] = &[1, 2, 12];
/// Remote codes that mean the entity identifier is invalid or unknown.
pub const INVALID_ID_ERROR_CODES: &[i64] = &[6, 7];

#[derive(Debug, Error)]
pub enum EchoNestError {
    #[error("Echo Nest IOError: {0}")]
    Io(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("Echo Nest API Error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        http_status: Option<u16>,
    },

    #[error("Echo Nest API key error {code}: {message}")]
    ApiKey {
        code: i64,
        message: String,
        http_status: Option<u16>,
    },

    #[error("Echo Nest invalid identifier {code}: {message}")]
    InvalidId {
        code: i64,
        message: String,
        http_status: Option<u16>,
    },

    #[error("Echo Nest Unknown Error: {message}")]
    Unknown {
        message: String,
        http_status: Option<u16>,
    },

    #[error("Rate limit exceeded: {calls} calls in the current window")]
    RateLimitExceeded { calls: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response from Echo Nest API: {0}")]
    InvalidResponse(String),

    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

impl EchoNestError {
    /// Map a nonzero envelope status onto the matching error kind.
    pub fn from_status(code: i64, message: impl Into<String>, http_status: Option<u16>) -> Self {
        let message = message.into();
        if API_KEY_ERROR_CODES.contains(&code) {
            Self::ApiKey {
                code,
                message,
                http_status,
            }
        } else if INVALID_ID_ERROR_CODES.contains(&code) {
            Self::InvalidId {
                code,
                message,
                http_status,
            }
        } else {
            Self::Api {
                code,
                message,
                http_status,
            }
        }
    }

    pub(crate) fn unknown(message: impl Into<String>, http_status: Option<u16>) -> Self {
        Self::Unknown {
            message: message.into(),
            http_status,
        }
    }

    /// The API-level status code, for errors that carry one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } | Self::ApiKey { code, .. } | Self::InvalidId { code, .. } => {
                Some(*code)
            }
            Self::Unknown { .. } => Some(UNKNOWN_ERROR_CODE),
            Self::RateLimitExceeded { .. } => Some(RATE_LIMIT_CODE),
            _ => None,
        }
    }

    /// The remote status message, for errors that came out of an envelope.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. }
            | Self::ApiKey { message, .. }
            | Self::InvalidId { message, .. }
            | Self::Unknown { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Api { http_status, .. }
            | Self::ApiKey { http_status, .. }
            | Self::InvalidId { http_status, .. }
            | Self::Unknown { http_status, .. } => *http_status,
            Self::UnexpectedStatus(status) => Some(*status),
            Self::Io(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for any error decoded from (or shaped like) an API status.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            Self::Api { .. }
                | Self::ApiKey { .. }
                | Self::InvalidId { .. }
                | Self::Unknown { .. }
                | Self::RateLimitExceeded { .. }
        )
    }
}

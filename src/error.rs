//! Error types for rJSON-Exporter
//!
//! This module defines the error types used throughout the application.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Path expression evaluation errors
///
/// All variants are treated the same way by the scrape engine (log and skip),
/// but they are kept distinct for diagnostics.
#[derive(Error, Debug)]
pub enum PathError {
    /// The document handed to the evaluator is not valid JSON
    #[error("Failed to parse JSON document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    /// The expression itself could not be parsed
    #[error("Invalid path expression '{path}': {reason}")]
    Syntax { path: String, reason: String },

    /// The expression is valid but addressed nothing
    #[error("Path '{path}' not found: {segment} is not found")]
    NotFound { path: String, segment: String },

    /// Runtime failure such as indexing into a non-array
    #[error("Failed to evaluate path '{path}': {reason}")]
    Evaluation { path: String, reason: String },
}

/// Value normalization errors
#[derive(Error, Debug, PartialEq)]
pub enum ValueError {
    /// Text is neither a float literal nor a boolean word
    #[error("'{0}' is not a numeric value")]
    NotNumeric(String),

    /// Text parsed to NaN or an infinity
    #[error("'{0}' is not a finite value")]
    NonFinite(String),

    /// Text is not an integer (timestamps)
    #[error("'{0}' is not an integer value")]
    NotInteger(String),
}

/// Per-metric or per-element scrape failure
///
/// Never escapes the engine; it only carries context into the log record.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Path evaluation failed
    #[error("Failed to extract value: {source}")]
    Extract {
        path: String,
        #[source]
        source: PathError,
    },

    /// Extracted text is not a usable number
    #[error("Failed to convert extracted value to float64: {source}")]
    Convert {
        path: String,
        value: String,
        #[source]
        source: ValueError,
    },
}

impl ScrapeError {
    /// Path expression the failure is attributed to
    pub fn path(&self) -> &str {
        match self {
            ScrapeError::Extract { path, .. } | ScrapeError::Convert { path, .. } => path,
        }
    }
}

/// Fetcher 모듈 에러 타입
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// 잘못된 target URL
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// 잘못된 모듈 헤더
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// HTTP 응답 읽기 실패
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// 허용되지 않은 HTTP 상태 코드
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// 타임아웃
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// 연결 실패
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl FetchError {
    /// HTTP 상태 코드 추출
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }

    /// Create a Timeout error with known duration
    pub fn timeout_with_duration(ms: u64) -> Self {
        FetchError::Timeout(Some(ms))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(None)
        } else if err.is_connect() {
            FetchError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            FetchError::HttpRequest(err)
        } else {
            FetchError::HttpResponse(err)
        }
    }
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Probe asked for a module that is not configured
    #[error("Unknown module {0:?}")]
    UnknownModule(String),

    /// Probe without a target parameter
    #[error("Target parameter is missing")]
    MissingTarget,

    /// Target could not be fetched
    #[error("Failed to fetch JSON response. TARGET: {target}, ERROR: {source}")]
    Fetch {
        target: String,
        #[source]
        source: FetchError,
    },

    /// Target answered with something that is not JSON
    #[error("Failed to fetch JSON response. TARGET: {target}, Fetched invalid response: \n\n{body}")]
    InvalidResponse { target: String, body: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnknownModule(_) | AppError::MissingTarget => StatusCode::BAD_REQUEST,
            AppError::Fetch { .. } | AppError::InvalidResponse { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %message, "Rejected request");
        }

        (status, message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

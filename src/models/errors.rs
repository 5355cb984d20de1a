//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so callers (HTTP layer, CLI,
//! logs) can tell "failed to compute" apart from "computed an unfavorable
//! result". A route that cannot be found or a CRITICAL assessment are NOT
//! errors and never flow through this type.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - ROUTE_xxx: Route optimizer input errors
//! - TX_xxx / ADDR_xxx: Risk scorer input errors
//! - REGISTRY_xxx: Load-time data errors
//! - API_xxx: API errors
//! - CFG_xxx: Configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Route Errors (1xx)
    // ============================================
    /// Asset symbol not present in the pool registry
    UnknownAsset,
    /// Amount is zero, negative or not finite
    InvalidAmount,
    /// Hop limit below 1
    InvalidHops,

    // ============================================
    // Transaction Errors (2xx)
    // ============================================
    /// `to` missing or not a valid address shape
    InvalidTransactionDescriptor,
    /// Standalone address check on a malformed address
    InvalidAddress,

    // ============================================
    // Registry / Table Errors (3xx)
    // ============================================
    /// Malformed pool, reputation or signature data at load time
    RegistryLoadError,

    // ============================================
    // API Errors (4xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Unauthorized (invalid API key)
    ApiUnauthorized,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Configuration Errors (5xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Route Errors
            Self::UnknownAsset => "ROUTE_UNKNOWN_ASSET",
            Self::InvalidAmount => "ROUTE_INVALID_AMOUNT",
            Self::InvalidHops => "ROUTE_INVALID_HOPS",

            // Transaction Errors
            Self::InvalidTransactionDescriptor => "TX_INVALID_DESCRIPTOR",
            Self::InvalidAddress => "ADDR_INVALID",

            // Registry Errors
            Self::RegistryLoadError => "REGISTRY_LOAD_FAILED",

            // API Errors
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            // Configuration Errors
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            // Generic
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidAmount
            | Self::InvalidHops
            | Self::InvalidTransactionDescriptor
            | Self::InvalidAddress
            | Self::ApiBadRequest
            | Self::ConfigInvalidValue => 400,
            Self::ApiUnauthorized => 401,
            Self::UnknownAsset => 404,
            Self::ApiRateLimited => 429,
            _ => 500,
        }
    }

    /// Whether the caller supplied bad input (as opposed to a server fault)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Asset symbol not in registry
    pub fn unknown_asset(symbol: &str) -> Self {
        Self::new(
            ErrorCode::UnknownAsset,
            format!("Unknown asset: {}", symbol),
        )
    }

    /// Route amount rejected
    pub fn invalid_amount(amount: f64) -> Self {
        Self::new(
            ErrorCode::InvalidAmount,
            format!("Amount must be a finite number greater than 0 (got {})", amount),
        )
    }

    /// Hop limit rejected
    pub fn invalid_hops(max_hops: usize) -> Self {
        Self::new(
            ErrorCode::InvalidHops,
            format!("max_hops must be at least 1 (got {})", max_hops),
        )
    }

    /// Transaction descriptor rejected
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransactionDescriptor, msg)
    }

    /// Malformed standalone address
    pub fn invalid_address(address: &str) -> Self {
        Self::new(
            ErrorCode::InvalidAddress,
            format!("Invalid address format: {} (expected 0x + 40 hex characters)", address),
        )
    }

    /// Malformed registry / table data
    pub fn registry_load(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RegistryLoadError, msg)
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {}", key, value),
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::RegistryLoadError, "IO error", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RegistryLoadError, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::unknown_asset("FOO");
        assert_eq!(err.code, ErrorCode::UnknownAsset);
        assert_eq!(err.code_str(), "ROUTE_UNKNOWN_ASSET");
        assert!(err.to_string().contains("FOO"));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::InvalidAmount.http_status(), 400);
        assert_eq!(ErrorCode::InvalidTransactionDescriptor.http_status(), 400);
        assert_eq!(ErrorCode::UnknownAsset.http_status(), 404);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::RegistryLoadError.http_status(), 500);
    }

    #[test]
    fn test_json_errors_are_load_errors() {
        let parse: Result<Vec<u8>, _> = serde_json::from_str("not json");
        let err: AppError = parse.unwrap_err().into();
        assert_eq!(err.code, ErrorCode::RegistryLoadError);
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.code.is_client_error());
    }
}

//!
//! # Layout Result and Error Types
//!

/// # [LayoutError] Result Type
pub type LayoutResult<T> = Result<T, LayoutError>;

///
/// # Layout Error Enumeration
///
/// Every failure the core raises falls in one of three categories:
/// malformed caller input ([LayoutError::Validation]), a geometrically
/// infeasible request ([LayoutError::Geometry]), or an unresolved name or
/// index ([LayoutError::NotFound]). All are raised synchronously at the
/// call that detects them; none are retried, as the computation is
/// deterministic. Advisory conditions are reported through [mod@log]
/// macros instead, and never abort an operation.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Malformed or mismatched caller input
    Validation(String),
    /// Geometrically infeasible request
    Geometry(String),
    /// Unresolved name or index
    NotFound(String),
    /// Uncategorized error, with string message
    Str(String),
}
impl LayoutError {
    /// Create a [LayoutError::Str] from anything string-convertible
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
    /// Create an error-variant [Result] from anything string-convertible
    pub fn fail<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::msg(s))
    }
    /// Create a [LayoutError::Validation] error-variant [Result]
    pub fn invalid<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::Validation(s.into()))
    }
    /// Create a [LayoutError::Geometry] error-variant [Result]
    pub fn infeasible<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::Geometry(s.into()))
    }
    /// Create a [LayoutError::NotFound] error-variant [Result]
    pub fn not_found<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::NotFound(s.into()))
    }
}
impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LayoutError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            LayoutError::Geometry(msg) => write!(f, "Geometry Error: {}", msg),
            LayoutError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            LayoutError::Str(msg) => write!(f, "{}", msg),
        }
    }
}
impl std::error::Error for LayoutError {}

impl From<String> for LayoutError {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
impl From<&str> for LayoutError {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}
impl<T> From<std::sync::PoisonError<T>> for LayoutError {
    fn from(_e: std::sync::PoisonError<T>) -> Self {
        Self::Str("poisoned shared-component lock".to_string())
    }
}

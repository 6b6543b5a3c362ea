//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur while resolving or applying projections.
///
/// None of these reach the ingestion layer: the resolver turns lookup
/// failures into "not found" and the transformer answers
/// [`GeoError::ProjectionUnavailable`] with the fallback heuristics.
#[derive(Debug, Error)]
pub enum GeoError {
    /// No definition could be resolved for the CRS identifier
    #[error("Unknown projection: EPSG:{0}")]
    ProjectionUnavailable(String),

    /// The external definition service failed or returned nothing usable
    #[error("Definition lookup for EPSG:{code} failed: {message}")]
    LookupService {
        /// CRS identifier that was requested
        code: String,
        /// Failure description
        message: String,
    },

    /// External lookups are switched off
    #[error("Definition lookup is disabled")]
    LookupDisabled,

    /// The definition text could not be turned into a projection
    #[error("Invalid projection definition '{definition}': {message}")]
    InvalidDefinition {
        /// Offending definition text
        definition: String,
        /// Parser message
        message: String,
    },

    /// The projection math rejected the coordinate
    #[error("Coordinate transformation failed: {0}")]
    Transform(String),
}

/// Error code for integration with bfgeo-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// No definition available
    ProjectionUnavailable = 10001,
    /// External lookup failed
    LookupService = 10002,
    /// External lookup disabled
    LookupDisabled = 10003,
    /// Definition text rejected
    InvalidDefinition = 10004,
    /// Projection math failed
    Transform = 10005,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::ProjectionUnavailable(_) => GeoErrorCode::ProjectionUnavailable,
            GeoError::LookupService { .. } => GeoErrorCode::LookupService,
            GeoError::LookupDisabled => GeoErrorCode::LookupDisabled,
            GeoError::InvalidDefinition { .. } => GeoErrorCode::InvalidDefinition,
            GeoError::Transform(_) => GeoErrorCode::Transform,
        }
    }

    /// Create a lookup service error
    pub fn lookup(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LookupService {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GeoError::ProjectionUnavailable("6346".into()).code() as u32,
            10001
        );
        assert_eq!(GeoError::LookupDisabled.code(), GeoErrorCode::LookupDisabled);
        assert_eq!(GeoError::Transform("nan".into()).code() as u32, 10005);
    }

    #[test]
    fn test_display_names_code() {
        let err = GeoError::lookup("9999", "404 Not Found");
        assert_eq!(
            err.to_string(),
            "Definition lookup for EPSG:9999 failed: 404 Not Found"
        );
    }
}

//! Error types for aggregation and clustering.

use thiserror::Error;

/// Errors surfaced to callers of the clustering pipeline.
///
/// Both variants are contract violations: the call fails before producing any
/// clusters and retrying with the same input fails the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// A record reaching the clusterer is malformed (e.g. NaN or out-of-range coordinates).
    #[error("invalid input for '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    /// A configuration value is out of range.
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ClusterError {
    pub(crate) fn invalid_parameter(name: &'static str, value: impl ToString, reason: &'static str) -> Self {
        ClusterError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid_input(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ClusterError::InvalidInput {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Numerical failures while building a cluster boundary.
///
/// Never leaves the crate: the boundary builder answers every variant with the
/// circle fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum GeometryError {
    #[error("convex hull is degenerate ({vertices} distinct vertices, area {area:e})")]
    DegenerateHull { vertices: usize, area: f64 },

    #[error("ellipse axis is not finite")]
    NonFiniteAxis,
}

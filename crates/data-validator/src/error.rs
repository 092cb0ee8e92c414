//! Validation Error Types

use thiserror::Error;

/// Reasons a tick's input is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// NaN or infinite value
    #[error("{field} is not finite: {value}")]
    NonFinite { field: &'static str, value: f32 },

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    /// Tick timestamp before the epoch
    #[error("Negative tick: {0}")]
    NegativeTick(i64),
}

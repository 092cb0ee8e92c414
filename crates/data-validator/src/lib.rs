//! Data Validation and Smoothing
//!
//! Guards every per-tick entry point against non-finite kinematics and
//! negative ticks, and smooths noisy speed samples.

mod error;
mod filter;
mod validator;

pub use error::ValidationError;
pub use filter::MedianFilter;
pub use validator::{ValidationConfig, Validator};

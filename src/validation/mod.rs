//! Error types and input validation

pub mod error;
pub mod samples;

pub use error::{GeometryError, PositionError};
pub use samples::{SampleFilter, SampleRejection, ValidSample};

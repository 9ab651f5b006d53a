//! Core types and constants for the beacon positioning engine

pub mod types;
pub mod constants;
pub mod registry;

pub use types::*;
pub use constants::*;
pub use registry::{AnchorRegistry, RegistryError};

//! Collection of live range samples

pub mod snapshot;

pub use snapshot::{RangingSnapshot, RangingTable, SharedRangingTable};

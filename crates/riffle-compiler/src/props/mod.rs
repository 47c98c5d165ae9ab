//! The physical property algebra.
//!
//! *Requested* properties are constraints a consumer places on a channel;
//! *delivered* properties are facts about what a channel or node actually
//! produces. Enumeration checks `delivered.satisfies(requested)` and prunes
//! candidates against the *interesting* properties collected from downstream
//! consumers.

pub mod global;
pub mod interesting;
pub mod local;

pub use global::{GlobalProperties, Partitioning, RequestedGlobalProperties};
pub use interesting::InterestingProperties;
pub use local::{LocalProperties, RequestedLocalProperties};

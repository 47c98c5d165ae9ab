#![forbid(unsafe_code)]
//! riffle-core: shared data model and collaborator interfaces for the plan
//! compiler.
//!
//! This crate holds:
//! - the logical plan surface users build ([`contract::Plan`]),
//! - field sets / key orderings the property algebra works over,
//! - the compiler configuration and its environment overrides,
//! - the collaborator *traits* (statistics, cluster info); concrete
//!   implementations live with the caller or in `riffle-compiler`.
//!
//! No I/O and no execution logic here. Everything is plain serializable data
//! so plans can be fingerprinted and compared byte-for-byte.

pub mod config;
pub mod contract;
pub mod error;
pub mod fields;
pub mod hash;
pub mod hints;
pub mod id;
pub mod instance;
pub mod prelude;
pub mod statistics;

/// Crate version, recorded in plan fingerprints for provenance.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

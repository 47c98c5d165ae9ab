#![forbid(unsafe_code)]
//! riffle-compiler: the cost-based plan compiler.
//!
//! The compiler takes a user-built logical [`Plan`](riffle_core::contract::Plan)
//! and produces an [`OptimizedPlan`] in which every operator has a concrete
//! local execution strategy, every channel a shipping strategy, and every
//! memory-consuming task a budget, for a chosen instance type and degree of
//! parallelism.
//!
//! The approach follows the classic optimizer lineage (Volcano/Cascades for
//! the enumeration, System-R for interesting-properties pruning), extended
//! from trees to DAGs:
//!
//! 1. translate the contract DAG into an optimizer graph with size estimates,
//! 2. pre-budget minimal memory for cost estimation,
//! 3. propagate interesting physical properties from the sinks down,
//! 4. track unclosed branches so reconverging paths stay consistent,
//! 5. enumerate physical alternatives from the sources up, pruning against
//!    cost and interesting properties,
//! 6. finalize the winning plan (topology wiring + memory assignment).
//!
//! The compiler is single-threaded; the only concurrency is the bounded
//! cluster-information lookup in [`cluster`].

pub mod candidate;
pub mod cluster;
pub mod compiler;
pub mod costs;
pub mod enumerate;
pub mod finalize;
pub mod graph;
pub mod postpass;
pub mod props;
pub mod strategies;

pub use compiler::PlanCompiler;
pub use costs::{Cost, CostEstimator, DefaultCostEstimator};
pub use finalize::OptimizedPlan;
pub use postpass::{DefaultPostPass, NoopPostPass, PostPass};

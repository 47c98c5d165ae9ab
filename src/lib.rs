#![forbid(unsafe_code)]
//! riffle: cost-based plan compiler for parallel dataflow programs.
//!
//! Facade over the workspace crates. Build a logical [`Plan`], hand it to a
//! [`PlanCompiler`], get back an [`OptimizedPlan`] with concrete shipping
//! and local strategies, parallelism, and memory budgets.
//!
//! ```
//! use riffle::prelude::*;
//! use riffle::{DefaultPostPass, PlanCompiler};
//!
//! let mut plan = Plan::new("word count");
//! let lines = plan.source("lines", "hdfs://data/lines");
//! let words = plan.map("tokenize", lines);
//! let counts = plan.reduce("count", words, vec![0]);
//! plan.set_combinable(counts, true);
//! plan.sink("out", counts);
//!
//! let instance = InstanceTypeDescription {
//!     identifier: "standard".into(),
//!     hardware: Some(HardwareDescription {
//!         free_memory_bytes: 4 << 30,
//!         num_cores: 8,
//!     }),
//!     max_instances: 4,
//! };
//! let compiler = PlanCompiler::new(CompilerConfig::default()).unwrap();
//! let optimized = compiler.compile_on(&plan, &instance, &DefaultPostPass).unwrap();
//! assert_eq!(optimized.sinks.len(), 1);
//! ```

pub use riffle_compiler::{
    candidate, cluster, costs, enumerate, finalize, graph, postpass, props, strategies,
    Cost, CostEstimator, DefaultCostEstimator, DefaultPostPass, NoopPostPass, OptimizedPlan,
    PlanCompiler, PostPass,
};
pub use riffle_core::{
    config, contract, error, fields, hash, hints, id, instance, statistics,
};

pub mod prelude {
    pub use riffle_core::prelude::*;
}

//! The logical plan surface: contracts and the plan arena.
//!
//! A [`Plan`] is an arena of [`Contract`]s addressed by [`ContractId`]
//! handles; edges are handles, never owning references, so a contract whose
//! output feeds several consumers is simply referenced twice. The builder
//! methods append contracts and return their handles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fields::FieldList;
use crate::hints::EstimateHints;
use crate::id::ContractId;

/// The operator kind of a contract, with its inputs and key fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContractKind {
    Source {
        /// Identifier handed to the statistics provider.
        source_id: String,
    },
    Sink {
        input: ContractId,
    },
    Map {
        input: ContractId,
    },
    Reduce {
        input: ContractId,
        keys: FieldList,
        /// Whether the user function may be applied as a combiner during
        /// sorting. Opt-in; a non-combinable reduction (e.g. a median) must
        /// never see partial groups.
        combinable: bool,
    },
    /// Binary equi-join on the given key fields.
    Match {
        first: ContractId,
        second: ContractId,
        keys_first: FieldList,
        keys_second: FieldList,
    },
    /// Binary group-by over both inputs on the given key fields.
    CoGroup {
        first: ContractId,
        second: ContractId,
        keys_first: FieldList,
        keys_second: FieldList,
    },
    /// Cartesian product of both inputs.
    Cross {
        first: ContractId,
        second: ContractId,
    },
}

impl ContractKind {
    /// Input handles in channel order.
    pub fn inputs(&self) -> Vec<ContractId> {
        use ContractKind::*;
        match self {
            Source { .. } => vec![],
            Sink { input } | Map { input } | Reduce { input, .. } => vec![*input],
            Match { first, second, .. }
            | CoGroup { first, second, .. }
            | Cross { first, second } => vec![*first, *second],
        }
    }

    pub fn arity(&self) -> usize {
        self.inputs().len()
    }
}

/// One logical operator with its user-visible attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    pub kind: ContractKind,
    /// Declared degree of parallelism; values below 1 mean "use the default".
    pub parallelism: i32,
    /// String-keyed parameter bag; compiler hints travel here.
    pub parameters: BTreeMap<String, String>,
    pub estimate_hints: EstimateHints,
}

/// A rooted set of sinks over an arena of contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    job_name: String,
    /// Plan-level default parallelism; values below 1 defer to the compiler.
    default_parallelism: i32,
    /// Plan-level machine cap; values below 1 defer to the compiler.
    max_machines: i32,
    contracts: Vec<Contract>,
    sinks: Vec<ContractId>,
}

impl Plan {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            default_parallelism: -1,
            max_machines: -1,
            contracts: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn default_parallelism(&self) -> i32 {
        self.default_parallelism
    }

    pub fn set_default_parallelism(&mut self, dop: i32) {
        self.default_parallelism = dop;
    }

    pub fn max_machines(&self) -> i32 {
        self.max_machines
    }

    pub fn set_max_machines(&mut self, machines: i32) {
        self.max_machines = machines;
    }

    pub fn sinks(&self) -> &[ContractId] {
        &self.sinks
    }

    pub fn contract(&self, id: ContractId) -> &Contract {
        &self.contracts[id.index()]
    }

    pub fn contracts(&self) -> impl Iterator<Item = (ContractId, &Contract)> {
        self.contracts
            .iter()
            .enumerate()
            .map(|(i, c)| (ContractId::new(i as u64), c))
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    fn push(&mut self, name: impl Into<String>, kind: ContractKind) -> ContractId {
        let id = ContractId::new(self.contracts.len() as u64);
        self.contracts.push(Contract {
            name: name.into(),
            kind,
            parallelism: -1,
            parameters: BTreeMap::new(),
            estimate_hints: EstimateHints::default(),
        });
        id
    }

    // ---- builder methods -------------------------------------------------

    pub fn source(&mut self, name: impl Into<String>, source_id: impl Into<String>) -> ContractId {
        self.push(
            name,
            ContractKind::Source {
                source_id: source_id.into(),
            },
        )
    }

    pub fn map(&mut self, name: impl Into<String>, input: ContractId) -> ContractId {
        self.push(name, ContractKind::Map { input })
    }

    pub fn reduce(
        &mut self,
        name: impl Into<String>,
        input: ContractId,
        keys: impl Into<FieldList>,
    ) -> ContractId {
        self.push(
            name,
            ContractKind::Reduce {
                input,
                keys: keys.into(),
                combinable: false,
            },
        )
    }

    pub fn match_join(
        &mut self,
        name: impl Into<String>,
        first: ContractId,
        second: ContractId,
        keys_first: impl Into<FieldList>,
        keys_second: impl Into<FieldList>,
    ) -> ContractId {
        self.push(
            name,
            ContractKind::Match {
                first,
                second,
                keys_first: keys_first.into(),
                keys_second: keys_second.into(),
            },
        )
    }

    pub fn co_group(
        &mut self,
        name: impl Into<String>,
        first: ContractId,
        second: ContractId,
        keys_first: impl Into<FieldList>,
        keys_second: impl Into<FieldList>,
    ) -> ContractId {
        self.push(
            name,
            ContractKind::CoGroup {
                first,
                second,
                keys_first: keys_first.into(),
                keys_second: keys_second.into(),
            },
        )
    }

    pub fn cross(
        &mut self,
        name: impl Into<String>,
        first: ContractId,
        second: ContractId,
    ) -> ContractId {
        self.push(name, ContractKind::Cross { first, second })
    }

    pub fn sink(&mut self, name: impl Into<String>, input: ContractId) -> ContractId {
        let id = self.push(name, ContractKind::Sink { input });
        self.sinks.push(id);
        id
    }

    // ---- per-contract attributes ----------------------------------------

    pub fn set_parallelism(&mut self, id: ContractId, dop: i32) {
        self.contracts[id.index()].parallelism = dop;
    }

    /// Mark a reduce contract's user function as combinable. Ignored for
    /// other kinds.
    pub fn set_combinable(&mut self, id: ContractId, value: bool) {
        if let ContractKind::Reduce { combinable, .. } = &mut self.contracts[id.index()].kind {
            *combinable = value;
        }
    }

    pub fn set_parameter(
        &mut self,
        id: ContractId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.contracts[id.index()]
            .parameters
            .insert(key.into(), value.into());
    }

    pub fn set_estimate_hints(&mut self, id: ContractId, hints: EstimateHints) {
        self.contracts[id.index()].estimate_hints = hints;
    }
}

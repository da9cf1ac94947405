//! Core data model and inference engine for reconstructability analysis:
//! bit-packed contingency tables, relations and models over discrete
//! variables, junction trees, the IPF and belief-propagation fitters, and
//! the information-theoretic statistics derived from a fit.

pub mod data;
pub mod domain;
mod executor;
pub mod fit;
pub mod graph;
pub mod junction;
pub mod key;
pub mod manager;
pub mod model;
pub mod notation;
pub mod relation;
pub mod stats;
pub mod table;
pub mod variable;

pub use data::{Dataset, VariableSpec};
pub use executor::Executor;
pub use fit::{BpConfig, FitOutcome, FitResult, IpfConfig, IpfIteration, IpfSink};
pub use graph::InteractionGraph;
pub use junction::{JunctionTree, TreeState};
pub use key::{Key, KeyMask};
pub use manager::{FitManager, SearchDirection};
pub use model::Model;
pub use notation::parse_model;
pub use relation::Relation;
pub use table::{Table, TableKind};
pub use variable::{BitLayout, Variable, VariableList};

pub use reweave_error::{Error, ErrorCode, Result};

//! Repair-based certainty for relations that violate a declared key.
//!
//! A relation whose key column holds duplicate values admits several
//! *repairs*: keep exactly one tuple from every conflict group, keep every
//! other tuple. A query answer is *certain* when it is the same (as a multiset
//! of tuples) in every repair.
//!
//! ```text
//!   RelationStore ──read──► RelationSnapshot ──group by key──► RepairPlan
//!                                                                 │
//!                                          cartesian product      ▼
//!   RepairQuery ◄──────────── answer each ─────────────────── Repairs
//!        │
//!        ▼
//!   all_identical(answers) ──► Certainty { certain, detail }
//! ```
//!
//! The crate does not parse SQL. Statement text is only scanned by the
//! syntactic first-order filter in [`first_order`]; query evaluation on a
//! repair goes through the [`RepairQuery`] seam.

pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod first_order;
pub mod multiset;
pub mod relation;
pub mod repairs;
pub mod session;
pub mod tuple;
pub mod value;

pub use catalog::{Catalog, Table};
pub use config::EvaluatorConfig;
pub use error::{CqaError, Result};
pub use evaluator::{
    Certainty, CertaintyDetail, CertaintyRequest, Evaluator, IdentityQuery, RelationStore,
    RepairOutcome, RepairQuery,
};
pub use first_order::{is_first_order, FirstOrder, FoBlocker, StatementKind};
pub use multiset::{all_identical, normalize};
pub use relation::{has_key_violation, key_of, KeyMetadata, RelationSnapshot};
pub use repairs::{ConflictGroup, RepairPlan, Repairs};
pub use session::{Session, StatementId, StatementRecord};
pub use tuple::Tuple;
pub use value::Value;

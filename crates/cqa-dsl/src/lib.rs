//! Plain-text CQA instances.
//!
//! An instance pairs a database of facts, each with a key prefix, with a
//! boolean conjunctive query:
//!
//! ```text
//! @database
//! R(a ; b)        # key `a`, one non-key argument
//! R(a ; c)
//! S(b)
//!
//! @query
//! R(x ; y)
//! not S(y)
//! ```
//!
//! [`is_certain`] decides whether the query holds in every repair of the
//! database, where a repair keeps one fact per predicate and key.

pub mod certain;
pub mod instance;

pub use certain::{holds, is_certain, is_variable};
pub use instance::{parse_instance, Atom, Fact, Instance, InstanceError};

//! # confgate-policy: Bundles, Data and Evaluation
//!
//! - **Bundle** ([`bundle`]): reads `.rules` sources, compiles them into an
//!   immutable [`PolicyBundle`] and resolves a [`NamespaceSelection`].
//!
//! - **Data** ([`data`]): builds the read-only [`DataStore`] exposed to rules
//!   as `data`, keyed by each source's location. Key collisions are errors.
//!
//! - **Evaluation** ([`evaluator`]): a [`TestRun`] executes every rule of the
//!   selected namespaces against one document and returns its
//!   [`Verdict`](confgate_core::Verdict). Evaluation errors become
//!   exception findings; the run only fails when cancelled.
//!
//! - **Cancellation** ([`cancel`]): [`CancelFlag`] is checked between
//!   documents and namespaces.
//!
//! Bundles and data stores are never mutated after construction, so one
//! pair can be shared by any number of concurrent test runs.

pub mod bundle;
pub mod cancel;
pub mod data;
pub mod evaluator;

pub use bundle::{read_rule_sources, NamespaceSelection, PolicyBundle, RULES_EXTENSION};
pub use cancel::{CancelFlag, CancelOnDrop};
pub use data::DataStore;
pub use evaluator::{TestRun, COMBINED_FILENAME};

//! Durable persistence for `bridge-correlator` (spec §4.A): the `Storage`
//! trait plus a MongoDB implementation whose native semantics — unique
//! secondary indexes, unordered batch insert with per-document duplicate-key
//! tolerance, arbitrary-sort-direction range queries — match the
//! persistence contract directly, and an in-memory fake for tests.

mod fake;
mod mongo;
mod traits;

pub use fake::FakeStorage;
pub use mongo::MongoStorage;
pub use traits::{InsertOutcome, Storage};

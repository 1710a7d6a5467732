//! Typed error enums for each component boundary named in the error-handling
//! design: one `thiserror` sum type per boundary, no cross-component unions
//! except where a component's contract explicitly composes another's (the
//! finder's [`FindError`] wraps both [`FetchError`] and [`StorageError`],
//! since its contract is defined in terms of both).

mod config;
mod fetch;
mod find;
mod storage;

pub use config::ConfigError;
pub use fetch::FetchError;
pub use find::FindError;
pub use storage::StorageError;

//! Profile core: the domain model, the storage contract and its adapters, and
//! the service that enforces email uniqueness on top of storage.
//!
//! Layering:
//! - [`storage`] executes single parameterized statements and owns no rules.
//! - [`service`] composes storage calls into create/read/update/delete.
//! - Email syntax is checked by the caller via [`email`] before the service runs.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod email;
mod error;
mod model;
pub mod service;
pub mod storage;

pub use error::{ProfileError, ProfileResult};
pub use model::{NewProfile, Profile, ProfileId};
pub use service::ProfileService;
pub use storage::{InMemoryProfileStore, ProfileStore};

#[cfg(feature = "postgres")]
pub use storage::postgres::PostgresProfileStore;

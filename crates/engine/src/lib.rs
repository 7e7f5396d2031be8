//! Resolver, update interpreter and version-transition engine for lamina
//!
//! The three core components of the versioned document layer:
//! - [`interpret`] / [`apply`]: compile a declarative update spec into pure
//!   payload transforms and fold them over a payload
//! - [`Resolver`]: latest-matching-snapshot resolution, single and batch
//! - [`Chronicle`]: create / update / soft-delete transitions that only
//!   ever append new snapshots
//!
//! Everything here is written against the `SnapshotStore` trait from
//! `lamina-storage`; nothing binds to a concrete backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod interpret;
pub mod resolve;
pub mod transition;

pub use interpret::{apply, interpret, Transform};
pub use resolve::Resolver;
pub use transition::Chronicle;

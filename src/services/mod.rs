//! The engagement lifecycle engine.
//!
//! Each submodule owns one ledger. Operations take the database handle and
//! the caller capability explicitly, issue single-row conditional writes, and
//! leave any cross-record link that could not be written to the read-path
//! repairs in [`reconcile`].

pub mod conversations;
pub mod orders;
pub mod quotes;
pub mod reconcile;
pub mod reviews;

//! Skein: a reversible mapping between grammar derivation trees and
//! canonical production-index sequences.
//!
//! The builder direction turns an index sequence (or a selection policy)
//! into a tree; the recovery direction turns a finished tree back into the
//! index sequence that rebuilds it. Both directions share one canonical
//! ordering over pending tree slots — `(path length, path)` ascending — so
//! they are mutually inverse.

pub use crate::errors::{BuildStatus, SkeinError};

pub mod build;
pub mod derivation;
pub mod errors;
pub mod grammar;
pub mod policy;
pub mod recover;
pub mod tree;

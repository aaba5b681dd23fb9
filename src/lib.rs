//! Bubble trees for multiplicative-exponential linear logic.
//!
//! The main data structure, [`Tree`], is an arena of colored _bubbles_. White
//! and black bubbles are the positive and negative multiplicative connectives,
//! blue and red bubbles are the exponentials `!` and `?`, and a single root
//! bubble holds the whole sheet. Labeled leaves are atoms.
//!
//! Trees can be rendered as formulas with [`algo::canonical`], stored with
//! [`Snapshot`] (a JSON-friendly interchange format) and edited under the
//! rules of the proof system with a [`proof::ProofState`].

/// Algorithms over bubble trees (e.g. formula rendering, path checks)
pub mod algo;

/// Session configuration
pub mod config;

/// Error types
pub mod error;

/// The proof-editing engine
pub mod proof;

mod convert;
mod core;

pub use config::{EngineConfig, Mode};
pub use convert::{Snapshot, SnapshotEdge, SnapshotNode};
pub use crate::core::*;
pub use error::{Result, TreeError};
pub use proof::{AssumptionPair, Phase, ProofState};

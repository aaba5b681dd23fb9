use thiserror::Error;

use crate::core::NodeIdx;

pub type Result<T> = std::result::Result<T, TreeError>;

/// Recoverable failures of tree edits and snapshot conversion
///
/// None of these are fatal: every edit that fails leaves the tree exactly as
/// it was before the call.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("inserting {child} under {parent} would create a cycle")]
    CycleRejected { parent: NodeIdx, child: NodeIdx },

    #[error("{target} is not attached anywhere below the given ancestor")]
    DetachNotFound { target: NodeIdx },

    #[error("the grabbed node may not be placed at {target}")]
    IllegalPlacement { target: NodeIdx },

    #[error("nodes passed to a loop must be non-empty and share one parent")]
    MalformedLoopRequest,

    #[error("edits outside the open cut are not allowed")]
    OutsideAssumption,

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("missing root node '{0}'")]
    MissingRoot(String),

    #[error("node '{0}' has a color or label it may not carry")]
    InvalidColor(String),

    #[error("node '{0}' has more than one parent")]
    MultipleParents(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

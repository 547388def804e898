use thiserror::Error;

use crate::graph::{EdgeId, NodeId};

pub type Result<T, E = PlanError> = std::result::Result<T, E>;

/// Errors raised while building or querying a plan.
///
/// Construction errors are fatal: no partial plan is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("malformed plan: {node} is missing required field `{field}`")]
    MalformedPlan { node: String, field: &'static str },

    #[error("invalid cycle {cycle}: {reason}")]
    InvalidCycle { cycle: String, reason: String },

    #[error("unknown plan node {0}")]
    UnknownNode(NodeId),

    #[error("unknown plan edge {0}")]
    UnknownEdge(EdgeId),
}

impl PlanError {
    pub(crate) fn malformed(node: impl ToString, field: &'static str) -> Self {
        PlanError::MalformedPlan {
            node: node.to_string(),
            field,
        }
    }

    pub(crate) fn invalid_cycle(cycle: impl ToString, reason: impl Into<String>) -> Self {
        PlanError::InvalidCycle {
            cycle: cycle.to_string(),
            reason: reason.into(),
        }
    }
}

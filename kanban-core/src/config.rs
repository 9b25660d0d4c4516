//! Positioning policies

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How caller-supplied bulk reorders are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderPolicy {
    /// The request must be a full, dense permutation of the container.
    #[default]
    Strict,
    /// Positions are written verbatim; density is the client's problem.
    Permissive,
}

impl FromStr for ReorderPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(ValidationError::InvalidValue {
                field: "reorder_policy".to_string(),
                reason: format!("expected strict or permissive, got '{}'", other),
            }),
        }
    }
}

/// What happens to siblings when an item leaves a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Close the gap so the container stays dense.
    #[default]
    Renumber,
    /// Leave the gap; only moves renumber.
    LeaveGap,
}

impl FromStr for RemovalPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "renumber" => Ok(Self::Renumber),
            "leave-gap" | "leave_gap" => Ok(Self::LeaveGap),
            other => Err(ValidationError::InvalidValue {
                field: "removal_policy".to_string(),
                reason: format!("expected renumber or leave-gap, got '{}'", other),
            }),
        }
    }
}

/// Engine-wide positioning configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositioningConfig {
    pub reorder_policy: ReorderPolicy,
    pub removal_policy: RemovalPolicy,
}

//! Policy engine: the binding/consistency core.
//!
//! Owns the one-policy-per-API rule, the deletion guard and the
//! notify-after-commit protocol. Storage and propagation are injected.

pub mod policy_engine;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use iplimit_core::model::PolicyId;
use iplimit_core::protocol::ChangeKind;

pub use policy_engine::{EngineOptions, PolicyEngine};

/// Held exclusively by engine mutations and shared by snapshot builders, so a
/// reader never observes a half-applied batch.
pub type CommitBarrier = Arc<RwLock<()>>;

/// Gateway push failed after the mutation was committed.
/// The change stays in the store; the caller may retry propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationWarning {
    pub seq: u64,
    pub change: ChangeKind,
    pub policy_id: Option<PolicyId>,
    pub message: String,
}

/// Result of a committed mutation plus any propagation warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub warning: Option<PropagationWarning>,
}

impl<T> Committed<T> {
    pub(crate) fn quiet(value: T) -> Self {
        Self { value, warning: None }
    }

    pub fn is_propagated(&self) -> bool {
        self.warning.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

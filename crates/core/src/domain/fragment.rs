use crate::domain::security::SecurityIdentity;
use crate::error::{ErrorKind, PipelineError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of processing one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Fragment {
    Success {
        identity: SecurityIdentity,
        html: String,
    },
    Failure {
        identity: SecurityIdentity,
        kind: ErrorKind,
        message: String,
    },
}

impl Fragment {
    pub fn failure(identity: SecurityIdentity, err: &PipelineError) -> Self {
        Self::Failure {
            identity,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn identity(&self) -> &SecurityIdentity {
        match self {
            Self::Success { identity, .. } | Self::Failure { identity, .. } => identity,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Append-only accumulation of one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: Uuid,
    pub fragments: Vec<Fragment>,
    pub success_count: usize,
}

impl BatchResult {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            fragments: Vec::new(),
            success_count: 0,
        }
    }

    pub fn push(&mut self, fragment: Fragment) {
        if fragment.is_success() {
            self.success_count += 1;
        }
        self.fragments.push(fragment);
    }

    pub fn failure_count(&self) -> usize {
        self.fragments.len() - self.success_count
    }

    /// A batch is worth delivering once at least one unit produced a narrative.
    pub fn is_deliverable(&self) -> bool {
        self.success_count > 0
    }
}

impl Default for BatchResult {
    fn default() -> Self {
        Self::new()
    }
}

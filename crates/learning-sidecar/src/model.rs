//! The correction entity and its gate records — the central data model of
//! the learning sidecar's validation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pass,
    Reject,
    Error,
}

/// A gate-1/gate-2a/gate-2b verdict. `confidence` is only ever populated by
/// gate 2a.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub status: GateStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate3Status {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate3Details {
    pub status: Gate3Status,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Processing,
    RejectedGate1,
    Gate1Error,
    RejectedGate2a,
    RejectedGate2b,
    Pending,
    RejectedGate3,
    Approved,
    Applied,
}

impl FinalStatus {
    /// The snake_case wire name, matching the `serde` representation —
    /// used where a status is rendered into a plain-string HTTP response
    /// field rather than through `Serialize` on the whole struct.
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalStatus::Processing => "processing",
            FinalStatus::RejectedGate1 => "rejected_gate1",
            FinalStatus::Gate1Error => "gate1_error",
            FinalStatus::RejectedGate2a => "rejected_gate2a",
            FinalStatus::RejectedGate2b => "rejected_gate2b",
            FinalStatus::Pending => "pending",
            FinalStatus::RejectedGate3 => "rejected_gate3",
            FinalStatus::Approved => "approved",
            FinalStatus::Applied => "applied",
        }
    }

    /// The directory a correction with this status is stored under. Any
    /// status not named here (`processing`, `gate1_error`) defaults to
    /// `pending`, matching the reference storage layer.
    pub fn directory(&self) -> &'static str {
        match self {
            FinalStatus::RejectedGate1
            | FinalStatus::RejectedGate2a
            | FinalStatus::RejectedGate2b
            | FinalStatus::RejectedGate3 => "rejected",
            FinalStatus::Approved => "approved",
            FinalStatus::Applied => "applied",
            FinalStatus::Pending => "pending",
            FinalStatus::Processing | FinalStatus::Gate1Error => "pending",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub id: Uuid,
    pub user_id: String,
    pub content: String,
    pub source: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub personal_info: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate1: Option<GateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate2a: Option<GateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate2b: Option<GateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate3: Option<Gate3Details>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<Uuid>,
    pub final_status: FinalStatus,
}

impl Correction {
    pub fn new(user_id: String, content: String, source: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            content,
            source,
            submitted_at: Utc::now(),
            personal_info: false,
            gate1: None,
            gate2a: None,
            gate2b: None,
            gate3: None,
            applied_at: None,
            memory_id: None,
            final_status: FinalStatus::Processing,
        }
    }
}

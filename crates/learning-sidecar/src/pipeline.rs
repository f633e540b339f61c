//! Drives a single correction through G1 -> G2a -> (G2b?) -> G3, and the
//! separate review/commit step once a human has acted on G3. No
//! parallelism within a correction; pipelines for distinct corrections are
//! independent and share only the store and clients below, which are
//! themselves safe for concurrent use.

use std::collections::HashMap;

use chrono::Utc;
use jarvis_domain::error::{Error, Result};
use uuid::Uuid;

use crate::config::Config;
use crate::correction_store::CorrectionStore;
use crate::gates;
use crate::llm_client::LlmSidecarClient;
use crate::model::{Correction, FinalStatus, Gate3Details, Gate3Status, GateStatus};
use crate::notifier::Notifier;
use crate::vendor_client::VendorClient;

pub struct Pipeline {
    store: CorrectionStore,
    notifier: Notifier,
    llm: LlmSidecarClient,
    vendor: VendorClient,
    config: Config,
}

impl Pipeline {
    pub fn new(
        store: CorrectionStore,
        notifier: Notifier,
        llm: LlmSidecarClient,
        vendor: VendorClient,
        config: Config,
    ) -> Self {
        Self {
            store,
            notifier,
            llm,
            vendor,
            config,
        }
    }

    pub fn store(&self) -> &CorrectionStore {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn llm(&self) -> &LlmSidecarClient {
        &self.llm
    }

    pub fn vendor(&self) -> &VendorClient {
        &self.vendor
    }

    /// Runs the full gate sequence for a freshly submitted correction.
    /// Intended to run as a background task after the submit response has
    /// already reached the client; every stopping point persists the
    /// correction before returning so `/learning/status` always reflects
    /// the latest gate the pipeline reached.
    pub async fn process(&self, mut correction: Correction) {
        let id = correction.id;
        tracing::info!(correction_id = %id, "starting pipeline");

        let gate1 = gates::validate_gate1(&self.llm, &correction.content).await;
        let gate1_status = gate1.status;
        correction.gate1 = Some(gate1);
        match gate1_status {
            GateStatus::Reject => {
                correction.final_status = FinalStatus::RejectedGate1;
                self.persist(&correction);
                tracing::info!(correction_id = %id, "rejected at gate1");
                return;
            }
            GateStatus::Error => {
                correction.final_status = FinalStatus::Gate1Error;
                self.persist(&correction);
                tracing::error!(correction_id = %id, "gate1 errored");
                return;
            }
            GateStatus::Pass => {}
        }
        tracing::info!(correction_id = %id, "passed gate1");

        let (gate2a, is_personal) = gates::validate_gate2a(
            &self.llm,
            &correction.content,
            &self.config.gates.personal_info_keywords,
        )
        .await;
        correction.personal_info = is_personal;
        let gate2a_status = gate2a.status;
        let gate2a_confidence = gate2a.confidence;
        correction.gate2a = Some(gate2a);

        match gate2a_status {
            GateStatus::Reject => {
                correction.final_status = FinalStatus::RejectedGate2a;
                self.persist(&correction);
                tracing::info!(correction_id = %id, "rejected at gate2a");
                return;
            }
            // Per the reference implementation, a gate2a error terminates
            // the pipeline but leaves `final_status` as `processing`
            // (unlike gate1) — see DESIGN.md for the open-question note.
            GateStatus::Error => {
                self.persist(&correction);
                tracing::error!(correction_id = %id, "gate2a errored");
                return;
            }
            GateStatus::Pass => {}
        }
        tracing::info!(correction_id = %id, confidence = ?gate2a_confidence, "passed gate2a");

        let threshold = self.config.gates.gate2a_confidence_threshold;
        let skip_gate2b =
            is_personal || gate2a_confidence.map(|c| c >= threshold).unwrap_or(false);

        if skip_gate2b {
            tracing::info!(correction_id = %id, personal_info = is_personal, "skipping gate2b");
        } else {
            let gate2b = gates::validate_gate2b(&self.vendor, &correction.content).await;
            let gate2b_status = gate2b.status;
            correction.gate2b = Some(gate2b);
            if gate2b_status == GateStatus::Reject {
                correction.final_status = FinalStatus::RejectedGate2b;
                self.persist(&correction);
                tracing::info!(correction_id = %id, "rejected at gate2b");
                return;
            }
            tracing::info!(correction_id = %id, "passed gate2b");
        }

        correction.gate3 = Some(Gate3Details {
            status: Gate3Status::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewer: None,
            reject_reason: None,
        });
        correction.final_status = FinalStatus::Pending;
        self.persist(&correction);
        self.notifier.notify_learning_review(self.store.pending_count());
        tracing::info!(correction_id = %id, "submitted to gate3 (pending admin approval)");
    }

    /// Applies `action` to a correction currently pending Gate 3. Validates
    /// the 403/404/400 preconditions from the HTTP boundary's point of
    /// view, then either commits to memory (approve) or records the
    /// rejection (reject).
    pub async fn review(
        &self,
        correction_id: Uuid,
        caller_id: &str,
        action: &str,
        reason: Option<String>,
    ) -> Result<Correction> {
        if caller_id != "dad" && caller_id != "mom" {
            return Err(Error::Permission(format!(
                "{caller_id} is not authorized to review corrections"
            )));
        }

        let mut correction = self.store.load(correction_id)?;

        if correction.final_status != FinalStatus::Pending {
            return Err(Error::Validation(format!(
                "correction not pending review (status: {:?})",
                correction.final_status
            )));
        }

        match action {
            "approve" => {}
            "reject" => {
                if reason.as_deref().unwrap_or("").is_empty() {
                    return Err(Error::Validation("reason required for rejection".into()));
                }
            }
            other => return Err(Error::Validation(format!("action must be 'approve' or 'reject', got '{other}'"))),
        }

        let gate3 = correction.gate3.get_or_insert(Gate3Details {
            status: Gate3Status::Pending,
            submitted_at: correction.submitted_at,
            reviewed_at: None,
            reviewer: None,
            reject_reason: None,
        });
        gate3.reviewed_at = Some(Utc::now());
        gate3.reviewer = Some(caller_id.to_string());

        if action == "reject" {
            gate3.status = Gate3Status::Rejected;
            gate3.reject_reason = reason;
            correction.final_status = FinalStatus::RejectedGate3;
            self.persist(&correction);
            return Ok(correction);
        }

        gate3.status = Gate3Status::Approved;
        correction.final_status = FinalStatus::Approved;
        self.persist(&correction);

        let mut metadata = HashMap::new();
        metadata.insert("correction_id".to_string(), serde_json::json!(correction.id));
        metadata.insert(
            "submitted_at".to_string(),
            serde_json::json!(correction.submitted_at.to_rfc3339()),
        );

        match self
            .llm
            .add_memory(&correction.user_id, &correction.content, "learning_correction", metadata)
            .await
        {
            Ok(memory_id) => {
                correction.applied_at = Some(Utc::now());
                correction.memory_id = Some(memory_id);
                correction.final_status = FinalStatus::Applied;
                self.persist(&correction);
                tracing::info!(correction_id = %correction.id, %memory_id, "correction applied to memory");
            }
            Err(e) => {
                // Leave the correction at `approved`: a future retry is
                // legal and the approval itself still stands.
                tracing::error!(correction_id = %correction.id, error = %e, "failed to apply correction to memory");
            }
        }

        Ok(correction)
    }

    fn persist(&self, correction: &Correction) {
        if let Err(e) = self.store.save(correction) {
            tracing::error!(correction_id = %correction.id, error = %e, "failed to persist correction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RecordingSink;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn pipeline_with_mock_llm(mock: &MockServer) -> (tempfile::TempDir, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let store = CorrectionStore::open(dir.path()).unwrap();
        let notifier = Notifier::with_sink(true, Arc::new(RecordingSink::default()));

        let mut config = Config::default();
        config.llm_sidecar.base_url = mock.uri();
        config.llm_sidecar.timeout_ms = 2_000;
        let llm = LlmSidecarClient::new(&config.llm_sidecar);
        let vendor = VendorClient::new(&config.vendor);

        (dir, Pipeline::new(store, notifier, llm, vendor, config))
    }

    #[tokio::test]
    async fn gate1_reject_stops_pipeline() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"verdict": "reject", "reason": "nonsense"}"#
            })))
            .mount(&mock)
            .await;

        let (_dir, pipeline) = pipeline_with_mock_llm(&mock).await;
        let correction = Correction::new("dad".into(), "asdkjhaskjdh".into(), "user_correction".into());
        let id = correction.id;
        pipeline.store().save(&correction).unwrap();
        pipeline.process(correction).await;

        let loaded = pipeline.store().load(id).unwrap();
        assert_eq!(loaded.final_status, FinalStatus::RejectedGate1);
    }

    #[tokio::test]
    async fn personal_info_bypasses_gate2b_and_reaches_pending() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": r#"{"verdict": "pass", "reason": "coherent and safe"}"#
            })))
            .mount(&mock)
            .await;

        let (_dir, pipeline) = pipeline_with_mock_llm(&mock).await;
        let correction = Correction::new("mom".into(), "Ma fille s'appelle Alice".into(), "user_correction".into());
        let id = correction.id;
        pipeline.store().save(&correction).unwrap();
        pipeline.process(correction).await;

        let loaded = pipeline.store().load(id).unwrap();
        assert!(loaded.personal_info);
        assert!(loaded.gate2b.is_none());
        assert_eq!(loaded.final_status, FinalStatus::Pending);
        assert_eq!(loaded.gate2a.as_ref().unwrap().confidence, Some(1.0));
    }

    #[tokio::test]
    async fn review_rejects_without_reason() {
        let mock = MockServer::start().await;
        let (_dir, pipeline) = pipeline_with_mock_llm(&mock).await;
        let mut correction = Correction::new("dad".into(), "x".into(), "user_correction".into());
        correction.final_status = FinalStatus::Pending;
        correction.gate3 = Some(Gate3Details {
            status: Gate3Status::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewer: None,
            reject_reason: None,
        });
        pipeline.store().save(&correction).unwrap();

        let err = pipeline.review(correction.id, "dad", "reject", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn review_non_admin_is_permission_error() {
        let mock = MockServer::start().await;
        let (_dir, pipeline) = pipeline_with_mock_llm(&mock).await;
        let correction = Correction::new("dad".into(), "x".into(), "user_correction".into());
        pipeline.store().save(&correction).unwrap();

        let err = pipeline
            .review(correction.id, "teen", "approve", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
    }

    #[tokio::test]
    async fn review_non_pending_is_validation_error() {
        let mock = MockServer::start().await;
        let (_dir, pipeline) = pipeline_with_mock_llm(&mock).await;
        let correction = Correction::new("dad".into(), "x".into(), "user_correction".into());
        pipeline.store().save(&correction).unwrap();

        let err = pipeline
            .review(correction.id, "dad", "approve", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

//! Merges inbound tally payloads into the per-answer counters.

use std::sync::Arc;

use pollcast_identity::ContentDigest;
use pollcast_protocol::{ProtocolVariant, TallyPayload};
use tracing::{debug, warn};

use crate::error::Error;
use crate::index::DomIndex;

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Counters whose value changed.
    pub applied: usize,
    /// Entries matching the counter's current value.
    pub unchanged: usize,
    /// Entries naming a question or answer not on this page.
    pub skipped: usize,
    /// Entries dropped for an invalid shape.
    pub malformed: usize,
}

/// Applies payloads to the counters of the index. The only writer of tallies.
pub struct Reconciler {
    index: Arc<DomIndex>,
    variant: ProtocolVariant,
}

impl Reconciler {
    pub fn new(index: Arc<DomIndex>, variant: ProtocolVariant) -> Self {
        Self { index, variant }
    }

    /// Apply one payload.
    ///
    /// Unknown digests are skipped silently since payloads may cover
    /// questions shown to other viewers. Malformed entries are logged and
    /// dropped without affecting the rest of the payload.
    pub async fn apply(&self, payload: &TallyPayload) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let doc = self.index.document().read().await;

        for (question_key, answers) in payload.questions() {
            let Ok(question_digest) = ContentDigest::from_hex(question_key) else {
                warn!("{}", Error::MalformedPayload(format!("question key {question_key:?}")));
                report.malformed += 1;
                continue;
            };
            let Some(question) = self.index.find_question(&doc, &question_digest) else {
                debug!("Question {} not displayed here", question_digest);
                report.skipped += 1;
                continue;
            };
            if answers.is_malformed() {
                warn!(
                    "{}",
                    Error::MalformedPayload(format!("answers of {question_digest} are not an object"))
                );
                report.malformed += 1;
                continue;
            }

            for (answer_key, data) in answers.entries() {
                let Ok(answer_digest) = ContentDigest::from_hex(answer_key) else {
                    warn!("{}", Error::MalformedPayload(format!("answer key {answer_key:?}")));
                    report.malformed += 1;
                    continue;
                };
                let Some(answer) = self.index.find_answer(&doc, &question, &answer_digest) else {
                    debug!("Answer {} of {} not displayed here", answer_digest, question_digest);
                    report.skipped += 1;
                    continue;
                };
                let update = match data.parse(self.variant) {
                    Ok(update) => update,
                    Err(e) => {
                        warn!("Dropping tally for answer {}: {}", answer_digest, e);
                        report.malformed += 1;
                        continue;
                    }
                };
                if self
                    .index
                    .counter(answer.node)
                    .send_if_modified(|tally| tally.apply(update))
                {
                    report.applied += 1;
                } else {
                    report.unchanged += 1;
                }
            }
        }

        debug!(
            "Reconciled payload: {} applied, {} unchanged, {} skipped, {} malformed",
            report.applied, report.unchanged, report.skipped, report.malformed
        );
        report
    }
}

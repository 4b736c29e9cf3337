//! Turns selection changes and affordance clicks into outgoing votes.

use std::sync::Arc;

use pollcast_channel::SocketChannel;
use pollcast_identity::ContentDigest;
use pollcast_page::{Document, NodeId};
use pollcast_protocol::{OutgoingVote, VoteKind};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::{DomIndex, QuestionItem};

/// Builds votes from the page and sends them over the session's channel.
pub struct VoteSubmitter {
    index: Arc<DomIndex>,
    channel: Arc<SocketChannel>,
    voter: String,
}

impl VoteSubmitter {
    pub fn new(index: Arc<DomIndex>, channel: Arc<SocketChannel>, voter: impl Into<String>) -> Self {
        Self {
            index,
            channel,
            voter: voter.into(),
        }
    }

    pub fn voter(&self) -> &str {
        &self.voter
    }

    /// Build the vote for a changed input without sending it.
    ///
    /// The vote carries every answer of the question that is checked now,
    /// so it replaces whatever the server held for this voter.
    pub fn selection_vote(&self, doc: &Document, input: NodeId) -> Result<OutgoingVote> {
        let block = self
            .index
            .question_for_input(input)
            .ok_or_else(|| Error::NotFound(format!("no listener on input {input}")))?;
        let question = QuestionItem::new(block);
        let question_digest = question.digest(&self.index, doc)?;

        let mut answers = Vec::new();
        for answer in self.index.answers_of(doc, &question)? {
            let control = match self.index.input_of(doc, answer.node) {
                Ok(Some(control)) => control,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping answer {}: {}", answer.node, e);
                    continue;
                }
            };
            if !doc.is_checked(control.node) {
                continue;
            }
            match answer.digest(&self.index, doc, self.index.lookup()) {
                Ok(digest) => answers.push(digest),
                Err(e) => warn!("Checked answer {} has no digest: {}", answer.node, e),
            }
        }

        Ok(OutgoingVote::Selection {
            question: question_digest,
            answers,
            voter: self.voter.clone(),
        })
    }

    /// Build an up/down vote for an answer without sending it.
    pub fn toggle_vote(&self, doc: &Document, answer: NodeId, kind: VoteKind) -> Result<OutgoingVote> {
        let block = self
            .index
            .question_of_answer(answer)
            .ok_or_else(|| Error::NotFound(format!("answer {answer} is not indexed")))?;
        let question = QuestionItem::new(block).digest(&self.index, doc)?;
        let answer = answer_digest(&self.index, doc, answer)?;
        Ok(OutgoingVote::Toggle {
            question,
            answer,
            vote_type: kind,
            voter: self.voter.clone(),
        })
    }

    /// Send the full current selection of the input's question.
    pub async fn on_selection_changed(&self, input: NodeId) -> Result<OutgoingVote> {
        let vote = {
            let doc = self.index.document().read().await;
            self.selection_vote(&doc, input)?
        };
        self.send(&vote).await?;
        Ok(vote)
    }

    /// Send an up/down vote for an answer.
    pub async fn on_affordance(&self, answer: NodeId, kind: VoteKind) -> Result<OutgoingVote> {
        let vote = {
            let doc = self.index.document().read().await;
            self.toggle_vote(&doc, answer, kind)?
        };
        self.send(&vote).await?;
        Ok(vote)
    }

    /// Send a vote built earlier. Failures are logged here and returned.
    pub async fn send(&self, vote: &OutgoingVote) -> Result<()> {
        if let Err(e) = self.channel.send(vote).await {
            warn!("Vote for question {} not sent: {}", vote.question(), e);
            return Err(e.into());
        }
        info!("Sent vote for question {}", vote.question());
        Ok(())
    }
}

/// Stamped digest if present, recomputed otherwise.
fn answer_digest(index: &DomIndex, doc: &Document, answer: NodeId) -> Result<ContentDigest> {
    match index.cached_digest(doc, answer) {
        Some(digest) => Ok(digest),
        None => index.answer_digest(doc, answer),
    }
}

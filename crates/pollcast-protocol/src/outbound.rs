//! Outgoing vote messages.

use pollcast_identity::ContentDigest;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Direction of a single-affordance vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteKind::Upvote => write!(f, "upvote"),
            VoteKind::Downvote => write!(f, "downvote"),
        }
    }
}

/// A vote sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutgoingVote {
    /// The full current selection of one question. Replaces whatever the
    /// server held for this voter.
    Selection {
        question: ContentDigest,
        answers: Vec<ContentDigest>,
        voter: String,
    },
    /// An up/down vote on one answer.
    Toggle {
        question: ContentDigest,
        answer: ContentDigest,
        vote_type: VoteKind,
        voter: String,
    },
}

impl OutgoingVote {
    /// The question the vote is about.
    pub fn question(&self) -> &ContentDigest {
        match self {
            OutgoingVote::Selection { question, .. } | OutgoingVote::Toggle { question, .. } => {
                question
            }
        }
    }

    /// The voter the vote is cast for.
    pub fn voter(&self) -> &str {
        match self {
            OutgoingVote::Selection { voter, .. } | OutgoingVote::Toggle { voter, .. } => voter,
        }
    }
}

/// Encode a vote as a JSON text frame.
pub fn encode(vote: &OutgoingVote) -> Result<String> {
    Ok(serde_json::to_string(vote)?)
}

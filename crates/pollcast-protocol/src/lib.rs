//! Pollcast Protocol - vote and tally messages
//!
//! Everything that crosses the socket is a JSON text frame.
//!
//! ## Outbound
//!
//! - Full selection: `{"question": d, "answers": [d, ...], "voter": s}`.
//!   Always the entire current selection of one question, never a delta.
//! - Toggle (extended protocol only):
//!   `{"question": d, "answer": d, "vote_type": "upvote"|"downvote", "voter": s}`.
//!
//! ## Inbound
//!
//! An object mapping question digest to an object mapping answer digest to
//! tally data. Tally data is a bare integer (total votes) or a
//! `"total,up,down"` string. Older servers wrap the answer level in an array of
//! such objects; both shapes decode.

pub mod error;
pub mod inbound;
pub mod outbound;
pub mod tally;

pub use error::{Error, Result};
pub use inbound::{decode_inbound, AnswerTallies, TallyData, TallyPayload};
pub use outbound::{encode, OutgoingVote, VoteKind};
pub use tally::{Tally, TallyUpdate};

use serde::{Deserialize, Serialize};

/// Which flavour of the protocol the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Totals only, answers re-hashed on every lookup.
    #[default]
    Basic,
    /// Totals plus up/down votes, answer digests cached on the page at
    /// initialization.
    Extended,
}

impl ProtocolVariant {
    /// Whether answers are resolved through the digest tag stamped at
    /// initialization rather than by re-hashing.
    pub fn uses_cached_tags(self) -> bool {
        matches!(self, ProtocolVariant::Extended)
    }

    /// Whether indicators carry up/down affordances.
    pub fn has_affordances(self) -> bool {
        matches!(self, ProtocolVariant::Extended)
    }
}

impl std::str::FromStr for ProtocolVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(ProtocolVariant::Basic),
            "extended" => Ok(ProtocolVariant::Extended),
            other => Err(Error::UnknownVariant(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolVariant::Basic => write!(f, "basic"),
            ProtocolVariant::Extended => write!(f, "extended"),
        }
    }
}

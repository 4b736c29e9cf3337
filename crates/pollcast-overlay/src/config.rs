//! Overlay configuration.

use pollcast_identity::ORDINAL_MARKER_CLASS;
use pollcast_protocol::ProtocolVariant;

use crate::error::{Error, Result};

/// Default tally server endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/";

/// Default key toggling indicator visibility.
pub const DEFAULT_TOGGLE_KEY: char = '$';

/// Names the host page uses for the elements the overlay reads.
///
/// Defaults match the quiz platform's attempt page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContract {
    /// Class of the listing containers. The last one is the navigation
    /// summary, not a question.
    pub listing_class: String,

    /// Class of the question-text element inside a block.
    pub question_text_class: String,

    /// Class of the answer-grouping element inside a block.
    pub answer_group_class: String,

    /// Class of the ordinal-marker span. Marker spans are left out of both
    /// question and answer digests.
    pub ordinal_marker_class: String,

    /// `data-region` value of the designated answer-label element.
    pub answer_label_region: String,

    /// Class of the reserved region whose clicks toggle indicator visibility.
    pub toggle_region_class: String,
}

impl Default for HostContract {
    fn default() -> Self {
        Self {
            listing_class: "content".to_string(),
            question_text_class: "qtext".to_string(),
            answer_group_class: "answer".to_string(),
            ordinal_marker_class: ORDINAL_MARKER_CLASS.to_string(),
            answer_label_region: "answer-label".to_string(),
            toggle_region_class: "pollcast-toggle".to_string(),
        }
    }
}

/// Configuration for an overlay session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Tally server endpoint
    pub endpoint: String,

    /// Protocol variant spoken by the server
    pub variant: ProtocolVariant,

    /// Declare displayed questions as topics when connecting
    pub topic_scoping: bool,

    /// Opaque voter identity supplied by the page
    pub voter: String,

    /// Key toggling indicator visibility
    pub toggle_key: char,

    /// Host page element names
    pub contract: HostContract,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            variant: ProtocolVariant::default(),
            topic_scoping: true,
            voter: "anonymous".to_string(),
            toggle_key: DEFAULT_TOGGLE_KEY,
            contract: HostContract::default(),
        }
    }
}

impl OverlayConfig {
    /// Create config from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup (environment, file, test map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let endpoint = lookup("POLLCAST_ENDPOINT").unwrap_or(defaults.endpoint);
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "POLLCAST_ENDPOINT must be a ws:// or wss:// URI, got {endpoint:?}"
            )));
        }

        let variant = match lookup("POLLCAST_VARIANT") {
            Some(v) => v
                .parse()
                .map_err(|e| Error::Config(format!("POLLCAST_VARIANT: {e}")))?,
            None => defaults.variant,
        };

        let topic_scoping = match lookup("POLLCAST_TOPICS") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| Error::Config(format!("POLLCAST_TOPICS: not a boolean: {v:?}")))?,
            None => defaults.topic_scoping,
        };

        let voter = lookup("POLLCAST_VOTER").unwrap_or(defaults.voter);

        let toggle_key = match lookup("POLLCAST_TOGGLE_KEY") {
            Some(v) => {
                let mut chars = v.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        return Err(Error::Config(format!(
                            "POLLCAST_TOGGLE_KEY must be a single character, got {v:?}"
                        )))
                    }
                }
            }
            None => defaults.toggle_key,
        };

        Ok(Self {
            endpoint,
            variant,
            topic_scoping,
            voter,
            toggle_key,
            contract: defaults.contract,
        })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: ProtocolVariant) -> Self {
        self.variant = variant;
        self
    }

    #[must_use]
    pub fn with_voter(mut self, voter: impl Into<String>) -> Self {
        self.voter = voter.into();
        self
    }

    #[must_use]
    pub fn with_topic_scoping(mut self, enabled: bool) -> Self {
        self.topic_scoping = enabled;
        self
    }

    #[must_use]
    pub fn with_contract(mut self, contract: HostContract) -> Self {
        self.contract = contract;
        self
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

//! In-memory index over the host page.
//!
//! The index resolves the page's question blocks and answer entries, derives
//! their content digests, and owns the per-answer tally counters. It never
//! holds the document lock itself: callers pass in the [`Document`] they have
//! locked, so one lock acquisition covers a whole pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use pollcast_identity::{ContentDigest, DigestCache};
use pollcast_page::{Document, NodeId};
use pollcast_protocol::{ProtocolVariant, Tally};
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::config::HostContract;
use crate::error::{Error, Result};

/// Class prefix for digests stamped onto answer entries.
pub const DIGEST_TAG_PREFIX: &str = "pollcast-digest-";

/// The page shared between the overlay's tasks.
pub type SharedDocument = Arc<RwLock<Document>>;

/// How an answer's digest is obtained during lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerLookup {
    /// Re-derive the digest from the answer's content every time.
    Recompute,
    /// Read the digest stamped on the entry at initialization.
    CachedTag,
}

impl From<ProtocolVariant> for AnswerLookup {
    fn from(variant: ProtocolVariant) -> Self {
        if variant.uses_cached_tags() {
            AnswerLookup::CachedTag
        } else {
            AnswerLookup::Recompute
        }
    }
}

/// A question block on the page.
#[derive(Debug, Clone)]
pub struct QuestionItem {
    pub node: NodeId,
    digest: OnceLock<ContentDigest>,
}

impl QuestionItem {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            digest: OnceLock::new(),
        }
    }

    /// The block's digest, computed on first use.
    pub fn digest(&self, index: &DomIndex, doc: &Document) -> Result<ContentDigest> {
        if let Some(digest) = self.digest.get() {
            return Ok(*digest);
        }
        let content = index.question_content(doc, self.node)?;
        let digest = index.digests.digest(&content);
        let _ = self.digest.set(digest);
        Ok(digest)
    }
}

/// An answer entry inside a question block.
#[derive(Debug, Clone)]
pub struct AnswerItem {
    pub node: NodeId,
    pub question: NodeId,
    digest: OnceLock<ContentDigest>,
}

impl AnswerItem {
    pub fn new(node: NodeId, question: NodeId) -> Self {
        Self {
            node,
            question,
            digest: OnceLock::new(),
        }
    }

    /// The entry's digest under the given lookup strategy.
    ///
    /// A missing or unreadable stamp under `CachedTag` is `NotFound`.
    pub fn digest(
        &self,
        index: &DomIndex,
        doc: &Document,
        lookup: AnswerLookup,
    ) -> Result<ContentDigest> {
        if let Some(digest) = self.digest.get() {
            return Ok(*digest);
        }
        let digest = match lookup {
            AnswerLookup::Recompute => index.answer_digest(doc, self.node)?,
            AnswerLookup::CachedTag => index
                .cached_digest(doc, self.node)
                .ok_or_else(|| Error::NotFound(format!("no digest tag on {}", self.node)))?,
        };
        let _ = self.digest.set(digest);
        Ok(digest)
    }
}

/// The kind of selection control an answer carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Radio,
    Checkbox,
    Other(String),
}

impl InputKind {
    pub fn is_supported(&self) -> bool {
        matches!(self, InputKind::Radio | InputKind::Checkbox)
    }
}

/// The selection control of an answer entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputControl {
    pub node: NodeId,
    pub kind: InputKind,
}

/// Index over the shared page.
pub struct DomIndex {
    document: SharedDocument,
    contract: HostContract,
    lookup: AnswerLookup,
    digests: DigestCache,
    tallies: Mutex<HashMap<NodeId, Arc<watch::Sender<Tally>>>>,
    listeners: Mutex<HashMap<NodeId, NodeId>>,
    owners: Mutex<HashMap<NodeId, NodeId>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl DomIndex {
    pub fn new(document: SharedDocument, contract: HostContract, variant: ProtocolVariant) -> Self {
        Self {
            digests: DigestCache::with_marker_class(contract.ordinal_marker_class.as_str()),
            document,
            contract,
            lookup: variant.into(),
            tallies: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            owners: Mutex::new(HashMap::new()),
        }
    }

    /// The page this index reads.
    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn contract(&self) -> &HostContract {
        &self.contract
    }

    pub fn lookup(&self) -> AnswerLookup {
        self.lookup
    }

    // --- Structure ---

    /// Every question block on the page, in page order.
    ///
    /// The last listing container is the navigation summary and is dropped,
    /// so fewer than two containers means the page is not a quiz page.
    pub fn enumerate_questions(&self, doc: &Document) -> Result<Vec<QuestionItem>> {
        let mut blocks = doc.elements_by_class(doc.root(), &self.contract.listing_class);
        if blocks.len() < 2 {
            return Err(Error::mismatch("listing containers", "at least 2", blocks.len()));
        }
        blocks.pop();
        Ok(blocks.into_iter().map(QuestionItem::new).collect())
    }

    /// The answer entries of a question block, in page order.
    pub fn answers_of(&self, doc: &Document, question: &QuestionItem) -> Result<Vec<AnswerItem>> {
        let groups = doc.elements_by_class(question.node, &self.contract.answer_group_class);
        let [group] = groups.as_slice() else {
            return Err(Error::mismatch("answer groups", "exactly 1", groups.len()));
        };
        Ok(doc
            .element_children(*group)
            .into_iter()
            .map(|node| AnswerItem::new(node, question.node))
            .collect())
    }

    /// Inner markup of the block's question text.
    pub fn question_content(&self, doc: &Document, block: NodeId) -> Result<String> {
        let texts = doc.elements_by_class(block, &self.contract.question_text_class);
        match texts.as_slice() {
            [text] => Ok(doc.inner_html(*text)),
            _ => Err(Error::mismatch("question texts", "exactly 1", texts.len())),
        }
    }

    /// Inner markup of an answer's label, ordinal markers removed.
    ///
    /// Label shapes are tried in order: a single `<label>`, a `<div>` right
    /// after an ordinal marker, a designated answer-label region.
    pub fn answer_content(&self, doc: &Document, answer: NodeId) -> Result<String> {
        let marker = self.contract.ordinal_marker_class.as_str();
        let skip_markers = |id: NodeId| doc.has_class(id, marker);

        let labels = doc.elements_by_tag(answer, "label");
        if let [label] = labels.as_slice() {
            return Ok(doc.inner_html_without(*label, &skip_markers));
        }

        let after_marker: Vec<NodeId> = doc
            .elements_by_class(answer, marker)
            .into_iter()
            .filter_map(|m| doc.next_element_sibling(m))
            .filter(|sibling| doc.tag(*sibling) == Some("div"))
            .collect();
        if let [div] = after_marker.as_slice() {
            return Ok(doc.inner_html_without(*div, &skip_markers));
        }

        let regions = doc.elements_by_attr(answer, "data-region", &self.contract.answer_label_region);
        if let [region] = regions.as_slice() {
            return Ok(doc.inner_html_without(*region, &skip_markers));
        }

        Err(Error::mismatch(
            "answer label candidates across all shapes",
            "exactly 1 of a single shape",
            labels.len() + after_marker.len() + regions.len(),
        ))
    }

    /// Digest of an answer's content, memoized by content.
    pub fn answer_digest(&self, doc: &Document, answer: NodeId) -> Result<ContentDigest> {
        let content = self.answer_content(doc, answer)?;
        Ok(self.digests.digest(&content))
    }

    /// The selection control of an answer entry.
    ///
    /// `Ok(None)` for entries that are not selectable (not a `<div>`
    /// container).
    pub fn input_of(&self, doc: &Document, answer: NodeId) -> Result<Option<InputControl>> {
        if doc.tag(answer) != Some("div") {
            return Ok(None);
        }
        let inputs = doc.elements_by_tag(answer, "input");
        let [input] = inputs.as_slice() else {
            return Err(Error::mismatch("inputs", "exactly 1", inputs.len()));
        };
        let kind = match doc.input_type(*input).as_deref() {
            Some("radio") => InputKind::Radio,
            Some("checkbox") => InputKind::Checkbox,
            Some(other) => InputKind::Other(other.to_string()),
            None => InputKind::Other(String::new()),
        };
        Ok(Some(InputControl { node: *input, kind }))
    }

    // --- Digest tags ---

    /// Stamp a digest onto an answer entry as a class.
    pub fn stamp_digest(&self, doc: &mut Document, answer: NodeId, digest: &ContentDigest) -> Result<()> {
        if self.cached_digest(doc, answer).as_ref() == Some(digest) {
            return Ok(());
        }
        doc.add_class(answer, &format!("{DIGEST_TAG_PREFIX}{}", digest.to_hex()))?;
        Ok(())
    }

    /// The digest stamped on an answer entry, if any.
    pub fn cached_digest(&self, doc: &Document, answer: NodeId) -> Option<ContentDigest> {
        doc.classes(answer)
            .into_iter()
            .filter_map(|c| c.strip_prefix(DIGEST_TAG_PREFIX))
            .find_map(|hex| ContentDigest::from_hex(hex).ok())
    }

    // --- Resolution ---

    /// Find the displayed question with the given digest.
    ///
    /// Blocks whose structure does not match are logged and skipped.
    pub fn find_question(&self, doc: &Document, digest: &ContentDigest) -> Option<QuestionItem> {
        let questions = match self.enumerate_questions(doc) {
            Ok(questions) => questions,
            Err(e) => {
                warn!("Cannot enumerate questions: {}", e);
                return None;
            }
        };
        questions.into_iter().find(|q| match q.digest(self, doc) {
            Ok(d) => d == *digest,
            Err(e) => {
                warn!("Skipping question block {}: {}", q.node, e);
                false
            }
        })
    }

    /// Find the answer with the given digest inside a question.
    pub fn find_answer(
        &self,
        doc: &Document,
        question: &QuestionItem,
        digest: &ContentDigest,
    ) -> Option<AnswerItem> {
        let answers = match self.answers_of(doc, question) {
            Ok(answers) => answers,
            Err(e) => {
                warn!("Skipping question block {}: {}", question.node, e);
                return None;
            }
        };
        answers.into_iter().find(|a| match a.digest(self, doc, self.lookup) {
            Ok(d) => d == *digest,
            Err(e) => {
                debug!("Skipping answer {}: {}", a.node, e);
                false
            }
        })
    }

    /// Locks the page and resolves a question by digest.
    pub async fn resolve_question_by_digest(&self, digest: &ContentDigest) -> Option<QuestionItem> {
        let doc = self.document.read().await;
        self.find_question(&doc, digest)
    }

    /// Locks the page and resolves an answer by digest.
    pub async fn resolve_answer_by_digest(
        &self,
        question: &QuestionItem,
        digest: &ContentDigest,
    ) -> Option<AnswerItem> {
        let doc = self.document.read().await;
        self.find_answer(&doc, question, digest)
    }

    /// Digests of every displayed question whose structure is intact.
    pub async fn topics(&self) -> Vec<ContentDigest> {
        let doc = self.document.read().await;
        self.topics_in(&doc)
    }

    pub fn topics_in(&self, doc: &Document) -> Vec<ContentDigest> {
        let Ok(questions) = self.enumerate_questions(doc) else {
            return Vec::new();
        };
        questions
            .iter()
            .filter_map(|q| q.digest(self, doc).ok())
            .collect()
    }

    // --- Tallies ---

    /// The counter of an answer, created on first use.
    pub(crate) fn counter(&self, answer: NodeId) -> Arc<watch::Sender<Tally>> {
        let mut tallies = lock(&self.tallies);
        Arc::clone(
            tallies
                .entry(answer)
                .or_insert_with(|| Arc::new(watch::channel(Tally::default()).0)),
        )
    }

    /// Current tally of an answer.
    pub fn tally(&self, answer: NodeId) -> Tally {
        *self.counter(answer).borrow()
    }

    /// Subscribe to an answer's tally changes.
    pub fn subscribe(&self, answer: NodeId) -> watch::Receiver<Tally> {
        self.counter(answer).subscribe()
    }

    /// Number of tally counters created so far.
    pub fn counter_count(&self) -> usize {
        lock(&self.tallies).len()
    }

    // --- Registries ---

    /// Record that changes of `input` concern question block `question`.
    pub fn attach_listener(&self, input: NodeId, question: NodeId) {
        lock(&self.listeners).insert(input, question);
    }

    /// The question block an input's listener was attached for.
    pub fn question_for_input(&self, input: NodeId) -> Option<NodeId> {
        lock(&self.listeners).get(&input).copied()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Record the question block an answer entry belongs to.
    pub fn register_answer(&self, answer: NodeId, question: NodeId) {
        lock(&self.owners).insert(answer, question);
    }

    /// The question block of a registered answer entry.
    pub fn question_of_answer(&self, answer: NodeId) -> Option<NodeId> {
        lock(&self.owners).get(&answer).copied()
    }
}

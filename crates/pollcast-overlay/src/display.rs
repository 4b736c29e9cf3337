//! Tally indicators rendered into the page.
//!
//! Every answer entry gets one indicator span:
//!
//! ```text
//! Basic:     <span class="pollcast-count"> ~ 7</span>
//! Extended:  <span class="pollcast-count">
//!              <span class="pollcast-total"> ~ 7 </span>
//!              <span class="pollcast-upvote">▲ 3</span>
//!              <span class="pollcast-downvote">▼ 1</span>
//!            </span>
//! ```
//!
//! Nodes are created once and only their text changes afterwards, so the
//! affordance node ids the host sees in click events stay valid.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::{self, StreamExt};
use pollcast_page::{Document, NodeId};
use pollcast_protocol::{ProtocolVariant, Tally, VoteKind};
use tracing::{debug, info};

use crate::error::Result;
use crate::index::DomIndex;

pub const INDICATOR_CLASS: &str = "pollcast-count";
pub const TOTAL_CLASS: &str = "pollcast-total";
pub const UPVOTE_CLASS: &str = "pollcast-upvote";
pub const DOWNVOTE_CLASS: &str = "pollcast-downvote";

/// Indicator text before the first tally arrives.
pub const PENDING_TEXT: &str = " ~ ..";

#[derive(Debug, Clone, Copy)]
struct Indicator {
    span: NodeId,
    total: NodeId,
    upvote: Option<NodeId>,
    downvote: Option<NodeId>,
}

/// An up/down affordance click target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordance {
    pub answer: NodeId,
    pub kind: VoteKind,
}

/// Renders tallies next to answers and tracks the indicators it created.
pub struct ReactiveDisplay {
    index: Arc<DomIndex>,
    variant: ProtocolVariant,
    indicators: Mutex<HashMap<NodeId, Indicator>>,
    affordances: Mutex<HashMap<NodeId, Affordance>>,
    hidden: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ReactiveDisplay {
    pub fn new(index: Arc<DomIndex>, variant: ProtocolVariant) -> Self {
        Self {
            index,
            variant,
            indicators: Mutex::new(HashMap::new()),
            affordances: Mutex::new(HashMap::new()),
            hidden: AtomicBool::new(false),
        }
    }

    /// Create the indicator of an answer entry, or return the existing one.
    pub fn ensure_indicator(&self, doc: &mut Document, answer: NodeId) -> Result<NodeId> {
        if let Some(existing) = lock(&self.indicators).get(&answer) {
            return Ok(existing.span);
        }
        if let Some(span) = doc
            .element_children(answer)
            .into_iter()
            .find(|c| doc.has_class(*c, INDICATOR_CLASS))
        {
            let indicator = self.adopt(doc, span);
            self.register(answer, indicator);
            return Ok(span);
        }

        let span = doc.append_element(answer, "span")?;
        doc.add_class(span, INDICATOR_CLASS)?;
        let indicator = if self.variant.has_affordances() {
            let total = doc.append_element(span, "span")?;
            doc.add_class(total, TOTAL_CLASS)?;
            doc.append_text(total, PENDING_TEXT)?;
            let upvote = doc.append_element(span, "span")?;
            doc.add_class(upvote, UPVOTE_CLASS)?;
            doc.append_text(upvote, "▲")?;
            let downvote = doc.append_element(span, "span")?;
            doc.add_class(downvote, DOWNVOTE_CLASS)?;
            doc.append_text(downvote, "▼")?;
            Indicator {
                span,
                total,
                upvote: Some(upvote),
                downvote: Some(downvote),
            }
        } else {
            doc.append_text(span, PENDING_TEXT)?;
            Indicator {
                span,
                total: span,
                upvote: None,
                downvote: None,
            }
        };
        if self.hidden.load(Ordering::SeqCst) {
            doc.set_hidden(span, true)?;
        }
        self.register(answer, indicator);
        Ok(span)
    }

    fn adopt(&self, doc: &Document, span: NodeId) -> Indicator {
        let child = |class: &str| doc.elements_by_class(span, class).into_iter().next();
        Indicator {
            span,
            total: child(TOTAL_CLASS).unwrap_or(span),
            upvote: child(UPVOTE_CLASS),
            downvote: child(DOWNVOTE_CLASS),
        }
    }

    fn register(&self, answer: NodeId, indicator: Indicator) {
        let mut affordances = lock(&self.affordances);
        if let Some(up) = indicator.upvote {
            affordances.insert(up, Affordance { answer, kind: VoteKind::Upvote });
        }
        if let Some(down) = indicator.downvote {
            affordances.insert(down, Affordance { answer, kind: VoteKind::Downvote });
        }
        lock(&self.indicators).insert(answer, indicator);
    }

    /// The indicator span of an answer, if one was created.
    pub fn indicator_of(&self, answer: NodeId) -> Option<NodeId> {
        lock(&self.indicators).get(&answer).map(|i| i.span)
    }

    /// Answers that have an indicator.
    pub fn answers(&self) -> Vec<NodeId> {
        lock(&self.indicators).keys().copied().collect()
    }

    /// Write a tally into an answer's indicator.
    pub fn render(&self, doc: &mut Document, answer: NodeId, tally: Tally) -> Result<()> {
        let Some(indicator) = lock(&self.indicators).get(&answer).copied() else {
            debug!("No indicator for answer {}", answer);
            return Ok(());
        };
        if let (Some(up), Some(down)) = (indicator.upvote, indicator.downvote) {
            doc.set_text(indicator.total, &format!(" ~ {} ", tally.total))?;
            doc.set_text(up, &format!("▲ {}", tally.upvotes))?;
            doc.set_text(down, &format!("▼ {}", tally.downvotes))?;
        } else {
            doc.set_text(indicator.total, &format!(" ~ {}", tally.total))?;
        }
        Ok(())
    }

    /// Render the counter's current value.
    pub fn render_current(&self, doc: &mut Document, answer: NodeId) -> Result<()> {
        self.render(doc, answer, self.index.tally(answer))
    }

    /// Show or hide every indicator. Each indicator's state is flipped, so
    /// two calls restore the page exactly.
    pub fn toggle_visibility(&self, doc: &mut Document) -> Result<()> {
        let hidden = !self.hidden.fetch_xor(true, Ordering::SeqCst);
        let spans: Vec<NodeId> = lock(&self.indicators).values().map(|i| i.span).collect();
        for span in spans {
            let now_hidden = doc.is_hidden(span);
            doc.set_hidden(span, !now_hidden)?;
        }
        info!("Indicators {}", if hidden { "hidden" } else { "shown" });
        Ok(())
    }

    /// Whether indicators are currently toggled off.
    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    /// Map a clicked node to the affordance it belongs to.
    pub fn affordance_at(&self, doc: &Document, node: NodeId) -> Option<Affordance> {
        let affordances = lock(&self.affordances);
        [UPVOTE_CLASS, DOWNVOTE_CLASS]
            .into_iter()
            .filter_map(|class| doc.closest_with_class(node, class))
            .find_map(|target| affordances.get(&target).copied())
    }

    /// Re-render indicators whenever their counters change.
    ///
    /// Subscribes to the answers that have an indicator when called; runs
    /// until every counter is dropped.
    pub async fn run(self: Arc<Self>) {
        let answers = self.answers();
        let receivers: Vec<_> = answers
            .iter()
            .map(|answer| (*answer, self.index.subscribe(*answer)))
            .collect();

        // Catch up on values written before the subscriptions existed.
        {
            let mut doc = self.index.document().write().await;
            for answer in &answers {
                let tally = self.index.tally(*answer);
                if tally != Tally::default() {
                    if let Err(e) = self.render(&mut doc, *answer, tally) {
                        debug!("Render of {} failed: {}", answer, e);
                    }
                }
            }
        }

        let mut changes = stream::select_all(receivers.into_iter().map(|(answer, rx)| {
            stream::unfold(rx, move |mut rx| async move {
                rx.changed().await.ok()?;
                let tally = *rx.borrow_and_update();
                Some(((answer, tally), rx))
            })
            .boxed()
        }));

        debug!("Watching {} tally counters", answers.len());
        while let Some((answer, tally)) = changes.next().await {
            let mut doc = self.index.document().write().await;
            if let Err(e) = self.render(&mut doc, answer, tally) {
                debug!("Render of {} failed: {}", answer, e);
            }
        }
    }
}

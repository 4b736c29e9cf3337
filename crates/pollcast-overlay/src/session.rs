//! One overlay session over one page.

use std::sync::Arc;

use pollcast_channel::{ChannelConfig, Connector, InboundSink, SocketChannel};
use pollcast_page::{Document, NodeId, PageEvent};
use pollcast_protocol::{OutgoingVote, TallyPayload, VoteKind};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::display::ReactiveDisplay;
use crate::error::{Error, Result};
use crate::index::{DomIndex, InputKind, SharedDocument};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::submit::VoteSubmitter;

/// What [`Overlay::initialize`] found on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Question blocks indexed.
    pub questions: usize,
    /// Question blocks skipped for a structural mismatch.
    pub skipped_blocks: usize,
    /// Answer entries given an indicator.
    pub answers: usize,
    /// Inputs with an attached listener.
    pub listeners: usize,
    /// Entries without a selection control.
    pub non_selectable: usize,
    /// Entries whose control is neither radio nor checkbox, or malformed.
    pub unsupported: usize,
}

/// What a page event led to once the document is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Submit(NodeId),
    Affordance(NodeId, VoteKind),
    Toggled,
    Nothing,
}

/// Result of handling one page event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A vote was sent.
    Voted(OutgoingVote),
    /// Indicator visibility flipped.
    Toggled,
    /// The event concerns nothing the overlay tracks.
    Ignored,
}

/// The overlay session: owns the index, the channel, and the components
/// built on them.
pub struct Overlay {
    config: OverlayConfig,
    index: Arc<DomIndex>,
    channel: Arc<SocketChannel>,
    reconciler: Reconciler,
    display: Arc<ReactiveDisplay>,
    submitter: Arc<VoteSubmitter>,
    inbound: Option<mpsc::UnboundedReceiver<TallyPayload>>,
}

impl Overlay {
    pub fn new(config: OverlayConfig, document: Document, connector: Arc<dyn Connector>) -> Self {
        let document: SharedDocument = Arc::new(RwLock::new(document));
        let index = Arc::new(DomIndex::new(
            document,
            config.contract.clone(),
            config.variant,
        ));

        let (sink, inbound) = InboundSink::channel();
        let channel = Arc::new(SocketChannel::new(
            ChannelConfig::new(config.endpoint.clone()).with_topic_scoping(config.topic_scoping),
            connector,
            sink,
        ));

        let reconciler = Reconciler::new(Arc::clone(&index), config.variant);
        let display = Arc::new(ReactiveDisplay::new(Arc::clone(&index), config.variant));
        let submitter = Arc::new(VoteSubmitter::new(
            Arc::clone(&index),
            Arc::clone(&channel),
            config.voter.clone(),
        ));

        Self {
            config,
            index,
            channel,
            reconciler,
            display,
            submitter,
            inbound: Some(inbound),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<DomIndex> {
        &self.index
    }

    pub fn channel(&self) -> &Arc<SocketChannel> {
        &self.channel
    }

    pub fn display(&self) -> &Arc<ReactiveDisplay> {
        &self.display
    }

    pub fn document(&self) -> &SharedDocument {
        self.index.document()
    }

    /// Index the page: indicators for every answer, digest tags when the
    /// protocol uses them, listeners on every radio and checkbox.
    ///
    /// A broken question block is logged and skipped. Only a page with no
    /// recognizable question listing is an error.
    pub async fn initialize(&self) -> Result<InitReport> {
        let mut report = InitReport::default();
        let mut doc = self.index.document().write().await;
        let stamp = self.config.variant.uses_cached_tags();

        let questions = self.index.enumerate_questions(&doc)?;
        let mut topics = Vec::with_capacity(questions.len());

        for question in &questions {
            let indexed = question
                .digest(&self.index, &doc)
                .and_then(|digest| Ok((digest, self.index.answers_of(&doc, question)?)));
            let (digest, answers) = match indexed {
                Ok(indexed) => indexed,
                Err(e) => {
                    warn!("Skipping question block {}: {}", question.node, e);
                    report.skipped_blocks += 1;
                    continue;
                }
            };
            topics.push(digest);
            report.questions += 1;

            for answer in answers {
                if let Err(e) = self.display.ensure_indicator(&mut doc, answer.node) {
                    warn!("No indicator for answer {}: {}", answer.node, e);
                    continue;
                }
                report.answers += 1;
                self.index.register_answer(answer.node, question.node);

                if stamp {
                    let stamped = self
                        .index
                        .answer_digest(&doc, answer.node)
                        .and_then(|d| self.index.stamp_digest(&mut doc, answer.node, &d));
                    if let Err(e) = stamped {
                        warn!("Answer {} left without digest tag: {}", answer.node, e);
                    }
                }

                match self.index.input_of(&doc, answer.node) {
                    Ok(Some(control)) if control.kind.is_supported() => {
                        self.index.attach_listener(control.node, question.node);
                        report.listeners += 1;
                    }
                    Ok(Some(control)) => {
                        let InputKind::Other(kind) = control.kind else {
                            continue;
                        };
                        warn!("{}", Error::UnsupportedInput(kind));
                        report.unsupported += 1;
                    }
                    Ok(None) => {
                        debug!("Answer {} is not selectable", answer.node);
                        report.non_selectable += 1;
                    }
                    Err(e) => {
                        warn!("Answer {} has no usable input: {}", answer.node, e);
                        report.unsupported += 1;
                    }
                }
            }
        }

        self.channel.set_topics(topics);
        info!(
            "Indexed {} questions ({} skipped), {} answers, {} listeners",
            report.questions, report.skipped_blocks, report.answers, report.listeners
        );
        Ok(report)
    }

    /// Apply an event to the document and return the follow-up work.
    async fn apply_event(&self, event: PageEvent) -> Result<Step> {
        let mut doc = self.index.document().write().await;
        match event {
            PageEvent::InputChanged { node, checked } => {
                doc.set_checked(node, checked)?;
                if self.index.question_for_input(node).is_none() {
                    debug!("Change of untracked input {}", node);
                    return Ok(Step::Nothing);
                }
                Ok(Step::Submit(node))
            }
            PageEvent::Click { node } => {
                if let Some(affordance) = self.display.affordance_at(&doc, node) {
                    return Ok(Step::Affordance(affordance.answer, affordance.kind));
                }
                let region = &self.config.contract.toggle_region_class;
                if doc.closest_with_class(node, region).is_none() {
                    return Ok(Step::Nothing);
                }
                self.display.toggle_visibility(&mut doc)?;
                Ok(Step::Toggled)
            }
            PageEvent::KeyPress { key } if key == self.config.toggle_key => {
                self.display.toggle_visibility(&mut doc)?;
                Ok(Step::Toggled)
            }
            PageEvent::KeyPress { .. } => Ok(Step::Nothing),
        }
    }

    /// Build the vote a step calls for from the page as it is now.
    async fn prepare_vote(&self, step: Step) -> Option<Result<OutgoingVote>> {
        let doc = self.index.document().read().await;
        match step {
            Step::Submit(input) => Some(self.submitter.selection_vote(&doc, input)),
            Step::Affordance(answer, kind) => Some(self.submitter.toggle_vote(&doc, answer, kind)),
            Step::Toggled | Step::Nothing => None,
        }
    }

    async fn vote(&self, step: Step) -> Option<Result<OutgoingVote>> {
        match step {
            Step::Submit(input) => Some(self.submitter.on_selection_changed(input).await),
            Step::Affordance(answer, kind) => Some(self.submitter.on_affordance(answer, kind).await),
            Step::Toggled | Step::Nothing => None,
        }
    }

    /// Handle one page event, waiting for any vote it triggers.
    pub async fn handle_event(&self, event: PageEvent) -> Result<EventOutcome> {
        let step = self.apply_event(event).await?;
        match self.vote(step).await {
            Some(vote) => Ok(EventOutcome::Voted(vote?)),
            None if step == Step::Toggled => Ok(EventOutcome::Toggled),
            None => Ok(EventOutcome::Ignored),
        }
    }

    /// Merge one inbound payload into the counters.
    pub async fn reconcile(&self, payload: &TallyPayload) -> ReconcileReport {
        self.reconciler.apply(payload).await
    }

    /// Drive the session until the page event stream ends.
    ///
    /// Connects right away so tallies show up without waiting for a vote.
    /// Each vote is built when its event is handled and queued to a single
    /// sender task, so votes reach the server in event order even while a
    /// connect is pending. The queue is drained before returning.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) -> Result<()> {
        let mut inbound = self
            .inbound
            .take()
            .ok_or_else(|| Error::Config("session is already running".to_string()))?;

        let channel = Arc::clone(&self.channel);
        tokio::spawn(async move {
            if let Err(e) = channel.acquire().await {
                warn!("Initial connect failed: {}", e);
            }
        });

        let display = tokio::spawn(Arc::clone(&self.display).run());

        let (votes, mut queued) = mpsc::unbounded_channel::<OutgoingVote>();
        let submitter = Arc::clone(&self.submitter);
        let sender = tokio::spawn(async move {
            while let Some(vote) = queued.recv().await {
                // Logged by the submitter; later votes still go out.
                let _ = submitter.send(&vote).await;
            }
        });

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Page event stream ended");
                        break;
                    };
                    let step = match self.apply_event(event).await {
                        Ok(step) => step,
                        Err(e) => {
                            warn!("Page event dropped: {}", e);
                            continue;
                        }
                    };
                    match self.prepare_vote(step).await {
                        Some(Ok(vote)) => {
                            if votes.send(vote).is_err() {
                                warn!("Vote sender has stopped");
                            }
                        }
                        Some(Err(e)) => warn!("Vote not built: {}", e),
                        None => {}
                    }
                }
                Some(payload) = inbound.recv() => {
                    self.reconciler.apply(&payload).await;
                }
            }
        }

        drop(votes);
        if let Err(e) = sender.await {
            warn!("Vote sender task failed: {}", e);
        }
        display.abort();
        Ok(())
    }
}

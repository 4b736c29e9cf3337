//! Shared fixtures for the overlay integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use pollcast_channel::{ChannelError, Connection, Connector, InboundSink, Result};
use pollcast_page::{Document, ElementSpec, TreeNode};
use tokio::sync::watch;

/// A connection that records every frame sent on it.
#[derive(Default)]
pub struct RecordingConnection {
    pub frames: Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

impl RecordingConnection {
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn json_frames(&self) -> Vec<serde_json::Value> {
        self.frames()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }
}

impl Connection for RecordingConnection {
    fn send(&self, text: String) -> BoxFuture<'_, Result<()>> {
        async move {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ChannelError::Closed);
            }
            self.frames.lock().unwrap().push(text);
            Ok(())
        }
        .boxed()
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// Connector handing out one shared recording connection and remembering
/// the URIs and inbound sinks it was given.
#[derive(Default)]
pub struct MockConnector {
    pub connection: Arc<RecordingConnection>,
    pub uris: Mutex<Vec<String>>,
    pub sinks: Mutex<Vec<InboundSink>>,
    pub connects: AtomicUsize,
    pub refuse: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push a raw text frame as if the server had sent it.
    pub fn push(&self, frame: &str) -> bool {
        let sinks = self.sinks.lock().unwrap();
        sinks.last().is_some_and(|sink| sink.deliver_frame(frame))
    }

    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        uri: String,
        inbound: InboundSink,
    ) -> BoxFuture<'static, Result<Arc<dyn Connection>>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.uris.lock().unwrap().push(uri.clone());
        if self.refuse.load(Ordering::SeqCst) {
            return async move {
                Err(ChannelError::Connect {
                    uri,
                    reason: "refused".to_string(),
                })
            }
            .boxed();
        }
        self.sinks.lock().unwrap().push(inbound);
        let conn: Arc<dyn Connection> = Arc::clone(&self.connection) as Arc<dyn Connection>;
        async move { Ok(conn) }.boxed()
    }
}

/// A [`MockConnector`] whose connects stay pending until [`GatedConnector::open`].
pub struct GatedConnector {
    pub inner: Arc<MockConnector>,
    gate: watch::Sender<bool>,
}

impl GatedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MockConnector::new(),
            gate: watch::channel(false).0,
        })
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }
}

impl Connector for GatedConnector {
    fn connect(
        &self,
        uri: String,
        inbound: InboundSink,
    ) -> BoxFuture<'static, Result<Arc<dyn Connection>>> {
        let mut gate = self.gate.subscribe();
        let connect = self.inner.connect(uri, inbound);
        async move {
            gate.wait_for(|open| *open)
                .await
                .map_err(|_| ChannelError::Closed)?;
            connect.await
        }
        .boxed()
    }
}

pub fn answer(ordinal: &str, text: &str, input_type: &str, name: &str) -> ElementSpec {
    ElementSpec::new("div")
        .class("r0")
        .child(
            ElementSpec::new("input")
                .attr("type", input_type)
                .attr("name", name),
        )
        .child(
            ElementSpec::new("label")
                .child(ElementSpec::new("span").class("answernumber").text(ordinal))
                .text(text),
        )
}

pub fn question(text: &str, answers: Vec<ElementSpec>) -> ElementSpec {
    let group = answers
        .into_iter()
        .fold(ElementSpec::new("div").class("answer"), |g, a| g.child(a));
    ElementSpec::new("div")
        .class("que")
        .child(
            ElementSpec::new("div")
                .class("content")
                .child(ElementSpec::new("div").class("qtext").text(text))
                .child(ElementSpec::new("div").class("ablock").child(group)),
        )
}

/// A page with the given question blocks followed by the navigation block.
pub fn page(questions: Vec<ElementSpec>) -> Document {
    let body = questions
        .into_iter()
        .fold(ElementSpec::new("body"), |b, q| b.child(q))
        .child(
            ElementSpec::new("div")
                .class("content")
                .child(ElementSpec::new("span").text("Quiz navigation")),
        );
    Document::from_tree(&TreeNode::Element(body)).unwrap()
}

/// Radio question, checkbox question, and a question whose answers are
/// free text.
pub fn quiz_page() -> Document {
    page(vec![
        question(
            "Largest planet?",
            vec![
                answer("a. ", "Mars", "radio", "q1"),
                answer("b. ", "Jupiter", "radio", "q1"),
                answer("c. ", "Venus", "radio", "q1"),
            ],
        ),
        question(
            "Which are mammals?",
            vec![
                answer("a. ", "Whale", "checkbox", "q2a"),
                answer("b. ", "Shark", "checkbox", "q2b"),
                answer("c. ", "Bat", "checkbox", "q2c"),
            ],
        ),
        question(
            "Name a colour",
            vec![answer("a. ", "Your answer", "text", "q3")],
        ),
    ])
}

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{answer, page, question, quiz_page, GatedConnector, MockConnector};
use pollcast_channel::ChannelError;
use pollcast_identity::compute_digest;
use pollcast_overlay::{Error, EventOutcome, Overlay, OverlayConfig};
use pollcast_page::{ElementSpec, NodeId, PageEvent};
use pollcast_protocol::{OutgoingVote, ProtocolVariant, Tally, VoteKind};
use tokio::sync::mpsc;
use tokio_test::assert_ok;

fn overlay(variant: ProtocolVariant) -> (Overlay, Arc<MockConnector>) {
    let mut doc = quiz_page();
    let root = doc.root();
    let region = doc.append_element(root, "div").unwrap();
    doc.add_class(region, "pollcast-toggle").unwrap();

    let connector = MockConnector::new();
    let config = OverlayConfig::default()
        .with_variant(variant)
        .with_voter("attempt-7");
    (Overlay::new(config, doc, connector.clone()), connector)
}

async fn answer_node(overlay: &Overlay, q: &str, a: &str) -> NodeId {
    let index = overlay.index();
    let question = index
        .resolve_question_by_digest(&compute_digest(q))
        .await
        .unwrap();
    index
        .resolve_answer_by_digest(&question, &compute_digest(a))
        .await
        .unwrap()
        .node
}

async fn input_node(overlay: &Overlay, q: &str, a: &str) -> NodeId {
    let entry = answer_node(overlay, q, a).await;
    let doc = overlay.document().read().await;
    overlay
        .index()
        .input_of(&doc, entry)
        .unwrap()
        .unwrap()
        .node
}

async fn indicator_text(overlay: &Overlay, q: &str, a: &str) -> String {
    let entry = answer_node(overlay, q, a).await;
    let span = overlay.display().indicator_of(entry).unwrap();
    overlay.document().read().await.text_content(span)
}

fn change(node: NodeId, checked: bool) -> PageEvent {
    PageEvent::InputChanged { node, checked }
}

#[tokio::test]
async fn initialize_indexes_every_block() {
    let (overlay, _) = overlay(ProtocolVariant::Basic);
    let report = assert_ok!(overlay.initialize().await);

    assert_eq!(report.questions, 3);
    assert_eq!(report.skipped_blocks, 0);
    assert_eq!(report.answers, 7);
    assert_eq!(report.listeners, 6);
    assert_eq!(report.unsupported, 1);

    let doc = overlay.document().read().await;
    assert_eq!(doc.elements_by_class(doc.root(), "pollcast-count").len(), 7);
    drop(doc);
    assert_eq!(indicator_text(&overlay, "Largest planet?", "Mars").await, " ~ ..");
}

#[tokio::test]
async fn initialize_twice_reuses_indicators() {
    let (overlay, _) = overlay(ProtocolVariant::Extended);
    overlay.initialize().await.unwrap();
    overlay.initialize().await.unwrap();

    let doc = overlay.document().read().await;
    assert_eq!(doc.elements_by_class(doc.root(), "pollcast-count").len(), 7);
}

#[tokio::test]
async fn broken_block_is_skipped_alone() {
    let broken = ElementSpec::new("div")
        .class("content")
        .child(ElementSpec::new("div").class("answer"));
    let doc = page(vec![
        question("First", vec![answer("a. ", "one", "radio", "f")]),
        broken,
        question("Third", vec![answer("a. ", "three", "radio", "t")]),
    ]);
    let connector = MockConnector::new();
    let overlay = Overlay::new(OverlayConfig::default(), doc, connector.clone());

    let report = assert_ok!(overlay.initialize().await);
    assert_eq!(report.questions, 2);
    assert_eq!(report.skipped_blocks, 1);
    assert_eq!(report.listeners, 2);

    overlay.channel().acquire().await.unwrap();
    let expected = format!(
        "ws://localhost:8080/?topics={},{}",
        compute_digest("First").to_hex(),
        compute_digest("Third").to_hex()
    );
    assert_eq!(connector.uris(), vec![expected]);
}

#[tokio::test]
async fn page_without_listing_is_rejected() {
    let doc = page(Vec::new());
    let overlay = Overlay::new(OverlayConfig::default(), doc, MockConnector::new());
    assert!(matches!(
        overlay.initialize().await,
        Err(Error::StructuralMismatch { found: 1, .. })
    ));
}

#[tokio::test]
async fn topic_scoping_can_be_disabled() {
    let connector = MockConnector::new();
    let config = OverlayConfig::default().with_topic_scoping(false);
    let overlay = Overlay::new(config, quiz_page(), connector.clone());
    overlay.initialize().await.unwrap();
    overlay.channel().acquire().await.unwrap();
    assert_eq!(connector.uris(), vec!["ws://localhost:8080/".to_string()]);
}

#[tokio::test]
async fn every_change_replaces_the_selection() {
    let (overlay, connector) = overlay(ProtocolVariant::Basic);
    overlay.initialize().await.unwrap();
    let whale = input_node(&overlay, "Which are mammals?", "Whale").await;
    let bat = input_node(&overlay, "Which are mammals?", "Bat").await;

    overlay.handle_event(change(whale, true)).await.unwrap();
    overlay.handle_event(change(bat, true)).await.unwrap();
    let outcome = overlay.handle_event(change(whale, false)).await.unwrap();

    let expected = OutgoingVote::Selection {
        question: compute_digest("Which are mammals?"),
        answers: vec![compute_digest("Bat")],
        voter: "attempt-7".to_string(),
    };
    assert_eq!(outcome, EventOutcome::Voted(expected));

    let frames = connector.connection.json_frames();
    assert_eq!(frames.len(), 3);
    let answers: Vec<usize> = frames
        .iter()
        .map(|f| f["answers"].as_array().unwrap().len())
        .collect();
    assert_eq!(answers, vec![1, 2, 1]);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn radio_change_drops_the_previous_pick() {
    let (overlay, connector) = overlay(ProtocolVariant::Basic);
    overlay.initialize().await.unwrap();
    let mars = input_node(&overlay, "Largest planet?", "Mars").await;
    let jupiter = input_node(&overlay, "Largest planet?", "Jupiter").await;

    overlay.handle_event(change(mars, true)).await.unwrap();
    overlay.handle_event(change(jupiter, true)).await.unwrap();

    let frames = connector.connection.json_frames();
    assert_eq!(
        frames[1]["answers"],
        serde_json::json!([compute_digest("Jupiter").to_hex()])
    );
    assert_eq!(frames[1]["voter"], "attempt-7");
}

#[tokio::test]
async fn untracked_inputs_are_ignored() {
    let (overlay, connector) = overlay(ProtocolVariant::Basic);
    overlay.initialize().await.unwrap();
    let free_text = {
        let doc = overlay.document().read().await;
        doc.elements_by_attr(doc.root(), "name", "q3")[0]
    };

    let outcome = overlay.handle_event(change(free_text, true)).await.unwrap();
    assert_eq!(outcome, EventOutcome::Ignored);
    assert!(connector.connection.frames().is_empty());
}

#[tokio::test]
async fn failed_send_surfaces_as_channel_error() {
    let (overlay, connector) = overlay(ProtocolVariant::Basic);
    overlay.initialize().await.unwrap();
    connector.refuse.store(true, Ordering::SeqCst);
    let mars = input_node(&overlay, "Largest planet?", "Mars").await;

    let result = overlay.handle_event(change(mars, true)).await;
    assert!(matches!(
        result,
        Err(Error::Channel(ChannelError::Connect { .. }))
    ));

    // The next change connects again.
    connector.refuse.store(false, Ordering::SeqCst);
    overlay.handle_event(change(mars, true)).await.unwrap();
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn toggle_key_and_region_flip_visibility() {
    let (overlay, _) = overlay(ProtocolVariant::Basic);
    overlay.initialize().await.unwrap();
    let before = {
        let doc = overlay.document().read().await;
        doc.outer_html(doc.root())
    };

    let key = overlay
        .handle_event(PageEvent::KeyPress { key: '$' })
        .await
        .unwrap();
    assert_eq!(key, EventOutcome::Toggled);
    {
        let doc = overlay.document().read().await;
        let spans = doc.elements_by_class(doc.root(), "pollcast-count");
        assert!(spans.iter().all(|s| doc.is_hidden(*s)));
    }

    let other = overlay
        .handle_event(PageEvent::KeyPress { key: 'x' })
        .await
        .unwrap();
    assert_eq!(other, EventOutcome::Ignored);

    let region = {
        let doc = overlay.document().read().await;
        doc.elements_by_class(doc.root(), "pollcast-toggle")[0]
    };
    let click = overlay
        .handle_event(PageEvent::Click { node: region })
        .await
        .unwrap();
    assert_eq!(click, EventOutcome::Toggled);

    let doc = overlay.document().read().await;
    assert_eq!(doc.outer_html(doc.root()), before);
}

#[tokio::test]
async fn extended_affordance_click_sends_toggle_vote() {
    let (overlay, connector) = overlay(ProtocolVariant::Extended);
    overlay.initialize().await.unwrap();
    let bat = answer_node(&overlay, "Which are mammals?", "Bat").await;
    let upvote = {
        let doc = overlay.document().read().await;
        let span = overlay.display().indicator_of(bat).unwrap();
        doc.elements_by_class(span, "pollcast-upvote")[0]
    };

    let outcome = overlay
        .handle_event(PageEvent::Click { node: upvote })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        EventOutcome::Voted(OutgoingVote::Toggle {
            question: compute_digest("Which are mammals?"),
            answer: compute_digest("Bat"),
            vote_type: VoteKind::Upvote,
            voter: "attempt-7".to_string(),
        })
    );
    let frames = connector.connection.json_frames();
    assert_eq!(frames[0]["vote_type"], "upvote");
    assert_eq!(frames[0]["answer"], compute_digest("Bat").to_hex());
}

#[tokio::test]
async fn extended_stamps_digest_tags() {
    let (overlay, _) = overlay(ProtocolVariant::Extended);
    overlay.initialize().await.unwrap();
    let mars = answer_node(&overlay, "Largest planet?", "Mars").await;
    let doc = overlay.document().read().await;
    let tag = format!("pollcast-digest-{}", compute_digest("Mars").to_hex());
    assert!(doc.has_class(mars, &tag));
}

#[tokio::test]
async fn reconcile_updates_counters() {
    let (overlay, _) = overlay(ProtocolVariant::Extended);
    overlay.initialize().await.unwrap();
    let payload = pollcast_protocol::decode_inbound(
        &serde_json::json!({
            compute_digest("Largest planet?").to_hex(): {
                compute_digest("Jupiter").to_hex(): "6,4,1",
            }
        })
        .to_string(),
    )
    .unwrap();

    let report = overlay.reconcile(&payload).await;
    assert_eq!(report.applied, 1);
    let again = overlay.reconcile(&payload).await;
    assert_eq!(again.unchanged, 1);

    let jupiter = answer_node(&overlay, "Largest planet?", "Jupiter").await;
    assert_eq!(overlay.index().tally(jupiter), Tally::new(6, 4, 1));
}

#[tokio::test]
async fn run_loop_renders_pushes_and_sends_votes() {
    let (overlay, connector) = overlay(ProtocolVariant::Basic);
    overlay.initialize().await.unwrap();
    let venus = input_node(&overlay, "Largest planet?", "Venus").await;
    let venus_entry = answer_node(&overlay, "Largest planet?", "Venus").await;
    let span = overlay.display().indicator_of(venus_entry).unwrap();
    let document = Arc::clone(overlay.document());

    let (tx, rx) = mpsc::channel(8);
    let session = tokio::spawn(overlay.run(rx));

    // The run loop connects eagerly.
    for _ in 0..200 {
        if !connector.sinks.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let frame = serde_json::json!({
        compute_digest("Largest planet?").to_hex(): {
            compute_digest("Venus").to_hex(): 11,
        }
    });
    assert!(connector.push(&frame.to_string()));

    let mut text = String::new();
    for _ in 0..200 {
        text = document.read().await.text_content(span);
        if text == " ~ 11" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(text, " ~ 11");

    tx.send(change(venus, true)).await.unwrap();
    for _ in 0..200 {
        if !connector.connection.frames().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let frames = connector.connection.json_frames();
    assert_eq!(
        frames[0]["answers"],
        serde_json::json!([compute_digest("Venus").to_hex()])
    );

    drop(tx);
    session.await.unwrap().unwrap();
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_loop_sends_votes_in_event_order_while_connecting() {
    for _ in 0..20 {
        let connector = GatedConnector::new();
        let config = OverlayConfig::default().with_voter("attempt-7");
        let overlay = Overlay::new(config, quiz_page(), connector.clone());
        overlay.initialize().await.unwrap();
        let whale = input_node(&overlay, "Which are mammals?", "Whale").await;
        let bat = input_node(&overlay, "Which are mammals?", "Bat").await;
        let document = Arc::clone(overlay.document());

        let (tx, rx) = mpsc::channel(8);
        let session = tokio::spawn(overlay.run(rx));
        tx.send(change(whale, true)).await.unwrap();
        tx.send(change(bat, true)).await.unwrap();
        tx.send(change(whale, false)).await.unwrap();

        for _ in 0..200 {
            if document.read().await.is_checked(bat) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        connector.open();

        drop(tx);
        session.await.unwrap().unwrap();

        let selections: Vec<serde_json::Value> = connector
            .inner
            .connection
            .json_frames()
            .into_iter()
            .map(|frame| frame["answers"].clone())
            .collect();
        assert_eq!(
            selections,
            vec![
                serde_json::json!([compute_digest("Whale").to_hex()]),
                serde_json::json!([
                    compute_digest("Whale").to_hex(),
                    compute_digest("Bat").to_hex()
                ]),
                serde_json::json!([compute_digest("Bat").to_hex()]),
            ]
        );
        assert_eq!(connector.inner.connects.load(Ordering::SeqCst), 1);
    }
}

use flowstudio_core::config::EdgePolicy;
use flowstudio_core::document::{parse, serialize};
use flowstudio_core::graph::{EdgeChange, FrontmatterPatch, NodeChange};
use flowstudio_core::{FlowDocument, FlowFrontmatter, GraphStore, Position};
use serde_json::json;

/// The document as persisted: selection and drag state never reach disk.
fn persisted(mut document: FlowDocument) -> FlowDocument {
    for node in &mut document.nodes {
        node.selected = false;
        node.dragging = false;
    }
    for edge in &mut document.edges {
        edge.selected = false;
    }
    document
}

fn assert_round_trips(store: &GraphStore, step: &str) {
    let snapshot = store.snapshot();
    let text = serialize(&snapshot).unwrap();
    let parsed = parse(&text).unwrap();
    assert_eq!(parsed, persisted(snapshot), "after {}:\n{}", step, text);
}

#[test]
fn every_mutation_step_survives_serialization() {
    let mut store = GraphStore::from_document(
        FlowDocument::new(FlowFrontmatter::named("orders")),
        EdgePolicy::default(),
    );
    assert_round_trips(&store, "empty flow");

    let trigger = store.add_node(
        "trigger",
        Position::new(0.0, 0.0),
        json!({ "cron": "0 * * * *" }),
    );
    let action = store.add_node(
        "action",
        Position::new(240.0, 0.0),
        json!({
            "label": "Post order",
            "request": { "method": "POST", "headers": { "accept": "application/json" } },
            "retries": 3,
            "timeout": 2.5
        }),
    );
    assert_round_trips(&store, "add");

    let main = store
        .connect(&trigger, &action, Some("out".into()), Some("in".into()))
        .unwrap();
    assert_round_trips(&store, "connect with handles");

    store.apply_node_changes(&[
        NodeChange::Position {
            id: action.clone(),
            position: Some(Position::new(240.5, -80.25)),
            dragging: Some(true),
        },
        NodeChange::Select {
            id: trigger.clone(),
            selected: true,
        },
        NodeChange::Dimensions {
            id: trigger.clone(),
            width: 150.0,
            height: 40.0,
        },
    ]);
    assert_round_trips(&store, "move, select and resize");

    assert!(store.update_node_data(
        &action,
        json!({
            "tags": ["billing", "sync"],
            "steps": [
                { "name": "validate", "attempts": 1 },
                { "name": "charge", "attempts": 2, "notify": ["ops", "finance"] }
            ],
            "mixed": [1, "two", true]
        }),
    ));
    assert_round_trips(&store, "nested node data");

    let archive = store.add_node("action", Position::new(480.0, 0.0), json!({}));
    store.connect(&action, &archive, None, None).unwrap();
    let shortcut = store.connect(&trigger, &archive, None, None).unwrap();
    store.update_frontmatter(FrontmatterPatch {
        active: Some(true),
        description: Some("Charge new orders".into()),
        ..FrontmatterPatch::default()
    });
    assert_round_trips(&store, "more nodes and frontmatter");

    store.apply_edge_changes(&[
        EdgeChange::Select {
            id: main.clone(),
            selected: true,
        },
        EdgeChange::Remove { id: shortcut },
    ]);
    assert_round_trips(&store, "edge remove");

    store.apply_node_changes(&[NodeChange::Remove { id: action }]);
    assert_eq!(store.nodes().len(), 2);
    assert!(store.edges().is_empty());
    assert_round_trips(&store, "node remove");
}

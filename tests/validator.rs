use stackforge::store::{NodeUpdate, WorkflowStore};
use stackforge::types::ComponentType;
use stackforge::validator::{config_issues, validate};
use stackforge::workflow::{Edge, Node, Position, Workflow};

fn node(id: &str, kind: ComponentType) -> Node {
    Node::new(id, kind, Position::default())
}

#[test]
fn test_empty_workflow_is_invalid_with_both_anchors_missing() {
    let report = validate(&Workflow::new("wf-1", "empty"));
    assert!(!report.valid);
    assert_eq!(
        report.missing,
        vec![ComponentType::UserQuery, ComponentType::Output]
    );
    assert!(!report.has_connections);
}

#[test]
fn test_minimal_query_to_output_pair_is_valid() {
    let mut store = WorkflowStore::create("wf-1", "minimal");
    store.add_node(node("q1", ComponentType::UserQuery)).unwrap();
    store.add_node(node("o1", ComponentType::Output)).unwrap();
    store.add_edge(Edge::new("e1", "q1", "o1")).unwrap();

    let report = validate(store.workflow());
    assert!(report.valid);
    assert!(report.missing.is_empty());
    assert!(report.has_connections);
}

#[test]
fn test_missing_output_is_the_only_gap_reported() {
    let mut store = WorkflowStore::create("wf-1", "no output");
    store.add_node(node("q1", ComponentType::UserQuery)).unwrap();
    store.add_node(node("llm1", ComponentType::LlmEngine)).unwrap();
    store.add_edge(Edge::new("e1", "q1", "llm1")).unwrap();

    let report = validate(store.workflow());
    assert!(!report.valid);
    assert_eq!(report.missing, vec![ComponentType::Output]);
    assert!(report.has_connections);
}

#[test]
fn test_anchors_without_connections_stay_invalid() {
    let mut store = WorkflowStore::create("wf-1", "disconnected");
    store.add_node(node("q1", ComponentType::UserQuery)).unwrap();
    store.add_node(node("o1", ComponentType::Output)).unwrap();

    let report = validate(store.workflow());
    assert!(!report.valid);
    assert!(report.missing.is_empty());
    assert!(!report.has_connections);
}

// The connection check counts edges, not paths: an edge between two
// auxiliary nodes satisfies it even though query and output stay
// disconnected. Documented behavior, kept as-is.
#[test]
fn test_any_edge_satisfies_the_connection_check() {
    let mut store = WorkflowStore::create("wf-1", "coarse");
    store.add_node(node("q1", ComponentType::UserQuery)).unwrap();
    store.add_node(node("o1", ComponentType::Output)).unwrap();
    store.add_node(node("kb1", ComponentType::KnowledgeBase)).unwrap();
    store.add_node(node("llm1", ComponentType::LlmEngine)).unwrap();
    store.add_edge(Edge::new("e1", "kb1", "llm1")).unwrap();

    assert!(validate(store.workflow()).valid);
}

#[test]
fn test_config_issues_are_advisory_and_sorted() {
    let mut store = WorkflowStore::create("wf-1", "misconfigured");
    store.add_node(node("q1", ComponentType::UserQuery)).unwrap();
    store.add_node(node("o1", ComponentType::Output)).unwrap();
    store.add_node(node("llm1", ComponentType::LlmEngine)).unwrap();
    store.add_node(node("kb1", ComponentType::KnowledgeBase)).unwrap();
    store.add_edge(Edge::new("e1", "q1", "o1")).unwrap();

    store
        .update_node(
            "llm1",
            &NodeUpdate::new().with_config(serde_json::json!({
                "temperature": 3.5,
                "maxTokens": 0,
            })),
        )
        .unwrap();
    store
        .update_node(
            "kb1",
            &NodeUpdate::new().with_config(serde_json::json!({
                "chunkSize": 100,
                "chunkOverlap": 100,
            })),
        )
        .unwrap();

    let issues = config_issues(store.workflow());
    let keys: Vec<(&str, &str)> = issues
        .iter()
        .map(|i| (i.node_id.as_str(), i.issue.field))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("kb1", "chunkOverlap"),
            ("llm1", "maxTokens"),
            ("llm1", "temperature"),
        ]
    );

    // Advisory findings never flip the structural verdict.
    assert!(validate(store.workflow()).valid);
}

#[test]
fn test_validation_is_stable_across_repeated_runs() {
    let mut store = WorkflowStore::create("wf-1", "stable");
    store.add_node(node("q1", ComponentType::UserQuery)).unwrap();
    store.add_node(node("o1", ComponentType::Output)).unwrap();
    store.add_edge(Edge::new("e1", "q1", "o1")).unwrap();

    let first = validate(store.workflow());
    let second = validate(store.workflow());
    assert_eq!(first, second);
}

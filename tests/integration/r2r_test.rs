use oxigraph::model::*;
use rsp_core::engine::{Dag, QueryOperator, RelationToRelationOperator};
use rsp_core::rdf::{OxigraphEvaluator, QuadContainer, UnionOperator};

fn quad(subject: &str, predicate: &str, object: &str) -> Quad {
    Quad::new(
        NamedNode::new(format!("http://example.org/{}", subject)).unwrap(),
        NamedNode::new(format!("http://example.org/{}", predicate)).unwrap(),
        Literal::new_simple_literal(object),
        GraphName::DefaultGraph,
    )
}

#[test]
fn test_r2r_basic_query() {
    let op = QueryOperator::new(
        "q",
        vec!["w".into()],
        "SELECT ?s ?p ?o WHERE { ?s ?p ?o . }",
        OxigraphEvaluator::new(),
    );
    let mut container = QuadContainer::default();
    container.add(quad("subject1", "predicate1", "object1"), 1000);

    let result = op.eval(&[&container]).unwrap();
    assert_eq!(result.bindings.len(), 1);
    assert_eq!(result.last_timestamp_changed, 1000);
    assert_eq!(op.query(), "SELECT ?s ?p ?o WHERE { ?s ?p ?o . }");
}

#[test]
fn test_r2r_with_static_data() {
    let evaluator = OxigraphEvaluator::new();
    let op = QueryOperator::new(
        "q",
        vec!["w".into()],
        "PREFIX ex: <http://example.org/> SELECT ?sensor ?location WHERE { ?sensor ex:location ?location . }",
        evaluator.clone(),
    );
    // Static data added through a clone reaches the operator.
    evaluator.add_static_data(quad("sensor1", "location", "Room A"));

    let result = op.eval(&[&QuadContainer::default()]).unwrap();
    assert_eq!(result.bindings.len(), 1);
    assert_eq!(op.evaluator().static_data_size(), 1);
}

#[test]
fn test_query_over_union_chain() {
    let operators: Vec<Box<dyn RelationToRelationOperator<QuadContainer>>> = vec![
        Box::new(QueryOperator::new(
            "q",
            vec!["u2".into()],
            "SELECT ?s WHERE { ?s ?p ?o }",
            OxigraphEvaluator::new(),
        )),
        Box::new(UnionOperator::new("u2", "u1", "w3")),
        Box::new(UnionOperator::new("u1", "w1", "w2")),
    ];
    let windows = vec!["w1".to_string(), "w2".to_string(), "w3".to_string()];
    let dag = Dag::build(&windows, operators, None).unwrap();
    assert_eq!(dag.sink_name(), "q");
    assert_eq!(dag.evaluation_order(), vec!["w1", "w2", "w3", "u1", "u2", "q"]);

    let inputs = [
        QuadContainer::from_quads([quad("a", "p", "1")], 1),
        QuadContainer::from_quads([quad("b", "p", "2")], 2),
        QuadContainer::from_quads([quad("a", "p", "1"), quad("c", "p", "3")], 3),
    ];
    let result = dag
        .evaluate(|slot| inputs[slot].clone(), |err| panic!("unexpected failure: {}", err))
        .unwrap();
    assert_eq!(result.bindings.len(), 3);
}

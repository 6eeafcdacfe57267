use oxigraph::model::*;
use oxigraph::sparql::QueryResults;
use rsp_core::engine::QueryEvaluator;
use rsp_core::rdf::{OxigraphEvaluator, QuadContainer};

fn temperature(graph: GraphName) -> Quad {
    Quad::new(
        NamedNode::new("http://example.org/sensor1").unwrap(),
        NamedNode::new("http://example.org/temperature").unwrap(),
        Literal::new_typed_literal(
            "21",
            NamedNode::new("http://www.w3.org/2001/XMLSchema#integer").unwrap(),
        ),
        graph,
    )
}

#[test]
fn test_oxigraph_basic_query() {
    let container = QuadContainer::from_quads([temperature(GraphName::DefaultGraph)], 0);
    let evaluator = OxigraphEvaluator::new();
    let results = evaluator
        .execute("SELECT ?s ?p ?o WHERE { ?s ?p ?o . }", &[&container])
        .unwrap();
    match results {
        QueryResults::Solutions(solutions) => assert_eq!(solutions.count(), 1),
        _ => panic!("Expected Solutions result"),
    }
}

#[test]
fn test_oxigraph_named_graph_query() {
    let graph = GraphName::NamedNode(NamedNode::new("http://example.org/tempWindow").unwrap());
    let container = QuadContainer::from_quads([temperature(graph)], 0);
    let query = r#"
        PREFIX ex: <http://example.org/>
        SELECT ?sensor ?temperature
        WHERE {
            GRAPH ex:tempWindow {
                ?sensor ex:temperature ?temperature .
            }
        }
    "#;
    let evaluator = OxigraphEvaluator::new();
    let relation = evaluator.evaluate(query, &[&container]).unwrap();
    assert_eq!(relation.bindings.len(), 1);

    // The default graph does not see named-graph quads.
    let relation = evaluator
        .evaluate("SELECT ?s WHERE { ?s ?p ?o }", &[&container])
        .unwrap();
    assert!(relation.bindings.is_empty());
}

#[test]
fn test_ask_becomes_a_result_binding() {
    let container = QuadContainer::from_quads([temperature(GraphName::DefaultGraph)], 0);
    let relation = OxigraphEvaluator::new()
        .evaluate("ASK { ?s ?p ?o }", &[&container])
        .unwrap();
    assert_eq!(
        relation.bindings[0].get("result"),
        Some(&Term::from(Literal::from(true)))
    );
}

#[test]
fn test_operands_are_merged_into_one_store() {
    let a = QuadContainer::from_quads([temperature(GraphName::DefaultGraph)], 10);
    let b = QuadContainer::from_quads(
        [Quad::new(
            NamedNode::new("http://example.org/sensor1").unwrap(),
            NamedNode::new("http://example.org/location").unwrap(),
            Literal::new_simple_literal("Room A"),
            GraphName::DefaultGraph,
        )],
        20,
    );
    let relation = OxigraphEvaluator::new()
        .evaluate(
            "PREFIX ex: <http://example.org/> SELECT ?room WHERE { ?s ex:temperature ?t ; ex:location ?room }",
            &[&a, &b],
        )
        .unwrap();
    assert_eq!(relation.bindings.len(), 1);
    assert_eq!(relation.last_timestamp_changed, 20);
}

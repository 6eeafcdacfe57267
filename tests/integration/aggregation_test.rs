use oxigraph::model::*;
use rsp_core::engine::{QueryOperator, RStream, Task};
use rsp_core::rdf::{Binding, OxigraphEvaluator, QuadContainer, window_content_factory};
use rsp_core::{CSPARQLWindow, Clock, Emitted, Report};

const WINDOW: &str = "http://example.org/tempWindow";

fn reading(sensor: &str, value: i64) -> QuadContainer {
    QuadContainer::from_quads(
        [Quad::new(
            NamedNode::new(format!("http://example.org/{}", sensor)).unwrap(),
            NamedNode::new("http://example.org/temperature").unwrap(),
            Literal::new_typed_literal(
                value.to_string(),
                NamedNode::new("http://www.w3.org/2001/XMLSchema#integer").unwrap(),
            ),
            GraphName::DefaultGraph,
        )],
        0,
    )
}

/// Runs `select` over a 5000/1000 window fed with `readings`, then pushes a
/// dummy element at `trigger` and returns everything emitted.
fn aggregate(select: &str, readings: &[(i64, &str, i64)], trigger: i64) -> Vec<Emitted<Binding>> {
    let query = format!(
        "PREFIX ex: <http://example.org/>\n{}",
        select.replace("WINDOW_GRAPH", &format!("<{}>", WINDOW))
    );
    let mut task: Task<QuadContainer, QuadContainer, Binding> =
        Task::new("aggregation", Clock::tuple_driven(0));
    task.add_s2r(
        CSPARQLWindow::new(WINDOW, 5000, 1000, window_content_factory(WINDOW), Report::on_window_close())
            .unwrap(),
        "temperatures",
    )
    .unwrap();
    task.add_r2r(QueryOperator::new("agg", vec![WINDOW.into()], query, OxigraphEvaluator::new()))
        .unwrap();
    task.add_r2s(RStream::new(|c: &QuadContainer| c.bindings.clone()))
        .unwrap();
    task.initialize().unwrap();

    let mut emitted = Vec::new();
    for (ts, sensor, value) in readings {
        emitted.extend(task.process("temperatures", &reading(sensor, *value), (*ts).into()).unwrap());
    }
    emitted.extend(task.process("temperatures", &QuadContainer::default(), trigger.into()).unwrap());
    emitted
}

fn number(binding: &Binding, var: &str) -> f64 {
    match binding.get(var) {
        Some(Term::Literal(l)) => l.value().parse().unwrap(),
        other => panic!("{} is not a literal: {:?}", var, other),
    }
}

fn last_cycle(emitted: &[Emitted<Binding>]) -> Vec<&Binding> {
    let last = emitted.last().unwrap().timestamp;
    emitted
        .iter()
        .filter(|e| e.timestamp == last)
        .map(|e| &e.element)
        .collect()
}

const READINGS: [(i64, &str, i64); 3] = [(1000, "sensor1", 21), (2000, "sensor1", 22), (3000, "sensor1", 23)];

#[test]
fn test_count_aggregation() {
    let emitted = aggregate(
        "SELECT (COUNT(?t) AS ?count) WHERE { GRAPH WINDOW_GRAPH { ?s ex:temperature ?t } }",
        &READINGS,
        6000,
    );
    let counts: Vec<f64> = emitted.iter().map(|e| number(&e.element, "count")).collect();
    // Closes at 2000, 3000, 4000, 5000 and 6000.
    assert_eq!(counts, vec![1.0, 2.0, 3.0, 3.0, 3.0]);
    assert_eq!(emitted.last().unwrap().timestamp.value(), 6000);
}

#[test]
fn test_avg_aggregation() {
    let emitted = aggregate(
        "SELECT (AVG(?t) AS ?avg) WHERE { GRAPH WINDOW_GRAPH { ?s ex:temperature ?t } }",
        &READINGS,
        6000,
    );
    assert_eq!(number(last_cycle(&emitted)[0], "avg"), 22.0);
}

#[test]
fn test_min_max_aggregation() {
    let emitted = aggregate(
        "SELECT (MIN(?t) AS ?min) (MAX(?t) AS ?max) WHERE { GRAPH WINDOW_GRAPH { ?s ex:temperature ?t } }",
        &READINGS,
        6000,
    );
    let binding = last_cycle(&emitted)[0];
    assert_eq!(number(binding, "min"), 21.0);
    assert_eq!(number(binding, "max"), 23.0);
}

#[test]
fn test_sum_aggregation() {
    let emitted = aggregate(
        "SELECT (SUM(?t) AS ?sum) WHERE { GRAPH WINDOW_GRAPH { ?s ex:temperature ?t } }",
        &READINGS,
        6000,
    );
    assert_eq!(number(last_cycle(&emitted)[0], "sum"), 66.0);
}

#[test]
fn test_group_by_aggregation() {
    let emitted = aggregate(
        "SELECT ?s (COUNT(?t) AS ?count) WHERE { GRAPH WINDOW_GRAPH { ?s ex:temperature ?t } } GROUP BY ?s",
        &[
            (1000, "sensor1", 20),
            (1500, "sensor2", 30),
            (2000, "sensor1", 21),
            (2500, "sensor2", 31),
            (3000, "sensor1", 22),
        ],
        6000,
    );
    let mut groups: Vec<(String, f64)> = last_cycle(&emitted)
        .into_iter()
        .map(|b| (b["s"].to_string(), number(b, "count")))
        .collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        groups,
        vec![
            ("<http://example.org/sensor1>".to_string(), 3.0),
            ("<http://example.org/sensor2>".to_string(), 2.0),
        ]
    );
}

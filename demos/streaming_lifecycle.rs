//! Streaming lifecycle of an RSP-QL query.
//!
//! Window closure is driven by event timestamps, not wall-clock time: the
//! timestamps passed to `add_quads` decide when windows close, and
//! `close_stream` flushes whatever is still open at the end.
//!
//! Run with `RUST_LOG=rsp_core=debug` to see windows open, report and evict.

use oxigraph::model::*;
use rsp_core::RSPEngine;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // A 10-second window, sliding every 2 seconds
    let query = r#"
        PREFIX ex: <https://rsp.rs/>
        REGISTER RStream <output> AS
        SELECT ?s (COUNT(?o) AS ?readings)
        FROM NAMED WINDOW ex:w1 ON STREAM ex:stream1 [RANGE 10000 STEP 2000]
        WHERE {
            WINDOW ex:w1 { ?s ?p ?o }
        }
        GROUP BY ?s
    "#;

    let mut engine = RSPEngine::new(query)?;
    engine.initialize()?;
    let stream = engine
        .get_stream("https://rsp.rs/stream1")
        .ok_or("stream1 is declared by the query")?;
    println!("Stream obtained: {}", stream.name());

    let results = engine.start_processing();
    let collector = thread::spawn(move || {
        let mut count = 0;
        while let Some(result) = results.recv_timeout(Duration::from_millis(500)) {
            count += 1;
            println!(
                "Result #{}: window [{}, {}) {}",
                count, result.timestamp_from, result.timestamp_to, result.bindings
            );
        }
        count
    });

    for i in 0..20i64 {
        let quad = Quad::new(
            NamedNode::new(format!("https://rsp.rs/sensor{}", i % 3))?,
            NamedNode::new("https://rsp.rs/reading")?,
            Literal::new_simple_literal(format!("{}", 20 + i)),
            GraphName::DefaultGraph,
        );
        stream.add_quads(vec![quad], i * 1000)?;
        if let Some(stats) = engine.get_window_stats("https://rsp.rs/w1") {
            println!(
                "t={:>5}  active instances: {}  reports so far: {}",
                i * 1000,
                stats.active_instances,
                stats.reports_emitted
            );
        }
        thread::sleep(Duration::from_millis(50));
    }

    // Flush every window ending by t=30000
    engine.close_stream("https://rsp.rs/stream1", 30_000)?;

    let count = collector.join().map_err(|_| "collector panicked")?;
    println!("Received {} results", count);
    Ok(())
}

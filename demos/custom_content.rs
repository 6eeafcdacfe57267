//! A generic continuous program with user-defined window content.
//!
//! A generator source emits a temperature reading every 400 logical
//! milliseconds. Two tasks read the same stream: one keeps a running
//! maximum without storing readings, the other stores only readings above a
//! threshold.

use rsp_core::content::{
    ContentAlgebra, ContentFactory, FilterContentFactory, IncrementalContentFactory,
};
use rsp_core::engine::{RStream, Task};
use rsp_core::{
    CSPARQLWindow, Clock, ContinuousProgram, DataStream, GeneratorSource, Report,
    TimeInstant,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    sensor: u32,
    celsius: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let clock = Clock::tuple_driven(0);
    let mut program: ContinuousProgram<Reading, Vec<Reading>, String> =
        ContinuousProgram::new(clock.clone());
    let readings = DataStream::new("readings")?;

    let peak = ContentAlgebra::identity_storage(
        |r: &Reading| vec![r.clone()],
        |a: Vec<Reading>, b: Vec<Reading>| {
            a.into_iter()
                .chain(b)
                .max_by(|x, y| x.celsius.total_cmp(&y.celsius))
                .into_iter()
                .collect()
        },
        Vec::new(),
    );
    let peak: Arc<dyn ContentFactory<Reading, Reading, Vec<Reading>>> =
        Arc::new(IncrementalContentFactory::new(peak));
    let mut peak_task: Task<Reading, Vec<Reading>, String> = Task::new("peak", clock.clone());
    peak_task
        .add_s2r(
            CSPARQLWindow::tumbling(
                "peak-2s",
                2000,
                peak,
                Report::on_window_close(),
            )?,
            "readings",
        )?
        .add_r2s(RStream::new(|max: &Vec<Reading>| {
            max.iter()
                .map(|r| format!("peak {:.1}C from sensor {}", r.celsius, r.sensor))
                .collect()
        }))?;
    peak_task.initialize()?;

    let all = ContentAlgebra::identity_storage(
        |r: &Reading| vec![r.clone()],
        |mut a: Vec<Reading>, b: Vec<Reading>| {
            a.extend(b);
            a
        },
        Vec::new(),
    );
    let hot: Arc<dyn ContentFactory<Reading, Reading, Vec<Reading>>> =
        Arc::new(FilterContentFactory::new(all, |r: &Reading| r.celsius > 24.0));
    let mut hot_task: Task<Reading, Vec<Reading>, String> = Task::new("hot", clock.clone());
    hot_task
        .add_s2r(
            CSPARQLWindow::new(
                "hot-4s",
                4000,
                2000,
                hot,
                Report::on_window_close(),
            )?,
            "readings",
        )?
        .add_r2s(RStream::new(|hot: &Vec<Reading>| {
            vec![format!("{} hot readings", hot.len())]
        }))?;
    hot_task.initialize()?;

    program.build_task(peak_task, &[readings.clone()], vec![DataStream::new("peaks")?])?;
    program.build_task(hot_task, &[readings.clone()], vec![DataStream::new("hot")?])?;
    let peaks = program.subscribe_output("peaks")?;
    let hot_readings = program.subscribe_output("hot")?;

    program.register_source(GeneratorSource::new(
        readings,
        400,
        Duration::from_millis(20),
        |t: TimeInstant| {
            let step = t.value() / 400;
            vec![Reading {
                sensor: (step % 3) as u32,
                celsius: 20.0 + (step % 11) as f64 * 0.8,
            }]
        },
    ));
    program.start_sources()?;

    for _ in 0..5 {
        if let Some((line, at)) = peaks.recv_timeout(Duration::from_secs(2)) {
            println!("[{}] {}", at, line);
        }
        for (line, at) in hot_readings.try_iter() {
            println!("[{}] {}", at, line);
        }
    }

    program.stop();
    Ok(())
}

use crate::vec_factory;
use rsp_core::engine::{BinaryOperator, RStream, Task};
use rsp_core::{
    CSPARQLWindow, Clock, ContinuousProgram, DataStream, GeneratorSource, OverflowPolicy,
    ProgramConfig, Report, TimeInstant,
};
use std::time::Duration;

type VecProgram = ContinuousProgram<u32, Vec<u32>, Vec<u32>>;

fn tumbling_task(name: &str, clock: &Clock, width: i64) -> Task<u32, Vec<u32>, Vec<u32>> {
    let mut task = Task::new(name, clock.clone());
    task.add_s2r(
        CSPARQLWindow::tumbling(format!("{}-window", name), width, vec_factory(), Report::on_window_close())
            .unwrap(),
        "input",
    )
    .unwrap()
    .add_r2s(RStream::new(|r: &Vec<u32>| vec![r.clone()]))
    .unwrap();
    task.initialize().unwrap();
    task
}

#[test]
fn test_tick_driven_clock_closes_windows() {
    let clock = Clock::tick_driven(0, 500, Duration::from_secs(3600)).unwrap();
    let mut program: VecProgram = ContinuousProgram::new(clock.clone());
    let input = DataStream::new("input").unwrap();
    let output = DataStream::new("output").unwrap();
    program
        .build_task(tumbling_task("t", &clock, 1000), &[input.clone()], vec![output])
        .unwrap();
    let sub = program.subscribe_output("output").unwrap();

    input.put(1, 100).unwrap();
    input.put(2, 600).unwrap();
    // Elements do not move a tick-driven clock.
    assert_eq!(clock.now(), TimeInstant::new(0));
    assert!(sub.try_recv().is_none());

    assert_eq!(clock.tick().unwrap(), TimeInstant::new(500));
    assert!(sub.try_recv().is_none());
    clock.tick().unwrap();
    assert_eq!(sub.try_recv(), Some((vec![1, 2], TimeInstant::new(1000))));
}

#[test]
fn test_drop_oldest_keeps_the_latest_results() {
    let config = ProgramConfig::from_json_str(
        r#"{ "output": { "capacity": 2, "policy": "drop_oldest" } }"#,
    )
    .unwrap();
    let mut program: VecProgram = ContinuousProgram::from_config(&config).unwrap();
    let clock = program.clock().clone();
    let input = DataStream::new("input").unwrap();
    program
        .build_task(
            tumbling_task("t", &clock, 10),
            &[input.clone()],
            vec![DataStream::new("output").unwrap()],
        )
        .unwrap();
    assert_eq!(program.output_config().policy, OverflowPolicy::DropOldest);
    let sub = program.subscribe_output("output").unwrap();

    for i in 0..5u32 {
        input.put(i, i64::from(i) * 10).unwrap();
    }
    let kept: Vec<_> = sub.try_iter().collect();
    assert_eq!(
        kept,
        vec![
            (vec![2], TimeInstant::new(30)),
            (vec![3], TimeInstant::new(40)),
        ]
    );
    assert_eq!(sub.dropped(), 2);
}

#[test]
fn test_tasks_on_one_stream_see_the_same_elements() {
    let clock = Clock::tuple_driven(0);
    let mut program: VecProgram = ContinuousProgram::new(clock.clone());
    let input = DataStream::new("input").unwrap();
    program
        .build_task(
            tumbling_task("narrow", &clock, 100),
            &[input.clone()],
            vec![DataStream::new("narrow-out").unwrap()],
        )
        .unwrap();
    program
        .build_task(
            tumbling_task("wide", &clock, 1000),
            &[input.clone()],
            vec![DataStream::new("wide-out").unwrap()],
        )
        .unwrap();
    let narrow = program.subscribe_output("narrow-out").unwrap();
    let wide = program.subscribe_output("wide-out").unwrap();

    input.put(1, 50).unwrap();
    input.put(2, 150).unwrap();
    program.advance_time(1000).unwrap();

    let narrow: Vec<_> = narrow.try_iter().map(|(r, _)| r).collect();
    assert_eq!(narrow, vec![vec![1], vec![2]]);
    assert_eq!(wide.try_recv(), Some((vec![1, 2], TimeInstant::new(1000))));
    assert_eq!(
        program.window_stats("wide", "wide-window").unwrap().elements_routed,
        2
    );
}

#[test]
fn test_generator_source_feeds_the_program() {
    let clock = Clock::tuple_driven(0);
    let mut program: VecProgram = ContinuousProgram::new(clock.clone());
    let input = DataStream::new("input").unwrap();
    program
        .build_task(
            tumbling_task("t", &clock, 1000),
            &[input.clone()],
            vec![DataStream::new("output").unwrap()],
        )
        .unwrap();
    let sub = program.subscribe_output("output").unwrap();

    program.register_source(GeneratorSource::new(
        input,
        400,
        Duration::from_millis(5),
        |t: TimeInstant| vec![t.value() as u32],
    ));
    program.start_sources().unwrap();

    let first = sub.recv_timeout(Duration::from_secs(5));
    program.stop();
    assert_eq!(first, Some((vec![0, 400, 800], TimeInstant::new(1000))));
}

fn union_task(clock: &Clock) -> Task<u32, Vec<u32>, Vec<u32>> {
    let mut task = Task::new("union", clock.clone());
    task.add_s2r(
        CSPARQLWindow::tumbling("wa", 1000, vec_factory(), Report::on_window_close()).unwrap(),
        "a",
    )
    .unwrap()
    .add_s2r(
        CSPARQLWindow::tumbling("wb", 1000, vec_factory(), Report::on_window_close()).unwrap(),
        "b",
    )
    .unwrap()
    .add_r2r(BinaryOperator::new("both", "wa", "wb", |x: &Vec<u32>, y: &Vec<u32>| {
        let mut out = x.clone();
        out.extend(y);
        out.sort_unstable();
        out
    }))
    .unwrap()
    .add_r2s(RStream::new(|r: &Vec<u32>| vec![r.clone()]))
    .unwrap();
    task.initialize().unwrap();
    task
}

#[test]
fn test_out_of_order_streams_keep_their_elements() {
    let clock = Clock::tuple_driven(0);
    let mut program: VecProgram = ContinuousProgram::new(clock.clone());
    let a = DataStream::new("a").unwrap();
    let b = DataStream::new("b").unwrap();
    program
        .build_task(union_task(&clock), &[a.clone(), b.clone()], vec![DataStream::new("output").unwrap()])
        .unwrap();
    let sub = program.subscribe_output("output").unwrap();

    a.put(1, 500).unwrap();
    // behind the clock, but [0,1000) of wb has not closed yet
    b.put(2, 450).unwrap();
    program.advance_time(1000).unwrap();

    assert_eq!(sub.try_recv(), Some((vec![1, 2], TimeInstant::new(1000))));
    assert_eq!(program.window_stats("union", "wb").unwrap().late_drops, 0);

    // every instance of wb holding 900 is closed by now
    b.put(3, 900).unwrap();
    assert_eq!(program.window_stats("union", "wb").unwrap().late_drops, 1);
}

#[test]
fn test_element_after_tick_opens_its_window() {
    let clock = Clock::tick_driven(0, 500, Duration::from_secs(3600)).unwrap();
    let mut program: VecProgram = ContinuousProgram::new(clock.clone());
    let input = DataStream::new("input").unwrap();
    program
        .build_task(
            tumbling_task("t", &clock, 1000),
            &[input.clone()],
            vec![DataStream::new("output").unwrap()],
        )
        .unwrap();
    let sub = program.subscribe_output("output").unwrap();

    clock.tick().unwrap();
    input.put(7, 300).unwrap();
    assert_eq!(program.window_stats("t", "t-window").unwrap().late_drops, 0);
    clock.tick().unwrap();
    assert_eq!(sub.try_recv(), Some((vec![7], TimeInstant::new(1000))));
}

#[test]
fn test_tick_driven_elements_do_not_close_windows() {
    let clock = Clock::tick_driven(0, 1000, Duration::from_secs(3600)).unwrap();
    let mut program: VecProgram = ContinuousProgram::new(clock.clone());
    let input = DataStream::new("input").unwrap();
    program
        .build_task(
            tumbling_task("t", &clock, 1000),
            &[input.clone()],
            vec![DataStream::new("output").unwrap()],
        )
        .unwrap();
    let sub = program.subscribe_output("output").unwrap();

    input.put(1, 100).unwrap();
    input.put(2, 1200).unwrap();
    assert!(sub.try_recv().is_none(), "an element ahead of the clock closed a window");

    clock.tick().unwrap();
    assert_eq!(sub.try_recv(), Some((vec![1], TimeInstant::new(1000))));
    clock.tick().unwrap();
    assert_eq!(sub.try_recv(), Some((vec![2], TimeInstant::new(2000))));
}

#[test]
fn test_chained_tasks_share_the_clock() {
    type ChainProgram = ContinuousProgram<u32, Vec<u32>, u32>;
    fn stage(name: &str, clock: &Clock, stream: &str) -> Task<u32, Vec<u32>, u32> {
        let mut task = Task::new(name, clock.clone());
        task.add_s2r(
            CSPARQLWindow::tumbling(format!("{}-window", name), 100, vec_factory(), Report::on_window_close())
                .unwrap(),
            stream,
        )
        .unwrap()
        .add_r2s(RStream::new(|r: &Vec<u32>| r.clone()))
        .unwrap();
        task.initialize().unwrap();
        task
    }

    let clock = Clock::tuple_driven(0);
    let mut program: ChainProgram = ContinuousProgram::new(clock.clone());
    let src = DataStream::new("src").unwrap();
    let mid = DataStream::new("mid").unwrap();
    let out = DataStream::new("out").unwrap();
    program
        .build_task(stage("first", &clock, "src"), &[src.clone()], vec![mid.clone()])
        .unwrap();
    program
        .build_task(stage("second", &clock, "mid"), &[mid], vec![out])
        .unwrap();
    let sub = program.subscribe_output("out").unwrap();

    src.put(1, 10).unwrap();
    src.put(2, 150).unwrap();
    program.advance_time(300).unwrap();

    assert_eq!(
        sub.try_iter().collect::<Vec<_>>(),
        vec![(1, TimeInstant::new(200)), (2, TimeInstant::new(300))]
    );
}

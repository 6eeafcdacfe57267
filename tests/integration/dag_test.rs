use crate::vec_factory;
use rsp_core::engine::{BinaryOperator, RStream, Task, UnaryOperator};
use rsp_core::{CSPARQLWindow, Clock, ConfigError, Report, RspError, TimeInstant};
use std::sync::{Arc, Mutex};

type VecTask = Task<u32, Vec<u32>, Vec<u32>>;

fn task_with_window() -> VecTask {
    let mut task = Task::new("t", Clock::tuple_driven(0));
    task.add_s2r(
        CSPARQLWindow::tumbling("w", 1000, vec_factory(), Report::on_window_close()).unwrap(),
        "s",
    )
    .unwrap();
    task
}

fn identity(result: &str, operand: &str) -> UnaryOperator<Vec<u32>> {
    UnaryOperator::new(result, operand, |r: &Vec<u32>| r.clone())
}

#[test]
fn test_cycle_is_rejected_with_its_members() {
    let mut task = task_with_window();
    task.add_r2r(BinaryOperator::new("a", "w", "c", |l: &Vec<u32>, _: &Vec<u32>| l.clone()))
        .unwrap()
        .add_r2r(identity("b", "a"))
        .unwrap()
        .add_r2r(identity("c", "b"))
        .unwrap()
        .add_r2s(RStream::new(|r: &Vec<u32>| vec![r.clone()]).consuming("c"))
        .unwrap();
    assert_eq!(
        task.initialize(),
        Err(RspError::Configuration(ConfigError::Cycle(vec![
            "a".into(),
            "b".into(),
            "c".into()
        ])))
    );
}

#[test]
fn test_operand_order_is_preserved() {
    let mut task = Task::new("t", Clock::tuple_driven(0));
    task.add_s2r(
        CSPARQLWindow::tumbling("big", 1000, vec_factory(), Report::on_window_close()).unwrap(),
        "s",
    )
    .unwrap()
    .add_s2r(
        CSPARQLWindow::tumbling("small", 1000, vec_factory(), Report::on_window_close()).unwrap(),
        "s",
    )
    .unwrap()
    // Declared in the order the DAG sees them last.
    .add_r2r(BinaryOperator::new("minus", "big", "small", |l: &Vec<u32>, r: &Vec<u32>| {
        vec![l.iter().sum::<u32>() * 10 - r.iter().sum::<u32>()]
    }))
    .unwrap()
    .add_r2s(RStream::new(|r: &Vec<u32>| r.clone()))
    .unwrap();
    task.initialize().unwrap();

    task.process("s", &3, TimeInstant::new(10)).unwrap();
    let out = task.process("s", &0, TimeInstant::new(1000)).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].element, 27);
}

#[test]
fn test_failure_skips_downstream_and_reaches_the_hook() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);

    let mut task = task_with_window();
    task.add_r2r(UnaryOperator::fallible("checked", "w", |r: &Vec<u32>| {
        if r.contains(&13) {
            Err("unlucky".to_string())
        } else {
            Ok(r.clone())
        }
    }))
    .unwrap()
    .add_r2r(identity("after", "checked"))
    .unwrap()
    .add_r2s(RStream::new(|r: &Vec<u32>| vec![r.clone()]))
    .unwrap();
    task.set_error_hook(move |err| sink.lock().unwrap().push(err.clone()));
    task.initialize().unwrap();

    task.process("s", &13, TimeInstant::new(0)).unwrap();
    let out = task.process("s", &1, TimeInstant::new(1000)).unwrap();
    assert!(out.is_empty());
    let out = task.process("s", &2, TimeInstant::new(2000)).unwrap();
    assert_eq!(out[0].element, vec![1]);

    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(matches!(&failures[0], RspError::Evaluation(e) if e.operator == "checked"));
}

#[test]
fn test_task_lifecycle_errors() {
    let mut task = task_with_window();
    assert!(matches!(
        task.process("s", &1, TimeInstant::new(0)),
        Err(RspError::NotInitialized { .. })
    ));
    assert!(matches!(
        task.initialize(),
        Err(RspError::Configuration(ConfigError::MissingSink(_)))
    ));

    task.add_r2s(RStream::new(|r: &Vec<u32>| vec![r.clone()]))
        .unwrap();
    task.initialize().unwrap();
    assert!(matches!(
        task.add_r2r(identity("late", "w")),
        Err(RspError::AlreadyInitialized { .. })
    ));

    task.stop();
    assert!(matches!(
        task.on_time(TimeInstant::new(5000)),
        Err(RspError::TaskStopped { .. })
    ));
}

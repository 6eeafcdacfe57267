use super::dag::Dag;
use super::r2r::RelationToRelationOperator;
use super::r2s::RelationToStreamOperator;
use crate::config::WindowConfig;
use crate::content::ContentFactory;
use crate::error::{ConfigError, Result, RspError};
use crate::naming::validate_name;
use crate::time::{Clock, TimeInstant};
use crate::windowing::{StreamToRelationOperator, WindowReport, WindowStats};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Built,
    Initialized,
    Running,
    Stopped,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Built => "built",
            TaskState::Initialized => "initialized",
            TaskState::Running => "running",
            TaskState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// An output element with the time of the report cycle that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted<O> {
    pub element: O,
    pub timestamp: TimeInstant,
}

struct WindowBinding<I, R> {
    stream: String,
    operator: Box<dyn StreamToRelationOperator<I, R>>,
}

type ErrorHook = Box<dyn Fn(&RspError) + Send>;

/// One standing query: window operators bound to input streams, an operator
/// DAG over their outputs, and the R2S operator at its end.
pub struct Task<I, R, O> {
    name: String,
    clock: Clock,
    state: TaskState,
    windows: Vec<WindowBinding<I, R>>,
    operators: Vec<Box<dyn RelationToRelationOperator<R>>>,
    dag: Option<Dag<R>>,
    r2s: Option<Box<dyn RelationToStreamOperator<R, O>>>,
    error_hook: Option<ErrorHook>,
}

impl<I, R, O> Task<I, R, O> {
    pub fn new(name: impl Into<String>, clock: Clock) -> Self {
        Self {
            name: name.into(),
            clock,
            state: TaskState::Built,
            windows: Vec::new(),
            operators: Vec::new(),
            dag: None,
            r2s: None,
            error_hook: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    fn ensure_building(&self) -> Result<()> {
        if self.state == TaskState::Built {
            Ok(())
        } else {
            Err(RspError::AlreadyInitialized {
                task: self.name.clone(),
            })
        }
    }

    fn ensure_live(&self) -> Result<()> {
        match self.state {
            TaskState::Built => Err(RspError::NotInitialized {
                task: self.name.clone(),
            }),
            TaskState::Stopped => Err(RspError::TaskStopped {
                task: self.name.clone(),
            }),
            TaskState::Initialized | TaskState::Running => Ok(()),
        }
    }

    /// Binds a window operator to the stream it reads. One stream may feed
    /// several windows.
    pub fn add_s2r<S>(&mut self, operator: S, stream: impl Into<String>) -> Result<&mut Self>
    where
        S: StreamToRelationOperator<I, R> + 'static,
    {
        self.ensure_building()?;
        let stream = stream.into();
        validate_name(&stream)?;
        self.windows.push(WindowBinding {
            stream,
            operator: Box::new(operator),
        });
        Ok(self)
    }

    pub fn add_r2r<P>(&mut self, operator: P) -> Result<&mut Self>
    where
        P: RelationToRelationOperator<R> + 'static,
    {
        self.ensure_building()?;
        self.operators.push(Box::new(operator));
        Ok(self)
    }

    /// Sets the output operator, replacing any earlier one.
    pub fn add_r2s<P>(&mut self, operator: P) -> Result<&mut Self>
    where
        P: RelationToStreamOperator<R, O> + 'static,
    {
        self.ensure_building()?;
        self.r2s = Some(Box::new(operator));
        Ok(self)
    }

    /// Receives every evaluation failure. Without a hook failures are only
    /// logged.
    pub fn set_error_hook<F>(&mut self, hook: F)
    where
        F: Fn(&RspError) + Send + 'static,
    {
        self.error_hook = Some(Box::new(hook));
    }

    /// Validates the operator graph. After this the graph is fixed.
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_building()?;
        validate_name(&self.name)?;
        let Some(r2s) = &self.r2s else {
            return Err(ConfigError::MissingSink(self.name.clone()).into());
        };
        let window_names: Vec<String> = self
            .windows
            .iter()
            .map(|binding| binding.operator.name().to_string())
            .collect();
        let operators = std::mem::take(&mut self.operators);
        let dag = Dag::build(&window_names, operators, r2s.operand())?;
        log::debug!(
            "Task {} initialized: {} windows, sink '{}'",
            self.name,
            window_names.len(),
            dag.sink_name()
        );
        self.dag = Some(dag);
        self.state = TaskState::Initialized;
        Ok(())
    }

    /// Stops the task. Later calls to [`process`](Self::process) and
    /// [`on_time`](Self::on_time) fail with [`RspError::TaskStopped`].
    pub fn stop(&mut self) {
        if self.state != TaskState::Stopped {
            log::debug!("Task {} stopped", self.name);
            self.state = TaskState::Stopped;
        }
    }

    /// Names of the streams this task reads, without duplicates.
    pub fn input_streams(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .windows
            .iter()
            .map(|binding| binding.stream.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Each window name with the stream it reads.
    pub fn window_bindings(&self) -> Vec<(&str, &str)> {
        self.windows
            .iter()
            .map(|binding| (binding.operator.name(), binding.stream.as_str()))
            .collect()
    }

    pub fn reads(&self, stream: &str) -> bool {
        self.windows.iter().any(|binding| binding.stream == stream)
    }

    pub fn window_stats(&self, window: &str) -> Option<WindowStats> {
        self.windows
            .iter()
            .find(|binding| binding.operator.name() == window)
            .map(|binding| binding.operator.stats())
    }

    pub fn active_window_ranges(&self, window: &str) -> Option<Vec<(TimeInstant, TimeInstant)>> {
        self.windows
            .iter()
            .find(|binding| binding.operator.name() == window)
            .map(|binding| binding.operator.active_window_ranges())
    }

    /// Routes one element of `stream` to the windows bound to it and runs the
    /// report cycles it triggered.
    ///
    /// Under a tuple-driven clock the element's timestamp moves the windows
    /// forward. Under a tick-driven clock only the clock closes instances;
    /// the element is placed by its timestamp and nothing more.
    pub fn process(&mut self, stream: &str, element: &I, timestamp: TimeInstant) -> Result<Vec<Emitted<O>>> {
        self.ensure_live()?;
        self.state = TaskState::Running;
        let tuple_driven = self.clock.is_tuple_driven();
        let now = self.clock.now();
        let mut reports = Vec::new();
        for binding in self.windows.iter_mut().filter(|b| b.stream == stream) {
            log::trace!("Task {} routing element at {} to {}", self.name, timestamp, binding.operator.name());
            if tuple_driven {
                reports.extend(binding.operator.compute(element, timestamp));
            } else {
                reports.extend(binding.operator.insert(element, timestamp, now));
            }
        }
        Ok(self.run_cycles(reports))
    }

    /// Lets every window react to the clock reaching `now`.
    pub fn on_time(&mut self, now: TimeInstant) -> Result<Vec<Emitted<O>>> {
        self.ensure_live()?;
        let mut reports = Vec::new();
        for binding in &mut self.windows {
            reports.extend(binding.operator.advance(now));
        }
        Ok(self.run_cycles(reports))
    }

    /// One DAG evaluation per distinct report timestamp, oldest first.
    ///
    /// Windows that reported at `T` contribute their reported relation; when
    /// several instances of one window reported at `T` the latest-closing one
    /// is used and the rest are dropped. The other windows contribute what
    /// they currently hold at `T`. Outputs are stamped with `T`.
    fn run_cycles(&mut self, reports: Vec<WindowReport<R>>) -> Vec<Emitted<O>> {
        if reports.is_empty() {
            return Vec::new();
        }
        let (Some(dag), Some(r2s)) = (self.dag.as_ref(), self.r2s.as_mut()) else {
            return Vec::new();
        };

        let mut cycles: BTreeMap<TimeInstant, HashMap<usize, WindowReport<R>>> = BTreeMap::new();
        for report in reports {
            let Some(slot) = self
                .windows
                .iter()
                .position(|binding| binding.operator.name() == &*report.window)
            else {
                continue;
            };
            let cycle = cycles.entry(report.timestamp).or_default();
            match cycle.get(&slot) {
                Some(existing) if existing.instance.close >= report.instance.close => {}
                _ => {
                    cycle.insert(slot, report);
                }
            }
        }

        let mut emitted = Vec::new();
        for (timestamp, mut reported) in cycles {
            log::debug!(
                "Task {} cycle at {} ({} windows reported)",
                self.name,
                timestamp,
                reported.len()
            );
            let windows = &self.windows;
            let hook = &self.error_hook;
            let sink = dag.evaluate(
                |slot| match reported.remove(&slot) {
                    Some(report) => report.relation,
                    None => windows[slot].operator.materialize(timestamp),
                },
                |err| {
                    if let Some(hook) = hook {
                        hook(&RspError::Evaluation(err));
                    }
                },
            );
            if let Some(relation) = sink {
                emitted.extend(
                    r2s.eval(&relation, timestamp)
                        .into_iter()
                        .map(|element| Emitted { element, timestamp }),
                );
            }
        }
        emitted
    }
}

impl<I, R, O> Task<I, R, O>
where
    I: Clone + 'static,
    R: Clone + Send + 'static,
{
    /// Builds the window `config` describes and binds it to the stream the
    /// configuration names.
    pub fn add_window_config<W: 'static>(
        &mut self,
        config: &WindowConfig,
        factory: Arc<dyn ContentFactory<I, W, R>>,
    ) -> Result<&mut Self> {
        let window = config.build(factory)?;
        self.add_s2r(window, config.stream.clone())
    }
}

impl<I, R, O> fmt::Debug for Task<I, R, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("windows", &self.window_bindings())
            .finish_non_exhaustive()
    }
}

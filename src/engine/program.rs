use super::task::{Emitted, Task, TaskState};
use crate::config::{OutputConfig, ProgramConfig};
use crate::error::{ConfigError, Result, RspError};
use crate::stream::{DataStream, OverflowPolicy, StreamRegistry, StreamSource, Subscription};
use crate::time::{Clock, ListenerId, Ticker, TimeInstant};
use crate::windowing::WindowStats;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

struct TaskEntry<I, R, O> {
    name: String,
    task: Mutex<Task<I, R, O>>,
    outputs: Vec<DataStream<O>>,
}

impl<I, R, O: Clone> TaskEntry<I, R, O> {
    fn deliver(&self, emitted: Vec<Emitted<O>>) {
        for Emitted { element, timestamp } in emitted {
            for output in &self.outputs {
                if let Err(err) = output.put(element.clone(), timestamp) {
                    log::error!("Task {} could not deliver to {}: {}", self.name, output.name(), err);
                }
            }
        }
    }

    fn run<F>(&self, step: F)
    where
        F: FnOnce(&mut Task<I, R, O>) -> Result<Vec<Emitted<O>>>,
    {
        let emitted = match self.task.lock() {
            Ok(mut task) => {
                if task.state() == TaskState::Stopped {
                    return;
                }
                step(&mut task)
            }
            Err(_) => {
                log::error!("Task {} lock poisoned, skipping", self.name);
                return;
            }
        };
        match emitted {
            Ok(emitted) => self.deliver(emitted),
            Err(err) => log::warn!("Task {}: {}", self.name, err),
        }
    }
}

struct Shared<I, R, O> {
    clock: Clock,
    tasks: RwLock<Vec<Arc<TaskEntry<I, R, O>>>>,
}

impl<I, R, O: Clone> Shared<I, R, O> {
    fn snapshot(&self) -> Vec<Arc<TaskEntry<I, R, O>>> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn on_time(&self, now: TimeInstant) {
        for entry in self.snapshot() {
            entry.run(|task| task.on_time(now));
        }
    }

    fn dispatch(&self, stream: &str, element: &I, timestamp: TimeInstant) {
        if self.clock.is_tuple_driven() {
            // Advancing first lets every task close what ends before this
            // element, in clock order.
            self.clock.observe(timestamp);
        }
        for entry in self.snapshot() {
            let reads = match entry.task.lock() {
                Ok(task) => task.reads(stream),
                Err(_) => false,
            };
            if reads {
                entry.run(|task| task.process(stream, element, timestamp));
            }
        }
    }
}

/// Coordinates tasks sharing input streams and one clock.
///
/// Elements put on a bound input stream are fanned out to every task reading
/// it; clock advances are forwarded to every task, so all of them observe the
/// same non-decreasing sequence of instants.
pub struct ContinuousProgram<I, R, O> {
    shared: Arc<Shared<I, R, O>>,
    inputs: StreamRegistry<I>,
    outputs: StreamRegistry<O>,
    sources: Vec<Box<dyn StreamSource>>,
    listener: ListenerId,
    ticker: Option<Ticker>,
    output: OutputConfig,
    stopped: bool,
}

impl<I, R, O> ContinuousProgram<I, R, O>
where
    I: Send + 'static,
    R: Send + 'static,
    O: Clone + Send + 'static,
{
    pub fn new(clock: Clock) -> Self {
        let shared = Arc::new(Shared {
            clock: clock.clone(),
            tasks: RwLock::new(Vec::new()),
        });
        let weak: Weak<Shared<I, R, O>> = Arc::downgrade(&shared);
        let listener = clock.subscribe(move |now| {
            if let Some(shared) = weak.upgrade() {
                shared.on_time(now);
            }
        });
        Self {
            shared,
            inputs: StreamRegistry::new(),
            outputs: StreamRegistry::new(),
            sources: Vec::new(),
            listener,
            ticker: None,
            output: OutputConfig::default(),
            stopped: false,
        }
    }

    /// Builds the program's clock and output defaults from a configuration.
    pub fn from_config(config: &ProgramConfig) -> Result<Self> {
        let mut program = Self::new(config.clock.build()?);
        program.output = config.output;
        Ok(program)
    }

    pub fn clock(&self) -> &Clock {
        &self.shared.clock
    }

    /// Capacity and overflow policy of subscriptions opened through
    /// [`subscribe_output`](Self::subscribe_output).
    pub fn output_config(&self) -> OutputConfig {
        self.output
    }

    /// Attaches an initialized task: each of its windows is fed from the
    /// input stream of the same name, and its outputs are put on every stream
    /// in `outputs`.
    pub fn build_task(
        &mut self,
        task: Task<I, R, O>,
        inputs: &[DataStream<I>],
        outputs: Vec<DataStream<O>>,
    ) -> Result<()> {
        match task.state() {
            TaskState::Built => {
                return Err(RspError::NotInitialized {
                    task: task.name().to_string(),
                });
            }
            TaskState::Stopped => {
                return Err(RspError::TaskStopped {
                    task: task.name().to_string(),
                });
            }
            TaskState::Initialized | TaskState::Running => {}
        }
        if !task.clock().same_as(&self.shared.clock) {
            return Err(ConfigError::ClockMismatch(task.name().to_string()).into());
        }
        for (window, stream) in task.window_bindings() {
            if !inputs.iter().any(|input| input.name() == stream) {
                return Err(ConfigError::UnboundStream {
                    window: window.to_string(),
                    stream: stream.to_string(),
                }
                .into());
            }
        }
        let name = task.name().to_string();
        if self.task_names().iter().any(|existing| *existing == name) {
            return Err(ConfigError::DuplicateName(name).into());
        }

        for output in &outputs {
            self.outputs.register(output)?;
        }
        for input in inputs {
            if self.inputs.register(input)? {
                let weak = Arc::downgrade(&self.shared);
                input.add_consumer(move |stream, element, timestamp| {
                    if let Some(shared) = weak.upgrade() {
                        shared.dispatch(stream, element, timestamp);
                    }
                });
            }
        }

        log::debug!(
            "Program attached task {} reading {:?}",
            name,
            task.input_streams()
        );
        self.shared
            .tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(TaskEntry {
                name,
                task: Mutex::new(task),
                outputs,
            }));
        Ok(())
    }

    pub fn task_names(&self) -> Vec<String> {
        self.shared
            .snapshot()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn task_state(&self, task: &str) -> Option<TaskState> {
        self.with_task(task, |t| t.state())
    }

    pub fn window_stats(&self, task: &str, window: &str) -> Option<WindowStats> {
        self.with_task(task, |t| t.window_stats(window)).flatten()
    }

    fn with_task<T>(&self, name: &str, f: impl FnOnce(&Task<I, R, O>) -> T) -> Option<T> {
        let entry = self
            .shared
            .snapshot()
            .into_iter()
            .find(|entry| entry.name == name)?;
        let task = entry.task.lock().ok()?;
        Some(f(&task))
    }

    pub fn input(&self, name: &str) -> Option<&DataStream<I>> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&DataStream<O>> {
        self.outputs.get(name)
    }

    /// Opens a subscription on a registered output stream with the configured
    /// capacity and overflow policy.
    pub fn subscribe_output(&self, name: &str) -> Result<Subscription<O>> {
        self.subscribe_output_with(name, self.output.capacity, self.output.policy)
    }

    pub fn subscribe_output_with(
        &self,
        name: &str,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Result<Subscription<O>> {
        Ok(self.outputs.require(name)?.subscribe(capacity, policy))
    }

    /// Takes ownership of a source; it is started by
    /// [`start_sources`](Self::start_sources) and stopped with the program.
    pub fn register_source<S: StreamSource + 'static>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }

    pub fn start_sources(&mut self) -> Result<()> {
        for source in &mut self.sources {
            log::debug!("Starting source {}", source.name());
            source.start()?;
        }
        Ok(())
    }

    /// Starts the background ticker of a tick-driven clock.
    pub fn start_ticker(&mut self) -> Result<()> {
        if self.ticker.is_none() {
            self.ticker = Some(self.shared.clock.start_ticker()?);
        }
        Ok(())
    }

    /// Moves the shared clock forward; every task reacts before this returns.
    pub fn advance_time(&self, to: impl Into<TimeInstant>) -> Result<bool> {
        self.shared.clock.advance(to)
    }

    /// Stops the ticker, every source, every input stream and every task.
    /// Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        for source in &mut self.sources {
            source.stop();
        }
        self.inputs.stop_all();
        for entry in self.shared.snapshot() {
            match entry.task.lock() {
                Ok(mut task) => task.stop(),
                Err(_) => log::error!("Task {} lock poisoned while stopping", entry.name),
            }
        }
        log::debug!("Program stopped");
    }
}

impl<I, R, O> Drop for ContinuousProgram<I, R, O> {
    fn drop(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        for source in &mut self.sources {
            source.stop();
        }
        self.shared.clock.unsubscribe(self.listener);
    }
}

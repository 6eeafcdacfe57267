use super::quad_container::{Binding, QuadContainer, window_content_factory};
use super::rspql::{ParsedQuery, RSPQLParser, StreamOperator};
use super::sparql::{OxigraphEvaluator, UnionOperator, format_binding};
use crate::config::OutputConfig;
use crate::engine::{ContinuousProgram, DStream, IStream, QueryOperator, RStream, Task};
use crate::error::{Result, RspError};
use crate::report::Report;
use crate::stream::{DataStream, OverflowPolicy, Subscription};
use crate::time::{Clock, TimeInstant};
use crate::windowing::{CSPARQLWindow, WindowStats};
use oxigraph::model::Quad;
use std::collections::BTreeMap;
use std::time::Duration;

const TASK_NAME: &str = "rspql";
const QUERY_RESULT: &str = "query";

/// Represents a binding result with timestamp information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingWithTimestamp {
    pub bindings: String,
    pub binding: Binding,
    pub timestamp_from: i64,
    pub timestamp_to: i64,
}

/// Represents an RDF stream that feeds data into a window
#[derive(Debug, Clone)]
pub struct RDFStream {
    stream: DataStream<QuadContainer>,
}

impl RDFStream {
    pub fn name(&self) -> &str {
        self.stream.name()
    }

    /// Add a quad container to the stream
    pub fn add(&self, container: QuadContainer) -> Result<()> {
        let ts = container.last_timestamp_changed;
        self.stream.put(container, ts)
    }

    /// Add a set of quads with a timestamp to the stream
    pub fn add_quads(&self, quads: Vec<Quad>, timestamp: i64) -> Result<()> {
        self.add(QuadContainer::from_quads(quads, timestamp))
    }
}

/// Receives query results, converting each output binding into a
/// [`BindingWithTimestamp`] covering the window that produced it.
pub struct ResultReceiver {
    subscription: Subscription<Binding>,
    width: i64,
}

impl ResultReceiver {
    fn convert(&self, (binding, ts): (Binding, TimeInstant)) -> BindingWithTimestamp {
        BindingWithTimestamp {
            bindings: format_binding(&binding),
            binding,
            timestamp_from: ts.value().saturating_sub(self.width),
            timestamp_to: ts.value(),
        }
    }

    pub fn recv(&self) -> Option<BindingWithTimestamp> {
        self.subscription.recv().map(|item| self.convert(item))
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<BindingWithTimestamp> {
        self.subscription
            .recv_timeout(timeout)
            .map(|item| self.convert(item))
    }

    pub fn try_recv(&self) -> Option<BindingWithTimestamp> {
        self.subscription.try_recv().map(|item| self.convert(item))
    }

    /// Everything delivered so far, without waiting.
    pub fn drain(&self) -> Vec<BindingWithTimestamp> {
        self.subscription
            .try_iter()
            .map(|item| self.convert(item))
            .collect()
    }

    pub fn dropped(&self) -> u64 {
        self.subscription.dropped()
    }
}

/// The main RSP (RDF Stream Processing) Engine
///
/// Builds one continuous program from an RSP-QL query: a window per
/// `FROM NAMED WINDOW` clause, unions chaining the windows together, the
/// SPARQL query over the result, and the stream operator named in
/// `REGISTER`.
pub struct RSPEngine {
    parsed_query: ParsedQuery,
    evaluator: OxigraphEvaluator,
    clock: Clock,
    streams: BTreeMap<String, RDFStream>,
    output: DataStream<Binding>,
    output_config: OutputConfig,
    program: Option<ContinuousProgram<QuadContainer, QuadContainer, Binding>>,
}

impl RSPEngine {
    /// Create a new RSP Engine from an RSPQL query
    pub fn new(query: impl Into<String>) -> Result<Self> {
        let parsed_query = RSPQLParser::new(query).parse()?;
        let output_name = parsed_query
            .output
            .clone()
            .unwrap_or_else(|| "output".to_string());

        let mut streams = BTreeMap::new();
        for def in &parsed_query.s2r {
            if !streams.contains_key(&def.stream_name) {
                let stream = DataStream::new(def.stream_name.clone())?;
                streams.insert(def.stream_name.clone(), RDFStream { stream });
            }
        }

        Ok(Self {
            evaluator: OxigraphEvaluator::new(),
            clock: Clock::tuple_driven(TimeInstant::MIN),
            streams,
            output: DataStream::new(output_name)?,
            output_config: OutputConfig::default(),
            program: None,
            parsed_query,
        })
    }

    /// Capacity and overflow policy of the receivers returned by
    /// [`start_processing`](Self::start_processing).
    pub fn with_output_config(mut self, config: OutputConfig) -> Self {
        self.output_config = config;
        self
    }

    /// Initialize the engine by creating windows and streams
    pub fn initialize(&mut self) -> Result<()> {
        if self.program.is_some() {
            return Err(RspError::AlreadyInitialized {
                task: TASK_NAME.to_string(),
            });
        }

        let mut task = Task::new(TASK_NAME, self.clock.clone());
        for def in &self.parsed_query.s2r {
            let window = CSPARQLWindow::new(
                def.window_name.clone(),
                def.width,
                def.slide,
                window_content_factory(&def.window_name),
                Report::on_window_close(),
            )?;
            task.add_s2r(window, def.stream_name.clone())?;
        }

        let mut windows = self.parsed_query.s2r.iter().map(|def| def.window_name.clone());
        let mut input = windows.next().unwrap_or_default();
        for (i, window) in windows.enumerate() {
            let union = format!("union{}", i + 1);
            task.add_r2r(UnionOperator::new(union.clone(), input, window))?;
            input = union;
        }
        task.add_r2r(QueryOperator::new(
            QUERY_RESULT,
            vec![input],
            self.parsed_query.sparql_query.clone(),
            self.evaluator.clone(),
        ))?;

        let bindings = |container: &QuadContainer| container.bindings.clone();
        match self.parsed_query.r2s {
            StreamOperator::RStream => task.add_r2s(RStream::new(bindings))?,
            StreamOperator::IStream => task.add_r2s(IStream::new(bindings))?,
            StreamOperator::DStream => task.add_r2s(DStream::new(bindings))?,
        };
        task.set_error_hook(|err| log::warn!("Query evaluation failed: {}", err));
        task.initialize()?;

        let inputs: Vec<DataStream<QuadContainer>> =
            self.streams.values().map(|s| s.stream.clone()).collect();
        let mut program = ContinuousProgram::new(self.clock.clone());
        program.build_task(task, &inputs, vec![self.output.clone()])?;
        self.program = Some(program);
        log::debug!(
            "RSPEngine initialized with {} windows over {} streams",
            self.parsed_query.s2r.len(),
            self.streams.len()
        );
        Ok(())
    }

    /// Opens a receiver for query results.
    pub fn start_processing(&self) -> ResultReceiver {
        self.start_processing_with(self.output_config.capacity, self.output_config.policy)
    }

    pub fn start_processing_with(&self, capacity: usize, policy: OverflowPolicy) -> ResultReceiver {
        let width = self
            .parsed_query
            .s2r
            .iter()
            .map(|def| def.width)
            .max()
            .unwrap_or_default();
        ResultReceiver {
            subscription: self.output.subscribe(capacity, policy),
            width,
        }
    }

    /// Get a stream by name (returns a clone for easier usage)
    pub fn get_stream(&self, stream_name: &str) -> Option<RDFStream> {
        self.streams.get(stream_name).cloned()
    }

    /// Add static data joined with every evaluation
    pub fn add_static_data(&mut self, quad: Quad) {
        self.evaluator.add_static_data(quad);
    }

    /// Get all stream names
    pub fn get_all_streams(&self) -> Vec<String> {
        self.streams.keys().cloned().collect()
    }

    /// Ends a stream: time moves to `final_timestamp`, closing every window
    /// that ends by then, and the stream accepts no more data.
    pub fn close_stream(&self, stream_uri: &str, final_timestamp: i64) -> Result<()> {
        let Some(stream) = self.streams.get(stream_uri) else {
            return Err(RspError::UnknownStream {
                stream: stream_uri.to_string(),
            });
        };
        self.clock.observe(final_timestamp);
        stream.stream.stop();
        Ok(())
    }

    /// Get the parsed query
    pub fn parsed_query(&self) -> &ParsedQuery {
        &self.parsed_query
    }

    pub fn get_window_stats(&self, window_name: &str) -> Option<WindowStats> {
        self.program
            .as_ref()?
            .window_stats(TASK_NAME, window_name)
    }

    pub fn static_data_size(&self) -> usize {
        self.evaluator.static_data_size()
    }
}

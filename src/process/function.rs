//! Process functions: the execution coordinator for wrapped functions

use std::sync::Arc;

use log::{debug, error, info, warn};
use shellfn_core::{ExitCode, Outputs, Result, Value};
use uuid::Uuid;

use crate::inputs::{BoundInputs, Kwargs, create_inputs};
use crate::process::interrupt::{CancelToken, InterruptGuard};
use crate::process::record::{ExecutionRecord, ProcessState};
use crate::process::runner::Runner;
use crate::schema::{
    BodyFn, CallContext, FunctionDescriptor, ProcessOutput, ProcessSchema, RecordKind,
    SINGLE_OUTPUT_KEY,
};

/// Message attached to records killed by an interrupt
pub const KILLED_MESSAGE: &str = "Process was killed because the runner received an interrupt";

/// Note attached to records run with provenance storage disabled
pub const UNSTORABLE_MESSAGE: &str =
    "cannot store record because it was run with `store_provenance=false`";

/// How a body terminated
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Ran to completion. Outputs are kept even when the exit code is non-zero.
    Finished { outputs: Outputs, exit: ExitCode },
    /// Stopped because cancellation was requested
    Killed,
}

impl Outcome {
    pub fn success(outputs: Outputs) -> Self {
        Outcome::Finished {
            outputs,
            exit: ExitCode::success(),
        }
    }
}

/// State handed to an execution body for one invocation
pub struct Invocation<'a> {
    pub schema: &'a ProcessSchema,
    pub record: &'a mut ExecutionRecord,
    pub cancel: &'a CancelToken,
}

impl Invocation<'_> {
    /// Positional values per slot and keyword rest of the record's inputs
    pub fn split_inputs(&self) -> (Vec<Value>, Kwargs) {
        self.record.inputs().split(self.schema)
    }
}

/// The execution body run by the coordinator
pub trait ExecutionBody: Send + Sync {
    fn execute(&self, invocation: &mut Invocation<'_>) -> Result<Outcome>;
}

/// Merge a body's return value into `outputs`. A bare value lands under [`SINGLE_OUTPUT_KEY`].
pub fn merge_returned(outputs: &mut Outputs, returned: Option<ProcessOutput>) {
    match returned {
        None => {}
        Some(ProcessOutput::Single(value)) => {
            outputs.insert(SINGLE_OUTPUT_KEY.to_string(), value);
        }
        Some(ProcessOutput::Mapping(mapping)) => outputs.extend(mapping),
    }
}

/// Body that calls the registered function directly
#[derive(Clone, Default)]
pub struct FunctionBody {
    func: Option<Arc<BodyFn>>,
}

impl FunctionBody {
    pub fn new(func: Option<Arc<BodyFn>>) -> Self {
        Self { func }
    }
}

impl ExecutionBody for FunctionBody {
    fn execute(&self, invocation: &mut Invocation<'_>) -> Result<Outcome> {
        let (args, kwargs) = invocation.split_inputs();
        let mut outputs = Outputs::new();

        if let Some(func) = &self.func {
            let ctx = CallContext::new(invocation.schema, &args, &kwargs, None, invocation.cancel);
            merge_returned(&mut outputs, func(&ctx)?);
        }

        if invocation.cancel.is_cancelled() {
            return Ok(Outcome::Killed);
        }
        Ok(Outcome::success(outputs))
    }
}

/// Per-call options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Hand the record to the runner's store when done
    pub store_provenance: bool,
    /// Record label, defaults to the function name
    pub label: Option<String>,
    /// Explicit cancellation token
    pub cancel: Option<CancelToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            store_provenance: true,
            label: None,
            cancel: None,
        }
    }
}

/// A function turned into a schema-validated process.
///
/// Each call binds its arguments, runs the body once and returns the normalized
/// result with the execution record.
pub struct ProcessFunction<B: ExecutionBody = FunctionBody> {
    schema: Arc<ProcessSchema>,
    body: B,
}

impl<B: ExecutionBody> std::fmt::Debug for ProcessFunction<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessFunction")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ProcessFunction<FunctionBody> {
    /// Build a process function running the descriptor's own body
    pub fn build(
        descriptor: FunctionDescriptor,
        kind: RecordKind,
        exit_codes: &[(u32, &str, &str)],
    ) -> Result<Self> {
        let schema = ProcessSchema::build(&descriptor, kind, exit_codes)?;
        let body = FunctionBody::new(descriptor.body_fn().cloned());
        Ok(Self::from_parts(schema, body))
    }
}

impl<B: ExecutionBody> ProcessFunction<B> {
    pub fn from_parts(schema: ProcessSchema, body: B) -> Self {
        Self {
            schema: Arc::new(schema),
            body,
        }
    }

    pub fn schema(&self) -> &ProcessSchema {
        &self.schema
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    /// Run and return the result only
    pub fn call(&self, runner: &Runner, args: Vec<Value>, kwargs: Kwargs) -> Result<ProcessOutput> {
        self.run_get_record(runner, args, kwargs)
            .map(|(result, _)| result)
    }

    /// Run and return the result with the execution record
    pub fn run_get_record(
        &self,
        runner: &Runner,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Result<(ProcessOutput, ExecutionRecord)> {
        self.launch(runner, &RunOptions::default(), args, kwargs)
    }

    /// Run and return the result with the record id
    pub fn run_get_id(
        &self,
        runner: &Runner,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Result<(ProcessOutput, Uuid)> {
        self.run_get_record(runner, args, kwargs)
            .map(|(result, record)| (result, record.id()))
    }

    /// Run with explicit options
    pub fn launch(
        &self,
        runner: &Runner,
        options: &RunOptions,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Result<(ProcessOutput, ExecutionRecord)> {
        let inputs: BoundInputs = create_inputs(&self.schema, args, kwargs)?;
        let mut record = ExecutionRecord::new(&self.schema, inputs);
        if let Some(label) = &options.label {
            record.set_label(label.clone());
        }

        let executed = {
            // Interrupting the host must not kill processes owned by a persistent runner.
            let guard = if runner.is_persistent() {
                None
            } else {
                Some(InterruptGuard::install()?)
            };
            let mut cancel = options.cancel.clone().unwrap_or_default();
            if guard.is_some() {
                cancel = cancel.observing_interrupts();
            }

            record.transition(ProcessState::Running)?;
            info!("Running process {} ({})", record.id(), record.label());

            let mut invocation = Invocation {
                schema: &self.schema,
                record: &mut record,
                cancel: &cancel,
            };
            self.body.execute(&mut invocation)
        };

        let result = match executed {
            Ok(Outcome::Finished { outputs, exit }) => {
                debug!(
                    "Process {} finished with exit status {}",
                    record.id(),
                    exit.status
                );
                record.set_outputs(outputs.clone());
                record.finish(exit)?;
                Ok(ProcessOutput::from_outputs(outputs))
            }
            Ok(Outcome::Killed) => {
                error!("runner received interrupt, killing process {}", record.id());
                record.kill(KILLED_MESSAGE)?;
                Ok(ProcessOutput::Mapping(Outputs::new()))
            }
            Err(e) => {
                warn!("Process {} excepted: {}", record.id(), e);
                record.except(&e)?;
                Err(e)
            }
        };

        if options.store_provenance {
            runner.store().store(&record)?;
        } else {
            record.mark_non_persistable(UNSTORABLE_MESSAGE);
        }

        result.map(|output| (output, record))
    }
}

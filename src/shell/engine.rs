//! Shell functions: external commands run as process functions

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use shellfn_core::{ExitCode, FileContent, Outputs, Result, Value};

use crate::inputs::Kwargs;
use crate::process::{ExecutionBody, Invocation, Outcome, ProcessFunction, merge_returned};
use crate::schema::{BodyFn, CallContext, FunctionDescriptor, ProcessSchema, RecordKind};
use crate::shell::capture::{RunResult, run_captured};
use crate::shell::outputs::{OutputDeclaration, reconcile};
use crate::shell::staging::{ArgumentPlan, ScratchDirectory};

pub const COMMAND_NOT_FOUND: &str = "COMMAND_NOT_FOUND";
pub const COMMAND_FAILED: &str = "COMMAND_FAILED";
pub const MISSING_OUTPUT_FILES: &str = "MISSING_OUTPUT_FILES";

/// Exit codes registered on every shell schema
pub const SHELL_EXIT_CODES: &[(u32, &str, &str)] = &[
    (250, COMMAND_NOT_FOUND, "The command `{command}` was not found."),
    (251, COMMAND_FAILED, "The command returned a non-zero exit code: {exit_code}."),
    (
        252,
        MISSING_OUTPUT_FILES,
        "The command did not produce all declared output files: {missing_files}.",
    ),
];

/// Keyword input holding the command line arguments; also the record attribute with the final argv
pub const ARGUMENTS_KEY: &str = "arguments";

/// Blob and output name of the captured standard output
pub const STDOUT: &str = "stdout";
/// Blob name of the captured standard error
pub const STDERR: &str = "stderr";

/// A shell command wrapped as a process function
pub type ShellFunction = ProcessFunction<ShellBody>;

impl ProcessFunction<ShellBody> {
    pub fn builder(command: impl Into<String>) -> ShellFunctionBuilder {
        ShellFunctionBuilder::new(command)
    }
}

/// Start wrapping `command`
pub fn wrap(command: impl Into<String>) -> ShellFunctionBuilder {
    ShellFunctionBuilder::new(command)
}

/// Builder for shell functions
#[derive(Debug, Clone)]
pub struct ShellFunctionBuilder {
    command: String,
    attach_stdout: bool,
    output_filenames: Vec<String>,
}

impl ShellFunctionBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            attach_stdout: false,
            output_filenames: Vec::new(),
        }
    }

    /// Return stdout as the `stdout` output instead of storing it as a blob
    pub fn attach_stdout(mut self, attach: bool) -> Self {
        self.attach_stdout = attach;
        self
    }

    /// Files to collect from the working directory. Names may contain wildcards.
    pub fn output_filenames<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_filenames = names.into_iter().map(Into::into).collect();
        self
    }

    /// Build the function around `descriptor`, whose body runs as post-processing
    pub fn build(self, descriptor: FunctionDescriptor) -> Result<ShellFunction> {
        let outputs = self
            .output_filenames
            .iter()
            .map(|name| OutputDeclaration::parse(name))
            .collect::<Result<Vec<_>>>()?;

        let descriptor = descriptor.ensure_var_keyword();
        let schema = ProcessSchema::build(&descriptor, RecordKind::Calculation, SHELL_EXIT_CODES)?;
        info!(
            "Wrapped command `{}` as shell function {}",
            self.command,
            schema.name()
        );

        let body = ShellBody {
            command: self.command,
            attach_stdout: self.attach_stdout,
            outputs,
            post_process: descriptor.body_fn().cloned(),
        };
        Ok(ProcessFunction::from_parts(schema, body))
    }
}

/// Execution body running an external command in a scratch directory
pub struct ShellBody {
    command: String,
    attach_stdout: bool,
    outputs: Vec<OutputDeclaration>,
    post_process: Option<Arc<BodyFn>>,
}

impl ShellBody {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn attaches_stdout(&self) -> bool {
        self.attach_stdout
    }

    pub fn output_declarations(&self) -> &[OutputDeclaration] {
        &self.outputs
    }

    fn exit(&self, schema: &ProcessSchema, key: &str, params: &[(&str, &str)]) -> Result<ExitCode> {
        Ok(schema.exit_codes().require(key)?.format(params))
    }

    fn run_in(
        &self,
        invocation: &mut Invocation<'_>,
        scratch: &ScratchDirectory,
        executable: &Path,
        plan: &ArgumentPlan,
        args: &[Value],
        kwargs: &Kwargs,
    ) -> Result<Outcome> {
        let argv = scratch.stage(plan)?;
        let recorded: Vec<String> = std::iter::once(executable.to_string_lossy().into_owned())
            .chain(argv.iter().cloned())
            .collect();
        debug!("Running {:?} in {}", recorded, scratch.path().display());
        invocation
            .record
            .set_attribute(ARGUMENTS_KEY, serde_json::json!(recorded));

        let captured = match run_captured(executable, &argv, scratch.path(), invocation.cancel)? {
            RunResult::Exited(captured) => captured,
            RunResult::Cancelled => return Ok(Outcome::Killed),
        };

        invocation.record.put_blob(STDERR, captured.stderr.as_slice())?;
        let mut outputs = Outputs::new();
        if self.attach_stdout {
            outputs.insert(
                STDOUT.to_string(),
                Value::File(FileContent::new(STDOUT, captured.stdout)),
            );
        } else {
            invocation.record.put_blob(STDOUT, captured.stdout.as_slice())?;
        }

        if captured.status != 0 {
            let exit = self.exit(
                invocation.schema,
                COMMAND_FAILED,
                &[("exit_code", &captured.status.to_string())],
            )?;
            return Ok(Outcome::Finished { outputs, exit });
        }

        let returned = match &self.post_process {
            Some(post_process) => {
                let ctx = CallContext::new(
                    invocation.schema,
                    args,
                    kwargs,
                    Some(scratch.path()),
                    invocation.cancel,
                );
                post_process(&ctx)?
            }
            None => None,
        };
        if invocation.cancel.is_cancelled() {
            return Ok(Outcome::Killed);
        }

        let reconciliation = reconcile(scratch.path(), &self.outputs)?;
        outputs.extend(reconciliation.outputs);
        merge_returned(&mut outputs, returned);

        if !reconciliation.missing.is_empty() {
            let missing = reconciliation.missing.join(", ");
            let exit = self.exit(
                invocation.schema,
                MISSING_OUTPUT_FILES,
                &[("missing_files", &missing)],
            )?;
            return Ok(Outcome::Finished { outputs, exit });
        }

        Ok(Outcome::success(outputs))
    }
}

impl ExecutionBody for ShellBody {
    fn execute(&self, invocation: &mut Invocation<'_>) -> Result<Outcome> {
        let executable: PathBuf = match which::which(&self.command) {
            Ok(path) => path,
            Err(e) => {
                debug!("Could not resolve `{}`: {}", self.command, e);
                let exit = self.exit(
                    invocation.schema,
                    COMMAND_NOT_FOUND,
                    &[("command", &self.command)],
                )?;
                return Ok(Outcome::Finished {
                    outputs: Outputs::new(),
                    exit,
                });
            }
        };

        let (args, kwargs) = invocation.split_inputs();
        let mut files = kwargs.clone();
        files.remove(ARGUMENTS_KEY);
        let arguments = invocation
            .record
            .inputs()
            .get(ARGUMENTS_KEY)
            .filter(|value| !value.is_none())
            .cloned();
        let plan = ArgumentPlan::build(arguments.as_ref(), files)?;

        let scratch = ScratchDirectory::create()?;
        let outcome = self.run_in(invocation, &scratch, &executable, &plan, &args, &kwargs);
        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch directory: {}", e);
        }
        outcome
    }
}

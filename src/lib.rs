//! shellfn: shell commands as schema-validated processes
//!
//! Wraps plain functions and external commands into process functions that validate
//! their inputs against a schema, run exactly once, and leave an execution record
//! with exit status, outputs and captured streams.
//!
//! # Modules
//!
//! - **schema**: Function descriptors and process schemas
//! - **inputs**: Input binding and validation
//! - **process**: Execution coordinator, records, runners and cancellation
//! - **shell**: Shell command wrapping, file staging and output collection
//!
//! # Example
//!
//! ```ignore
//! use shellfn::{FunctionDescriptor, Kwargs, Runner, Value, wrap};
//!
//! let date = wrap("date").build(FunctionDescriptor::new("date"))?;
//! let kwargs = Kwargs::new().with("arguments", Value::list(["--iso-8601"]));
//! let (_, record) = date.run_get_record(&Runner::default(), vec![], kwargs)?;
//! println!("{}", record.blob_content("stdout").unwrap_or_default());
//! ```

// Schema and inputs
pub mod inputs;
pub mod schema;

// Execution
pub mod process;
pub mod shell;

// Public API
pub use inputs::{BoundInputs, Kwargs};
pub use process::{
    CancelToken, ExecutionRecord, MemoryStore, ProcessFunction, ProcessState, RecordStore,
    RunOptions, Runner,
};
pub use schema::{CallContext, FunctionDescriptor, ProcessOutput, ProcessSchema, RecordKind};
pub use shell::{ShellFunction, ShellFunctionBuilder, wrap};
pub use shellfn_core::{
    ExitCode, ExitCodeSpec, ExitCodes, FileContent, Outputs, Result, ShellfnError, Value,
};

//! Shell layer: wrap external commands as process functions
//!
//! Every invocation resolves the command on the search path, stages its input files
//! in a private scratch directory, runs it there with captured output, and collects
//! the declared output files.
//!
//! # Examples
//!
//! ```ignore
//! use shellfn::shell::wrap;
//! use shellfn::schema::FunctionDescriptor;
//! use shellfn::{Kwargs, Runner, Value};
//!
//! let split = wrap("split")
//!     .output_filenames(["x*"])
//!     .build(FunctionDescriptor::new("split_lines"))?;
//!
//! let kwargs = Kwargs::new()
//!     .with("arguments", Value::list(["-l", "1", "{single_file}"]))
//!     .with("single_file", FileContent::new("lines.txt", "a\nb\nc\n"));
//! let (outputs, record) = split.run_get_record(&Runner::default(), vec![], kwargs)?;
//! ```

mod capture;
pub mod engine;
pub mod outputs;
pub mod staging;
pub mod template;

pub use capture::{Captured, RunResult, run_captured};
pub use engine::{
    ARGUMENTS_KEY, COMMAND_FAILED, COMMAND_NOT_FOUND, MISSING_OUTPUT_FILES, SHELL_EXIT_CODES,
    STDERR, STDOUT, ShellBody, ShellFunction, ShellFunctionBuilder, wrap,
};
pub use outputs::{OutputDeclaration, Reconciliation, normalize_key, reconcile};
pub use staging::{ArgumentPlan, ScratchDirectory};
pub use template::ArgumentTemplate;

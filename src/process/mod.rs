//! Process layer: execution coordination, records and runners
//!
//! This module turns bound inputs into a single synchronous invocation and returns the
//! result together with its [`ExecutionRecord`].
//!
//! # Features
//!
//! - **Coordinator**: binds inputs, creates the record, runs the body once
//! - **Records**: lifecycle state machine, exit status, outputs and stored blobs
//! - **Runners**: explicit runner handles with a pluggable record store
//! - **Cancellation**: cancel tokens and a scoped SIGINT guard for local runners
//!
//! # Examples
//!
//! ```ignore
//! use shellfn::process::{ProcessFunction, Runner};
//! use shellfn::schema::{FunctionDescriptor, ProcessOutput, RecordKind};
//! use shellfn::{Kwargs, Value};
//!
//! let double = ProcessFunction::build(
//!     FunctionDescriptor::new("double").param("x").body(|ctx| { /* ... */ Ok(None) }),
//!     RecordKind::Calculation,
//!     &[],
//! )?;
//! let (result, record) = double.run_get_record(&Runner::default(), vec![Value::Int(2)], Kwargs::new())?;
//! ```

pub mod function;
pub mod interrupt;
pub mod record;
pub mod runner;

pub use function::{
    ExecutionBody, FunctionBody, Invocation, Outcome, ProcessFunction, RunOptions, merge_returned,
};
pub use interrupt::{CancelToken, InterruptGuard};
pub use record::{ExecutionRecord, ProcessState};
pub use runner::{MemoryStore, RecordStore, Runner};

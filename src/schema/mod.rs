//! Schema layer: process schemas built from function descriptors
//!
//! A [`ProcessSchema`] is compiled once per wrapped function and is immutable afterwards.
//! It holds the ordered input slots, whether extra keyword inputs are accepted, and the
//! exit code table.
//!
//! # Examples
//!
//! ```ignore
//! use shellfn::schema::{FunctionDescriptor, ProcessSchema, RecordKind};
//!
//! let descriptor = FunctionDescriptor::new("add").param("x").param("y");
//! let schema = ProcessSchema::build(&descriptor, RecordKind::Calculation, &[])?;
//! assert_eq!(schema.slot_names(), vec!["x", "y"]);
//! ```

pub mod descriptor;

pub use descriptor::{BodyFn, CallContext, FunctionDescriptor, Param};

use std::collections::HashSet;

use log::debug;
use serde::Serialize;
use shellfn_core::{ExitCodes, Outputs, Result, ShellfnError, Value};

/// Output key used when a process returns a single value instead of a mapping
pub const SINGLE_OUTPUT_KEY: &str = "result";

/// Kind of record created for each invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Creates new data from its inputs
    Calculation,
    /// Only returns existing data
    Work,
}

/// Output of a process: a bare value or a mapping of link name to value
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutput {
    Single(Value),
    Mapping(Outputs),
}

impl ProcessOutput {
    /// Unwrap a mapping holding only [`SINGLE_OUTPUT_KEY`] into a bare value
    pub fn from_outputs(mut outputs: Outputs) -> Self {
        if outputs.len() == 1 {
            if let Some(value) = outputs.remove(SINGLE_OUTPUT_KEY) {
                return ProcessOutput::Single(value);
            }
        }
        ProcessOutput::Mapping(outputs)
    }

    /// Flatten back into a mapping, keying a single value by [`SINGLE_OUTPUT_KEY`]
    pub fn into_outputs(self) -> Outputs {
        match self {
            ProcessOutput::Single(value) => Outputs::from([(SINGLE_OUTPUT_KEY.to_string(), value)]),
            ProcessOutput::Mapping(outputs) => outputs,
        }
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            ProcessOutput::Single(value) => Some(value),
            ProcessOutput::Mapping(_) => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Outputs> {
        match self {
            ProcessOutput::Single(_) => None,
            ProcessOutput::Mapping(outputs) => Some(outputs),
        }
    }
}

/// One named input position in a schema
#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    name: String,
    default: Option<Value>,
    nullable: bool,
}

impl InputSlot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Whether `Value::None` is accepted
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Compiled description of a wrapped function's inputs and exit codes
#[derive(Debug, Clone)]
pub struct ProcessSchema {
    name: String,
    label: String,
    description: Option<String>,
    source: Option<String>,
    kind: RecordKind,
    slots: Vec<InputSlot>,
    dynamic: bool,
    exit_codes: ExitCodes,
}

impl ProcessSchema {
    /// Build the schema for a function.
    ///
    /// Every positional parameter becomes a slot; a `Value::None` default also makes the
    /// slot accept `Value::None`. A variadic keyword parameter makes the schema dynamic.
    /// Fails if the function declares variadic positional parameters or repeats a name.
    pub fn build(
        descriptor: &FunctionDescriptor,
        kind: RecordKind,
        exit_codes: &[(u32, &str, &str)],
    ) -> Result<Self> {
        if let Some(name) = descriptor.var_positional_name() {
            return Err(ShellfnError::InvalidConfig(format!(
                "variadic arguments are not supported: `{}` declares `*{}`",
                descriptor.name(),
                name
            )));
        }

        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(descriptor.params().len());
        for param in descriptor.params() {
            if param.name.is_empty() {
                return Err(ShellfnError::InvalidConfig(format!(
                    "`{}` declares a parameter with an empty name",
                    descriptor.name()
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(ShellfnError::InvalidConfig(format!(
                    "`{}` declares parameter `{}` more than once",
                    descriptor.name(),
                    param.name
                )));
            }
            slots.push(InputSlot {
                name: param.name.clone(),
                nullable: matches!(param.default, Some(Value::None)),
                default: param.default.clone(),
            });
        }

        let mut table = ExitCodes::new();
        for (status, key, message) in exit_codes {
            table.register(*status, key, message)?;
        }

        debug!(
            "Built schema for `{}` with {} slot(s), dynamic={}",
            descriptor.name(),
            slots.len(),
            descriptor.accepts_var_keyword()
        );

        Ok(Self {
            name: descriptor.name().to_string(),
            label: descriptor.name().to_string(),
            description: descriptor.docstring().map(str::to_string),
            source: descriptor.source_text().map(str::to_string),
            kind,
            slots,
            dynamic: descriptor.accepts_var_keyword(),
            exit_codes: table,
        })
    }

    /// Name of the wrapped function
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default record label
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn slots(&self) -> &[InputSlot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&InputSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn slot_names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.name.as_str()).collect()
    }

    /// Whether keyword inputs without a slot are accepted
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn exit_codes(&self) -> &ExitCodes {
        &self.exit_codes
    }
}

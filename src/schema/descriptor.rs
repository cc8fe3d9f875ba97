//! Function descriptors: the registered parameter list and body of a wrapped function

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use shellfn_core::{Result, Value};

use crate::inputs::Kwargs;
use crate::process::CancelToken;
use crate::schema::{ProcessOutput, ProcessSchema};

/// Callback invoked as the body of a process function
pub type BodyFn = dyn Fn(&CallContext<'_>) -> Result<Option<ProcessOutput>> + Send + Sync;

/// A named positional parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// Read-only description of a wrapped function.
///
/// Rust has no signature reflection, so parameters are registered explicitly in
/// declaration order.
///
/// ```ignore
/// let descriptor = FunctionDescriptor::new("split_lines")
///     .doc("Run the `split` command.")
///     .param("prefix")
///     .param_with_default("suffix", Value::None)
///     .var_keyword("kwargs");
/// ```
#[derive(Clone)]
pub struct FunctionDescriptor {
    name: String,
    doc: Option<String>,
    source: Option<String>,
    params: Vec<Param>,
    var_positional: Option<String>,
    var_keyword: Option<String>,
    body: Option<Arc<BodyFn>>,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            source: None,
            params: Vec::new(),
            var_positional: None,
            var_keyword: None,
            body: None,
        }
    }

    /// Set the docstring, used as the record description
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Attach source text, stored on each record as the `source_file` blob
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add a required positional parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Add a positional parameter with a default. A `Value::None` default makes the slot nullable.
    pub fn param_with_default(mut self, name: impl Into<String>, default: Value) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default),
        });
        self
    }

    /// Declare a variadic positional parameter (`*args`). Schemas reject these.
    pub fn var_positional(mut self, name: impl Into<String>) -> Self {
        self.var_positional = Some(name.into());
        self
    }

    /// Declare a variadic keyword parameter (`**kwargs`), making the schema dynamic
    pub fn var_keyword(mut self, name: impl Into<String>) -> Self {
        self.var_keyword = Some(name.into());
        self
    }

    /// Set the function body
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Option<ProcessOutput>> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// Add a `kwargs` variadic keyword parameter unless one is declared already
    pub fn ensure_var_keyword(mut self) -> Self {
        if self.var_keyword.is_none() {
            self.var_keyword = Some("kwargs".to_string());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn docstring(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn var_positional_name(&self) -> Option<&str> {
        self.var_positional.as_deref()
    }

    pub fn accepts_var_keyword(&self) -> bool {
        self.var_keyword.is_some()
    }

    pub fn body_fn(&self) -> Option<&Arc<BodyFn>> {
        self.body.as_ref()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("var_positional", &self.var_positional)
            .field("var_keyword", &self.var_keyword)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Arguments handed to a function body
pub struct CallContext<'a> {
    schema: &'a ProcessSchema,
    args: &'a [Value],
    kwargs: &'a Kwargs,
    cwd: Option<&'a Path>,
    cancel: &'a CancelToken,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        schema: &'a ProcessSchema,
        args: &'a [Value],
        kwargs: &'a Kwargs,
        cwd: Option<&'a Path>,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            schema,
            args,
            kwargs,
            cwd,
            cancel,
        }
    }

    /// Positional values, one per slot, with defaults applied
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Keyword inputs without a slot of their own
    pub fn kwargs(&self) -> &Kwargs {
        self.kwargs
    }

    /// Look up an input by name, positional slots first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema
            .slots()
            .iter()
            .position(|slot| slot.name() == name)
            .and_then(|index| self.args.get(index))
            .or_else(|| self.kwargs.get(name))
    }

    /// Working directory the shell command ran in, for shell post-processing bodies
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

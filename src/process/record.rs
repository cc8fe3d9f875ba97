//! Execution records: per-invocation status, inputs, outputs and stored blobs

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use shellfn_core::{ExitCode, Outputs, Result, ShellfnError, Value};
use uuid::Uuid;

use crate::inputs::BoundInputs;
use crate::schema::{ProcessSchema, RecordKind};

/// Blob holding the registered source text of the wrapped function
pub const SOURCE_FILE_BLOB: &str = "source_file";

/// Lifecycle state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Pending,
    Running,
    /// Terminated with an exit status, zero or not
    Finished,
    /// Terminated by an error raised from the body
    Excepted,
    /// Terminated by cancellation
    Killed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessState::Finished | ProcessState::Excepted | ProcessState::Killed
        )
    }

    fn can_transition_to(self, next: ProcessState) -> bool {
        match (self, next) {
            (ProcessState::Pending, ProcessState::Running) => true,
            (ProcessState::Pending, ProcessState::Excepted) => true,
            (ProcessState::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Pending => "pending",
            ProcessState::Running => "running",
            ProcessState::Finished => "finished",
            ProcessState::Excepted => "excepted",
            ProcessState::Killed => "killed",
        };
        f.write_str(name)
    }
}

/// Record of a single invocation
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    id: Uuid,
    kind: RecordKind,
    process_label: String,
    label: String,
    description: Option<String>,
    inputs: BoundInputs,
    state: ProcessState,
    exit_status: Option<u32>,
    exit_message: Option<String>,
    outputs: Outputs,
    blobs: BTreeMap<String, Vec<u8>>,
    attributes: BTreeMap<String, serde_json::Value>,
    storable: bool,
    unstorable_message: Option<String>,
    ctime: DateTime<Utc>,
    mtime: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Create a pending record for the schema, taking ownership of the bound inputs
    pub fn new(schema: &ProcessSchema, inputs: BoundInputs) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::new_v4(),
            kind: schema.kind(),
            process_label: schema.name().to_string(),
            label: schema.label().to_string(),
            description: schema.description().map(str::to_string),
            inputs,
            state: ProcessState::Pending,
            exit_status: None,
            exit_message: None,
            outputs: Outputs::new(),
            blobs: BTreeMap::new(),
            attributes: BTreeMap::new(),
            storable: true,
            unstorable_message: None,
            ctime: now,
            mtime: now,
        };

        record.set_attribute("function_name", json!(schema.name()));
        if let Some(source) = schema.source() {
            record
                .blobs
                .insert(SOURCE_FILE_BLOB.to_string(), source.as_bytes().to_vec());
        }
        record
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Name of the function this record executed
    pub fn process_label(&self) -> &str {
        &self.process_label
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.touch();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn inputs(&self) -> &BoundInputs {
        &self.inputs
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn exit_status(&self) -> Option<u32> {
        self.exit_status
    }

    pub fn exit_message(&self) -> Option<&str> {
        self.exit_message.as_deref()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    /// Finished with exit status zero
    pub fn is_finished_ok(&self) -> bool {
        self.state == ProcessState::Finished && self.exit_status == Some(0)
    }

    /// Finished with a non-zero exit status
    pub fn is_failed(&self) -> bool {
        self.state == ProcessState::Finished && self.exit_status.is_some_and(|status| status != 0)
    }

    pub fn is_killed(&self) -> bool {
        self.state == ProcessState::Killed
    }

    pub fn is_excepted(&self) -> bool {
        self.state == ProcessState::Excepted
    }

    /// Move to the next lifecycle state
    pub fn transition(&mut self, next: ProcessState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ShellfnError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        self.touch();
        Ok(())
    }

    /// Terminate with an exit code
    pub fn finish(&mut self, exit: ExitCode) -> Result<()> {
        self.transition(ProcessState::Finished)?;
        self.exit_status = Some(exit.status);
        self.exit_message = exit.message;
        Ok(())
    }

    /// Terminate as killed. Only a running record can be killed.
    pub fn kill(&mut self, message: &str) -> Result<()> {
        self.transition(ProcessState::Killed)?;
        self.exit_message = Some(message.to_string());
        Ok(())
    }

    /// Terminate because the body raised an error
    pub fn except(&mut self, error: &ShellfnError) -> Result<()> {
        self.transition(ProcessState::Excepted)?;
        self.exit_message = Some(error.to_string());
        Ok(())
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    pub(crate) fn set_outputs(&mut self, outputs: Outputs) {
        self.outputs = outputs;
        self.touch();
    }

    /// Store a byte stream under `name`, replacing any previous blob
    pub fn put_blob(&mut self, name: &str, mut stream: impl Read) -> Result<()> {
        let mut content = Vec::new();
        stream.read_to_end(&mut content)?;
        self.blobs.insert(name.to_string(), content);
        self.touch();
        Ok(())
    }

    pub fn blob(&self, name: &str) -> Option<&[u8]> {
        self.blobs.get(name).map(Vec::as_slice)
    }

    /// Blob decoded as UTF-8, replacing invalid sequences
    pub fn blob_content(&self, name: &str) -> Option<String> {
        self.blob(name)
            .map(|content| String::from_utf8_lossy(content).into_owned())
    }

    /// Stored blob names, sorted
    pub fn blob_names(&self) -> Vec<&str> {
        self.blobs.keys().map(String::as_str).collect()
    }

    pub fn set_attribute(&mut self, key: &str, value: serde_json::Value) {
        self.attributes.insert(key.to_string(), value);
        self.touch();
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Forbid handing this record to a store, keeping the reason
    pub fn mark_non_persistable(&mut self, reason: &str) {
        self.storable = false;
        self.unstorable_message = Some(reason.to_string());
    }

    pub fn is_storable(&self) -> bool {
        self.storable
    }

    pub fn unstorable_message(&self) -> Option<&str> {
        self.unstorable_message.as_deref()
    }

    pub fn ctime(&self) -> DateTime<Utc> {
        self.ctime
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    /// JSON summary for inspection. Blob and file contents are reduced to sizes.
    pub fn summary(&self) -> serde_json::Value {
        let inputs: serde_json::Map<String, serde_json::Value> = self
            .inputs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        let outputs: serde_json::Map<String, serde_json::Value> = self
            .outputs
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        let blobs: serde_json::Map<String, serde_json::Value> = self
            .blobs
            .iter()
            .map(|(name, content)| (name.clone(), json!(content.len())))
            .collect();

        json!({
            "id": self.id.to_string(),
            "kind": self.kind,
            "process_label": self.process_label,
            "label": self.label,
            "description": self.description,
            "state": self.state,
            "exit_status": self.exit_status,
            "exit_message": self.exit_message,
            "inputs": inputs,
            "outputs": outputs,
            "blobs": blobs,
            "attributes": self.attributes,
            "storable": self.storable,
            "unstorable_message": self.unstorable_message,
            "ctime": self.ctime.to_rfc3339(),
            "mtime": self.mtime.to_rfc3339(),
        })
    }

    fn touch(&mut self) {
        self.mtime = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{Kwargs, create_inputs};
    use crate::schema::FunctionDescriptor;

    fn record() -> ExecutionRecord {
        let descriptor = FunctionDescriptor::new("add")
            .doc("Add two numbers.")
            .source("fn add(x, y) { x + y }")
            .param("x")
            .param("y");
        let schema = ProcessSchema::build(&descriptor, RecordKind::Calculation, &[]).unwrap();
        let inputs = create_inputs(&schema, vec![Value::Int(1), Value::Int(2)], Kwargs::new()).unwrap();
        ExecutionRecord::new(&schema, inputs)
    }

    #[test]
    fn new_record_is_pending() {
        let record = record();
        assert_eq!(record.state(), ProcessState::Pending);
        assert!(record.exit_status().is_none());
        assert!(!record.is_terminated());
        assert_eq!(record.label(), "add");
        assert_eq!(record.description(), Some("Add two numbers."));
        assert_eq!(record.inputs().get("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn source_text_is_stored_as_blob() {
        let record = record();
        assert_eq!(record.blob_names(), vec![SOURCE_FILE_BLOB]);
        assert_eq!(
            record.blob_content(SOURCE_FILE_BLOB).as_deref(),
            Some("fn add(x, y) { x + y }")
        );
    }

    #[test]
    fn finish_ok_and_failed() {
        let mut ok = record();
        ok.transition(ProcessState::Running).unwrap();
        ok.finish(ExitCode::success()).unwrap();
        assert!(ok.is_finished_ok());
        assert!(!ok.is_failed());

        let mut failed = record();
        failed.transition(ProcessState::Running).unwrap();
        failed
            .finish(ExitCode {
                status: 251,
                message: Some("boom".into()),
            })
            .unwrap();
        assert!(failed.is_failed());
        assert_eq!(failed.exit_status(), Some(251));
        assert_eq!(failed.exit_message(), Some("boom"));
    }

    #[test]
    fn kill_only_from_running() {
        let mut pending = record();
        assert!(pending.kill("interrupted").is_err());

        let mut running = record();
        running.transition(ProcessState::Running).unwrap();
        running.kill("interrupted").unwrap();
        assert!(running.is_killed());
        assert!(running.is_terminated());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut record = record();
        record.transition(ProcessState::Running).unwrap();
        record.finish(ExitCode::success()).unwrap();

        assert!(record.kill("late").is_err());
        assert!(record.transition(ProcessState::Running).is_err());
        assert!(record.finish(ExitCode::success()).is_err());
    }

    #[test]
    fn put_blob_reads_stream() {
        let mut record = record();
        record.put_blob("stderr", &b""[..]).unwrap();
        record.put_blob("stdout", &b"hello\n"[..]).unwrap();

        assert_eq!(record.blob_content("stderr").as_deref(), Some(""));
        assert_eq!(record.blob("stdout"), Some(&b"hello\n"[..]));
        assert_eq!(record.blob_names(), vec![SOURCE_FILE_BLOB, "stderr", "stdout"]);
    }

    #[test]
    fn mark_non_persistable_keeps_reason() {
        let mut record = record();
        assert!(record.is_storable());
        record.mark_non_persistable("not today");
        assert!(!record.is_storable());
        assert_eq!(record.unstorable_message(), Some("not today"));
    }

    #[test]
    fn summary_lists_sizes_not_content() {
        let mut record = record();
        record.put_blob("stdout", &b"abc"[..]).unwrap();
        let summary = record.summary();

        assert_eq!(summary["state"], json!("pending"));
        assert_eq!(summary["kind"], json!("calculation"));
        assert_eq!(summary["blobs"]["stdout"], json!(3));
        assert_eq!(summary["inputs"]["x"], json!(1));
        assert_eq!(summary["attributes"]["function_name"], json!("add"));
    }
}

//! Exit codes: terminal outcome classifications of a process

use crate::error::{Result, ShellfnError};

/// Exit status of a finished process. Zero means success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCode {
    pub status: u32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn success() -> Self {
        Self {
            status: 0,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

impl Default for ExitCode {
    fn default() -> Self {
        Self::success()
    }
}

/// A registered exit code: numeric status, symbolic key and message template.
///
/// Templates reference parameters as `{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCodeSpec {
    pub status: u32,
    pub key: String,
    pub message: String,
}

impl ExitCodeSpec {
    /// Instantiate the exit code, substituting `{name}` parameters in the message
    pub fn format(&self, params: &[(&str, &str)]) -> ExitCode {
        let mut message = self.message.clone();
        for (name, value) in params {
            message = message.replace(&format!("{{{}}}", name), value);
        }
        ExitCode {
            status: self.status,
            message: Some(message),
        }
    }
}

/// Exit code table of a process schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitCodes {
    codes: Vec<ExitCodeSpec>,
}

impl ExitCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exit code. Status zero and duplicate keys or statuses are rejected.
    pub fn register(&mut self, status: u32, key: &str, message: &str) -> Result<()> {
        if status == 0 {
            return Err(ShellfnError::InvalidConfig(format!(
                "exit code `{}` cannot use status 0, which is reserved for success",
                key
            )));
        }
        if key.is_empty() {
            return Err(ShellfnError::InvalidConfig(
                "exit code key cannot be empty".to_string(),
            ));
        }
        if let Some(existing) = self
            .codes
            .iter()
            .find(|code| code.key == key || code.status == status)
        {
            return Err(ShellfnError::InvalidConfig(format!(
                "exit code `{}` ({}) conflicts with `{}` ({})",
                key, status, existing.key, existing.status
            )));
        }
        self.codes.push(ExitCodeSpec {
            status,
            key: key.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ExitCodeSpec> {
        self.codes.iter().find(|code| code.key == key)
    }

    pub fn by_status(&self, status: u32) -> Option<&ExitCodeSpec> {
        self.codes.iter().find(|code| code.status == status)
    }

    /// Look up a code that the caller registered itself
    pub fn require(&self, key: &str) -> Result<&ExitCodeSpec> {
        self.get(key)
            .ok_or_else(|| ShellfnError::InvalidConfig(format!("exit code `{}` is not registered", key)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExitCodeSpec> {
        self.codes.iter()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

//! Declared output files and their reconciliation against the scratch directory

use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use log::{debug, warn};
use shellfn_core::{FileContent, Outputs, Result, ShellfnError, Value};

/// A declared output file name, literal or wildcard pattern
#[derive(Debug, Clone, PartialEq)]
pub enum OutputDeclaration {
    Literal(String),
    Wildcard(Pattern),
}

impl OutputDeclaration {
    /// Parse a declared name. Empty names, absolute paths and `..` are rejected.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(ShellfnError::InvalidConfig(
                "output filenames must not be empty".to_string(),
            ));
        }

        for component in Path::new(name).components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(ShellfnError::InvalidConfig(format!(
                        "output filename `{}` must be a relative path inside the working directory",
                        name
                    )));
                }
            }
        }

        if name.contains(['*', '?', '[']) {
            let pattern = Pattern::new(name).map_err(|e| {
                ShellfnError::InvalidConfig(format!("invalid output pattern `{}`: {}", name, e))
            })?;
            Ok(OutputDeclaration::Wildcard(pattern))
        } else {
            Ok(OutputDeclaration::Literal(name.to_string()))
        }
    }

    /// The name as declared
    pub fn as_str(&self) -> &str {
        match self {
            OutputDeclaration::Literal(name) => name,
            OutputDeclaration::Wildcard(pattern) => pattern.as_str(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, OutputDeclaration::Wildcard(_))
    }
}

/// Output key of a produced file: every non-identifier character becomes `_`
pub fn normalize_key(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Files collected for the declared outputs
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub outputs: Outputs,
    /// Declared names or patterns that produced nothing
    pub missing: Vec<String>,
}

/// Match every declaration against `dir`, reading matched files into outputs
pub fn reconcile(dir: &Path, declarations: &[OutputDeclaration]) -> Result<Reconciliation> {
    let mut reconciliation = Reconciliation::default();

    for declaration in declarations {
        let matched = match declaration {
            OutputDeclaration::Literal(name) => {
                let path = dir.join(name);
                if path.is_file() { vec![path] } else { Vec::new() }
            }
            OutputDeclaration::Wildcard(pattern) => expand(dir, pattern)?,
        };

        if matched.is_empty() {
            debug!("Declared output `{}` was not produced", declaration.as_str());
            reconciliation.missing.push(declaration.as_str().to_string());
            continue;
        }

        for path in matched {
            let Some(filename) = path.file_name().map(|name| name.to_string_lossy().into_owned())
            else {
                continue;
            };
            let key = normalize_key(&filename);
            let file = FileContent::from_path(&path)?;
            if reconciliation
                .outputs
                .insert(key.clone(), Value::File(file))
                .is_some()
            {
                warn!("Output `{}` matched more than one file, keeping {}", key, path.display());
            }
        }
    }

    Ok(reconciliation)
}

fn expand(dir: &Path, pattern: &Pattern) -> Result<Vec<PathBuf>> {
    let base = dir.to_str().ok_or_else(|| {
        ShellfnError::InvalidConfig(format!(
            "working directory {} is not valid UTF-8",
            dir.display()
        ))
    })?;
    let full = format!("{}/{}", Pattern::escape(base), pattern.as_str());

    let entries = glob::glob(&full).map_err(|e| {
        ShellfnError::InvalidConfig(format!(
            "invalid output pattern `{}`: {}",
            pattern.as_str(),
            e
        ))
    })?;

    let mut matched = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ShellfnError::Io(e.into_error()))?;
        if path.is_file() {
            matched.push(path);
        }
    }
    matched.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(matched)
}

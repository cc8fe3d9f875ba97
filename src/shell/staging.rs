//! Argument planning and file staging in the scratch directory

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::debug;
use shellfn_core::{FileContent, Result, ShellfnError, Value};
use tempfile::TempDir;

use crate::inputs::Kwargs;
use crate::shell::template::ArgumentTemplate;

/// One entry of the command line, before staging
#[derive(Debug, Clone)]
enum PlannedArgument {
    Literal(String),
    /// File staged in the scratch directory as `name`; the template wraps its path if present
    Staged {
        name: String,
        template: Option<ArgumentTemplate>,
        file: FileContent,
    },
}

/// Validated command line: every placeholder resolved and every file accounted for
#[derive(Debug, Clone, Default)]
pub struct ArgumentPlan {
    entries: Vec<PlannedArgument>,
}

impl ArgumentPlan {
    /// Plan the command line from the `arguments` input and the keyword inputs.
    ///
    /// Placeholders consume the file they name from `kwargs`. Files left in `kwargs`
    /// afterwards are appended as extra arguments in encounter order. A file without a
    /// filename of its own is staged under its keyword. Nothing touches the filesystem,
    /// so every configuration error surfaces before staging.
    pub fn build(arguments: Option<&Value>, mut kwargs: Kwargs) -> Result<Self> {
        let mut entries = Vec::new();

        if let Some(arguments) = arguments {
            let strings = arguments.as_str_list().ok_or_else(|| {
                ShellfnError::Type(format!(
                    "the `arguments` input should be a list of strings, but got: {}",
                    arguments.type_name()
                ))
            })?;

            for argument in strings {
                let template = ArgumentTemplate::parse(argument)?;
                let Some(name) = template.placeholder().map(str::to_string) else {
                    entries.push(PlannedArgument::Literal(argument.to_string()));
                    continue;
                };

                let value = kwargs.remove(&name).ok_or_else(|| {
                    ShellfnError::InvalidConfig(format!(
                        "command line arguments include placeholder `{{{}}}` but no corresponding file is specified in the input keyword arguments",
                        name
                    ))
                })?;
                entries.push(staged(&name, value, Some(template))?);
            }
        }

        for (name, value) in kwargs {
            entries.push(staged(&name, value, None)?);
        }

        let plan = Self { entries };
        plan.check_filenames()?;
        Ok(plan)
    }

    /// Number of files the plan stages
    pub fn staged_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, PlannedArgument::Staged { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_filenames(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if let PlannedArgument::Staged { name, .. } = entry {
                validate_filename(name)?;
                if !seen.insert(name.as_str()) {
                    return Err(ShellfnError::InvalidConfig(format!(
                        "more than one input file is staged as `{}`",
                        name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn staged(
    keyword: &str,
    value: Value,
    template: Option<ArgumentTemplate>,
) -> Result<PlannedArgument> {
    let file = expect_file(keyword, value)?;
    let name = file.declared_filename().unwrap_or(keyword).to_string();
    Ok(PlannedArgument::Staged {
        name,
        template,
        file,
    })
}

fn expect_file(name: &str, value: Value) -> Result<FileContent> {
    match value {
        Value::File(file) => Ok(file),
        other => Err(ShellfnError::Type(format!(
            "keyword argument `{}` should be file content, but got: {}",
            name,
            other.type_name()
        ))),
    }
}

/// Staged files must be a single plain path component
fn validate_filename(filename: &str) -> Result<()> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ShellfnError::InvalidConfig(format!(
            "input file name `{}` must be a plain file name",
            filename
        ))),
    }
}

/// Private temporary working directory of one invocation, removed on drop
#[derive(Debug)]
pub struct ScratchDirectory {
    dir: TempDir,
}

impl ScratchDirectory {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("shellfn-").tempdir()?;
        debug!("Created scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the directory as `name` and return its absolute path
    pub fn write(&self, name: &str, file: &FileContent) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, file.content())?;
        Ok(path)
    }

    /// Stage every planned file and render the final argument vector
    pub fn stage(&self, plan: &ArgumentPlan) -> Result<Vec<String>> {
        plan.entries
            .iter()
            .map(|entry| match entry {
                PlannedArgument::Literal(argument) => Ok(argument.clone()),
                PlannedArgument::Staged {
                    name,
                    template,
                    file,
                } => {
                    let path = self.write(name, file)?;
                    let path = path.to_string_lossy();
                    Ok(match template {
                        Some(template) => template.render(&path),
                        None => path.into_owned(),
                    })
                }
            })
            .collect()
    }

    /// Remove the directory now, reporting errors that drop would swallow
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

//! Command line argument templates with at most one `{name}` placeholder

use shellfn_core::{Result, ShellfnError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

/// A parsed command line argument.
///
/// `{name}` marks a placeholder, `{{` and `}}` are literal braces, and `{}` is kept
/// literally. Anything after `:` or `!` inside a field is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl ArgumentTemplate {
    /// Parse an argument. More than one placeholder or unbalanced braces are rejected.
    pub fn parse(argument: &str) -> Result<Self> {
        let segments = scan(argument)?;

        let fields = segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Field(_)))
            .count();
        if fields > 1 {
            return Err(ShellfnError::InvalidConfig(format!(
                "command line argument `{}` is invalid as it contains more than one placeholder",
                argument
            )));
        }

        Ok(Self {
            raw: argument.to_string(),
            segments,
        })
    }

    /// Name of the placeholder, if any
    pub fn placeholder(&self) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// The argument as given
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Substitute the placeholder. Arguments without one are returned verbatim.
    pub fn render(&self, value: &str) -> String {
        if self.placeholder().is_none() {
            return self.raw.clone();
        }
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.as_str(),
                Segment::Field(_) => value,
            })
            .collect()
    }
}

fn scan(argument: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = argument.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => {
                            return Err(unbalanced(argument, "nested '{' in placeholder"));
                        }
                        Some(inner) => field.push(inner),
                        None => return Err(unbalanced(argument, "unmatched '{'")),
                    }
                }
                let name = field
                    .split([':', '!'])
                    .next()
                    .unwrap_or_default()
                    .to_string();
                if name.is_empty() {
                    text.push('{');
                    text.push_str(&field);
                    text.push('}');
                } else {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Field(name));
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '}' => return Err(unbalanced(argument, "single '}' encountered")),
            other => text.push(other),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

fn unbalanced(argument: &str, reason: &str) -> ShellfnError {
    ShellfnError::InvalidConfig(format!(
        "command line argument `{}` is invalid: {}",
        argument, reason
    ))
}

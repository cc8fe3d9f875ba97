//! Input binding: mapping call arguments onto schema slots

use shellfn_core::{Result, ShellfnError, Value};

use crate::schema::ProcessSchema;

/// Keyword inputs in encounter order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    entries: Vec<(String, Value)>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`Kwargs::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Remove a value, preserving the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Kwargs
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kwargs = Kwargs::new();
        for (key, value) in iter {
            kwargs.insert(key, value);
        }
        kwargs
    }
}

impl IntoIterator for Kwargs {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Inputs bound to a schema, keyed by slot or keyword name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundInputs {
    values: Kwargs,
}

impl BoundInputs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Split into one positional value per slot, defaults applied, and the keyword rest
    pub fn split(&self, schema: &ProcessSchema) -> (Vec<Value>, Kwargs) {
        let args = schema
            .slots()
            .iter()
            .map(|slot| {
                self.values
                    .get(slot.name())
                    .or_else(|| slot.default())
                    .cloned()
                    .unwrap_or(Value::None)
            })
            .collect();

        let kwargs = self
            .values
            .iter()
            .filter(|(name, _)| schema.slot(name).is_none())
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();

        (args, kwargs)
    }
}

/// Validate positional and keyword arguments against the schema.
///
/// More positional arguments than slots is always rejected. For a dynamic schema the
/// surplus would otherwise be absorbed as keyword inputs without a name to link them by.
pub fn validate_inputs(schema: &ProcessSchema, args: &[Value], kwargs: &Kwargs) -> Result<()> {
    let nargs = args.len();
    let nparameters = schema.slots().len();

    if nargs > nparameters {
        return Err(ShellfnError::InvalidInputs(format!(
            "{}() takes {} positional arguments but {} were given",
            schema.name(),
            nparameters,
            nargs
        )));
    }

    if !schema.is_dynamic() {
        let unknown: Vec<&str> = kwargs
            .keys()
            .filter(|name| schema.slot(name).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(ShellfnError::InvalidInputs(format!(
                "{} does not support these kwargs: {:?}",
                schema.name(),
                unknown
            )));
        }
    }

    Ok(())
}

/// Bind call arguments: zip positionals onto slot names, then overlay keywords.
///
/// A keyword naming a slot that was also filled positionally wins.
pub fn create_inputs(schema: &ProcessSchema, args: Vec<Value>, kwargs: Kwargs) -> Result<BoundInputs> {
    validate_inputs(schema, &args, &kwargs)?;

    let mut values = Kwargs::new();
    for (slot, value) in schema.slots().iter().zip(args) {
        values.insert(slot.name(), value);
    }
    for (name, value) in kwargs {
        values.insert(name, value);
    }

    for slot in schema.slots() {
        match values.get(slot.name()) {
            None if !slot.has_default() => {
                return Err(ShellfnError::InvalidInputs(format!(
                    "{}() is missing required input `{}`",
                    schema.name(),
                    slot.name()
                )));
            }
            Some(Value::None) if !slot.is_nullable() => {
                return Err(ShellfnError::InvalidInputs(format!(
                    "input `{}` of {}() does not accept none",
                    slot.name(),
                    schema.name()
                )));
            }
            _ => {}
        }
    }

    Ok(BoundInputs { values })
}

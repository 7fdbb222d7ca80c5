//! Answer map assembly for a whole schema.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;
use crate::validate::{serialize_answer, validate, AnswerError};

/// Submitted answers keyed by field label. Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<String, String>);

impl AnswerMap {
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    /// Serializes to the submission payload.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Validation failures of a submission, keyed by label in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, AnswerError)>);

impl FieldErrors {
    /// Error for the given field, if it failed.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&AnswerError> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, e)| e)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerError)> {
        self.0.iter().map(|(l, e)| (l.as_str(), e))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, error)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{label}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Validates every field of `schema` against the caller's values and builds
/// the answer map.
///
/// A label missing from `values` is treated as an empty value. The map
/// contains exactly the schema's labels; optional fields left blank map to
/// an empty string.
///
/// # Errors
///
/// Returns every failing field, in schema order, if any field fails.
pub fn collect_answers(
    schema: &Schema,
    values: &HashMap<String, String>,
) -> Result<AnswerMap, FieldErrors> {
    let mut answers = BTreeMap::new();
    let mut errors = Vec::new();

    for field in schema {
        let raw = values.get(&field.label).map_or("", String::as_str);
        match validate(field, raw) {
            Ok(value) => {
                let (label, serialized) = serialize_answer(field, &value);
                answers.insert(label, serialized);
            }
            Err(error) => errors.push((field.label.clone(), error)),
        }
    }

    if errors.is_empty() {
        Ok(AnswerMap(answers))
    } else {
        Err(FieldErrors(errors))
    }
}

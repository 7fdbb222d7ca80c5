//! Field model: the typed vocabulary of a single form field.
//!
//! A [`Field`] is the unit of a registration form schema. Its wire shape is
//! a flat JSON object (`label`, `type`, `required`, plus optional
//! `placeholder`, `description`, `options`, `validation`). Absent optional
//! attributes are omitted rather than written as `null` so that a
//! serialize/deserialize round trip is exact.
//!
//! # Invariant
//!
//! Choice types (`select`, `radio`, `checkbox`) carry a non-empty list of
//! trimmed, non-empty, distinct options. Every other type carries no options.
//! [`Field::check`] enforces this together with the constraints on
//! `validation`; the schema store calls it at every mutation boundary.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Separator used both to split raw operator option input and to join
/// multiple checkbox selections in an answer.
pub const OPTION_DELIMITER: char = ',';

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// Closed set of field types. Lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Tel,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
}

impl FieldType {
    /// Every variant, in the order the builder palette lists them.
    pub const ALL: [FieldType; 9] = [
        FieldType::Text,
        FieldType::Email,
        FieldType::Tel,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Date,
    ];

    /// Whether fields of this type must enumerate options.
    #[must_use]
    pub fn requires_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }

    /// Whether `minLength`/`maxLength`/`pattern` constraints apply to this type.
    #[must_use]
    pub fn is_free_text(self) -> bool {
        matches!(
            self,
            FieldType::Text
                | FieldType::Email
                | FieldType::Tel
                | FieldType::Number
                | FieldType::Textarea
        )
    }

    /// Wire name of the variant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Tel => "tel",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
        }
    }

    /// Operator-facing name shown in the builder palette and used for
    /// defaulted labels.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            FieldType::Text => "Testo",
            FieldType::Email => "Email",
            FieldType::Tel => "Telefono",
            FieldType::Number => "Numero",
            FieldType::Textarea => "Testo lungo",
            FieldType::Select => "Menu a tendina",
            FieldType::Radio => "Scelta singola",
            FieldType::Checkbox => "Scelta multipla",
            FieldType::Date => "Data",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// Text constraints for free-text-like fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_length: Option<usize>,
    /// Regular expression the whole value must match.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pattern: Option<String>,
}

/// A single form field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Display name. Also the key of this field's answer.
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Present only for choice types, in declared order.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Vec<String>>,
    /// Present only for free-text-like types.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub validation: Option<FieldValidation>,
}

impl Field {
    /// Creates an optional field with no options or constraints.
    #[must_use]
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: label.into(),
            field_type,
            required: false,
            placeholder: None,
            description: None,
            options: None,
            validation: None,
        }
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Declared options, or an empty slice for scalar fields.
    #[must_use]
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }

    /// Checks the field invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldError`] found: blank label, missing or
    /// unexpected options, malformed option entries, constraints on a type
    /// that does not take them, inverted length bounds, or a pattern that
    /// does not compile.
    pub fn check(&self) -> Result<(), FieldError> {
        if self.label.trim().is_empty() {
            return Err(FieldError::BlankLabel);
        }

        if self.field_type.requires_options() {
            let options = self.options();
            if options.is_empty() {
                return Err(FieldError::MissingOptions {
                    field_type: self.field_type,
                });
            }
            for (i, option) in options.iter().enumerate() {
                if option.trim().is_empty() || option.trim() != option {
                    return Err(FieldError::MalformedOption {
                        option: option.clone(),
                    });
                }
                if options[..i].contains(option) {
                    return Err(FieldError::DuplicateOption {
                        option: option.clone(),
                    });
                }
                // A delimiter inside a checkbox option would be ambiguous in
                // the joined answer string.
                if self.field_type == FieldType::Checkbox && option.contains(OPTION_DELIMITER) {
                    return Err(FieldError::DelimiterInOption {
                        option: option.clone(),
                    });
                }
            }
        } else if self.options.is_some() {
            return Err(FieldError::UnexpectedOptions {
                field_type: self.field_type,
            });
        }

        if let Some(validation) = &self.validation {
            if !self.field_type.is_free_text() {
                return Err(FieldError::UnexpectedValidation {
                    field_type: self.field_type,
                });
            }
            if let (Some(min), Some(max)) = (validation.min_length, validation.max_length) {
                if min > max {
                    return Err(FieldError::LengthBounds { min, max });
                }
            }
            if let Some(pattern) = &validation.pattern {
                compile_pattern(pattern).map_err(|e| FieldError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            }
        }

        Ok(())
    }
}

/// Compiles a `pattern` constraint so that it must match the whole value.
///
/// # Errors
///
/// Returns the underlying `regex` error when the pattern is not valid.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Violations of the field invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("field label must not be blank")]
    BlankLabel,
    #[error("{field_type} field requires at least one option")]
    MissingOptions { field_type: FieldType },
    #[error("{field_type} field does not take options")]
    UnexpectedOptions { field_type: FieldType },
    #[error("option {option:?} is blank or has surrounding whitespace")]
    MalformedOption { option: String },
    #[error("option {option:?} is listed more than once")]
    DuplicateOption { option: String },
    #[error("checkbox option {option:?} contains the answer delimiter ','")]
    DelimiterInOption { option: String },
    #[error("{field_type} field does not take text constraints")]
    UnexpectedValidation { field_type: FieldType },
    #[error("minLength {min} exceeds maxLength {max}")]
    LengthBounds { min: usize, max: usize },
    #[error("pattern {pattern:?} does not compile: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

// ---------------------------------------------------------------------------
// FieldPatch
// ---------------------------------------------------------------------------

/// Partial update merged into an existing [`Field`].
///
/// `None` leaves an attribute untouched. For clearable attributes the inner
/// `Option` distinguishes "set" (`Some(Some(v))`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::option_option)]
pub struct FieldPatch {
    pub label: Option<String>,
    pub field_type: Option<FieldType>,
    pub required: Option<bool>,
    pub placeholder: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub options: Option<Option<Vec<String>>>,
    pub validation: Option<Option<FieldValidation>>,
}

impl FieldPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: Option<String>) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn options(mut self, options: Option<Vec<String>>) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn validation(mut self, validation: Option<FieldValidation>) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Merges the patch into a copy of `field`.
    ///
    /// Attributes that no longer apply to the merged type are dropped:
    /// `options` for scalar types and `validation` for types without free
    /// text. This includes options or validation set by the patch itself.
    /// The result is not checked; callers run [`Field::check`].
    #[must_use]
    pub fn apply(&self, field: &Field) -> Field {
        let mut merged = field.clone();
        if let Some(label) = &self.label {
            merged.label.clone_from(label);
        }
        if let Some(field_type) = self.field_type {
            merged.field_type = field_type;
        }
        if let Some(required) = self.required {
            merged.required = required;
        }
        if let Some(placeholder) = &self.placeholder {
            merged.placeholder.clone_from(placeholder);
        }
        if let Some(description) = &self.description {
            merged.description.clone_from(description);
        }
        if let Some(options) = &self.options {
            merged.options.clone_from(options);
        }
        if let Some(validation) = &self.validation {
            merged.validation.clone_from(validation);
        }

        if !merged.field_type.requires_options() {
            merged.options = None;
        }
        if !merged.field_type.is_free_text() {
            merged.validation = None;
        }
        merged
    }
}

// ---------------------------------------------------------------------------
// Operator input helpers
// ---------------------------------------------------------------------------

/// Splits comma-separated operator input into option entries.
///
/// Tokens are trimmed and empty tokens dropped; order is preserved and
/// duplicates are kept (the invariant check rejects them).
#[must_use]
pub fn normalize_options(raw: &str) -> Vec<String> {
    raw.split(OPTION_DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Whether `field_type` must enumerate options.
#[must_use]
pub fn requires_options(field_type: FieldType) -> bool {
    field_type.requires_options()
}

/// Label given to a quick-added field the operator has not named.
///
/// `position` is the 1-based position the field will occupy.
#[must_use]
pub fn default_label(field_type: FieldType, position: usize) -> String {
    format!("{} {position}", field_type.display_name())
}

//! Answer validation and serialization for a single field.
//!
//! [`validate`] applies the checks in a fixed order so the reported error
//! is deterministic:
//!
//! 1. required-ness (an empty value on a required field)
//! 2. `minLength`, `maxLength`, `pattern` for free-text types
//! 3. the type's own shape (email, number, phone, date)
//! 4. option membership for `select`/`radio`
//! 5. option membership of every component for `checkbox`
//!
//! An empty value on an optional field passes and skips the remaining checks.

use chrono::NaiveDate;

use crate::field::{compile_pattern, Field, FieldType, OPTION_DELIMITER};

/// A value that passed [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedValue {
    /// Optional field left blank.
    Empty,
    /// Free-text or date value, trimmed.
    Text(String),
    /// The chosen option of a `select` or `radio` field.
    Choice(String),
    /// Chosen options of a `checkbox` field, in the order they were given.
    Selection(Vec<String>),
}

/// Why a candidate value was refused. Each variant names the violated
/// constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("campo obbligatorio")]
    MissingRequiredField,
    #[error("inserisci almeno {min} caratteri")]
    TooShort { min: usize },
    #[error("inserisci al massimo {max} caratteri")]
    TooLong { max: usize },
    #[error("il valore non rispetta il formato richiesto")]
    PatternMismatch { pattern: String },
    #[error("indirizzo email non valido")]
    InvalidEmail,
    #[error("numero non valido")]
    InvalidNumber,
    #[error("numero di telefono non valido")]
    InvalidPhone,
    #[error("data non valida (formato AAAA-MM-GG)")]
    InvalidDate,
    #[error("{value:?} non è tra le opzioni disponibili")]
    InvalidOption { value: String },
}

/// Validates a raw control value against `field`.
///
/// For `checkbox` fields the raw value is the comma-joined list of selected
/// options (see [`Selection::to_raw`]).
///
/// # Errors
///
/// Returns the first violated constraint in the order documented at the
/// module level.
pub fn validate(field: &Field, raw: &str) -> Result<NormalizedValue, AnswerError> {
    let value = raw.trim();
    let selection = (field.field_type == FieldType::Checkbox).then(|| split_selection(value));
    let is_empty = match &selection {
        Some(selected) => selected.is_empty(),
        None => value.is_empty(),
    };
    if is_empty {
        return if field.required {
            Err(AnswerError::MissingRequiredField)
        } else {
            Ok(NormalizedValue::Empty)
        };
    }

    match field.field_type {
        FieldType::Text
        | FieldType::Email
        | FieldType::Tel
        | FieldType::Number
        | FieldType::Textarea => {
            check_text_constraints(field, value)?;
            check_shape(field.field_type, value)?;
            Ok(NormalizedValue::Text(value.to_string()))
        }
        FieldType::Date => {
            check_shape(FieldType::Date, value)?;
            Ok(NormalizedValue::Text(value.to_string()))
        }
        FieldType::Select | FieldType::Radio => {
            if field.options().iter().any(|o| o == value) {
                Ok(NormalizedValue::Choice(value.to_string()))
            } else {
                Err(AnswerError::InvalidOption {
                    value: value.to_string(),
                })
            }
        }
        FieldType::Checkbox => {
            let selected = selection.unwrap_or_default();
            if let Some(unknown) = selected.iter().find(|s| !field.options().contains(s)) {
                return Err(AnswerError::InvalidOption {
                    value: unknown.clone(),
                });
            }
            Ok(NormalizedValue::Selection(selected))
        }
    }
}

/// Produces the `(key, value)` answer pair for a validated value.
///
/// Checkbox selections are written in the order the options are declared
/// in the schema, without repeats, so equal selections always serialize to
/// the same string regardless of click order.
#[must_use]
pub fn serialize_answer(field: &Field, value: &NormalizedValue) -> (String, String) {
    let serialized = match value {
        NormalizedValue::Empty => String::new(),
        NormalizedValue::Text(text) | NormalizedValue::Choice(text) => text.clone(),
        NormalizedValue::Selection(selected) => field
            .options()
            .iter()
            .filter(|option| selected.contains(option))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&OPTION_DELIMITER.to_string()),
    };
    (field.label.clone(), serialized)
}

fn split_selection(raw: &str) -> Vec<String> {
    raw.split(OPTION_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn check_text_constraints(field: &Field, value: &str) -> Result<(), AnswerError> {
    let Some(validation) = &field.validation else {
        return Ok(());
    };
    let length = value.chars().count();
    if let Some(min) = validation.min_length {
        if length < min {
            return Err(AnswerError::TooShort { min });
        }
    }
    if let Some(max) = validation.max_length {
        if length > max {
            return Err(AnswerError::TooLong { max });
        }
    }
    if let Some(pattern) = &validation.pattern {
        // A schema that reached this point has a compilable pattern; one that
        // did not is treated as unmatched rather than silently ignored.
        let matched = compile_pattern(pattern).is_ok_and(|re| re.is_match(value));
        if !matched {
            return Err(AnswerError::PatternMismatch {
                pattern: pattern.clone(),
            });
        }
    }
    Ok(())
}

fn check_shape(field_type: FieldType, value: &str) -> Result<(), AnswerError> {
    match field_type {
        FieldType::Email if !is_email(value) => Err(AnswerError::InvalidEmail),
        FieldType::Number if !value.parse::<f64>().is_ok_and(f64::is_finite) => {
            Err(AnswerError::InvalidNumber)
        }
        FieldType::Tel if !is_phone(value) => Err(AnswerError::InvalidPhone),
        FieldType::Date if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() => {
            Err(AnswerError::InvalidDate)
        }
        _ => Ok(()),
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !value.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

fn is_phone(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || " +-()./".contains(c))
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Live state of a checkbox group, in click order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Vec<String>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a selection from its raw comma-joined form.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        Self {
            selected: split_selection(raw),
        }
    }

    /// Flips `option` and returns whether it is now selected.
    pub fn toggle(&mut self, option: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|s| s == option) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(option.to_string());
            true
        }
    }

    #[must_use]
    pub fn contains(&self, option: &str) -> bool {
        self.selected.iter().any(|s| s == option)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Comma-joined raw value, in click order, as fed to [`validate`].
    #[must_use]
    pub fn to_raw(&self) -> String {
        self.selected.join(&OPTION_DELIMITER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValidation;

    fn nome() -> Field {
        Field::new("Nome", FieldType::Text)
            .required(true)
            .with_validation(FieldValidation {
                min_length: Some(5),
                max_length: None,
                pattern: None,
            })
    }

    fn colors() -> Field {
        Field::new("Colori", FieldType::Checkbox).with_options(["Red", "Green", "Blue"])
    }

    #[test]
    fn required_check_precedes_length_check() {
        assert_eq!(validate(&nome(), ""), Err(AnswerError::MissingRequiredField));
        assert_eq!(validate(&nome(), "   "), Err(AnswerError::MissingRequiredField));
        assert_eq!(validate(&nome(), "ab"), Err(AnswerError::TooShort { min: 5 }));
        assert_eq!(
            validate(&nome(), "abcde"),
            Ok(NormalizedValue::Text("abcde".to_string()))
        );
    }

    #[test]
    fn optional_empty_skips_constraints() {
        let field = nome().required(false);
        assert_eq!(validate(&field, ""), Ok(NormalizedValue::Empty));
        let radio = Field::new("Taglia", FieldType::Radio).with_options(["S"]);
        assert_eq!(validate(&radio, ""), Ok(NormalizedValue::Empty));
    }

    #[test]
    fn max_length_and_pattern_are_distinct_errors() {
        let field = Field::new("CAP", FieldType::Text).with_validation(FieldValidation {
            min_length: None,
            max_length: Some(5),
            pattern: Some("[0-9]+".to_string()),
        });
        assert_eq!(validate(&field, "123456"), Err(AnswerError::TooLong { max: 5 }));
        assert_eq!(
            validate(&field, "12a45"),
            Err(AnswerError::PatternMismatch {
                pattern: "[0-9]+".to_string()
            })
        );
        assert!(validate(&field, "00184").is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let field = Field::new("x", FieldType::Text).with_validation(FieldValidation {
            max_length: Some(3),
            ..FieldValidation::default()
        });
        assert!(validate(&field, "àèì").is_ok());
    }

    #[test]
    fn type_shapes() {
        let email = Field::new("Email", FieldType::Email);
        assert!(validate(&email, "mario@example.it").is_ok());
        assert_eq!(validate(&email, "mario@"), Err(AnswerError::InvalidEmail));
        assert_eq!(validate(&email, "mario.example.it"), Err(AnswerError::InvalidEmail));
        assert_eq!(validate(&email, "ma rio@example.it"), Err(AnswerError::InvalidEmail));

        let number = Field::new("Età", FieldType::Number);
        assert!(validate(&number, "42").is_ok());
        assert!(validate(&number, "-3.5").is_ok());
        assert_eq!(validate(&number, "quaranta"), Err(AnswerError::InvalidNumber));
        assert_eq!(validate(&number, "inf"), Err(AnswerError::InvalidNumber));

        let tel = Field::new("Telefono", FieldType::Tel);
        assert!(validate(&tel, "+39 06 1234-5678").is_ok());
        assert_eq!(validate(&tel, "chiamami"), Err(AnswerError::InvalidPhone));

        let date = Field::new("Nascita", FieldType::Date);
        assert!(validate(&date, "1990-02-28").is_ok());
        assert_eq!(validate(&date, "1990-02-30"), Err(AnswerError::InvalidDate));
        assert_eq!(validate(&date, "28/02/1990"), Err(AnswerError::InvalidDate));
    }

    #[test]
    fn length_check_precedes_shape_check() {
        let email = Field::new("Email", FieldType::Email).with_validation(FieldValidation {
            min_length: Some(10),
            ..FieldValidation::default()
        });
        assert_eq!(validate(&email, "a@b"), Err(AnswerError::TooShort { min: 10 }));
    }

    #[test]
    fn single_choice_must_be_declared() {
        let field = Field::new("Taglia", FieldType::Select).with_options(["S", "M"]);
        assert_eq!(
            validate(&field, "M"),
            Ok(NormalizedValue::Choice("M".to_string()))
        );
        assert_eq!(
            validate(&field, "XL"),
            Err(AnswerError::InvalidOption {
                value: "XL".to_string()
            })
        );
    }

    #[test]
    fn every_checkbox_component_must_be_declared() {
        assert_eq!(
            validate(&colors(), "Red,Purple"),
            Err(AnswerError::InvalidOption {
                value: "Purple".to_string()
            })
        );
        assert!(validate(&colors(), "Blue, Red").is_ok());
    }

    #[test]
    fn required_checkbox_with_only_delimiters_is_missing() {
        let field = colors().required(true);
        assert_eq!(validate(&field, " , "), Err(AnswerError::MissingRequiredField));
    }

    #[test]
    fn checkbox_serializes_in_declared_order() {
        let field = colors();
        let mut selection = Selection::new();
        selection.toggle("Blue");
        selection.toggle("Red");
        assert_eq!(selection.to_raw(), "Blue,Red");

        let value = validate(&field, &selection.to_raw()).expect("valid");
        assert_eq!(
            serialize_answer(&field, &value),
            ("Colori".to_string(), "Red,Blue".to_string())
        );
    }

    #[test]
    fn checkbox_serialization_drops_repeats() {
        let field = colors();
        let value = validate(&field, "Green,Green,Red").expect("valid");
        assert_eq!(serialize_answer(&field, &value).1, "Red,Green");
    }

    #[test]
    fn empty_value_serializes_to_empty_string() {
        let field = Field::new("Nota", FieldType::Textarea);
        assert_eq!(
            serialize_answer(&field, &NormalizedValue::Empty),
            ("Nota".to_string(), String::new())
        );
    }

    #[test]
    fn selection_toggle_round_trip() {
        let mut selection = Selection::from_raw("Red, Blue");
        assert!(selection.contains("Blue"));
        assert!(!selection.toggle("Blue"));
        assert!(!selection.contains("Blue"));
        assert!(selection.toggle("Green"));
        assert_eq!(selection.to_raw(), "Red,Green");
        assert!(!selection.is_empty());
    }
}

//! Schema store: the ordered, immutable-snapshot collection of fields.
//!
//! A [`Schema`] is a cheap-to-clone snapshot (`Arc<[Field]>`). Every
//! mutation returns a new snapshot and leaves the receiver untouched, so a
//! holder of an older snapshot never observes later edits. Each mutation
//! re-checks the field invariant and label uniqueness before the new
//! snapshot is handed out; a rejected mutation produces no snapshot at all.
//!
//! # Wire format
//!
//! A schema serializes to a JSON array of fields in display order. Parsing
//! runs the same checks as the mutation path, so a schema read back from
//! storage is either fully valid or rejected as a whole.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::field::{Field, FieldError, FieldPatch};

/// Suffix appended to the label of a duplicated field.
const COPY_SUFFIX: &str = "copia";

/// Ordered snapshot of the fields of one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Arc<[Field]>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: Arc::from(Vec::new()),
        }
    }

    /// Builds a schema from a list of fields, checking every field and
    /// label uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidField`] for the first field violating
    /// the field invariant, or [`SchemaError::DuplicateLabel`].
    pub fn from_fields(fields: Vec<Field>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            field
                .check()
                .map_err(|source| SchemaError::InvalidField { index, source })?;
            if !seen.insert(field.label.as_str()) {
                return Err(SchemaError::DuplicateLabel {
                    label: field.label.clone(),
                });
            }
        }
        Ok(Self {
            fields: Arc::from(fields),
        })
    }

    /// Parses the JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Malformed`] when the input is not a JSON array
    /// of fields, or the checking errors of [`Schema::from_fields`].
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let fields: Vec<Field> = serde_json::from_str(json)?;
        Self::from_fields(fields).inspect_err(|e| {
            tracing::debug!(error = %e, "stored schema rejected");
        })
    }

    /// Serializes to the JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(&*self.fields)?)
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Index of the field with the given label.
    #[must_use]
    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.label == label)
    }

    /// Returns `base` if no field uses it, otherwise the first free
    /// `"base (n)"` for n = 2, 3, ...
    #[must_use]
    pub fn unique_label(&self, base: &str) -> String {
        if self.position_of(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base} ({n})"))
            .find(|candidate| self.position_of(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Appends a field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidField`] if `field` violates the field
    /// invariant, or [`SchemaError::DuplicateLabel`] if its label is taken.
    pub fn add_field(&self, field: Field) -> Result<Self, SchemaError> {
        let index = self.len();
        field
            .check()
            .map_err(|source| SchemaError::InvalidField { index, source })?;
        if self.position_of(&field.label).is_some() {
            return Err(SchemaError::DuplicateLabel { label: field.label });
        }
        let mut fields = self.fields.to_vec();
        fields.push(field);
        Ok(Self::from_vec(fields))
    }

    /// Removes the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] if `index >= len`.
    pub fn remove_field(&self, index: usize) -> Result<Self, SchemaError> {
        self.check_index(index)?;
        let mut fields = self.fields.to_vec();
        fields.remove(index);
        Ok(Self::from_vec(fields))
    }

    /// Merges `patch` into the field at `index` and re-checks the result.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`], [`SchemaError::InvalidField`]
    /// (for example a scalar field turned into a choice field without
    /// options), or [`SchemaError::DuplicateLabel`] when renaming onto an
    /// existing label.
    pub fn update_field(&self, index: usize, patch: &FieldPatch) -> Result<Self, SchemaError> {
        self.check_index(index)?;
        let merged = patch.apply(&self.fields[index]);
        merged
            .check()
            .map_err(|source| SchemaError::InvalidField { index, source })?;
        if let Some(other) = self.position_of(&merged.label) {
            if other != index {
                return Err(SchemaError::DuplicateLabel {
                    label: merged.label,
                });
            }
        }
        let mut fields = self.fields.to_vec();
        fields[index] = merged;
        Ok(Self::from_vec(fields))
    }

    /// Appends a deep copy of the field at `index` to the end of the
    /// schema, with its label suffixed to stay unique.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] if `index >= len`.
    pub fn duplicate_field(&self, index: usize) -> Result<Self, SchemaError> {
        self.check_index(index)?;
        let source = &self.fields[index];
        let mut copy = source.clone();
        copy.label = self.copy_label(&source.label);
        let mut fields = self.fields.to_vec();
        fields.push(copy);
        Ok(Self::from_vec(fields))
    }

    /// Moves the field at `from` so that it ends up at `to`.
    ///
    /// Splice-out then splice-in: the field is removed first and `to` is
    /// interpreted against the shortened sequence. Both indices must be
    /// valid for the current schema. `from == to` returns an equal snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] if either index is `>= len`.
    pub fn move_field(&self, from: usize, to: usize) -> Result<Self, SchemaError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(self.clone());
        }
        let mut fields = self.fields.to_vec();
        let moved = fields.remove(from);
        fields.insert(to, moved);
        Ok(Self::from_vec(fields))
    }

    fn from_vec(fields: Vec<Field>) -> Self {
        Self {
            fields: Arc::from(fields),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), SchemaError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(SchemaError::IndexOutOfBounds {
                index,
                len: self.len(),
            })
        }
    }

    fn copy_label(&self, label: &str) -> String {
        let first = format!("{label} ({COPY_SUFFIX})");
        if self.position_of(&first).is_none() {
            return first;
        }
        (2..)
            .map(|n| format!("{label} ({COPY_SUFFIX} {n})"))
            .find(|candidate| self.position_of(candidate).is_none())
            .unwrap_or(first)
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Vec::<Field>::deserialize(deserializer)?;
        Self::from_fields(fields).map_err(serde::de::Error::custom)
    }
}

/// Errors from schema store operations and schema parsing.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("field at index {index} is invalid: {source}")]
    InvalidField {
        index: usize,
        #[source]
        source: FieldError,
    },
    #[error("label {label:?} is already used by another field")]
    DuplicateLabel { label: String },
    #[error("index {index} out of bounds for schema of {len} fields")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("malformed schema JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl SchemaError {
    /// Whether the error is a rejected mutation the operator can fix, as
    /// opposed to a caller bug (bad index) or unreadable stored data.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SchemaError::InvalidField { .. } | SchemaError::DuplicateLabel { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::field::{default_label, FieldType, FieldValidation};

    fn labels(schema: &Schema) -> Vec<&str> {
        schema.iter().map(|f| f.label.as_str()).collect()
    }

    fn abcd() -> Schema {
        ["A", "B", "C", "D"]
            .into_iter()
            .try_fold(Schema::new(), |s, l| s.add_field(Field::new(l, FieldType::Text)))
            .expect("build")
    }

    fn sports() -> Field {
        Field::new("Interessi", FieldType::Checkbox).with_options(["Calcio", "Basket"])
    }

    #[test]
    fn add_appends_in_order() {
        assert_eq!(labels(&abcd()), ["A", "B", "C", "D"]);
    }

    #[test]
    fn add_rejects_invalid_field_and_keeps_snapshot() {
        let schema = abcd();
        let err = schema
            .add_field(Field::new("Taglia", FieldType::Select))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidField {
                index: 4,
                source: FieldError::MissingOptions { .. }
            }
        ));
        assert!(err.is_validation());
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn add_rejects_duplicate_label() {
        let err = abcd().add_field(Field::new("B", FieldType::Email)).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateLabel { ref label } if label == "B"));
    }

    #[test]
    fn mutations_leave_previous_snapshot_untouched() {
        let before = abcd();
        let after = before.remove_field(0).expect("remove");
        assert_eq!(labels(&before), ["A", "B", "C", "D"]);
        assert_eq!(labels(&after), ["B", "C", "D"]);
    }

    #[test]
    fn remove_out_of_bounds_fails() {
        let err = abcd().remove_field(4).unwrap_err();
        assert!(matches!(err, SchemaError::IndexOutOfBounds { index: 4, len: 4 }));
        assert!(!err.is_validation());
    }

    #[test]
    fn update_merges_and_rechecks() {
        let schema = abcd()
            .update_field(1, &FieldPatch::new().required(true).label("Nome"))
            .expect("update");
        assert_eq!(labels(&schema), ["A", "Nome", "C", "D"]);
        assert!(schema.fields()[1].required);
    }

    #[test]
    fn update_to_choice_without_options_is_rejected() {
        let err = abcd()
            .update_field(0, &FieldPatch::new().field_type(FieldType::Radio))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidField {
                index: 0,
                source: FieldError::MissingOptions { .. }
            }
        ));
    }

    #[test]
    fn update_away_from_choice_drops_options() {
        let schema = Schema::new().add_field(sports()).expect("add");
        let schema = schema
            .update_field(0, &FieldPatch::new().field_type(FieldType::Text))
            .expect("update");
        assert!(schema.fields()[0].options.is_none());
    }

    #[test]
    fn update_rename_onto_other_label_is_rejected() {
        let err = abcd()
            .update_field(0, &FieldPatch::new().label("C"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateLabel { .. }));
        // Keeping its own label is fine.
        assert!(abcd().update_field(2, &FieldPatch::new().label("C")).is_ok());
    }

    #[test]
    fn update_out_of_bounds_fails() {
        assert!(matches!(
            abcd().update_field(9, &FieldPatch::new()),
            Err(SchemaError::IndexOutOfBounds { index: 9, .. })
        ));
    }

    #[test]
    fn duplicate_appends_suffixed_copy_at_end() {
        let schema = abcd().duplicate_field(1).expect("dup");
        assert_eq!(labels(&schema), ["A", "B", "C", "D", "B (copia)"]);
        let schema = schema.duplicate_field(1).expect("dup again");
        assert_eq!(schema.fields()[5].label, "B (copia 2)");
    }

    #[test]
    fn duplicate_does_not_alias_options() {
        let schema = Schema::new().add_field(sports()).expect("add");
        let schema = schema.duplicate_field(0).expect("dup");
        let schema = schema
            .update_field(
                1,
                &FieldPatch::new().options(Some(vec!["Nuoto".to_string()])),
            )
            .expect("edit copy");
        assert_eq!(schema.fields()[0].options(), ["Calcio", "Basket"]);
        assert_eq!(schema.fields()[1].options(), ["Nuoto"]);
    }

    #[test]
    fn move_uses_splice_semantics() {
        let moved = abcd().move_field(0, 2).expect("move");
        assert_eq!(labels(&moved), ["B", "C", "A", "D"]);
        let moved = moved.move_field(2, 3).expect("continue");
        assert_eq!(labels(&moved), ["B", "C", "D", "A"]);
    }

    #[test]
    fn move_towards_front() {
        let moved = abcd().move_field(3, 0).expect("move");
        assert_eq!(labels(&moved), ["D", "A", "B", "C"]);
    }

    #[test]
    fn move_to_same_index_is_noop() {
        let schema = abcd();
        assert_eq!(schema.move_field(2, 2).expect("noop"), schema);
    }

    #[test]
    fn move_rejects_out_of_range() {
        assert!(matches!(
            abcd().move_field(0, 4),
            Err(SchemaError::IndexOutOfBounds { index: 4, len: 4 })
        ));
        assert!(matches!(
            abcd().move_field(7, 0),
            Err(SchemaError::IndexOutOfBounds { index: 7, .. })
        ));
    }

    #[test]
    fn unique_label_appends_counter() {
        let schema = Schema::new()
            .add_field(Field::new("Testo 1", FieldType::Text))
            .and_then(|s| s.add_field(Field::new("Testo 1 (2)", FieldType::Text)))
            .expect("build");
        assert_eq!(schema.unique_label("Testo 2"), "Testo 2");
        assert_eq!(schema.unique_label("Testo 1"), "Testo 1 (3)");
    }

    #[test]
    fn json_wire_format() {
        let schema = Schema::new()
            .add_field(Field::new("Nome", FieldType::Text).required(true))
            .and_then(|s| s.add_field(sports()))
            .expect("build");
        let json: serde_json::Value =
            serde_json::from_str(&schema.to_json().expect("to_json")).expect("parse");
        assert_eq!(
            json,
            serde_json::json!([
                {"label": "Nome", "type": "text", "required": true},
                {"label": "Interessi", "type": "checkbox", "required": false,
                 "options": ["Calcio", "Basket"]}
            ])
        );
    }

    #[test]
    fn from_json_rejects_malformed_and_invalid() {
        assert!(matches!(
            Schema::from_json("{not json"),
            Err(SchemaError::Malformed(_))
        ));
        assert!(matches!(
            Schema::from_json(r#"[{"label":"x","type":"radio"}]"#),
            Err(SchemaError::InvalidField { index: 0, .. })
        ));
        assert!(matches!(
            Schema::from_json(r#"[{"label":"x","type":"text"},{"label":"x","type":"date"}]"#),
            Err(SchemaError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn from_json_defaults_required_to_false() {
        let schema = Schema::from_json(r#"[{"label":"Nota","type":"textarea"}]"#).expect("parse");
        assert!(!schema.fields()[0].required);
    }

    #[test]
    fn serde_deserialize_checks_fields() {
        let err = serde_json::from_str::<Schema>(r#"[{"label":"x","type":"text","options":["a"]}]"#);
        assert!(err.is_err());
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn arb_field_type() -> impl Strategy<Value = FieldType> {
        prop::sample::select(FieldType::ALL.to_vec())
    }

    fn arb_validation() -> impl Strategy<Value = Option<FieldValidation>> {
        prop::option::of(
            (
                prop::option::of(0usize..5),
                prop::option::of(5usize..20),
                prop::option::of(prop::sample::select(vec!["[a-z]+", "[0-9]{2,}", ".*"])),
            )
                .prop_map(|(min_length, max_length, pattern)| FieldValidation {
                    min_length,
                    max_length,
                    pattern: pattern.map(String::from),
                }),
        )
    }

    fn arb_field() -> impl Strategy<Value = Field> {
        (
            "[A-Za-z][A-Za-z ]{0,12}",
            arb_field_type(),
            any::<bool>(),
            prop::option::of("[a-z ]{0,10}"),
            prop::option::of("[a-z ]{0,20}"),
            prop::collection::btree_set("[A-Za-z]{1,8}", 1..5),
            arb_validation(),
        )
            .prop_map(
                |(label, field_type, required, placeholder, description, options, validation)| {
                    let mut field = Field::new(label.trim(), field_type).required(required);
                    field.placeholder = placeholder;
                    field.description = description;
                    if field_type.requires_options() {
                        field.options = Some(options.into_iter().collect());
                    }
                    if field_type.is_free_text() {
                        field.validation = validation;
                    }
                    field
                },
            )
    }

    fn arb_schema() -> impl Strategy<Value = Schema> {
        prop::collection::vec(arb_field(), 0..8).prop_map(|fields| {
            let fields = fields
                .into_iter()
                .enumerate()
                .map(|(i, mut f)| {
                    f.label = format!("{} #{i}", f.label);
                    f
                })
                .collect();
            Schema::from_fields(fields).expect("generated schema is valid")
        })
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(FieldType),
        Remove(usize),
        Retype(usize, FieldType),
        Duplicate(usize),
        Move(usize, usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            arb_field_type().prop_map(Op::Add),
            (0usize..10).prop_map(Op::Remove),
            (0usize..10, arb_field_type()).prop_map(|(i, t)| Op::Retype(i, t)),
            (0usize..10).prop_map(Op::Duplicate),
            (0usize..10, 0usize..10).prop_map(|(a, b)| Op::Move(a, b)),
        ]
    }

    fn apply(schema: &Schema, op: &Op) -> Result<Schema, SchemaError> {
        match op {
            Op::Add(field_type) => {
                let label = schema.unique_label(&default_label(*field_type, schema.len() + 1));
                let mut field = Field::new(label, *field_type);
                if field_type.requires_options() {
                    field = field.with_options(["Uno", "Due"]);
                }
                schema.add_field(field)
            }
            Op::Remove(i) => schema.remove_field(*i),
            Op::Retype(i, t) => schema.update_field(*i, &FieldPatch::new().field_type(*t)),
            Op::Duplicate(i) => schema.duplicate_field(*i),
            Op::Move(from, to) => schema.move_field(*from, *to),
        }
    }

    proptest! {
        #[test]
        fn json_round_trip_is_identity(schema in arb_schema()) {
            let json = schema.to_json().expect("to_json");
            let back = Schema::from_json(&json).expect("from_json");
            prop_assert_eq!(back, schema);
        }

        #[test]
        fn every_snapshot_satisfies_invariant(ops in prop::collection::vec(arb_op(), 0..40)) {
            let mut schema = Schema::new();
            for op in &ops {
                if let Ok(next) = apply(&schema, op) {
                    schema = next;
                }
                let mut seen = HashSet::new();
                for field in &schema {
                    prop_assert!(field.check().is_ok(), "invalid field {:?}", field);
                    prop_assert!(seen.insert(field.label.clone()), "duplicate label {}", field.label);
                }
            }
        }

        #[test]
        fn failed_mutation_preserves_snapshot(schema in arb_schema(), index in 8usize..20) {
            let before = schema.clone();
            prop_assert!(schema.remove_field(index).is_err());
            prop_assert_eq!(schema, before);
        }
    }
}

//! Widget selection for a field.
//!
//! [`control_for`] is shared by the builder preview and the public
//! submission page; the only difference between the two call sites is the
//! [`RenderMode`], which decides whether the control accepts input.

use serde::Serialize;

use crate::field::{Field, FieldType};

/// Where a control is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Builder preview: inert, never validated.
    Preview,
    /// Public submission: accepts and validates input.
    Live,
}

/// HTML-style input type for single-line text controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Email,
    Tel,
    Number,
}

/// The kind of control a field is rendered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "widget", rename_all = "camelCase")]
pub enum WidgetKind {
    TextInput {
        #[serde(rename = "inputType")]
        input_type: InputType,
    },
    TextArea,
    Select,
    RadioGroup,
    CheckboxGroup,
    DatePicker,
}

/// Static description of the control for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDescriptor {
    pub label: String,
    #[serde(flatten)]
    pub kind: WidgetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Options to enumerate; empty for scalar controls.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Whether several options can be chosen at once.
    pub multiple: bool,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Maps a field to its control.
#[must_use]
pub fn control_for(field: &Field, mode: RenderMode) -> WidgetDescriptor {
    let kind = match field.field_type {
        FieldType::Text => WidgetKind::TextInput {
            input_type: InputType::Text,
        },
        FieldType::Email => WidgetKind::TextInput {
            input_type: InputType::Email,
        },
        FieldType::Tel => WidgetKind::TextInput {
            input_type: InputType::Tel,
        },
        FieldType::Number => WidgetKind::TextInput {
            input_type: InputType::Number,
        },
        FieldType::Textarea => WidgetKind::TextArea,
        FieldType::Select => WidgetKind::Select,
        FieldType::Radio => WidgetKind::RadioGroup,
        FieldType::Checkbox => WidgetKind::CheckboxGroup,
        FieldType::Date => WidgetKind::DatePicker,
    };

    let options = if field.field_type.requires_options() {
        field.options().to_vec()
    } else {
        Vec::new()
    };
    let validation = field.validation.as_ref();

    WidgetDescriptor {
        label: field.label.clone(),
        kind,
        placeholder: field.placeholder.clone(),
        description: field.description.clone(),
        required: field.required,
        options,
        multiple: field.field_type == FieldType::Checkbox,
        disabled: mode == RenderMode::Preview,
        min_length: validation.and_then(|v| v.min_length),
        max_length: validation.and_then(|v| v.max_length),
    }
}

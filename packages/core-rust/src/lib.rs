//! `regform` core: field model, schema store, drag reordering, and the
//! renderer/validator shared by the form builder and the public submission page.

pub mod answers;
pub mod field;
pub mod render;
pub mod reorder;
pub mod schema;
pub mod validate;

pub use answers::{collect_answers, AnswerMap, FieldErrors};
pub use field::{
    default_label, normalize_options, requires_options, Field, FieldError, FieldPatch, FieldType,
    FieldValidation,
};
pub use render::{control_for, InputType, RenderMode, WidgetDescriptor, WidgetKind};
pub use reorder::{DragState, ReorderEngine};
pub use schema::{Schema, SchemaError};
pub use validate::{serialize_answer, validate, AnswerError, NormalizedValue, Selection};

//! Builder surface: operator intents over the schema store.
//!
//! The builder owns three pieces of UI state next to the schema snapshot:
//! the index of the field open in the edit panel, the drag state, and the
//! staged draft of a choice field being configured. None of them live in
//! the schema itself.
//!
//! Scalar types are committed as soon as they are picked. Choice types
//! cannot form a valid field without options, so picking one only opens a
//! draft; the field is added when the operator confirms it ("Aggiungi").
//!
//! Every intent either replaces the snapshot with a new valid one or fails
//! and leaves snapshot and UI state as they were.

use regform_core::reorder::{move_down, move_up};
use regform_core::{
    control_for, default_label, normalize_options, DragState, Field, FieldPatch, FieldType,
    RenderMode, ReorderEngine, Schema, SchemaError, WidgetDescriptor,
};
use tracing::debug;

use crate::traits::SchemaSink;

/// A choice field being configured before it is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceDraft {
    pub field_type: FieldType,
    pub label: String,
    /// Comma-separated options as typed by the operator.
    pub options_raw: String,
    pub required: bool,
}

impl ChoiceDraft {
    fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            label: String::new(),
            options_raw: String::new(),
            required: false,
        }
    }

    fn to_field(&self) -> Field {
        Field::new(self.label.trim(), self.field_type)
            .required(self.required)
            .with_options(normalize_options(&self.options_raw))
    }
}

/// Result of picking a type from the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAdd {
    /// A scalar field was appended at `index`.
    Added { index: usize },
    /// A choice draft was opened and awaits configuration.
    DraftOpened,
}

/// Errors returned by builder intents.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("no choice field is being configured")]
    NoDraft,
    #[error("no field is open for editing")]
    NotEditing,
    #[error("failed to store schema: {0}")]
    Store(#[from] anyhow::Error),
}

/// Editing state of one form in progress.
#[derive(Debug, Default)]
pub struct BuilderSurface {
    schema: Schema,
    editing: Option<usize>,
    reorder: ReorderEngine,
    draft: Option<ChoiceDraft>,
}

impl BuilderSurface {
    /// Starts a new, empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reopens an existing form.
    #[must_use]
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    /// Current snapshot. Cheap to clone and never mutated afterwards.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Index of the field open in the edit panel.
    #[must_use]
    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    #[must_use]
    pub fn draft(&self) -> Option<&ChoiceDraft> {
        self.draft.as_ref()
    }

    #[must_use]
    pub fn drag_state(&self) -> DragState {
        self.reorder.state()
    }

    /// Inert controls for every field, in schema order.
    #[must_use]
    pub fn preview(&self) -> Vec<WidgetDescriptor> {
        self.schema
            .iter()
            .map(|field| control_for(field, RenderMode::Preview))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Palette and choice drafts
    // -----------------------------------------------------------------------

    /// Picks a type from the palette.
    ///
    /// Scalar types are appended immediately under a defaulted label and do
    /// not open the edit panel. Choice types open a draft instead, replacing
    /// any draft already open.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Schema`] if the defaulted field is rejected.
    pub fn quick_add(&mut self, field_type: FieldType) -> Result<QuickAdd, BuilderError> {
        if field_type.requires_options() {
            self.draft = Some(ChoiceDraft::new(field_type));
            return Ok(QuickAdd::DraftOpened);
        }
        let position = self.schema.len() + 1;
        let label = self
            .schema
            .unique_label(&default_label(field_type, position));
        let next = self.schema.add_field(Field::new(label, field_type));
        self.commit(next, "quick_add")?;
        Ok(QuickAdd::Added {
            index: self.schema.len() - 1,
        })
    }

    /// # Errors
    ///
    /// Returns [`BuilderError::NoDraft`] if no draft is open.
    pub fn set_draft_label(&mut self, label: impl Into<String>) -> Result<(), BuilderError> {
        self.draft_mut()?.label = label.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`BuilderError::NoDraft`] if no draft is open.
    pub fn set_draft_options(&mut self, raw: impl Into<String>) -> Result<(), BuilderError> {
        self.draft_mut()?.options_raw = raw.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`BuilderError::NoDraft`] if no draft is open.
    pub fn set_draft_required(&mut self, required: bool) -> Result<(), BuilderError> {
        self.draft_mut()?.required = required;
        Ok(())
    }

    /// Adds the drafted choice field and closes the draft.
    ///
    /// The draft stays open if the field is rejected, so the operator can
    /// fix it.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NoDraft`] if no draft is open, or
    /// [`BuilderError::Schema`] if the label is blank or taken, or the
    /// options are empty or repeated.
    pub fn commit_draft(&mut self) -> Result<usize, BuilderError> {
        let field = self.draft.as_ref().ok_or(BuilderError::NoDraft)?.to_field();
        let next = self.schema.add_field(field);
        self.commit(next, "commit_draft")?;
        self.draft = None;
        Ok(self.schema.len() - 1)
    }

    /// Discards the draft without touching the schema.
    pub fn cancel_draft(&mut self) {
        self.draft = None;
    }

    // -----------------------------------------------------------------------
    // Edit panel
    // -----------------------------------------------------------------------

    /// Opens the edit panel on the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] for an index past the end.
    pub fn open_editor(&mut self, index: usize) -> Result<(), BuilderError> {
        if index >= self.schema.len() {
            return Err(SchemaError::IndexOutOfBounds {
                index,
                len: self.schema.len(),
            }
            .into());
        }
        self.editing = Some(index);
        Ok(())
    }

    /// Applies a partial update to the field open in the edit panel.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NotEditing`] if the panel is closed, or
    /// [`BuilderError::Schema`] if the merged field is rejected.
    pub fn apply_edit(&mut self, patch: &FieldPatch) -> Result<(), BuilderError> {
        let index = self.editing.ok_or(BuilderError::NotEditing)?;
        let next = self.schema.update_field(index, patch);
        self.commit(next, "apply_edit")
    }

    pub fn close_editor(&mut self) {
        self.editing = None;
    }

    // -----------------------------------------------------------------------
    // List actions
    // -----------------------------------------------------------------------

    /// Deletes the field at `index`. Closes the edit panel if it was open
    /// on that field, and ends a drag of that field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] for an index past the end.
    pub fn delete(&mut self, index: usize) -> Result<(), BuilderError> {
        let next = self.schema.remove_field(index);
        self.commit(next, "delete")?;
        self.editing = match self.editing {
            Some(e) if e == index => None,
            Some(e) if e > index => Some(e - 1),
            other => other,
        };
        self.reorder.on_removed(index);
        Ok(())
    }

    /// Appends a copy of the field at `index` and returns the copy's index.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] for an index past the end.
    pub fn duplicate(&mut self, index: usize) -> Result<usize, BuilderError> {
        let next = self.schema.duplicate_field(index);
        self.commit(next, "duplicate")?;
        Ok(self.schema.len() - 1)
    }

    /// Keyboard reorder: one slot up.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] for an index past the end.
    pub fn move_up(&mut self, index: usize) -> Result<(), BuilderError> {
        let next = move_up(&self.schema, index);
        self.commit(next, "move_up")?;
        let to = index.saturating_sub(1);
        self.follow_move(index, to);
        self.reorder.on_moved(index, to);
        Ok(())
    }

    /// Keyboard reorder: one slot down.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] for an index past the end.
    pub fn move_down(&mut self, index: usize) -> Result<(), BuilderError> {
        let next = move_down(&self.schema, index);
        self.commit(next, "move_down")?;
        let to = index.saturating_add(1).min(self.schema.len().saturating_sub(1));
        self.follow_move(index, to);
        self.reorder.on_moved(index, to);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Drag and drop
    // -----------------------------------------------------------------------

    pub fn drag_start(&mut self, index: usize) {
        self.reorder.on_drag_start(index);
    }

    /// Handles the dragged field passing over `target`. Returns whether the
    /// schema changed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IndexOutOfBounds`] for a target past the end.
    pub fn drag_over(&mut self, target: usize) -> Result<bool, BuilderError> {
        let DragState::Dragging { source } = self.reorder.state() else {
            return Ok(false);
        };
        match self.reorder.on_drag_over(&self.schema, target) {
            Ok(Some(next)) => {
                self.schema = next;
                self.follow_move(source, target);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                debug!(error = %e, intent = "drag_over", "builder intent rejected");
                Err(e.into())
            }
        }
    }

    pub fn drag_end(&mut self) {
        self.reorder.on_drag_end();
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serializes the current schema to its wire format.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Schema`] if serialization fails.
    pub fn export_schema(&self) -> Result<String, BuilderError> {
        Ok(self.schema.to_json()?)
    }

    /// Hands the serialized schema to the owning record's storage.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Store`] if the sink fails.
    pub async fn save(&self, sink: &dyn SchemaSink, form_id: &str) -> Result<(), BuilderError> {
        let json = self.export_schema()?;
        sink.store_schema(form_id, &json).await?;
        tracing::info!(form_id, fields = self.schema.len(), "schema saved");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn draft_mut(&mut self) -> Result<&mut ChoiceDraft, BuilderError> {
        self.draft.as_mut().ok_or(BuilderError::NoDraft)
    }

    fn commit(
        &mut self,
        next: Result<Schema, SchemaError>,
        intent: &'static str,
    ) -> Result<(), BuilderError> {
        match next {
            Ok(schema) => {
                self.schema = schema;
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, intent, "builder intent rejected");
                Err(e.into())
            }
        }
    }

    /// Keeps the edit panel on the same field after a move from `from` to `to`.
    fn follow_move(&mut self, from: usize, to: usize) {
        let Some(editing) = self.editing else {
            return;
        };
        self.editing = Some(if editing == from {
            to
        } else if from < editing && editing <= to {
            editing - 1
        } else if to <= editing && editing < from {
            editing + 1
        } else {
            editing
        });
    }
}

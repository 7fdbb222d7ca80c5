//! Reorder engine: turns drag gestures into schema moves.
//!
//! State machine: `Idle -> Dragging { source } -> Idle`
//!
//! Every accepted drag-over moves the dragged field with
//! [`Schema::move_field`] and re-bases `source` to the target index, since
//! that is where the dragged field now lives. Subsequent drag-over events
//! are therefore computed against its current position, not its original one.

use std::cmp::Ordering;

use crate::schema::{Schema, SchemaError};

/// Drag state of the builder list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    /// A field is being dragged; `source` is its current index.
    Dragging { source: usize },
}

/// Pointer-driven reordering. Holds no schema; callers pass the current
/// snapshot with every event and keep the returned one.
#[derive(Debug, Default)]
pub struct ReorderEngine {
    state: DragState,
}

impl ReorderEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> DragState {
        self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Starts dragging the field at `index`.
    pub fn on_drag_start(&mut self, index: usize) {
        self.state = DragState::Dragging { source: index };
    }

    /// Handles the dragged field passing over `target`.
    ///
    /// Returns `Ok(None)` when the event is ignored (no drag in progress, or
    /// the pointer is over the dragged field itself), otherwise the schema
    /// with the field moved to `target`.
    ///
    /// # Errors
    ///
    /// Propagates [`SchemaError::IndexOutOfBounds`] from the move; the drag
    /// state is left unchanged in that case.
    pub fn on_drag_over(
        &mut self,
        schema: &Schema,
        target: usize,
    ) -> Result<Option<Schema>, SchemaError> {
        let DragState::Dragging { source } = self.state else {
            return Ok(None);
        };
        if source == target {
            return Ok(None);
        }
        let moved = schema.move_field(source, target)?;
        self.state = DragState::Dragging { source: target };
        Ok(Some(moved))
    }

    /// Ends the gesture, whether or not anything moved.
    pub fn on_drag_end(&mut self) {
        self.state = DragState::Idle;
    }

    /// Keeps `source` on the dragged field after the field at `index` was
    /// removed by another intent. Removing the dragged field ends the drag.
    pub fn on_removed(&mut self, index: usize) {
        let DragState::Dragging { source } = self.state else {
            return;
        };
        self.state = match index.cmp(&source) {
            Ordering::Equal => DragState::Idle,
            Ordering::Less => DragState::Dragging { source: source - 1 },
            Ordering::Greater => DragState::Dragging { source },
        };
    }

    /// Keeps `source` on the dragged field after another intent moved the
    /// field at `from` to `to`.
    pub fn on_moved(&mut self, from: usize, to: usize) {
        let DragState::Dragging { source } = self.state else {
            return;
        };
        let source = if source == from {
            to
        } else if from < source && source <= to {
            source - 1
        } else if to <= source && source < from {
            source + 1
        } else {
            source
        };
        self.state = DragState::Dragging { source };
    }
}

/// Keyboard alternative: moves the field at `index` one slot up.
/// The first field stays where it is.
///
/// # Errors
///
/// Returns [`SchemaError::IndexOutOfBounds`] if `index >= len`.
pub fn move_up(schema: &Schema, index: usize) -> Result<Schema, SchemaError> {
    schema.move_field(index, index.saturating_sub(1))
}

/// Keyboard alternative: moves the field at `index` one slot down.
/// The last field stays where it is.
///
/// # Errors
///
/// Returns [`SchemaError::IndexOutOfBounds`] if `index >= len`.
pub fn move_down(schema: &Schema, index: usize) -> Result<Schema, SchemaError> {
    let last = schema.len().saturating_sub(1);
    schema.move_field(index, index.saturating_add(1).min(last))
}

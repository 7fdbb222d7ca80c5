//! Public submission surface.
//!
//! Loads a stored schema once, keeps one raw value per field (keyed by
//! label), drives the shared renderer in live mode, and posts the answer map.
//!
//! Submission state machine: `Idle -> InFlight -> Submitted`
//!
//! A failed or invalid submission returns to `Idle`. While `InFlight` the
//! submit affordance is disabled and further submits are refused without
//! reaching the sink, since the sink has no idempotency key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use regform_core::{
    collect_answers, control_for, validate, AnswerError, AnswerMap, Field, FieldErrors,
    FieldType, RenderMode, Schema, Selection, WidgetDescriptor,
};
use tracing::{error, info, warn};

use crate::config::SubmissionConfig;
use crate::traits::{AnswerSink, SchemaSource};

/// Submission progress of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    /// Ready to submit.
    Idle,
    /// A submission is waiting for the sink.
    InFlight,
    /// The answers were accepted.
    Submitted,
}

/// Errors surfaced by the submission page.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("form {form_id} is unavailable: {reason}")]
    FormUnavailable { form_id: String, reason: String },
    #[error("no field labelled {label:?}")]
    UnknownField { label: String },
    #[error("field {label:?} does not accept multiple options")]
    NotMultiple { label: String },
    #[error("field {label:?} has no option {option:?}")]
    UnknownOption { label: String, option: String },
    #[error("submission rejected: {0}")]
    Invalid(FieldErrors),
    #[error("a submission is already in flight")]
    InFlight,
    #[error("answers were already submitted")]
    AlreadySubmitted,
    #[error("submission timed out after {}ms", timeout.as_millis())]
    Timeout { timeout: Duration },
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

/// One loaded public form.
pub struct SubmissionSurface {
    form_id: String,
    schema: Schema,
    config: SubmissionConfig,
    values: Mutex<HashMap<String, String>>,
    state: Arc<ArcSwap<SubmitState>>,
}

impl SubmissionSurface {
    /// Fetches and parses the form's schema.
    ///
    /// The schema is fetched exactly once per surface; it is never written back.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::FormUnavailable`] if the fetch fails or the
    /// stored schema is malformed. Neither can be repaired from this side.
    pub async fn load(
        source: &dyn SchemaSource,
        form_id: impl Into<String>,
        config: SubmissionConfig,
    ) -> Result<Self, SubmissionError> {
        let form_id = form_id.into();
        let unavailable = |reason: String| {
            error!(form_id = %form_id, %reason, "form unavailable");
            SubmissionError::FormUnavailable {
                form_id: form_id.clone(),
                reason,
            }
        };

        let json = source
            .fetch_schema(&form_id)
            .await
            .map_err(|e| unavailable(format!("{e:#}")))?;
        let schema = Schema::from_json(&json).map_err(|e| unavailable(e.to_string()))?;

        info!(form_id = %form_id, fields = schema.len(), "form loaded");
        Ok(Self {
            form_id,
            schema,
            config,
            values: Mutex::new(HashMap::new()),
            state: Arc::new(ArcSwap::from_pointee(SubmitState::Idle)),
        })
    }

    #[must_use]
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Live controls for every field, in schema order.
    #[must_use]
    pub fn widgets(&self) -> Vec<WidgetDescriptor> {
        self.schema
            .iter()
            .map(|field| control_for(field, RenderMode::Live))
            .collect()
    }

    /// Sets the raw value of a field.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::UnknownField`] if no field has this label.
    pub fn set_value(&self, label: &str, raw: impl Into<String>) -> Result<(), SubmissionError> {
        self.field(label)?;
        self.values.lock().insert(label.to_string(), raw.into());
        Ok(())
    }

    /// Flips one option of a checkbox field. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::UnknownField`], [`SubmissionError::NotMultiple`]
    /// for a field that is not a checkbox group, or
    /// [`SubmissionError::UnknownOption`] for an option the field does not declare.
    pub fn toggle_option(&self, label: &str, option: &str) -> Result<bool, SubmissionError> {
        let field = self.field(label)?;
        if field.field_type != FieldType::Checkbox {
            return Err(SubmissionError::NotMultiple {
                label: label.to_string(),
            });
        }
        if !field.options().iter().any(|o| o == option) {
            return Err(SubmissionError::UnknownOption {
                label: label.to_string(),
                option: option.to_string(),
            });
        }
        let mut values = self.values.lock();
        let raw = values.entry(label.to_string()).or_default();
        let mut selection = Selection::from_raw(raw);
        let selected = selection.toggle(option);
        *raw = selection.to_raw();
        Ok(selected)
    }

    /// Current raw value of a field, if one was entered.
    #[must_use]
    pub fn value(&self, label: &str) -> Option<String> {
        self.values.lock().get(label).cloned()
    }

    /// Inline message for a field: `None` if its current value is acceptable
    /// or no such field exists.
    #[must_use]
    pub fn validate_field(&self, label: &str) -> Option<AnswerError> {
        let field = self.schema.iter().find(|f| f.label == label)?;
        let raw = self.value(label).unwrap_or_default();
        validate(field, &raw).err()
    }

    #[must_use]
    pub fn state(&self) -> SubmitState {
        **self.state.load()
    }

    /// Whether the submit affordance should be enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        match self.state() {
            SubmitState::Idle => true,
            SubmitState::InFlight => false,
            SubmitState::Submitted => self.config.allow_resubmit,
        }
    }

    /// Validates every field and posts the answer map.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::InFlight`] / [`SubmissionError::AlreadySubmitted`]
    ///   when the affordance is disabled; the sink is not called
    /// - [`SubmissionError::Invalid`] with every failing field; the sink is
    ///   not called
    /// - [`SubmissionError::Timeout`] or [`SubmissionError::Transport`] when
    ///   the sink does not accept the answers; the page returns to `Idle`
    pub async fn submit(&self, sink: &dyn AnswerSink) -> Result<AnswerMap, SubmissionError> {
        let guard = self.begin_submit()?;

        let values = self.values.lock().clone();
        let answers = collect_answers(&self.schema, &values).map_err(SubmissionError::Invalid)?;

        let timeout = self.config.submit_timeout;
        match tokio::time::timeout(timeout, sink.submit(&self.form_id, &answers)).await {
            Ok(Ok(())) => {
                guard.complete();
                info!(form_id = %self.form_id, answers = answers.len(), "answers submitted");
                Ok(answers)
            }
            Ok(Err(e)) => {
                warn!(form_id = %self.form_id, error = %e, "answer sink failed");
                Err(SubmissionError::Transport(e))
            }
            Err(_) => {
                warn!(form_id = %self.form_id, ?timeout, "answer sink timed out");
                Err(SubmissionError::Timeout { timeout })
            }
        }
    }

    fn field(&self, label: &str) -> Result<&Field, SubmissionError> {
        self.schema
            .iter()
            .find(|f| f.label == label)
            .ok_or_else(|| SubmissionError::UnknownField {
                label: label.to_string(),
            })
    }

    /// Atomically moves to `InFlight` if submitting is currently allowed.
    fn begin_submit(&self) -> Result<SubmitGuard<'_>, SubmissionError> {
        let allow_resubmit = self.config.allow_resubmit;
        let previous = self.state.rcu(|current| match **current {
            SubmitState::Idle => SubmitState::InFlight,
            SubmitState::Submitted if allow_resubmit => SubmitState::InFlight,
            other => other,
        });
        match *previous {
            SubmitState::Idle => {}
            SubmitState::Submitted if allow_resubmit => {}
            SubmitState::InFlight => return Err(SubmissionError::InFlight),
            SubmitState::Submitted => return Err(SubmissionError::AlreadySubmitted),
        }
        Ok(SubmitGuard {
            state: &self.state,
            completed: false,
        })
    }
}

/// RAII guard for an in-flight submission.
///
/// Dropping it without [`complete`](SubmitGuard::complete) returns the page
/// to `Idle`, including when the submit future is cancelled.
struct SubmitGuard<'a> {
    state: &'a ArcSwap<SubmitState>,
    completed: bool,
}

impl SubmitGuard<'_> {
    fn complete(mut self) {
        self.state.store(Arc::new(SubmitState::Submitted));
        self.completed = true;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.state.store(Arc::new(SubmitState::Idle));
        }
    }
}

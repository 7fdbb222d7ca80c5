//! In-memory transport backed by [`DashMap`].
//!
//! Implements [`SchemaSink`], [`SchemaSource`] and [`AnswerSink`] against
//! process-local maps. Used by tests and local development in place of the
//! REST backend that owns event records and registrations.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::DashMap;
use regform_core::AnswerMap;

use crate::traits::{AnswerSink, SchemaSink, SchemaSource};

/// Process-local schema and submission storage.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    schemas: DashMap<String, String>,
    submissions: DashMap<String, Vec<AnswerMap>>,
    fetch_count: AtomicU64,
}

impl InMemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored schema directly, bypassing the builder.
    pub fn insert_schema(&self, form_id: impl Into<String>, schema_json: impl Into<String>) {
        self.schemas.insert(form_id.into(), schema_json.into());
    }

    /// Stored schema JSON for a form, if any.
    #[must_use]
    pub fn schema(&self, form_id: &str) -> Option<String> {
        self.schemas.get(form_id).map(|s| s.clone())
    }

    /// Answer maps received for a form, in arrival order.
    #[must_use]
    pub fn submissions(&self, form_id: &str) -> Vec<AnswerMap> {
        self.submissions
            .get(form_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Number of `fetch_schema` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SchemaSink for InMemoryTransport {
    async fn store_schema(&self, form_id: &str, schema_json: &str) -> anyhow::Result<()> {
        self.schemas
            .insert(form_id.to_string(), schema_json.to_string());
        Ok(())
    }
}

#[async_trait]
impl SchemaSource for InMemoryTransport {
    async fn fetch_schema(&self, form_id: &str) -> anyhow::Result<String> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.schema(form_id)
            .ok_or_else(|| anyhow!("no schema stored for form {form_id}"))
    }
}

#[async_trait]
impl AnswerSink for InMemoryTransport {
    async fn submit(&self, form_id: &str, answers: &AnswerMap) -> anyhow::Result<()> {
        self.submissions
            .entry(form_id.to_string())
            .or_default()
            .push(answers.clone());
        Ok(())
    }
}

use async_trait::async_trait;
use regform_core::AnswerMap;

/// Where the builder hands a finished schema for storage.
/// The owning record (an event, typically) keeps it as an opaque string.
#[async_trait]
pub trait SchemaSink: Send + Sync {
    /// Store the serialized schema of a form, replacing any previous one.
    async fn store_schema(&self, form_id: &str, schema_json: &str) -> anyhow::Result<()>;
}

/// Where the public submission page reads a form's schema from.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Fetch the serialized schema of a form.
    async fn fetch_schema(&self, form_id: &str) -> anyhow::Result<String>;
}

/// Endpoint receiving completed answer maps.
///
/// No idempotency key is assumed: every successful call is one registration.
/// Duplicate suppression is the submitting surface's job.
#[async_trait]
pub trait AnswerSink: Send + Sync {
    /// Deliver one answer map for a form.
    async fn submit(&self, form_id: &str, answers: &AnswerMap) -> anyhow::Result<()>;
}

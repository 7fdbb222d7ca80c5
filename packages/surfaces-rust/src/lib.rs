//! `regform` surfaces: the builder page orchestration and the public
//! submission page, wired to a pluggable schema/answer transport.

pub mod builder;
pub mod config;
pub mod logging;
pub mod submission;
pub mod traits;
pub mod transport;

pub use builder::{BuilderError, BuilderSurface, ChoiceDraft, QuickAdd};
pub use config::{LogConfig, LogFormat, SubmissionConfig};
pub use logging::init_tracing;
pub use submission::{SubmissionError, SubmissionSurface, SubmitState};
pub use traits::{AnswerSink, SchemaSink, SchemaSource};
pub use transport::InMemoryTransport;

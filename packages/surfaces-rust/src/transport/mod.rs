//! Transport implementations for the schema and answer traits.

pub mod memory;

pub use memory::InMemoryTransport;

//! Error types surfaced by the orchestrator.

use thiserror::Error;

/// Failure to turn a descriptor into a target.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The descriptor could not be parsed or lacks a schema.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// No factory is registered for the schema.
    #[error("unsupported schema: {0}")]
    UnknownSchema(String),

    /// The factory rejected the supplied fields.
    #[error("could not load {service} descriptor {descriptor}: {source}")]
    Construction {
        service: String,
        descriptor: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Call-level failures of a dispatch. Per-target faults never surface here.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no service(s) to notify")]
    NoTargets,

    #[error("no message content specified to deliver")]
    NoContent,

    #[error("failed to interpret escapes in message {field}: {source}")]
    Encoding {
        field: &'static str,
        #[source]
        source: EscapeError,
    },

    #[error("failed to start dispatch runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Malformed backslash escape sequences.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error("truncated \\{kind} escape at position {position}")]
    Truncated { kind: char, position: usize },

    #[error("escape at position {position} names invalid code point {value:#x}")]
    InvalidCodePoint { value: u32, position: usize },
}

/// Out-of-range access into a collection or container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("index {index} out of range for {len} targets")]
    OutOfRange { index: usize, len: usize },
}

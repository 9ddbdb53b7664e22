//! Logging and tracing for nlq
//!
//! Call [`init_telemetry`] once from the binary. Library crates only emit
//! `tracing` events and use the span helpers in [`spans`].

pub mod attributes;
pub mod spans;
pub mod tracer;

pub use spans::{
    ReasoningSpanAttributes, SchemaScanAttributes, trace_reasoning_call, trace_schema_scan,
};
pub use tracer::{init_telemetry, register_span_processor, tracer_provider};

//! Adapter implementations for task ports.

pub mod guardrail;
pub mod memory;
pub mod postgres;

pub use guardrail::PolicyGuardrail;

//! Unit tests for the task pipeline.

mod support;

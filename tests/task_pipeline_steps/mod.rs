//! Step definitions for task pipeline scenarios.


mod given;
mod then;
mod when;

//! Domain model for batch diff aggregation.

mod output;
mod result;

pub use output::{
    AggregationInput, AggregationOutput, AggregationSummary, FileConflict, ValidationReport,
};
pub use result::{SubTaskResult, SubTaskStatus};

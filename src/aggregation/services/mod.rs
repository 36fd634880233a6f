//! Aggregation services.

mod aggregator;
mod batch;
mod pr_body;

pub use aggregator::DiffAggregator;
pub use batch::{BatchError, BatchOutcome, BatchService};
pub use pr_body::{DEFAULT_PR_BODY_TEMPLATE, PrBodyContext, PrBodyError, PrBodyRenderer};

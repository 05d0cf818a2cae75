mod aggregation;
mod duration;
mod resolver;

pub use aggregation::Aggregation;
pub use resolver::{ResolvedRange, resolve_range};

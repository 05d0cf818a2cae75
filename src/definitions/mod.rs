mod model;
mod source;

pub use model::{DEFAULT_RANGE_INTERVAL, MetricDefinition, ProviderRef, RangeSpec};
pub use source::{DefinitionError, DefinitionEvent, diff_definitions, load_definitions};

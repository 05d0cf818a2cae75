mod history;
mod state;
mod status;
mod unit;

pub use history::{HistoryRing, MAX_HISTORY_CAPACITY};
pub use state::{InvalidTransition, UnitEvent, UnitPhase, transition};
pub use status::{EvaluationResult, MetricStatus};
pub use unit::{CycleOutcome, EvaluationUnit};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhase {
    Idle,
    Evaluating,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEvent {
    Tick,
    Succeeded,
    Failed,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} while {phase:?}")]
pub struct InvalidTransition {
    pub phase: UnitPhase,
    pub event: UnitEvent,
}

impl UnitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Evaluating => "evaluating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

pub fn transition(phase: UnitPhase, event: UnitEvent) -> Result<UnitPhase, InvalidTransition> {
    match (phase, event) {
        (UnitPhase::Idle, UnitEvent::Tick) => Ok(UnitPhase::Evaluating),
        (UnitPhase::Evaluating, UnitEvent::Succeeded) => Ok(UnitPhase::Succeeded),
        (UnitPhase::Evaluating, UnitEvent::Failed) => Ok(UnitPhase::Failed),
        (UnitPhase::Succeeded | UnitPhase::Failed, UnitEvent::Settled) => Ok(UnitPhase::Idle),
        _ => Err(InvalidTransition { phase, event }),
    }
}

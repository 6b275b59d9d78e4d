//! Realization stages and the stage-by-stage driver.

use crate::error::{StateError, StateResult};
use crate::state::State;
use core::fmt;

/// Monotonically ordered phases of state computation.
///
/// A state realized to stage `S` guarantees every quantity belonging to `S`
/// or an earlier stage is current. Changing an input belonging to stage `S`
/// drops the state back to the stage before `S`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[default]
    Empty,
    Topology,
    Model,
    Instance,
    Time,
    Position,
    Velocity,
    Dynamics,
    Acceleration,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::Empty,
        Stage::Topology,
        Stage::Model,
        Stage::Instance,
        Stage::Time,
        Stage::Position,
        Stage::Velocity,
        Stage::Dynamics,
        Stage::Acceleration,
        Stage::Report,
    ];

    fn ordinal(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    pub fn prev(self) -> Option<Stage> {
        self.ordinal().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Empty => "Empty",
            Stage::Topology => "Topology",
            Stage::Model => "Model",
            Stage::Instance => "Instance",
            Stage::Time => "Time",
            Stage::Position => "Position",
            Stage::Velocity => "Velocity",
            Stage::Dynamics => "Dynamics",
            Stage::Acceleration => "Acceleration",
            Stage::Report => "Report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Realize `state` one stage at a time until it reaches `target`.
///
/// `realize_stage` is called with the stage being realized while the state
/// still reports the previous stage; the state is advanced only after the
/// callback succeeds. A state already at or past `target` is left alone.
pub fn realize_through<E, F>(state: &mut State, target: Stage, mut realize_stage: F) -> Result<(), E>
where
    E: From<StateError>,
    F: FnMut(&mut State, Stage) -> Result<(), E>,
{
    while state.stage() < target {
        let next = next_stage(state.stage())?;
        tracing::debug!(stage = %next, "realizing stage");
        realize_stage(state, next)?;
        state.advance_to(next)?;
    }
    Ok(())
}

fn next_stage(stage: Stage) -> StateResult<Stage> {
    stage.next().ok_or(StateError::StageOrder {
        from: stage,
        to: stage,
    })
}

//! Verification policies evaluated after every step.

use crate::core::{PipelineState, StageTag, Transition};

/// Decides whether a run continues after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchPolicy {
    /// END iff the stage is `error` or `fatal_error`.
    #[default]
    HaltOnError,
    /// Like `HaltOnError`, but the `end` tag also stops the run.
    HaltOnTerminal,
}

impl BranchPolicy {
    /// Inspects the state produced by a step.
    #[must_use]
    pub fn verify(self, state: &PipelineState) -> Transition {
        let halt = match self {
            Self::HaltOnError => state.stage.is_error(),
            Self::HaltOnTerminal => state.stage.is_error() || state.stage == StageTag::End,
        };
        if halt {
            Transition::End
        } else {
            Transition::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: &str) -> PipelineState {
        PipelineState::new().with_stage(tag)
    }

    #[test]
    fn test_halt_on_error() {
        let policy = BranchPolicy::HaltOnError;
        assert_eq!(policy.verify(&tagged("error")), Transition::End);
        assert_eq!(policy.verify(&tagged("fatal_error")), Transition::End);
        assert_eq!(policy.verify(&tagged("end")), Transition::Continue);
        assert_eq!(policy.verify(&tagged("table_created")), Transition::Continue);
        assert_eq!(policy.verify(&PipelineState::new()), Transition::Continue);
    }

    #[test]
    fn test_halt_on_terminal() {
        let policy = BranchPolicy::HaltOnTerminal;
        assert_eq!(policy.verify(&tagged("end")), Transition::End);
        assert_eq!(policy.verify(&tagged("error")), Transition::End);
        assert_eq!(policy.verify(&tagged("success")), Transition::Continue);
    }
}

//! The two-state gate described in : outside animation most
//! commands are valid; during animation, only a handful are.

use crate::command::Command;
use crate::error::{ProtoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Running,
}

impl AnimationState {
    pub fn validate(self, cmd: &Command) -> Result<()> {
        let ok = match self {
            AnimationState::Idle => cmd.valid_outside_animation(),
            AnimationState::Running => cmd.valid_during_animation(),
        };
        if ok {
            Ok(())
        } else {
            match self {
                AnimationState::Idle => Err(ProtoError::InvalidOutsideAnimation(cmd.name())),
                AnimationState::Running => Err(ProtoError::InvalidDuringAnimation(cmd.name())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_frame_rejected_outside_animation() {
        let err = AnimationState::Idle
            .validate(&Command::UpdateFrame { vectors: vec![] })
            .unwrap_err();
        assert!(matches!(err, ProtoError::InvalidOutsideAnimation("update-frame")));
    }

    #[test]
    fn load_targets_rejected_during_animation() {
        let err = AnimationState::Running
            .validate(&Command::LoadTargets { definitions: vec![] })
            .unwrap_err();
        assert!(matches!(err, ProtoError::InvalidDuringAnimation("load-targets")));
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use brain::{ActuationService, CommandAccepted, DispatchError, PreconditionError};
use kinematics::{GripperCommand, JointCommand};
use log::{debug, info};

/// Accepts everything and logs it. Used with `--dry-run`.
#[derive(Debug, Default)]
pub struct DryRunActuation {
    sequence: AtomicU64,
}

impl DryRunActuation {
    fn accept(&self) -> CommandAccepted {
        CommandAccepted {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ActuationService for DryRunActuation {
    async fn verify_preconditions(&self) -> Result<(), PreconditionError> {
        info!("Dry run: skipping estop and lease checks");
        Ok(())
    }

    async fn submit_joint_command(
        &self,
        command: &JointCommand,
    ) -> Result<CommandAccepted, DispatchError> {
        debug!("joints {:.3?}", command.as_slice());
        Ok(self.accept())
    }

    async fn submit_gripper_command(
        &self,
        command: GripperCommand,
    ) -> Result<CommandAccepted, DispatchError> {
        debug!("gripper {:.3}", command.open_fraction());
        Ok(self.accept())
    }

    async fn move_to_ready_pose(&self) -> Result<CommandAccepted, DispatchError> {
        debug!("ready pose");
        Ok(self.accept())
    }
}

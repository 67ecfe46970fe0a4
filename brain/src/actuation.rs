use async_trait::async_trait;
use kinematics::{GripperCommand, JointCommand};
use thiserror::Error;

/// Acknowledgement that the transport took a command. It says nothing about
/// whether the arm has reached the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAccepted {
    pub sequence: u64,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to encode command: {0}")]
    Encode(String),
    #[error("command rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("robot is estopped (stop level {0}); release the estop first")]
    EstopEngaged(i32),
    #[error("control lease is not held")]
    LeaseUnavailable,
    #[error("no response from {0}")]
    NoResponse(String),
    #[error("session error: {0}")]
    Session(String),
}

/// Command sink for an arm that is already authenticated, estop-clear and
/// leased. Commands are submitted one at a time.
#[async_trait]
pub trait ActuationService: Send + Sync {
    async fn verify_preconditions(&self) -> Result<(), PreconditionError>;

    async fn submit_joint_command(
        &self,
        command: &JointCommand,
    ) -> Result<CommandAccepted, DispatchError>;

    async fn submit_gripper_command(
        &self,
        command: GripperCommand,
    ) -> Result<CommandAccepted, DispatchError>;

    async fn move_to_ready_pose(&self) -> Result<CommandAccepted, DispatchError>;
}

//! One-shot setup that gates entry into the control loop.

use std::time::Duration;

use kinematics::GripperCommand;
use log::info;
use thiserror::Error;
use tokio::time::sleep;

use crate::actuation::{ActuationService, DispatchError, PreconditionError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("preconditions not met: {0}")]
    Precondition(#[from] PreconditionError),
    #[error("setup command failed: {0}")]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Aperture the gripper is opened to before settling at its base.
    pub open_fraction: f64,
    /// Pause after each gripper move.
    pub settle: Duration,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            open_fraction: 1.0,
            settle: Duration::from_secs(2),
        }
    }
}

/// Verifies preconditions, deploys the arm, opens the gripper fully, then
/// settles it at `base`. Returns the aperture the loop starts from.
pub async fn prepare<A>(
    actuation: &A,
    setup: &SetupConfig,
    base: GripperCommand,
) -> Result<GripperCommand, StartupError>
where
    A: ActuationService + ?Sized,
{
    actuation.verify_preconditions().await?;
    info!("Preconditions verified.");

    actuation.move_to_ready_pose().await?;
    info!("Arm deployed to ready pose.");

    let open = GripperCommand::new(setup.open_fraction);
    info!("Opening gripper to {:.2}...", open.open_fraction());
    actuation.submit_gripper_command(open).await?;
    sleep(setup.settle).await;

    info!("Setting gripper to {:.2}...", base.open_fraction());
    actuation.submit_gripper_command(base).await?;
    sleep(setup.settle).await;

    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Recorded, RecordingActuation};

    #[tokio::test(start_paused = true)]
    async fn test_setup_order() {
        let actuation = RecordingActuation::default();
        let base = GripperCommand::new(0.4);

        let started = tokio::time::Instant::now();
        let result = prepare(&actuation, &SetupConfig::default(), base).await.unwrap();
        assert_eq!(result, base);
        assert_eq!(started.elapsed(), Duration::from_secs(4));

        assert_eq!(
            actuation.recorded(),
            vec![
                Recorded::Preconditions,
                Recorded::ReadyPose,
                Recorded::Gripper(1.0),
                Recorded::Gripper(0.4),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_precondition_failure_sends_nothing() {
        let actuation = RecordingActuation {
            estop_level: Some(1),
            ..Default::default()
        };

        let err = prepare(&actuation, &SetupConfig::default(), GripperCommand::new(0.4))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StartupError::Precondition(PreconditionError::EstopEngaged(1))
        ));
        assert_eq!(actuation.recorded(), vec![Recorded::Preconditions]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_dispatch_failure_is_fatal() {
        let actuation = RecordingActuation {
            fail_gripper: true,
            ..Default::default()
        };

        let err = prepare(&actuation, &SetupConfig::default(), GripperCommand::new(0.4))
            .await
            .unwrap_err();
        assert!(matches!(err, StartupError::Dispatch(_)));
    }
}

//! Fixed-rate interactive control loop.
//!
//! Each tick polls the operator key, applies any toggle, and while running
//! samples the trajectory and submits the arm command followed by the
//! gripper command. Ticks are paced against a monotonic deadline
//! (`next += period`); an overrun resets the deadline to now instead of
//! bursting to catch up.

use std::future::Future;
use std::time::Duration;

use kinematics::{GripperCommand, JointCommand, TrajectoryGenerator};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::{self, Instant};

use crate::actuation::ActuationService;
use crate::input::InputSource;
use crate::state::{
    ControlState, Mode, PhasePolicy, SAFE_SHUTDOWN, SafeAction, ToggleStateMachine, Transition,
};

pub const DEFAULT_RATE_HZ: f64 = 50.0;

#[derive(Debug, Error, PartialEq)]
pub enum LoopConfigError {
    #[error("tick rate must be a positive finite number of Hz, got {0}")]
    InvalidRate(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    rate_hz: f64,
    period: Duration,
    phase_policy: PhasePolicy,
}

impl LoopConfig {
    pub fn new(rate_hz: f64, phase_policy: PhasePolicy) -> Result<Self, LoopConfigError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(LoopConfigError::InvalidRate(rate_hz));
        }
        let period = Duration::try_from_secs_f64(1.0 / rate_hz)
            .map_err(|_| LoopConfigError::InvalidRate(rate_hz))?;
        if period.is_zero() {
            return Err(LoopConfigError::InvalidRate(rate_hz));
        }
        Ok(Self {
            rate_hz,
            period,
            phase_policy,
        })
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn phase_policy(&self) -> PhasePolicy {
        self.phase_policy
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            rate_hz: DEFAULT_RATE_HZ,
            period: Duration::from_millis(20),
            phase_policy: PhasePolicy::default(),
        }
    }
}

/// Counters reported when the loop is cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub ticks: u64,
    pub toggles: u64,
    pub samples_dispatched: u64,
    pub dispatch_failures: u64,
    pub overruns: u64,
}

pub struct ControlLoop<'a, I: ?Sized, A: ?Sized> {
    input: &'a mut I,
    actuation: &'a A,
    generator: TrajectoryGenerator,
    toggle: ToggleStateMachine,
    period: Duration,
    report: LoopReport,
}

impl<'a, I, A> ControlLoop<'a, I, A>
where
    I: InputSource + ?Sized,
    A: ActuationService + ?Sized,
{
    pub fn new(
        input: &'a mut I,
        actuation: &'a A,
        generator: TrajectoryGenerator,
        config: &LoopConfig,
        gripper: GripperCommand,
    ) -> Self {
        let state = ControlState::new(Instant::now(), gripper.open_fraction());
        Self {
            input,
            actuation,
            generator,
            toggle: ToggleStateMachine::new(state, config.phase_policy()),
            period: config.period(),
            report: LoopReport::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.toggle.mode()
    }

    pub fn state(&self) -> &ControlState {
        self.toggle.state()
    }

    pub fn report(&self) -> &LoopReport {
        &self.report
    }

    /// Runs ticks until `shutdown` resolves, handing every toggle to
    /// `on_transition`. An interrupt while running does not issue the
    /// safe-shutdown sequence.
    pub async fn run<F, N>(mut self, shutdown: F, mut on_transition: N) -> LoopReport
    where
        F: Future,
        N: FnMut(Transition),
    {
        tokio::pin!(shutdown);
        let mut deadline = Instant::now();

        loop {
            if let Some(transition) = self.tick(Instant::now()).await {
                on_transition(transition);
            }

            deadline += self.period;
            let now = Instant::now();
            if deadline < now {
                self.report.overruns += 1;
                deadline = now;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = time::sleep_until(deadline) => {}
            }
        }

        if self.toggle.is_running() {
            warn!("Interrupted while running; arm left at its last commanded pose.");
        }
        info!("Control loop stopped: {:?}", self.report);
        self.report
    }

    /// One poll/toggle/dispatch step. Returns the toggle applied this tick.
    pub async fn tick(&mut self, now: Instant) -> Option<Transition> {
        self.report.ticks += 1;

        let transition = self.input.poll().map(|event| self.toggle.handle(event, now));
        if let Some(transition) = transition {
            self.report.toggles += 1;
            debug!("toggle: {:?}", transition);
            if transition == Transition::Stopped {
                self.issue_safe_shutdown().await;
            }
        }

        if self.toggle.is_running() {
            let t = self.toggle.state().elapsed(now);
            let (joints, gripper) = self.generator.sample(t);
            self.dispatch(&joints, gripper).await;
        }
        transition
    }

    async fn dispatch(&mut self, joints: &JointCommand, gripper: GripperCommand) {
        if let Err(e) = self.actuation.submit_joint_command(joints).await {
            self.report.dispatch_failures += 1;
            warn!("Arm command dropped: {}", e);
        }
        match self.actuation.submit_gripper_command(gripper).await {
            Ok(_) => self.toggle.record_gripper(gripper.open_fraction()),
            Err(e) => {
                self.report.dispatch_failures += 1;
                warn!("Gripper command dropped: {}", e);
            }
        }
        self.report.samples_dispatched += 1;
    }

    async fn issue_safe_shutdown(&mut self) {
        for action in SAFE_SHUTDOWN {
            let result = match action {
                SafeAction::ReadyPose => self.actuation.move_to_ready_pose().await,
                SafeAction::CloseGripper => {
                    let closed = GripperCommand::CLOSED;
                    let result = self.actuation.submit_gripper_command(closed).await;
                    if result.is_ok() {
                        self.toggle.record_gripper(closed.open_fraction());
                    }
                    result
                }
            };
            if let Err(e) = result {
                self.report.dispatch_failures += 1;
                warn!("Safe-shutdown step {:?} failed: {}", action, e);
            }
        }
    }
}

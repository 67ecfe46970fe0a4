use log::debug;
use serde::Deserialize;
use tokio::time::Instant;

use crate::input::KeyEvent;

/// Where the oscillators are phase-referenced after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhasePolicy {
    /// Every Idle→Running transition restarts the pattern at `t = 0`.
    #[default]
    RestartOnStart,
    /// The epoch is fixed at loop entry; toggling resumes mid-pattern.
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Running,
}

/// Loop-owned control state. Only the toggle machine and the scheduler
/// write to it.
#[derive(Debug, Clone)]
pub struct ControlState {
    pub running: bool,
    pub epoch: Instant,
    pub last_gripper_fraction: f64,
}

impl ControlState {
    pub fn new(now: Instant, gripper_fraction: f64) -> Self {
        Self {
            running: false,
            epoch: now,
            last_gripper_fraction: gripper_fraction,
        }
    }

    /// Seconds since the epoch, never negative.
    pub fn elapsed(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.epoch).as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Stopped,
}

impl Transition {
    pub fn message(self) -> &'static str {
        match self {
            Transition::Started => "Arm cycling started.",
            Transition::Stopped => "Arm cycling stopped. Closing gripper.",
        }
    }
}

/// One step of the sequence issued when leaving `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeAction {
    ReadyPose,
    CloseGripper,
}

/// Ready pose first, then close the gripper.
pub const SAFE_SHUTDOWN: [SafeAction; 2] = [SafeAction::ReadyPose, SafeAction::CloseGripper];

#[derive(Debug)]
pub struct ToggleStateMachine {
    state: ControlState,
    policy: PhasePolicy,
}

impl ToggleStateMachine {
    pub fn new(state: ControlState, policy: PhasePolicy) -> Self {
        Self { state, policy }
    }

    pub fn mode(&self) -> Mode {
        if self.state.running {
            Mode::Running
        } else {
            Mode::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn record_gripper(&mut self, fraction: f64) {
        self.state.last_gripper_fraction = fraction;
    }

    pub fn handle(&mut self, event: KeyEvent, now: Instant) -> Transition {
        match event {
            KeyEvent::ToggleRequested => {
                if self.state.running {
                    self.state.running = false;
                    debug!("toggle: running -> idle");
                    Transition::Stopped
                } else {
                    self.state.running = true;
                    if self.policy == PhasePolicy::RestartOnStart {
                        self.state.epoch = now;
                    }
                    debug!("toggle: idle -> running");
                    Transition::Started
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_idle() {
        let machine = ToggleStateMachine::new(
            ControlState::new(Instant::now(), 0.4),
            PhasePolicy::default(),
        );
        assert_eq!(machine.mode(), Mode::Idle);
        assert!(!machine.is_running());
    }

    #[test]
    fn test_toggles_alternate() {
        let now = Instant::now();
        let mut machine =
            ToggleStateMachine::new(ControlState::new(now, 0.4), PhasePolicy::default());
        for n in 1..=9 {
            let transition = machine.handle(KeyEvent::ToggleRequested, now);
            if n % 2 == 1 {
                assert_eq!(transition, Transition::Started);
                assert_eq!(machine.mode(), Mode::Running);
            } else {
                assert_eq!(transition, Transition::Stopped);
                assert_eq!(machine.mode(), Mode::Idle);
            }
        }
    }

    #[test]
    fn test_start_resets_epoch() {
        let loop_entry = Instant::now();
        let mut machine =
            ToggleStateMachine::new(ControlState::new(loop_entry, 0.4), PhasePolicy::RestartOnStart);

        let pressed = loop_entry + Duration::from_secs(7);
        machine.handle(KeyEvent::ToggleRequested, pressed);
        assert_eq!(machine.state().epoch, pressed);
        assert_eq!(machine.state().elapsed(pressed), 0.0);

        // stopping leaves the epoch alone
        machine.handle(KeyEvent::ToggleRequested, pressed + Duration::from_secs(1));
        assert_eq!(machine.state().epoch, pressed);
    }

    #[test]
    fn test_continuous_keeps_epoch() {
        let loop_entry = Instant::now();
        let mut machine =
            ToggleStateMachine::new(ControlState::new(loop_entry, 0.4), PhasePolicy::Continuous);

        let pressed = loop_entry + Duration::from_secs(3);
        machine.handle(KeyEvent::ToggleRequested, pressed);
        assert_eq!(machine.state().epoch, loop_entry);
        assert!((machine.state().elapsed(pressed) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_saturates() {
        let now = Instant::now();
        let state = ControlState::new(now + Duration::from_secs(1), 0.0);
        assert_eq!(state.elapsed(now), 0.0);
    }
}

//! In-memory doubles for the input and actuation seams.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use kinematics::{GripperCommand, JointCommand};

use crate::actuation::{ActuationService, CommandAccepted, DispatchError, PreconditionError};
use crate::input::{InputSource, KeyEvent};

/// Replays one optional key byte per poll, then reports no input forever.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    keys: VecDeque<Option<u8>>,
}

impl ScriptedInput {
    pub fn new(keys: impl IntoIterator<Item = Option<u8>>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Enter on each listed poll index, nothing on the others.
    pub fn enter_at(polls: &[usize]) -> Self {
        let len = polls.iter().max().map_or(0, |last| last + 1);
        Self::new((0..len).map(|i| polls.contains(&i).then_some(b'\n')))
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Option<KeyEvent> {
        self.keys.pop_front().flatten().and_then(KeyEvent::from_key_byte)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Preconditions,
    Joint([f64; 6]),
    Gripper(f64),
    ReadyPose,
}

/// Logs every call in order. Flags make the matching call fail after it is
/// recorded.
#[derive(Debug, Default)]
pub struct RecordingActuation {
    pub estop_level: Option<i32>,
    pub fail_joint: bool,
    pub fail_gripper: bool,
    pub(crate) log: Mutex<Vec<Recorded>>,
    pub(crate) sequence: AtomicU64,
}

impl RecordingActuation {
    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: Recorded) {
        self.log.lock().unwrap().push(entry);
    }

    fn accept(&self, fail: bool) -> Result<CommandAccepted, DispatchError> {
        if fail {
            return Err(DispatchError::Transport("link down".into()));
        }
        Ok(CommandAccepted {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        })
    }
}

#[async_trait]
impl ActuationService for RecordingActuation {
    async fn verify_preconditions(&self) -> Result<(), PreconditionError> {
        self.push(Recorded::Preconditions);
        match self.estop_level {
            Some(level) => Err(PreconditionError::EstopEngaged(level)),
            None => Ok(()),
        }
    }

    async fn submit_joint_command(
        &self,
        command: &JointCommand,
    ) -> Result<CommandAccepted, DispatchError> {
        self.push(Recorded::Joint(command.angles()));
        self.accept(self.fail_joint)
    }

    async fn submit_gripper_command(
        &self,
        command: GripperCommand,
    ) -> Result<CommandAccepted, DispatchError> {
        self.push(Recorded::Gripper(command.open_fraction()));
        self.accept(self.fail_gripper)
    }

    async fn move_to_ready_pose(&self) -> Result<CommandAccepted, DispatchError> {
        self.push(Recorded::ReadyPose);
        self.accept(false)
    }
}

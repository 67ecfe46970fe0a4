pub mod actuation;
pub mod input;
pub mod scheduler;
pub mod startup;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use actuation::{ActuationService, CommandAccepted, DispatchError, PreconditionError};
pub use input::{InputSource, KeyEvent};
pub use scheduler::{ControlLoop, LoopConfig, LoopConfigError, LoopReport};
pub use startup::{SetupConfig, StartupError, prepare};
pub use state::{ControlState, Mode, PhasePolicy, ToggleStateMachine, Transition};

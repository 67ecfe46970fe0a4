//! Platform keyboard sources behind [`brain::InputSource`].

use std::io;

use brain::InputSource;
use thiserror::Error;

#[cfg(windows)]
mod console;
#[cfg(unix)]
mod terminal;

#[cfg(windows)]
pub use console::ConsoleInput;
#[cfg(unix)]
pub use terminal::TerminalInput;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("stdin is not an interactive terminal")]
    NotATerminal,
    #[error("failed to configure terminal: {0}")]
    Io(#[from] io::Error),
    #[cfg(not(any(unix, windows)))]
    #[error("no keyboard input support on this platform")]
    Unsupported,
}

/// cbreak terminal on unix, console polling on windows.
pub fn open_platform_input() -> Result<Box<dyn InputSource>, InputError> {
    #[cfg(unix)]
    {
        Ok(Box::new(TerminalInput::new()?))
    }
    #[cfg(windows)]
    {
        Ok(Box::new(ConsoleInput::new()?))
    }
    #[cfg(not(any(unix, windows)))]
    {
        Err(InputError::Unsupported)
    }
}

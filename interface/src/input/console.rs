use std::io::{self, IsTerminal};
use std::time::Duration;

use brain::{InputSource, KeyEvent};
use crossterm::event::{self, Event, KeyCode, KeyEvent as ConsoleKey, KeyEventKind};
use log::warn;

use super::InputError;

/// Polls console key events through crossterm.
///
/// Raw mode stays off so Ctrl+C is still delivered as a signal.
pub struct ConsoleInput;

impl ConsoleInput {
    pub fn new() -> Result<Self, InputError> {
        if !io::stdin().is_terminal() {
            return Err(InputError::NotATerminal);
        }
        Ok(Self)
    }
}

fn map_key(key: &ConsoleKey) -> Option<KeyEvent> {
    (key.kind == KeyEventKind::Press && key.code == KeyCode::Enter)
        .then_some(KeyEvent::ToggleRequested)
}

impl InputSource for ConsoleInput {
    fn poll(&mut self) -> Option<KeyEvent> {
        match event::poll(Duration::ZERO) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("console poll failed: {}", e);
                return None;
            }
        }
        match event::read() {
            Ok(Event::Key(key)) => map_key(&key),
            Ok(_) => None,
            Err(e) => {
                warn!("console read failed: {}", e);
                None
            }
        }
    }
}

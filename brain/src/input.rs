/// Operator request decoded from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    ToggleRequested,
}

impl KeyEvent {
    /// Only Enter toggles; every other key is dropped.
    pub fn from_key_byte(byte: u8) -> Option<Self> {
        match byte {
            b'\n' | b'\r' => Some(KeyEvent::ToggleRequested),
            _ => None,
        }
    }
}

/// Non-blocking key reader. `poll` returns immediately whether or not a key
/// is pending.
pub trait InputSource {
    fn poll(&mut self) -> Option<KeyEvent>;
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn poll(&mut self) -> Option<KeyEvent> {
        (**self).poll()
    }
}

use std::io;
use std::mem::MaybeUninit;
use std::os::fd::RawFd;

use brain::{InputSource, KeyEvent};
use log::{debug, warn};

use super::InputError;

/// Terminal in cbreak mode (no echo, no line buffering) for as long as the
/// value lives. The saved settings are restored on drop.
pub struct TerminalInput {
    fd: RawFd,
    saved: libc::termios,
}

impl TerminalInput {
    pub fn new() -> Result<Self, InputError> {
        Self::from_fd(libc::STDIN_FILENO)
    }

    pub fn from_fd(fd: RawFd) -> Result<Self, InputError> {
        if unsafe { libc::isatty(fd) } != 1 {
            return Err(InputError::NotATerminal);
        }

        let mut saved = MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, saved.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        // SAFETY: tcgetattr succeeded and filled the struct.
        let saved = unsafe { saved.assume_init() };

        let mut cbreak = saved;
        cbreak.c_lflag &= !(libc::ICANON | libc::ECHO);
        cbreak.c_cc[libc::VMIN] = 1;
        cbreak.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &cbreak) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        debug!("terminal fd {} in cbreak mode", fd);

        Ok(Self { fd, saved })
    }

    fn key_pending(&self) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ready > 0 && pfd.revents & libc::POLLIN != 0)
    }

    fn read_byte(&self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        let n = unsafe { libc::read(self.fd, (&mut byte as *mut u8).cast(), 1) };
        match n {
            1 => Ok(Some(byte)),
            0 => Ok(None),
            _ => Err(io::Error::last_os_error()),
        }
    }
}

impl InputSource for TerminalInput {
    fn poll(&mut self) -> Option<KeyEvent> {
        match self.key_pending() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("stdin poll failed: {}", e);
                return None;
            }
        }
        match self.read_byte() {
            Ok(byte) => byte.and_then(KeyEvent::from_key_byte),
            Err(e) => {
                warn!("stdin read failed: {}", e);
                None
            }
        }
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        if unsafe { libc::tcsetattr(self.fd, libc::TCSADRAIN, &self.saved) } != 0 {
            warn!(
                "failed to restore terminal settings: {}",
                io::Error::last_os_error()
            );
        }
    }
}

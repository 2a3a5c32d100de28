//! Raw serial line
//!
//! Opens a tty in raw mode (no echo, no line discipline, 8N1) at a fixed
//! baud rate. Both the target and the host use it.

use nix::fcntl::OFlag;
use nix::sys::termios::{self, BaudRate, FlushArg, SetArg};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Baud rate the reference hardware runs at
pub const DEFAULT_BAUD: u32 = 115_200;

/// Serial errors
#[derive(Error, Debug)]
pub enum SerialError {
    /// Device could not be opened
    #[error("Failed to open {path}: {source}")]
    Open {
        /// Device path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Terminal attributes could not be read or set
    #[error("Terminal configuration failed: {0}")]
    Termios(#[from] nix::Error),

    /// Baud rate not supported by termios
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaud(u32),
}

/// Result type for serial operations
pub type Result<T> = std::result::Result<T, SerialError>;

/// Open serial device in raw mode
#[derive(Debug)]
pub struct SerialPort {
    file: File,
}

impl SerialPort {
    /// Open `path` in raw mode at `baud`, discarding pending input
    pub fn open(path: &Path, baud: u32) -> Result<Self> {
        let speed = baud_rate(baud)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(path)
            .map_err(|source| SerialError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut attrs = termios::tcgetattr(&file)?;
        termios::cfmakeraw(&mut attrs);
        termios::cfsetspeed(&mut attrs, speed)?;
        termios::tcsetattr(&file, SetArg::TCSANOW, &attrs)?;
        termios::tcflush(&file, FlushArg::TCIOFLUSH)?;

        log::info!("Opened {} at {baud} baud", path.display());
        Ok(Self { file })
    }

    /// Clone the handle, for a separate reader and writer
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
        })
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        termios::tcdrain(&self.file).map_err(io::Error::from)
    }
}

fn baud_rate(baud: u32) -> Result<BaudRate> {
    Ok(match baud {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        460_800 => BaudRate::B460800,
        921_600 => BaudRate::B921600,
        other => return Err(SerialError::UnsupportedBaud(other)),
    })
}

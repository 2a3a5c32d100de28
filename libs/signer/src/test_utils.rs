//! Test doubles for the target's I/O
//!
//! A trigger pin that records its edges, and an in-memory duplex stream
//! that replays scripted host bytes and captures everything written back.

use crate::trigger::Trigger;
use std::cell::RefCell;
use std::convert::Infallible;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;

/// Edge seen on a recorded trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    /// Driven high
    Rising,
    /// Driven low
    Falling,
}

/// Shared edge log
pub type EdgeLog = Rc<RefCell<Vec<TriggerEdge>>>;

/// `embedded-hal` output pin that logs every level change
#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    edges: EdgeLog,
}

impl RecordingPin {
    /// Pin with an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle on the log, usable after the pin is moved
    #[must_use]
    pub fn edges(&self) -> EdgeLog {
        Rc::clone(&self.edges)
    }
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.edges.borrow_mut().push(TriggerEdge::Falling);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.edges.borrow_mut().push(TriggerEdge::Rising);
        Ok(())
    }
}

/// [`Trigger`] that logs raises and lowers; clones share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    edges: EdgeLog,
}

impl RecordingTrigger {
    /// Trigger with an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the edges so far
    #[must_use]
    pub fn edges(&self) -> Vec<TriggerEdge> {
        self.edges.borrow().clone()
    }
}

impl Trigger for RecordingTrigger {
    fn raise(&mut self) {
        self.edges.borrow_mut().push(TriggerEdge::Rising);
    }

    fn lower(&mut self) {
        self.edges.borrow_mut().push(TriggerEdge::Falling);
    }
}

/// Duplex stream over fixed input bytes
///
/// Reads drain the script and then report end of stream; writes are kept
/// for inspection.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
    flushes: usize,
}

impl ScriptedStream {
    /// Stream that will deliver `input`
    #[must_use]
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            output: Vec::new(),
            flushes: 0,
        }
    }

    /// Everything written so far
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.output
    }

    /// Number of flush calls
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Concatenate request frames into one script
#[must_use]
pub fn script(frames: &[&[u8]]) -> Vec<u8> {
    frames.concat()
}

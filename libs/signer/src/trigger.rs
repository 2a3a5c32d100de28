//! Trace-alignment trigger
//!
//! The trigger is raised right before a security-sensitive computation and
//! lowered right after it so a scope can align captured traces. It carries
//! no synchronization meaning.

use embedded_hal::digital::OutputPin;

/// A signal that can be driven high and low
pub trait Trigger {
    /// Drive the signal high
    fn raise(&mut self);
    /// Drive the signal low
    fn lower(&mut self);
}

/// Trigger that does nothing, for targets without a trigger line
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrigger;

impl Trigger for NullTrigger {
    fn raise(&mut self) {}
    fn lower(&mut self) {}
}

/// Trigger driving a GPIO output pin
///
/// Pin errors are logged and otherwise ignored: a missed edge only costs a
/// misaligned trace.
#[derive(Debug)]
pub struct PinTrigger<P> {
    pin: P,
}

impl<P: OutputPin> PinTrigger<P> {
    /// Wrap `pin`, driving it low first
    pub fn new(mut pin: P) -> Self {
        if let Err(e) = pin.set_low() {
            log::warn!("Failed to initialise trigger pin: {e:?}");
        }
        Self { pin }
    }

    /// Release the pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> Trigger for PinTrigger<P> {
    fn raise(&mut self) {
        if let Err(e) = self.pin.set_high() {
            log::warn!("Failed to raise trigger: {e:?}");
        }
    }

    fn lower(&mut self) {
        if let Err(e) = self.pin.set_low() {
            log::warn!("Failed to lower trigger: {e:?}");
        }
    }
}

/// RAII guard holding the trigger high
/// Raises on creation and lowers on drop, so every exit path lowers it
pub struct TriggerGuard<'a> {
    trigger: &'a mut dyn Trigger,
}

impl<'a> TriggerGuard<'a> {
    /// Raise `trigger` until the guard is dropped
    pub fn new(trigger: &'a mut dyn Trigger) -> Self {
        trigger.raise();
        Self { trigger }
    }
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.trigger.lower();
    }
}

//! Device descriptor and device manager.
//!
//! The single PCIe board implements all three capabilities (AI, AO, event
//! timer). Per  ("Multifunction hardware as three capabilities") we
//! model it as one owner type, [`Board`], that at construction hands out
//! three capability handles sharing its register mapping. The embedded
//! teacher expresses this sharing with borrowed references tied to the
//! owner's lifetime; a long-lived multi-threaded std process instead needs
//! `Send + 'static` handles (one runs on the ISR-simulation thread, one on
//! the event-poller thread, one on the main thread), so the handles here
//! share an `Arc` to the owner's register state rather than borrowing it.

use std::sync::Arc;

use crate::capability::{AnalogInput, AnalogOutput, EventTimerPort};
use crate::error::{HalError, LastError, Result};
use crate::null::{NullAnalogInput, NullAnalogOutput, NullEventTimerPort};
use crate::sim::{SimAnalogInput, SimAnalogOutput, SimEventTimer, SimRegisters};

/// Identifies a PCIe device by vendor/product IDs and an instance ordinal;
/// carries the mapped register base address, interrupt vector, and
/// last-error text. Lifetime: created at
/// process start, destroyed at process exit.
#[derive(Debug)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub instance: u32,
    pub register_base: usize,
    pub irq_vector: u32,
    pub last_error: LastError,
}

impl DeviceDescriptor {
    pub fn report(&self, err: &HalError) {
        self.last_error.set(err);
    }
}

/// The multifunction board's vendor/product identity. Modeled on the
/// deployed rig's NI PCIe data-acquisition card.
pub const BOARD_VENDOR_ID: u16 = 0x1093; // National Instruments
pub const BOARD_PRODUCT_ID: u16 = 0x7364;

/// Acquires the physical board at startup and hands out capability handles.
/// Missing sub-devices are represented by null placeholders so
/// callers of [`Board::analog_input`] etc. never need to branch on presence.
pub struct Board {
    pub descriptor: DeviceDescriptor,
    ai: Box<dyn AnalogInput>,
    ao: Box<dyn AnalogOutput>,
    event_timer: Box<dyn EventTimerPort>,
}

impl Board {
    /// Acquires the board. This ships with a software-simulated register
    /// backend (see [`crate::sim`]) standing in for direct MMIO access to
    /// the real card; see `DESIGN.md` for why. A `register_base` of zero
    /// indicates the simulated backend.
    pub fn acquire() -> Result<Board> {
        let registers = Arc::new(SimRegisters::new());
        let descriptor = DeviceDescriptor {
            vendor_id: BOARD_VENDOR_ID,
            product_id: BOARD_PRODUCT_ID,
            instance: 0,
            register_base: 0,
            irq_vector: 0,
            last_error: LastError::new(),
        };
        log::info!(
            "acquired DAQ board {:04x}:{:04x} (simulated backend)",
            descriptor.vendor_id, descriptor.product_id
        );
        Ok(Board {
            descriptor,
            ai: Box::new(SimAnalogInput::new(registers.clone())),
            ao: Box::new(SimAnalogOutput::new(registers.clone())),
            event_timer: Box::new(SimEventTimer::new(registers)),
        })
    }

    /// Acquires a board with every capability replaced by a null placeholder,
    /// exercising the "no hardware present" path described in .
    pub fn acquire_absent() -> Board {
        Board {
            descriptor: DeviceDescriptor {
                vendor_id: 0,
                product_id: 0,
                instance: 0,
                register_base: 0,
                irq_vector: 0,
                last_error: LastError::new(),
            },
            ai: Box::new(NullAnalogInput),
            ao: Box::new(NullAnalogOutput),
            event_timer: Box::new(NullEventTimerPort),
        }
    }

    pub fn analog_input(&mut self) -> &mut dyn AnalogInput {
        &mut *self.ai
    }

    pub fn analog_output(&mut self) -> &mut dyn AnalogOutput {
        &mut *self.ao
    }

    pub fn event_timer(&mut self) -> &mut dyn EventTimerPort {
        &mut *self.event_timer
    }

    /// Hands the event-timer capability to a caller that needs to own it
    /// (e.g. to fold it into `daq-engines::EventTimerEngine`), leaving a
    /// null placeholder behind so `self` stays in a valid never-branch-on
    /// presence state.
    pub fn take_event_timer(&mut self) -> Box<dyn EventTimerPort> {
        std::mem::replace(&mut self.event_timer, Box::new(NullEventTimerPort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_absent_returns_null_everywhere() {
        let mut board = Board::acquire_absent();
        assert!(board.analog_input().start().is_err());
        assert_eq!(board.analog_output().channel_count(), 0);
        assert!(board.event_timer().clock_period_us() == 0);
    }

    #[test]
    fn acquire_simulated_board_succeeds() {
        let board = Board::acquire().unwrap();
        assert_eq!(board.descriptor.vendor_id, BOARD_VENDOR_ID);
    }
}

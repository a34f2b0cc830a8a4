//! Hardware abstraction layer for the multifunction PCIe DAQ board.
//!
//! Exposes one capability trait per function class — [`AnalogInput`],
//! [`AnalogOutput`], [`EventTimerPort`] — and a [`Board`] device manager that
//! acquires the physical board at startup. Missing sub-devices are
//! represented by null placeholders (see [`null`]) so callers never branch
//! on presence.

pub mod capability;
pub mod device;
pub mod error;
pub mod null;
pub mod sim;

pub use capability::{
    AiConfig, AiUnload, AnalogInput, AnalogOutput, EventTimerConfig, EventTimerPort, LatchDelays,
    TimestampedEvent, code_to_volts, volts_to_code,
};
pub use device::{Board, DeviceDescriptor};
pub use error::{HalError, LastError, Result};

//! Engines layered on top of [`daq_hal`]'s capability traits: chair-output
//! helpers, the latched-device protocol, the pulse-sequence generator, and
//! the event timer engine that ties them together.

pub mod chair;
pub mod event_timer;
pub mod latched;
pub mod psg;

pub use chair::{init_chair, settle_chair, settle_chair_velocity, update_chair, ChairCalibration};
pub use event_timer::{DeviceAddress, EventSeconds, EventTimerEngine};
pub use latched::{
    misc_bits, DedicatedLineBus, LatchedDevice, LatchedDeviceBus, LatchedShadowState,
    MultiplexedBus, RewardOutcome,
};
pub use psg::{PsgController, PsgMode, PsgParams, PsgState};

//! The wire protocol shared by the DAQ driver and the stimulus renderer
//!: 32-bit little-endian word framing, the command/signal
//! enums, target definitions and motion vectors, and the animation-sequence
//! state gate.

pub mod command;
pub mod error;
pub mod signal;
pub mod state;
pub mod target;
pub mod video_mode;
pub mod wire;

pub use command::Command;
pub use error::{ProtoError, Result};
pub use signal::{AckPayload, Signal};
pub use state::AnimationState;
pub use target::{ApertureKind, Flicker, MotionVector, TargetDefinition, TargetVariant};
pub use video_mode::VideoMode;
pub use wire::{WordReader, WordWriter, MAX_PAYLOAD_WORDS};

//! The latched-device protocol layered atop the event timer's DIO output
//! port. The upper nibble of the 16-bit DO port addresses
//! one of 16 possible external devices; the remaining 12 bits carry data. An
//! addressed write is a 3-step strobe sequence, implemented by
//! [`daq_hal::EventTimerPort::set_do`].
//!
//! Per the Open Question in , the addressed multiplexer
//! ([`MultiplexedBus`]) is factored behind the [`LatchedDeviceBus`] trait so
//! a future rig without it can supply [`DedicatedLineBus`] instead, without
//! [`EventTimerEngine`] changing at all.

use std::time::Duration;

use daq_hal::{EventTimerPort, LatchDelays, Result};

/// Device addresses occupying DO bits 15-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LatchedDevice {
    Markers = 0x1,
    AdjustableReward = 0x4,
    Sgm = 0x5,
    Misc = 0x6,
    Writer = 0x7,
}

/// Bit positions within the miscellaneous device's data field.
pub mod misc_bits {
    pub const FIXATION_STATUS: u16 = 1 << 0;
    pub const AUDIO_REWARD: u16 = 1 << 1;
}

/// A bus capable of performing one addressed latched write. The default
/// implementation addresses the shared DO port with the device in the
/// upper nibble; [`DedicatedLineBus`] instead maps each device to its own
/// output lines, dropping the addressing scheme entirely.
pub trait LatchedDeviceBus: Send {
    fn write(&mut self, device: LatchedDevice, data: u16, delays: LatchDelays) -> Result<u16>;

    /// Raw pass-through used only by the marker-pulse trigger, which must
    /// issue two back-to-back writes (raise then lower) to the same device
    /// without any other latched write intervening.
    fn write_raw(&mut self, device: LatchedDevice, data: u16, delays: LatchDelays) -> Result<u16> {
        self.write(device, data, delays)
    }
}

/// The deployed rig's addressed multiplexer: bits 15-12 select the device,
/// bits 11-0 carry data.
pub struct MultiplexedBus<'a> {
    port: &'a mut dyn EventTimerPort,
}

impl<'a> MultiplexedBus<'a> {
    pub fn new(port: &'a mut dyn EventTimerPort) -> Self {
        MultiplexedBus { port }
    }
}

impl<'a> LatchedDeviceBus for MultiplexedBus<'a> {
    fn write(&mut self, device: LatchedDevice, data: u16, delays: LatchDelays) -> Result<u16> {
        let word = ((device as u16) << 12) | (data & 0x0FFF);
        self.port.set_do(word, delays)
    }
}

/// The software-timed alternative described in 's Open Question:
/// marker pulses and reward are driven on dedicated output lines rather than
/// through the address/data latch, for rigs that lack the multiplexer.
/// Bit assignment is fixed: DO0-11 are the marker bank, DO12 is the audio
/// reward line, DO13 is fixation status; the adjustable-reward duration and
/// the SGM and character-writer protocols have no dedicated-line equivalent
/// and return `DeviceUnavailable` so callers fail loudly instead of silently
/// no-opping.
pub struct DedicatedLineBus<'a> {
    port: &'a mut dyn EventTimerPort,
}

impl<'a> DedicatedLineBus<'a> {
    pub fn new(port: &'a mut dyn EventTimerPort) -> Self {
        DedicatedLineBus { port }
    }
}

impl<'a> LatchedDeviceBus for DedicatedLineBus<'a> {
    fn write(&mut self, device: LatchedDevice, data: u16, delays: LatchDelays) -> Result<u16> {
        match device {
            LatchedDevice::Markers => self.port.set_do(data & 0x0FFF, delays),
            LatchedDevice::Misc => {
                let audio = (data & misc_bits::AUDIO_REWARD) << 12;
                let fixation = (data & misc_bits::FIXATION_STATUS) << 13;
                self.port.set_do(audio | fixation, delays)
            }
            _ => Err(daq_hal::HalError::DeviceUnavailable),
        }
    }
}

/// The marker-pulse, reward, and misc state this engine has latched, kept
/// so that individual bits (fixation, audio reward) can be mutated without
/// clobbering the others.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatchedShadowState {
    pub markers: u16,
    pub misc: u16,
}

/// Minimum hold time for a marker pulse (§4.3): the hardware-observed pulse
/// width is at least one latched-write duration, but we hold high for at
/// least this long regardless, in case the hardware doesn't guarantee it.
const MIN_MARKER_HOLD: Duration = Duration::from_micros(30);

/// Delivers simultaneous positive pulses on the selected marker lines by
/// issuing two back-to-back latched writes: raise, then lower.
pub fn trigger_markers(
    bus: &mut dyn LatchedDeviceBus,
    shadow: &mut LatchedShadowState,
    mask12: u16,
    delays: LatchDelays,
) -> Result<()> {
    let mask12 = mask12 & 0x0FFF;
    bus.write_raw(LatchedDevice::Markers, mask12, delays)?;
    shadow.markers = mask12;
    std::thread::sleep(MIN_MARKER_HOLD);
    bus.write_raw(LatchedDevice::Markers, 0, delays)?;
    shadow.markers = 0;
    Ok(())
}

pub fn set_fixation_status(
    bus: &mut dyn LatchedDeviceBus,
    shadow: &mut LatchedShadowState,
    in_bounds: bool,
    delays: LatchDelays,
) -> Result<()> {
    shadow.misc = if in_bounds {
        shadow.misc | misc_bits::FIXATION_STATUS
    } else {
        shadow.misc & !misc_bits::FIXATION_STATUS
    };
    bus.write(LatchedDevice::Misc, shadow.misc, delays)?;
    Ok(())
}

fn set_audio_reward_bit(
    bus: &mut dyn LatchedDeviceBus,
    shadow: &mut LatchedShadowState,
    on: bool,
    delays: LatchDelays,
) -> Result<()> {
    shadow.misc = if on {
        shadow.misc | misc_bits::AUDIO_REWARD
    } else {
        shadow.misc & !misc_bits::AUDIO_REWARD
    };
    bus.write(LatchedDevice::Misc, shadow.misc, delays)?;
    Ok(())
}

/// The single-byte "reward delivered" character code (§4.3 step 5).
const CHAR_REWARD_DELIVERED: u8 = 0x05;

pub fn write_char(bus: &mut dyn LatchedDeviceBus, ch: u8, delays: LatchDelays) -> Result<()> {
    bus.write(LatchedDevice::Writer, ch as u16, delays)?;
    Ok(())
}

pub fn write_string(bus: &mut dyn LatchedDeviceBus, s: &str, delays: LatchDelays) -> Result<()> {
    for b in s.bytes() {
        write_char(bus, b, delays)?;
    }
    write_char(bus, 0, delays)
}

/// Result of a reward-delivery call, reported so callers (and tests of the
/// withholding statistics) can observe what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardOutcome {
    pub withheld: bool,
    pub audio_scheduled: bool,
}

/// Delivers a reward per :
/// 1. Clip `variable_ratio` to [1,10], the other two to their declared
///    limits (adjustable duration 1-4000ms, audio duration is caller-owned
///    and only gated on being > 0).
/// 2. Compute withholding.
/// 3. If not withheld, latch the adjustable-reward duration.
/// 4. Regardless of withholding, raise the audio-reward bit if requested;
///    the caller is responsible for scheduling the bit's release after
///    `audio_duration_ms` (a one-shot timer in the original device, modeled
///    here as a plain return value the caller acts on).
/// 5. If not withheld, transmit the "reward delivered" code and the reward
///    duration as a decimal string through the character writer.
pub fn deliver_reward(
    bus: &mut dyn LatchedDeviceBus,
    shadow: &mut LatchedShadowState,
    variable_ratio: u32,
    adjustable_duration_ms: i32,
    audio_duration_ms: i32,
    delays: LatchDelays,
) -> Result<RewardOutcome> {
    let ratio = variable_ratio.clamp(1, 10);
    let adjustable_duration_ms = adjustable_duration_ms.clamp(0, 4000);

    let withheld = adjustable_duration_ms <= 0
        || (ratio > 1 && rand::random::<u32>() % ratio == 0);

    if !withheld {
        bus.write(
            LatchedDevice::AdjustableReward,
            adjustable_duration_ms as u16,
            delays,
        )?;
    }

    let audio_scheduled = audio_duration_ms > 0;
    if audio_scheduled {
        set_audio_reward_bit(bus, shadow, true, delays)?;
    }

    if !withheld {
        write_char(bus, CHAR_REWARD_DELIVERED, delays)?;
        write_string(bus, &adjustable_duration_ms.to_string(), delays)?;
    }

    Ok(RewardOutcome {
        withheld,
        audio_scheduled,
    })
}

/// Lowers the audio-reward bit. Called by whatever one-shot timer mechanism
/// the caller used to schedule the release after `audio_duration_ms`.
pub fn clear_audio_reward(
    bus: &mut dyn LatchedDeviceBus,
    shadow: &mut LatchedShadowState,
    delays: LatchDelays,
) -> Result<()> {
    set_audio_reward_bit(bus, shadow, false, delays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daq_hal::sim::{SimEventTimer, SimRegisters};
    use std::sync::Arc;

    fn make_bus() -> SimEventTimer {
        SimEventTimer::new(Arc::new(SimRegisters::new()))
    }

    #[test]
    fn trigger_markers_round_trips_through_shadow() {
        let mut port = make_bus();
        let mut bus = MultiplexedBus::new(&mut port);
        let mut shadow = LatchedShadowState::default();
        trigger_markers(&mut bus, &mut shadow, 0b1010_1010_1010, LatchDelays::default()).unwrap();
        assert_eq!(shadow.markers, 0);
    }

    #[test]
    fn reward_withholding_converges_to_one_over_ratio() {
        let mut port = make_bus();
        let mut bus = MultiplexedBus::new(&mut port);
        let mut shadow = LatchedShadowState::default();
        let ratio = 5;
        let n = 10_000;
        let mut withheld = 0;
        for _ in 0..n {
            let outcome =
                deliver_reward(&mut bus, &mut shadow, ratio, 100, 0, LatchDelays::default())
                    .unwrap();
            if outcome.withheld {
                withheld += 1;
            }
        }
        assert!((1900..=2100).contains(&withheld), "withheld={withheld}");
    }

    #[test]
    fn zero_duration_is_always_withheld() {
        let mut port = make_bus();
        let mut bus = MultiplexedBus::new(&mut port);
        let mut shadow = LatchedShadowState::default();
        let outcome = deliver_reward(&mut bus, &mut shadow, 1, 0, 0, LatchDelays::default()).unwrap();
        assert!(outcome.withheld);
    }
}

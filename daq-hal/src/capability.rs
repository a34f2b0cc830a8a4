//! Capability traits covering the three independent hardware engines on the
//! multifunction board: analog input, analog output, and the event timer's
//! digital I/O side. Modeled as traits (rather than a class hierarchy) per
//! the design note in : "no device installed" is a stateless
//! implementation of the same trait, so callers never branch on presence.

use crate::error::Result;

/// Bipolar full-scale range assumed for every channel (§3: "bipolar ±10V
/// range is assumed always").
pub const FULL_SCALE_VOLTS: f64 = 10.0;

/// Configuration for the AI engine. See  "AI configuration".
#[derive(Debug, Clone, Copy)]
pub struct AiConfig {
    pub channel_count: u8,
    pub scan_interval_us: u32,
    pub fast_channel: Option<u8>,
    pub enable_interrupt: bool,
}

impl AiConfig {
    /// Validates the invariants from : fast channel within range,
    /// scan interval floor, at least one channel.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.channel_count == 0 {
            return Err("channel_count must be >= 1".into());
        }
        if self.scan_interval_us < 1000 {
            return Err("scan_interval_us must be >= 1000".into());
        }
        if let Some(fc) = self.fast_channel {
            if fc >= self.channel_count {
                return Err("fast_channel must lie within [0, channel_count)".into());
            }
        }
        Ok(())
    }
}

/// One demultiplexed drain of the AI FIFO: the slow stream (one sample per
/// channel per scan interval) and the fast stream (one sample per fast-clock
/// tick), each in chronological, intra-scan-ordered form.
#[derive(Debug, Default, Clone)]
pub struct AiUnload {
    pub slow: Vec<i16>,
    pub fast: Vec<i16>,
}

/// Converts a bipolar two's-complement ADC/DAC code to volts and back, per
/// the "b2s" glossary entry. `bits` is the resolution of the converter
/// (typically 16 for AI, 12 or 16 for AO).
pub fn code_to_volts(code: i16, bits: u32) -> f64 {
    let half_scale = 1i64 << (bits - 1);
    (code as f64 / half_scale as f64) * FULL_SCALE_VOLTS
}

pub fn volts_to_code(volts: f64, bits: u32) -> i16 {
    let half_scale = 1i64 << (bits - 1);
    let clipped = volts.clamp(-FULL_SCALE_VOLTS, FULL_SCALE_VOLTS * (1.0 - 1.0 / half_scale as f64));
    let code = (clipped / FULL_SCALE_VOLTS * half_scale as f64).round() as i64;
    code.clamp(-(half_scale), half_scale - 1) as i16
}

/// The analog input engine: multi-rate continuous sampling with per-scan
/// interrupt.
pub trait AnalogInput: Send {
    fn configure(&mut self, config: AiConfig) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;

    /// Drains both data streams. `requested_slow_samples` sizes the
    /// blocking timeout; pass 0 if `block` is false.
    fn unload(
        &mut self,
        requested_slow_samples: usize,
        fast_capacity: usize,
        block: bool,
    ) -> Result<AiUnload>;

    fn is_empty(&self) -> bool;

    /// Called from the ISR. Returns true if this board was the interrupt
    /// source, having already acknowledged it.
    fn acknowledge_interrupt(&mut self) -> bool;
}

/// The analog output engine: immediate-mode DAC updates.
pub trait AnalogOutput: Send {
    /// Channel index of -1 writes all channels with the same code.
    fn out_code(&mut self, channel: i32, code: i16) -> Result<()>;
    /// Channel index of -1 writes all channels with the same value.
    fn out_volts(&mut self, channel: i32, volts: f64) -> Result<()>;
    fn channel_count(&self) -> u8;
}

/// Configuration for the event timer's timestamping side.
#[derive(Debug, Clone, Copy)]
pub struct EventTimerConfig {
    pub clock_period_us: u32,
    pub channel_enable_mask: u16,
}

impl EventTimerConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=10_000).contains(&self.clock_period_us) {
            return Err("clock_period_us must be in [1, 10000]".into());
        }
        Ok(())
    }
}

/// A timestamped event: a rising edge on one or more enabled DI channels
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedEvent {
    pub mask: u16,
    pub time_ticks: u32,
}

/// The event timer engine's hardware-facing surface: DAQ-like control of the
/// digital input side, plus the strobed 16-bit output port. The
/// latched-device multiplexer is layered on top of `set_do` in `daq-engines`,
/// not implemented here.
pub trait EventTimerPort: Send {
    fn configure(&mut self, config: EventTimerConfig) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn unload(&mut self, max_events: usize) -> Result<Vec<TimestampedEvent>>;

    /// Issues the three-step latched write (§3) and returns the DO-port
    /// value in force prior to the write.
    fn set_do(&mut self, value: u16, delays: LatchDelays) -> Result<u16>;

    fn clock_period_us(&self) -> u32;
}

/// The three busy-wait intervals bounding a latched write, each
/// clamped to [0, 20] microseconds by the caller.
#[derive(Debug, Clone, Copy)]
pub struct LatchDelays {
    pub pre_strobe_us: u8,
    pub strobe_low_us: u8,
    pub post_strobe_us: u8,
}

impl Default for LatchDelays {
    fn default() -> Self {
        LatchDelays {
            pre_strobe_us: 3,
            strobe_low_us: 3,
            post_strobe_us: 3,
        }
    }
}

impl LatchDelays {
    pub fn clamp_all(self) -> Self {
        LatchDelays {
            pre_strobe_us: self.pre_strobe_us.min(20),
            strobe_low_us: self.strobe_low_us.min(20),
            post_strobe_us: self.post_strobe_us.min(20),
        }
    }
}

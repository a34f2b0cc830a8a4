//! The event timer engine: DAQ-like control of the digital input side, plus
//! the latched-device protocol and pulse-sequence generator layered on top
//! of its strobed output port.

use daq_hal::{EventTimerConfig, EventTimerPort, LatchDelays, Result, TimestampedEvent};

use crate::latched::{self, LatchedShadowState, MultiplexedBus, RewardOutcome};
use crate::psg::{PsgController, PsgParams, PsgState};

/// A timestamped event reported in seconds rather than raw ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSeconds {
    pub mask: u16,
    pub time_s: f64,
}

pub struct EventTimerEngine {
    port: Box<dyn EventTimerPort>,
    shadow: LatchedShadowState,
    psg: PsgController,
    delays: LatchDelays,
}

impl EventTimerEngine {
    pub fn new(port: Box<dyn EventTimerPort>) -> Self {
        EventTimerEngine {
            port,
            shadow: LatchedShadowState::default(),
            psg: PsgController::new(),
            delays: LatchDelays::default(),
        }
    }

    pub fn set_latch_delays(&mut self, delays: LatchDelays) {
        self.delays = delays.clamp_all();
    }

    pub fn configure(&mut self, config: EventTimerConfig) -> Result<()> {
        self.port.configure(config)
    }

    pub fn start(&mut self) -> Result<()> {
        self.port.start()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.port.stop()
    }

    pub fn unload_ticks(&mut self, max_events: usize) -> Result<Vec<TimestampedEvent>> {
        self.port.unload(max_events)
    }

    pub fn unload_seconds(&mut self, max_events: usize) -> Result<Vec<EventSeconds>> {
        let period_s = self.port.clock_period_us() as f64 * 1e-6;
        Ok(self
            .port
            .unload(max_events)?
            .into_iter()
            .map(|e| EventSeconds {
                mask: e.mask,
                time_s: e.time_ticks as f64 * period_s,
            })
            .collect())
    }

    /// Issues the 3-step latched write directly and returns the previous DO
    /// value. Intermixing this with the higher-level helpers
    /// below is safe because they all route through the same shadow state.
    pub fn set_do(&mut self, value: u16) -> Result<u16> {
        self.port.set_do(value, self.delays)
    }

    fn bus(&mut self) -> MultiplexedBus<'_> {
        MultiplexedBus::new(self.port.as_mut())
    }

    pub fn trigger_markers(&mut self, mask12: u16) -> Result<()> {
        let delays = self.delays;
        let mut shadow = self.shadow;
        let mut bus = self.bus();
        latched::trigger_markers(&mut bus, &mut shadow, mask12, delays)?;
        self.shadow = shadow;
        Ok(())
    }

    pub fn set_fixation_status(&mut self, in_bounds: bool) -> Result<()> {
        let delays = self.delays;
        let mut shadow = self.shadow;
        let mut bus = self.bus();
        latched::set_fixation_status(&mut bus, &mut shadow, in_bounds, delays)?;
        self.shadow = shadow;
        Ok(())
    }

    pub fn deliver_reward(
        &mut self,
        variable_ratio: u32,
        adjustable_duration_ms: i32,
        audio_duration_ms: i32,
    ) -> Result<RewardOutcome> {
        let delays = self.delays;
        let mut shadow = self.shadow;
        let mut bus = self.bus();
        let outcome = latched::deliver_reward(
            &mut bus,
            &mut shadow,
            variable_ratio,
            adjustable_duration_ms,
            audio_duration_ms,
            delays,
        )?;
        self.shadow = shadow;
        Ok(outcome)
    }

    /// Called by the one-shot timer the caller scheduled in response to
    /// `deliver_reward`'s `audio_scheduled` flag.
    pub fn clear_audio_reward(&mut self) -> Result<()> {
        let delays = self.delays;
        let mut shadow = self.shadow;
        let mut bus = self.bus();
        latched::clear_audio_reward(&mut bus, &mut shadow, delays)?;
        self.shadow = shadow;
        Ok(())
    }

    pub fn write_char(&mut self, ch: u8) -> Result<()> {
        let delays = self.delays;
        let mut bus = self.bus();
        latched::write_char(&mut bus, ch, delays)
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        let delays = self.delays;
        let mut bus = self.bus();
        latched::write_string(&mut bus, s, delays)
    }

    pub fn configure_pulse_sequence(&mut self, params: PsgParams) -> Result<()> {
        let delays = self.delays;
        let mut bus = MultiplexedBus::new(self.port.as_mut());
        self.psg.configure(&mut bus, params, delays)
    }

    pub fn start_pulse_sequence(&mut self) -> Result<()> {
        let delays = self.delays;
        let mut bus = MultiplexedBus::new(self.port.as_mut());
        self.psg.start(&mut bus, delays)
    }

    pub fn stop_pulse_sequence(&mut self) -> Result<()> {
        let delays = self.delays;
        let mut bus = MultiplexedBus::new(self.port.as_mut());
        self.psg.stop(&mut bus, delays)
    }

    pub fn reset_pulse_sequence(&mut self) -> Result<()> {
        let delays = self.delays;
        let mut bus = MultiplexedBus::new(self.port.as_mut());
        self.psg.reset(&mut bus, delays)
    }

    pub fn pulse_sequence_state(&self) -> PsgState {
        self.psg.state()
    }
}

/// Re-exported so callers can issue a raw addressed write without pulling in
/// the `latched` module path directly.
pub use latched::LatchedDevice as DeviceAddress;

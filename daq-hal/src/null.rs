//! Null-object placeholders for capabilities whose hardware was not found at
//! device-manager acquisition time. Every operation returns
//! `HalError::DeviceUnavailable`; callers never need an `Option<dyn Trait>`
//! or a presence check.

use crate::capability::{
    AiConfig, AiUnload, AnalogInput, AnalogOutput, EventTimerConfig, EventTimerPort, LatchDelays,
    TimestampedEvent,
};
use crate::error::{HalError, Result};

#[derive(Debug, Default)]
pub struct NullAnalogInput;

impl AnalogInput for NullAnalogInput {
    fn configure(&mut self, _config: AiConfig) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn start(&mut self) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn stop(&mut self) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn unload(&mut self, _: usize, _: usize, _: bool) -> Result<AiUnload> {
        Err(HalError::DeviceUnavailable)
    }
    fn is_empty(&self) -> bool {
        true
    }
    fn acknowledge_interrupt(&mut self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct NullAnalogOutput;

impl AnalogOutput for NullAnalogOutput {
    fn out_code(&mut self, _channel: i32, _code: i16) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn out_volts(&mut self, _channel: i32, _volts: f64) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn channel_count(&self) -> u8 {
        0
    }
}

#[derive(Debug, Default)]
pub struct NullEventTimerPort;

impl EventTimerPort for NullEventTimerPort {
    fn configure(&mut self, _config: EventTimerConfig) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn start(&mut self) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn stop(&mut self) -> Result<()> {
        Err(HalError::DeviceUnavailable)
    }
    fn unload(&mut self, _max_events: usize) -> Result<Vec<TimestampedEvent>> {
        Err(HalError::DeviceUnavailable)
    }
    fn set_do(&mut self, _value: u16, _delays: LatchDelays) -> Result<u16> {
        Err(HalError::DeviceUnavailable)
    }
    fn clock_period_us(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_devices_never_panic_and_always_fail() {
        let mut ai = NullAnalogInput;
        assert!(ai.start().is_err());
        assert!(ai.is_empty());

        let mut ao = NullAnalogOutput;
        assert_eq!(ao.channel_count(), 0);
        assert!(ao.out_volts(0, 1.0).is_err());

        let mut evt = NullEventTimerPort;
        assert!(evt.set_do(0xFFFF, LatchDelays::default()).is_err());
    }
}

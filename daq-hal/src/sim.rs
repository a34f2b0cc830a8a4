//! Software-simulated register backend for the multifunction board.
//!
//! The real card is memory-mapped hardware this workspace has no physical
//! access to; this module stands in for it with a deterministic software
//! model with a typed view onto "registers", except ours are plain
//! `Mutex`-guarded Rust state rather than MMIO. It is precise enough to
//! support loopback testing: a DO write becomes visible to the DI side
//! on the same tick, and the AI engine produces exactly `channel_count`
//! samples per scan interval.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::capability::{
    AiConfig, AiUnload, AnalogInput, AnalogOutput, EventTimerConfig, EventTimerPort, LatchDelays,
    TimestampedEvent, volts_to_code,
};
use crate::error::{HalError, Result};

/// Shared register-like state visible to all three capability handles, and
/// to the DI side so that a `set_do` write loops back to any DI channel
/// wired to it in the simulated rig.
pub struct SimRegisters {
    pub do_port: AtomicU16,
    pub di_loopback_mask: AtomicU16,
    pub ao_codes: Mutex<[i16; 16]>,
    pub ai_interrupt_pending: std::sync::atomic::AtomicBool,
    pub scan_counter: AtomicU64,
    pub event_clock: AtomicU32,
}

impl SimRegisters {
    pub fn new() -> Self {
        SimRegisters {
            do_port: AtomicU16::new(0),
            // By default DI<15:0> is wired straight to DO<15:0>, matching the
            // loopback harness in  scenario 1.
            di_loopback_mask: AtomicU16::new(0xFFFF),
            ao_codes: Mutex::new([0; 16]),
            ai_interrupt_pending: std::sync::atomic::AtomicBool::new(false),
            scan_counter: AtomicU64::new(0),
            event_clock: AtomicU32::new(0),
        }
    }
}

impl Default for SimRegisters {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated AI engine. A background thread (started by `start`) ticks once
/// per configured scan interval, appending one slow scan (and, if a fast
/// channel is configured, the appropriate number of 25kHz fast samples) to
/// the FIFO. The channel values are the scan index itself, which is enough
/// for FIFO-ordering and overrun/overflow tests without pretending to model
/// real analog voltages end to end (real-valued loopback is exercised at the
/// `daq-engines` level against this same counter-based source).
pub struct SimAnalogInput {
    regs: Arc<SimRegisters>,
    config: Option<AiConfig>,
    running: Arc<std::sync::atomic::AtomicBool>,
    fifo: Arc<Mutex<VecDeque<i16>>>,
    fast_fifo: Arc<Mutex<VecDeque<i16>>>,
    fifo_capacity: usize,
    error_latched: Arc<std::sync::atomic::AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

const FIFO_DEPTH: usize = 4096;

impl SimAnalogInput {
    pub fn new(regs: Arc<SimRegisters>) -> Self {
        SimAnalogInput {
            regs,
            config: None,
            running: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            fifo: Arc::new(Mutex::new(VecDeque::new())),
            fast_fifo: Arc::new(Mutex::new(VecDeque::new())),
            fifo_capacity: FIFO_DEPTH,
            error_latched: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl AnalogInput for SimAnalogInput {
    fn configure(&mut self, config: AiConfig) -> Result<()> {
        config
            .validate()
            .map_err(HalError::InvalidConfig)?;
        // FIFO depth must exceed one slow scan plus one fast burst (§3).
        let fast_burst = if config.fast_channel.is_some() {
            (config.scan_interval_us / 40).max(1) as usize // 25kHz => 40us/tick
        } else {
            0
        };
        if self.fifo_capacity <= config.channel_count as usize + fast_burst {
            return Err(HalError::InvalidConfig(
                "FIFO depth must exceed one slow scan plus one fast burst".into(),
            ));
        }
        self.config = Some(config);
        self.error_latched.store(false, Ordering::SeqCst);
        self.fifo.lock().unwrap().clear();
        self.fast_fifo.lock().unwrap().clear();
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.error_latched.load(Ordering::SeqCst) {
            return Err(HalError::Overflow);
        }
        let config = self.config.ok_or(HalError::NotConfigured)?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let running = self.running.clone();
        let fifo = self.fifo.clone();
        let fast_fifo = self.fast_fifo.clone();
        let error_latched = self.error_latched.clone();
        let regs = self.regs.clone();
        let capacity = self.fifo_capacity;
        self.worker = Some(std::thread::spawn(move || {
            let period = Duration::from_micros(config.scan_interval_us as u64);
            let fast_period = Duration::from_micros(40);
            let mut next_scan = Instant::now() + period;
            let mut next_fast = Instant::now() + fast_period;
            let mut scan_index: i32 = 0;
            while running.load(Ordering::Relaxed) {
                let now = Instant::now();
                if now >= next_scan {
                    regs.scan_counter.fetch_add(1, Ordering::Relaxed);
                    regs.ai_interrupt_pending.store(true, Ordering::SeqCst);
                    let mut q = fifo.lock().unwrap();
                    for ch in 0..config.channel_count {
                        if q.len() >= capacity {
                            error_latched.store(true, Ordering::SeqCst);
                            running.store(false, Ordering::SeqCst);
                            return;
                        }
                        q.push_back(scan_index.wrapping_add(ch as i32) as i16);
                    }
                    scan_index = scan_index.wrapping_add(1);
                    next_scan += period;
                }
                if config.fast_channel.is_some() && now >= next_fast {
                    let mut q = fast_fifo.lock().unwrap();
                    if q.len() >= capacity {
                        error_latched.store(true, Ordering::SeqCst);
                        running.store(false, Ordering::SeqCst);
                        return;
                    }
                    q.push_back(scan_index as i16);
                    next_fast += fast_period;
                }
                std::thread::sleep(Duration::from_micros(50));
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn unload(
        &mut self,
        requested_slow_samples: usize,
        fast_capacity: usize,
        block: bool,
    ) -> Result<AiUnload> {
        let config = self.config.ok_or(HalError::NotConfigured)?;
        if self.error_latched.load(Ordering::SeqCst) {
            return Err(HalError::Overflow);
        }
        let channel_count = config.channel_count as usize;
        if block {
            let timeout = Duration::from_micros(
                ((requested_slow_samples / channel_count.max(1)) + 1) as u64
                    * config.scan_interval_us as u64,
            );
            let deadline = Instant::now() + timeout;
            loop {
                if self.fifo.lock().unwrap().len() >= channel_count {
                    break;
                }
                if Instant::now() >= deadline {
                    self.error_latched.store(true, Ordering::SeqCst);
                    return Err(HalError::Timeout);
                }
                std::thread::sleep(Duration::from_micros(100));
            }
        }
        let slow: Vec<i16> = self.fifo.lock().unwrap().drain(..).collect();
        let mut fast_q = self.fast_fifo.lock().unwrap();
        if fast_q.len() > fast_capacity {
            self.error_latched.store(true, Ordering::SeqCst);
            return Err(HalError::LostFastData);
        }
        let fast: Vec<i16> = fast_q.drain(..).collect();
        Ok(AiUnload { slow, fast })
    }

    fn is_empty(&self) -> bool {
        self.fifo.lock().unwrap().is_empty() && self.fast_fifo.lock().unwrap().is_empty()
    }

    fn acknowledge_interrupt(&mut self) -> bool {
        self.regs
            .ai_interrupt_pending
            .swap(false, Ordering::SeqCst)
    }
}

impl Drop for SimAnalogInput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Simulated AO engine: immediate-mode writes into the shared register file.
pub struct SimAnalogOutput {
    regs: Arc<SimRegisters>,
    channel_count: u8,
    bits: u32,
}

impl SimAnalogOutput {
    pub fn new(regs: Arc<SimRegisters>) -> Self {
        SimAnalogOutput {
            regs,
            channel_count: 4,
            bits: 16,
        }
    }
}

impl AnalogOutput for SimAnalogOutput {
    fn out_code(&mut self, channel: i32, code: i16) -> Result<()> {
        let mut codes = self.regs.ao_codes.lock().unwrap();
        if channel == -1 {
            for c in codes.iter_mut().take(self.channel_count as usize) {
                *c = code;
            }
            return Ok(());
        }
        if channel < 0 || channel as u8 >= self.channel_count {
            return Err(HalError::InvalidChannel(channel));
        }
        codes[channel as usize] = code;
        Ok(())
    }

    fn out_volts(&mut self, channel: i32, volts: f64) -> Result<()> {
        let code = volts_to_code(volts, self.bits);
        self.out_code(channel, code)
    }

    fn channel_count(&self) -> u8 {
        self.channel_count
    }
}

/// Simulated event-timer engine. Timestamps rising edges of the DO-port
/// loopback mask against a free-running tick counter driven by `set_do`
/// calls, which is sufficient to reproduce  scenario 1 exactly
/// (strictly chronological masks as each DO line is raised in turn).
pub struct SimEventTimer {
    regs: Arc<SimRegisters>,
    config: Option<EventTimerConfig>,
    running: bool,
    events: VecDeque<TimestampedEvent>,
    last_di_state: u16,
    error_latched: bool,
}

const EVENT_FIFO_DEPTH: usize = 1024;

impl SimEventTimer {
    pub fn new(regs: Arc<SimRegisters>) -> Self {
        SimEventTimer {
            regs,
            config: None,
            running: false,
            events: VecDeque::new(),
            last_di_state: 0,
            error_latched: false,
        }
    }
}

impl EventTimerPort for SimEventTimer {
    fn configure(&mut self, config: EventTimerConfig) -> Result<()> {
        config.validate().map_err(HalError::InvalidConfig)?;
        self.config = Some(config);
        self.events.clear();
        self.last_di_state = 0;
        self.error_latched = false;
        self.regs.event_clock.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.config.ok_or(HalError::NotConfigured)?;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }

    fn unload(&mut self, max_events: usize) -> Result<Vec<TimestampedEvent>> {
        if self.error_latched {
            return Ok(Vec::new());
        }
        let n = max_events.min(self.events.len());
        Ok(self.events.drain(..n).collect())
    }

    fn set_do(&mut self, value: u16, delays: LatchDelays) -> Result<u16> {
        let delays = delays.clamp_all();
        let previous = self.regs.do_port.swap(value, Ordering::SeqCst);

        // Busy-wait the three configured intervals: pre-strobe settle,
        // strobe-low hold, post-strobe release. These are genuine busy
        // waits matching real hardware timing -- an async sleep would let
        // another thread's DO write interleave.
        spin_wait(Duration::from_micros(delays.pre_strobe_us as u64));
        spin_wait(Duration::from_micros(delays.strobe_low_us as u64));
        spin_wait(Duration::from_micros(delays.post_strobe_us as u64));

        if self.running && !self.error_latched {
            if let Some(config) = self.config {
                let di = value & self.regs.di_loopback_mask.load(Ordering::SeqCst);
                let rising = di & !self.last_di_state & config.channel_enable_mask;
                self.last_di_state = di;
                if rising != 0 {
                    let (tick, overflowed) = self
                        .regs
                        .event_clock
                        .load(Ordering::SeqCst)
                        .overflowing_add(1);
                    self.regs.event_clock.store(tick, Ordering::SeqCst);
                    if overflowed {
                        self.error_latched = true;
                        return Ok(previous);
                    }
                    if self.events.len() >= EVENT_FIFO_DEPTH {
                        self.error_latched = true;
                        return Ok(previous);
                    }
                    self.events.push_back(TimestampedEvent {
                        mask: rising,
                        time_ticks: tick,
                    });
                }
            }
        }
        Ok(previous)
    }

    fn clock_period_us(&self) -> u32 {
        self.config.map(|c| c.clock_period_us).unwrap_or(0)
    }
}

fn spin_wait(d: Duration) {
    if d.is_zero() {
        return;
    }
    let deadline = Instant::now() + d;
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::AiConfig;

    #[test]
    fn ai_produces_channel_count_samples_per_scan() {
        let regs = Arc::new(SimRegisters::new());
        let mut ai = SimAnalogInput::new(regs);
        ai.configure(AiConfig {
            channel_count: 4,
            scan_interval_us: 2000,
            fast_channel: None,
            enable_interrupt: true,
        })
        .unwrap();
        ai.start().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        ai.stop().unwrap();
        let unload = ai.unload(4, 0, false).unwrap();
        assert_eq!(unload.slow.len() % 4, 0);
    }

    #[test]
    fn loopback_dio_yields_chronological_masks() {
        let regs = Arc::new(SimRegisters::new());
        let mut evt = SimEventTimer::new(regs);
        evt.configure(EventTimerConfig {
            clock_period_us: 10,
            channel_enable_mask: 0xFFFF,
        })
        .unwrap();
        evt.start().unwrap();
        for i in 0..16u16 {
            evt.set_do(1 << i, LatchDelays::default()).unwrap();
            evt.set_do(0, LatchDelays::default()).unwrap();
        }
        evt.set_do(0xFFFF, LatchDelays::default()).unwrap();
        let events = evt.unload(64).unwrap();
        let masks: Vec<u16> = events.iter().map(|e| e.mask).collect();
        let mut expected: Vec<u16> = (0..16).map(|i| 1u16 << i).collect();
        expected.push(0xFFFF);
        assert_eq!(masks, expected);
    }
}

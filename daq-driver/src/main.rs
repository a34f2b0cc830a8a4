//! The instrument driver process: acquires the DAQ board,
//! starts the AI and event-timer engines, connects to the renderer's link
//! server, and runs the three-thread real-time model — an ISR-simulation
//! thread for AI, an event/link poller thread, and this main thread, which
//! is the only one permitted to issue AO writes or latched-device commands.

mod cli;
mod isr;
mod link;
mod poller;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use daq_engines::EventTimerEngine;
use daq_hal::{AiConfig, Board, EventTimerConfig};
use linktalk_proto::{Command, Signal};

use cli::Cli;
use isr::IsrSimThread;
use link::Link;
use poller::{PollEvent, PollerThread};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = &cli.log_level {
        builder.parse_filters(level);
    }
    builder.init();

    let mut board = Board::acquire().context("acquiring DAQ board")?;

    let ai_config = AiConfig {
        channel_count: cli.ai_channels,
        scan_interval_us: cli.ai_scan_interval_us,
        fast_channel: None,
        enable_interrupt: true,
    };
    ai_config.validate().map_err(anyhow::Error::msg)?;
    board.analog_input().configure(ai_config)?;
    board.analog_input().start()?;

    let mut timer = EventTimerEngine::new(board.take_event_timer());
    let timer_config =
        EventTimerConfig { clock_period_us: cli.event_clock_period_us, channel_enable_mask: 0xffff };
    timer_config.validate().map_err(anyhow::Error::msg)?;
    timer.configure(timer_config)?;
    timer.start()?;

    let board = Arc::new(Mutex::new(board));
    let timer = Arc::new(Mutex::new(timer));

    let link = Link::connect(&cli.renderer_addr, Some(Duration::from_micros(500)))
        .context("connecting to renderer")?;
    let link = Arc::new(Mutex::new(link));
    link.lock().unwrap().send_command(&Command::GetVersion)?;

    let (ai_tx, ai_rx) = mpsc::channel();
    let _isr = IsrSimThread::spawn(board.clone(), cli.ai_scan_interval_us, ai_tx);

    let (poll_tx, poll_rx) = mpsc::channel();
    let _poller = PollerThread::spawn(timer.clone(), link.clone(), poll_tx);

    log::info!("daq-driver running against renderer at {}", cli.renderer_addr);

    'main: loop {
        while let Ok(unload) = ai_rx.try_recv() {
            log::debug!("AI unload: {} slow samples, {} fast samples", unload.slow.len(), unload.fast.len());
        }

        while let Ok(event) = poll_rx.try_recv() {
            match event {
                PollEvent::Events(events) => {
                    for e in events {
                        log::debug!("event-timer: mask={:#06x} t={:.6}s", e.mask, e.time_s);
                    }
                }
                PollEvent::Signal(Signal::CmdError(message)) => {
                    log::warn!("renderer reported a command error: {message}");
                }
                PollEvent::Signal(Signal::Bye | Signal::Quitting) => {
                    log::info!("renderer is closing the link, shutting down");
                    break 'main;
                }
                PollEvent::Signal(signal) => {
                    log::debug!("signal: {signal:?}");
                }
                PollEvent::LinkClosed => {
                    log::warn!("link closed unexpectedly, shutting down");
                    break 'main;
                }
            }
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    board.lock().unwrap().analog_input().stop().ok();
    timer.lock().unwrap().stop().ok();

    Ok(())
}

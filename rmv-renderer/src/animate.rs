//! The animation main loop: runs once per animation sequence,
//! from the `start-animate` command that carries frame 0 and frame 1's
//! vectors through to whichever command ends it.

use std::time::Instant;

use linktalk_proto::{AckPayload, AnimationState, Command, MotionVector, Signal};
use rmv_math::{DisplayGeometry, PeriodRefiner};
use thiserror::Error;

use crate::display::Display;
use crate::link_server::DriverLink;
use crate::sync_flash::SyncFlash;
use crate::target_engine::TargetEngine;

#[derive(Debug, Error)]
pub enum AnimateError {
    #[error(transparent)]
    Link(#[from] crate::link_server::LinkServerError),
    #[error(transparent)]
    Display(#[from] crate::display::DisplayError),
}

pub type Result<T> = std::result::Result<T, AnimateError>;

/// Which command ended the loop, so the caller can decide what happens next.
pub enum ExitReason {
    StopAnimate,
    ShuttingDown,
    Exit,
}

const HEARTBEAT_INTERVAL_S: f64 = 1.0;
/// The tolerance a frame's wall-clock arrival is allowed before it counts
/// as a skip, expressed as a margin below one period.
const SKIP_MARGIN_S: f64 = 500e-6;

/// Runs the animation loop to completion. `stereo` selects whether each
/// iteration draws both eyes or just one.
pub fn run(
    link: &mut DriverLink,
    display: &mut Display,
    engine: &mut TargetEngine,
    sync_flash: &mut SyncFlash,
    geometry: &DisplayGeometry,
    stereo: bool,
    frame0: Vec<MotionVector>,
    frame1: Vec<MotionVector>,
) -> Result<ExitReason> {
    let frame_interval_ms = display.period.period_s * 1000.0;
    engine.update_motion(0.0, &frame0);
    engine.update_motion(0.0, &frame1);
    sync_flash.arm();

    let mut refiner = PeriodRefiner::new(display.period.period_s);
    let mut frame_index: u32 = 0;
    let mut start: Option<Instant> = None;
    let mut last_heartbeat_s = 0.0;

    loop {
        display.pump_events();

        let lit = sync_flash.advance();
        draw_frame(engine, sync_flash, geometry, stereo, lit);
        display.swap_buffers()?;
        finish_gl();

        let now = Instant::now();
        let start = *start.get_or_insert(now);
        let elapsed_s = (now - start).as_secs_f64();
        let period_s = refiner.period_s();

        let mut n = (elapsed_s / period_s).round().max(0.0) as u32;
        let mut skip_count = 0u32;
        while elapsed_s - n as f64 * period_s > period_s - SKIP_MARGIN_S {
            n += 1;
            skip_count += 1;
        }
        if skip_count > 0 {
            link.send_signal(&Signal::AnimateMessage { frame_index, skip_count: Some(skip_count) })?;
        }

        if elapsed_s - last_heartbeat_s >= HEARTBEAT_INTERVAL_S {
            link.send_signal(&Signal::AnimateMessage { frame_index, skip_count: None })?;
            last_heartbeat_s = elapsed_s;
        }

        refiner.observe(elapsed_s, frame_index + 1);

        let mut got_update = false;
        if let Some(cmd) = link.try_recv_command()? {
            match AnimationState::Running.validate(&cmd) {
                Ok(()) => match cmd {
                    Command::UpdateFrame { vectors } => {
                        engine.update_motion(frame_interval_ms, &vectors);
                        got_update = true;
                        link.send_signal(&Signal::CmdAck(AckPayload::None))?;
                    }
                    Command::StopAnimate => return Ok(finish(engine, sync_flash, ExitReason::StopAnimate)),
                    Command::ShuttingDown => return Ok(finish(engine, sync_flash, ExitReason::ShuttingDown)),
                    Command::Exit => return Ok(finish(engine, sync_flash, ExitReason::Exit)),
                    _ => unreachable!("validated against AnimationState::Running"),
                },
                Err(e) => link.send_signal(&Signal::CmdError(e.to_string()))?,
            }
        }

        if !got_update {
            link.send_signal(&Signal::AnimateMessage { frame_index, skip_count: Some(0) })?;
        }

        frame_index += 1;
    }
}

fn draw_frame(engine: &TargetEngine, sync_flash: &SyncFlash, geometry: &DisplayGeometry, stereo: bool, lit: bool) {
    unsafe {
        gl::Clear(gl::COLOR_BUFFER_BIT);
    }
    if stereo {
        unsafe {
            gl::DrawBuffer(gl::BACK_LEFT);
        }
        engine.draw(geometry, -0.5);
        engine.draw_sync_flash(geometry, sync_flash, lit);
        unsafe {
            gl::DrawBuffer(gl::BACK_RIGHT);
        }
        engine.draw(geometry, 0.5);
        engine.draw_sync_flash(geometry, sync_flash, lit);
    } else {
        engine.draw(geometry, 0.0);
        engine.draw_sync_flash(geometry, sync_flash, lit);
    }
}

/// Blocks until the driver's swap has completed, matching the display
/// server's vertical retrace.
fn finish_gl() {
    unsafe {
        gl::Finish();
    }
}

fn finish(engine: &mut TargetEngine, sync_flash: &mut SyncFlash, reason: ExitReason) -> ExitReason {
    engine.unload_all();
    sync_flash.extinguish();
    reason
}

//! Entry point: wires the CLI, media store, display, target engine and
//! link server together and runs the outside-animation command loop,
//! handing off to [`animate::run`] for each `start-animate`.

mod animate;
mod cli;
mod display;
mod link_server;
mod media;
mod sync_flash;
mod target_engine;

use anyhow::Context;
use clap::Parser;
use linktalk_proto::{AckPayload, AnimationState, Command, Signal};
use rmv_video::MediaStore;
use thiserror::Error;

use crate::animate::ExitReason;
use crate::cli::Cli;
use crate::display::Display;
use crate::link_server::{DriverLink, LinkServer};
use crate::media::MediaHandler;
use crate::sync_flash::SyncFlash;
use crate::target_engine::TargetEngine;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Link(#[from] link_server::LinkServerError),
    #[error(transparent)]
    Display(#[from] display::DisplayError),
    #[error(transparent)]
    Engine(#[from] target_engine::TargetEngineError),
    #[error(transparent)]
    Media(#[from] media::MediaCmdError),
    #[error(transparent)]
    Animate(#[from] animate::AnimateError),
}

/// What a served session decided should happen next.
enum SessionEnd {
    /// The driver announced its own shutdown; keep the process alive and
    /// wait for a new connection.
    Reconnect,
    /// `restart` was requested; re-exec this binary with the same
    /// arguments and exit.
    Restart,
    /// `exit` was requested; terminate the process.
    Quit,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = &cli.log_level {
        builder.parse_filters(level);
    }
    builder.init();

    let media_store = match &cli.media_root {
        Some(root) => MediaStore::open(root.clone()).context("opening the media store")?,
        None => MediaStore::open_default().context("opening the default media store")?,
    };
    let mut media = MediaHandler::new(media_store);

    let mut display = Display::open(cli.width_mm, cli.height_mm, cli.distance_mm, cli.stereo)
        .context("opening the display")?;
    let mut engine = TargetEngine::new().context("compiling the target shader")?;
    let mut sync_flash = SyncFlash::new(0.0, 0);
    rmv_video::restrict_main_thread_affinity();

    let server = LinkServer::bind(&cli.listen_addr)?;
    log::info!("rmv-renderer listening on {}", cli.listen_addr);

    loop {
        let mut link = server.accept()?;
        match serve_session(&mut link, &mut display, &mut engine, &mut media, &mut sync_flash, cli.stereo)? {
            SessionEnd::Reconnect => continue,
            SessionEnd::Quit => return Ok(()),
            SessionEnd::Restart => {
                let exe = std::env::current_exe()?;
                let args: Vec<String> = std::env::args().skip(1).collect();
                std::process::Command::new(exe).args(args).spawn()?;
                return Ok(());
            }
        }
    }
}

/// Serves one driver connection until it ends the session; a later
/// connection is served the same way after `shutting-down`.
fn serve_session(
    link: &mut DriverLink,
    display: &mut Display,
    engine: &mut TargetEngine,
    media: &mut MediaHandler,
    sync_flash: &mut SyncFlash,
    stereo: bool,
) -> Result<SessionEnd, MainError> {
    loop {
        let cmd = link.recv_command()?;

        if let Err(e) = AnimationState::Idle.validate(&cmd) {
            link.send_signal(&Signal::CmdError(e.to_string()))?;
            continue;
        }

        match cmd {
            Command::StartAnimate { frame0, frame1 } => {
                let geometry = display.geometry;
                let reason = animate::run(link, display, engine, sync_flash, &geometry, stereo, frame0, frame1)?;
                match reason {
                    ExitReason::StopAnimate => link.send_signal(&Signal::CmdAck(AckPayload::None))?,
                    ExitReason::ShuttingDown => {
                        link.send_signal(&Signal::Bye)?;
                        return Ok(SessionEnd::Reconnect);
                    }
                    ExitReason::Exit => {
                        link.send_signal(&Signal::Quitting)?;
                        return Ok(SessionEnd::Quit);
                    }
                }
            }
            Command::ShuttingDown => {
                link.send_signal(&Signal::Bye)?;
                return Ok(SessionEnd::Reconnect);
            }
            Command::Restart => {
                link.send_signal(&Signal::Bye)?;
                return Ok(SessionEnd::Restart);
            }
            Command::Exit => {
                link.send_signal(&Signal::Quitting)?;
                return Ok(SessionEnd::Quit);
            }
            other => match dispatch_idle_command(other, display, engine, media, sync_flash) {
                Ok(signal) => link.send_signal(&signal)?,
                Err(e) => link.send_signal(&Signal::CmdError(e.to_string()))?,
            },
        }
    }
}

/// Handles every command valid outside animation except the
/// session-terminating ones `shutting-down`/`restart`/`exit`, and the
/// animation starter handled separately.
fn dispatch_idle_command(
    cmd: Command,
    display: &mut Display,
    engine: &mut TargetEngine,
    media: &mut MediaHandler,
    sync_flash: &mut SyncFlash,
) -> Result<Signal, MainError> {
    Ok(match cmd {
        Command::GetVersion => Signal::CmdAck(AckPayload::Version {
            major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
            minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        }),
        Command::GetAllVideoModes => Signal::CmdAck(AckPayload::VideoModes(display.video_modes())),
        Command::GetCurrentVideoMode => Signal::CmdAck(AckPayload::CurrentVideoMode(display.current_video_mode())),
        Command::SetCurrentVideoMode { index } => {
            display.set_current_video_mode(index)?;
            Signal::CmdAck(AckPayload::None)
        }
        Command::GetGamma => {
            let (r_milli, g_milli, b_milli) = display.gamma_milli();
            Signal::CmdAck(AckPayload::Gamma { r_milli, g_milli, b_milli })
        }
        Command::SetGamma { r_milli, g_milli, b_milli } => {
            display.set_gamma(r_milli, g_milli, b_milli);
            Signal::CmdAck(AckPayload::None)
        }
        Command::SetSyncFlash { size_mm, duration_frames } => {
            sync_flash.set_config(size_mm, duration_frames);
            Signal::CmdAck(AckPayload::None)
        }
        Command::SetBackgroundColor { packed_rgb } => {
            display.set_background_color(packed_rgb);
            Signal::CmdAck(AckPayload::None)
        }
        Command::SetGeometry { width_mm, height_mm, distance_mm } => {
            display.set_geometry(width_mm as f64, height_mm as f64, distance_mm as f64);
            Signal::CmdAck(AckPayload::None)
        }
        Command::GetMediaDirs => media.get_media_dirs()?,
        Command::GetMediaFiles { folder } => media.get_media_files(&folder)?,
        Command::GetMediaInfo { folder, file } => media.get_media_info(&folder, &file)?,
        Command::DeleteMedia { folder, file } => media.delete_media(&folder, file.as_deref())?,
        Command::PutFile { folder, file, size_bytes } => media.begin_put_file(folder, file, size_bytes)?,
        Command::PutFileChunk { data } => media.put_file_chunk(data)?,
        Command::PutFileDone => media.finish_put_file()?,
        Command::LoadTargets { definitions } => {
            engine.load(&definitions, media.store())?;
            Signal::CmdAck(AckPayload::None)
        }
        Command::StartAnimate { .. } | Command::ShuttingDown | Command::Restart | Command::Exit => {
            unreachable!("handled by the caller before dispatch_idle_command")
        }
        Command::UpdateFrame { .. } | Command::StopAnimate => {
            unreachable!("rejected by AnimationState::Idle::validate")
        }
    })
}

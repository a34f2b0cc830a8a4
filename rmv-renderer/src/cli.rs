use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "rmv-renderer", about = "The OpenGL stimulus renderer and link server")]
pub struct Cli {
    /// Address the link server listens on for the driver's connection.
    #[arg(long, default_value = "0.0.0.0:7000")]
    pub listen_addr: String,

    /// Overrides RUST_LOG for this process.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Overrides the media store root (defaults to `$HOME/media`).
    #[arg(long)]
    pub media_root: Option<PathBuf>,

    /// Initial screen width, used until `set-geometry` arrives.
    #[arg(long, default_value_t = 531.0)]
    pub width_mm: f64,

    /// Initial screen height, used until `set-geometry` arrives.
    #[arg(long, default_value_t = 299.0)]
    pub height_mm: f64,

    /// Initial eye-to-screen distance, used until `set-geometry` arrives.
    #[arg(long, default_value_t = 600.0)]
    pub distance_mm: f64,

    /// Request a stereo visual (falls back to mono if unavailable).
    #[arg(long, default_value_t = false)]
    pub stereo: bool,
}

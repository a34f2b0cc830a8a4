use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "daq-driver", about = "Instrument driver: DAQ board ownership and the renderer link")]
pub struct Cli {
    /// Address of the renderer's link server, e.g. 192.168.1.2:7000.
    #[arg(long, default_value = "127.0.0.1:7000")]
    pub renderer_addr: String,

    /// Overrides RUST_LOG for this process.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Analog input channel count.
    #[arg(long, default_value_t = 8)]
    pub ai_channels: u8,

    /// Analog input scan interval in microseconds.
    #[arg(long, default_value_t = 1000)]
    pub ai_scan_interval_us: u32,

    /// Event timer clock period in microseconds.
    #[arg(long, default_value_t = 10)]
    pub event_clock_period_us: u32,
}

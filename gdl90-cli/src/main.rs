//! gdl90: decode GDL90 captures and print the traffic table.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use gdl90_core::config::{self, Config};
use gdl90_core::serialize;
use gdl90_core::types::*;
use gdl90_core::{Decoder, DecoderStats, TableMode, TrafficEntry};

mod capture;
mod enrich;

#[derive(Parser)]
#[command(name = "gdl90", version, about = "GDL90 decoder and traffic table")]
struct Cli {
    /// Log decode errors and unhandled messages (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default ~/.gdl90-decode/config.yaml)
    #[arg(long, global = true, env = "GDL90_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture file and print the traffic table
    Decode {
        /// Raw binary GDL90 stream, or hex text with one frame per line
        file: PathBuf,

        /// Treat the file as hex text without detection
        #[arg(long)]
        hex: bool,

        /// Print one delimited line per traffic entry
        #[arg(short, long, conflicts_with = "json")]
        delimited: bool,

        /// Override the configured output delimiter
        #[arg(long)]
        delimiter: Option<char>,

        /// Start delimited output with a row of field names
        #[arg(long, requires = "delimited")]
        header: bool,

        /// Print the table and receiver state as JSON
        #[arg(long)]
        json: bool,

        /// Keep every report instead of merging by callsign
        #[arg(long)]
        append: bool,
    },

    /// Show the effective configuration or write a default file
    Config {
        /// Write the default configuration if no file exists
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(config::config_file);

    match cli.command {
        Commands::Decode {
            file,
            hex,
            delimited,
            delimiter,
            header,
            json,
            append,
        } => {
            let mut cfg = load_config(&config_path);
            if let Some(d) = delimiter {
                cfg.output.delimiter = d;
            }
            if append {
                cfg.decoder.table_mode = TableMode::Append;
            }
            let format = if json {
                OutputFormat::Json
            } else if delimited {
                OutputFormat::Delimited { header }
            } else {
                OutputFormat::Table
            };
            cmd_decode(&file, hex, format, &cfg)
        }
        Commands::Config { init } => cmd_config(&config_path, init),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Config {
    config::load_config_from(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        std::process::exit(1);
    })
}

// ---------------------------------------------------------------------------
// decode
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Delimited { header: bool },
    Json,
}

fn cmd_decode(file: &Path, force_hex: bool, format: OutputFormat, cfg: &Config) {
    let frames = capture::read_capture(file, force_hex).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    });

    let mut decoder = Decoder::new(cfg.decoder);
    for raw in &frames {
        // Failures are logged and counted by the decoder.
        let _ = decoder.decode(&raw.bytes, raw.timestamp);
    }

    enrich::apply_registrations(decoder.table_mut());
    if let Some(rx) = cfg.receiver.position() {
        enrich::apply_range_bearing(decoder.table_mut(), rx);
    }

    match format {
        OutputFormat::Table => print_summary(&decoder),
        OutputFormat::Delimited { header } => {
            let d = cfg.output.delimiter;
            if header {
                print!("{}", serialize::header(d));
            }
            print!("{}", serialize::serialize_table(&decoder, d))
        }
        OutputFormat::Json => print_json(&decoder),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: &'a DecoderStats,
    heartbeat: Option<&'a HeartbeatStatus>,
    receiver_status: Option<&'a ReceiverStatus>,
    ownship_callsign: Option<&'a str>,
    traffic: Vec<&'a TrafficEntry>,
}

fn print_json(decoder: &Decoder) {
    let report = JsonReport {
        stats: decoder.stats(),
        heartbeat: decoder.heartbeat(),
        receiver_status: decoder.receiver_status(),
        ownship_callsign: decoder.ownship_callsign(),
        traffic: decoder.table().iter().collect(),
    };
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error encoding JSON: {e}");
            std::process::exit(1);
        }
    }
}

fn print_summary(decoder: &Decoder) {
    let stats = decoder.stats();
    println!();
    println!(
        "Frames: {} parsed, {} decoded, {} aircraft",
        stats.frames,
        stats.decoded,
        decoder.traffic_count()
    );
    println!(
        "  Unhandled: {}  Framing: {}  Length: {}  CRC: {}  Uplink: {}",
        stats.unhandled,
        stats.framing_errors,
        stats.length_errors,
        stats.crc_failures,
        stats.app_frame_errors
    );
    if let Some(ts) = decoder.latest_timestamp() {
        println!(
            "  Heartbeat: {:02}:{:02}:{:02}Z",
            ts / 3600,
            ts / 60 % 60,
            ts % 60
        );
    }
    if let Some(own) = decoder.ownship_callsign() {
        println!("  Ownship: {own}");
    }
    println!();

    if decoder.table().is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Callsign", "Address", "Type", "Reg", "Alt (ft)", "Speed (kts)", "Track", "VRate",
        "Lat", "Lon", "Range (nm)", "Brg", "Updates",
    ]);

    for entry in decoder.table().iter() {
        let r = &entry.report;
        table.add_row(vec![
            Cell::new(if r.is_ownship {
                format!("{} *", r.callsign)
            } else {
                r.callsign.clone()
            }),
            Cell::new(format!("{:06X}", r.participant_address)),
            Cell::new(r.address_type),
            Cell::new(if entry.owner.registration.is_empty() {
                "-"
            } else {
                entry.owner.registration.as_str()
            }),
            Cell::new(r.altitude_ft.map(|a| a.to_string()).unwrap_or("-".into())),
            Cell::new(match r.horizontal_velocity() {
                HorizontalVelocity::Knots(kt) => kt.to_string(),
                HorizontalVelocity::Saturated => ">4094".into(),
                HorizontalVelocity::NoData => "-".into(),
            }),
            Cell::new(if r.track_valid() {
                format!("{:.1}", r.track_deg)
            } else {
                "-".into()
            }),
            Cell::new(format!("{:+}", r.vertical_velocity_fpm)),
            Cell::new(format!("{:.4}", r.latitude)),
            Cell::new(format!("{:.4}", r.longitude)),
            Cell::new(
                entry
                    .range
                    .map(|rb| format!("{:.1}", rb.range_nm))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                entry
                    .range
                    .map(|rb| format!("{:.0}", rb.bearing_deg))
                    .unwrap_or("-".into()),
            ),
            Cell::new(entry.update_count),
        ]);
    }

    println!("{table}");
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config(path: &Path, init: bool) {
    if init {
        if path.exists() {
            eprintln!("Config already exists: {}", path.display());
            std::process::exit(1);
        }
        if let Err(e) = config::save_config_to(&Config::default(), path) {
            eprintln!("Error writing {}: {e}", path.display());
            std::process::exit(1);
        }
        println!("Wrote {}", path.display());
        return;
    }

    let cfg = load_config(path);
    println!("# {}", path.display());
    print!("{}", config::serialize_config(&cfg));
}

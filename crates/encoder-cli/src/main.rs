//! encoderctl
//!
//! Operator CLI for SDI-to-IP encoders: apply scenario presets or stream
//! files, disable channels, reset the device and read back its settings.
//!
//! # Configuration
//!
//! Device access comes from `ENCODER_HOST`, `ENCODER_USERNAME`,
//! `ENCODER_PASSWORD` (and the other `ENCODER_*` variables understood by
//! `ClientConfig`); `--host`, `--username` and `--password` override them.
//! Scenario targets read `TARGET_IP`, `PORT_BEGIN`, `PROTOCOL`, `SRT_MODE`
//! and `PIXEL_FORMAT`.
//!
//! Every device command runs under `--timeout-secs` (default 10). A timed
//! out command is abandoned, not cancelled on the device.

#![warn(clippy::pedantic)]

mod scenarios;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use common::config::ObservabilityConfig;
use common::observability::init_tracing;
use encoder_control::config::ClientConfig;
use encoder_control::encode::SrtMode;
use encoder_control::types::{CgiModule, ChannelId, ImageSize, PixelFormat, StreamDescription};
use encoder_control::{HttpTransport, StreamController};
use scenarios::{OutputProtocol, Preset, TargetOpts, DEFAULT_PORT_BEGIN, DEFAULT_TARGET_IP};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{error, info};

/// Default per-command timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Password the appliance ships with.
const FACTORY_PASSWORD: &str = "321321";

#[derive(Parser)]
#[command(name = "encoderctl")]
#[command(author, version, about = "SDI-to-IP encoder control", long_about = None)]
struct Cli {
    #[command(flatten)]
    device: DeviceArgs,

    #[command(flatten)]
    target: TargetArgs,

    /// Seconds to wait for each device command
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DeviceArgs {
    /// Encoder host or base URL (overrides ENCODER_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Basic auth user (overrides ENCODER_USERNAME)
    #[arg(long, global = true)]
    username: Option<String>,

    /// Basic auth password (overrides ENCODER_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,
}

#[derive(Args)]
struct TargetArgs {
    /// Destination IP for scenario streams
    #[arg(long, global = true, env = "TARGET_IP")]
    target_ip: Option<String>,

    /// Output port of channel 1; later channels add 10 each
    #[arg(long, global = true, env = "PORT_BEGIN", default_value_t = DEFAULT_PORT_BEGIN)]
    port_begin: u16,

    /// Output protocol (default: srt when --srt-mode is set, else rtp)
    #[arg(long, global = true, env = "PROTOCOL", value_enum)]
    protocol: Option<OutputProtocol>,

    /// SRT mode: caller, listener or rendezvous
    #[arg(long, global = true, env = "SRT_MODE")]
    srt_mode: Option<SrtMode>,

    /// Pixel format for scenario streams (NV12, NV16, XV15, XV20)
    #[arg(long, global = true, env = "PIXEL_FORMAT")]
    pixel_format: Option<PixelFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a scenario preset
    Scenario {
        #[arg(value_enum)]
        preset: Preset,

        /// Number of channels (1-4)
        #[arg(long)]
        count: Option<u8>,

        /// Video bitrate in kbps
        #[arg(long)]
        bitrate: Option<u32>,

        /// Image size, "1280,720" or "1920,1080"
        #[arg(long)]
        image_size: Option<ImageSize>,

        /// Enable SCTE-104 to SCTE-35 conversion
        #[arg(long)]
        scte: bool,

        /// Print the stream descriptions instead of applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply stream descriptions from a JSON file (an array)
    Apply {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Disable channels
    Disable {
        #[arg(required = true, value_parser = clap::value_parser!(u8).range(1..=4))]
        ids: Vec<u8>,
    },

    /// Disable all encode and stream channels
    Reset,

    /// Read device settings
    Inquiry {
        /// CGI modules to read
        #[arg(default_values_t = [CgiModule::AvInput, CgiModule::Video, CgiModule::Encode, CgiModule::Stream])]
        modules: Vec<CgiModule>,

        /// Print parsed values as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive menu
    Menu,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let observability = ObservabilityConfig::from_env()?;
    init_tracing(&observability);

    let timeout = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Commands::Menu => run_menu(&cli.device, &cli.target, timeout).await,
        command => {
            let config = client_config(&cli.device, &HashMap::new())?;
            let target = target_opts(&cli.target, &config);
            let mut controller = StreamController::new(config.transport()?);
            run_command(command, &mut controller, &cli.target, &target, timeout).await
        }
    }
}

/// Environment variables overlaid with command-line overrides.
fn client_config(args: &DeviceArgs, prompted: &HashMap<String, String>) -> Result<ClientConfig> {
    let mut vars: HashMap<String, String> = std::env::vars().collect();
    vars.extend(prompted.clone());

    for (name, value) in [
        ("ENCODER_HOST", &args.host),
        ("ENCODER_USERNAME", &args.username),
        ("ENCODER_PASSWORD", &args.password),
    ] {
        if let Some(value) = value {
            vars.insert(name.to_string(), value.clone());
        }
    }

    ClientConfig::from_vars(&vars).context("invalid encoder configuration")
}

/// An SRT listener is reached at the device itself, so its target defaults
/// to the device host.
fn target_opts(args: &TargetArgs, config: &ClientConfig) -> TargetOpts {
    let target_ip = args.target_ip.clone().unwrap_or_else(|| {
        if args.srt_mode == Some(SrtMode::Listener) {
            device_host(&config.base_url).to_string()
        } else {
            DEFAULT_TARGET_IP.to_string()
        }
    });

    TargetOpts {
        target_ip,
        port_begin: args.port_begin,
        protocol: args.protocol,
        srt_mode: args.srt_mode,
    }
}

/// Host part of a base URL: no scheme, port or path.
fn device_host(base_url: &str) -> &str {
    let rest = base_url
        .split_once("://")
        .map_or(base_url, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    authority.split(':').next().unwrap_or(authority)
}

async fn with_timeout<T>(
    timeout: Duration,
    command: impl Future<Output = encoder_control::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, command).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(anyhow!(
            "Command failed after timeout of {}s",
            timeout.as_secs()
        )),
    }
}

async fn run_command(
    command: Commands,
    controller: &mut StreamController<HttpTransport>,
    args: &TargetArgs,
    target: &TargetOpts,
    timeout: Duration,
) -> Result<()> {
    match command {
        Commands::Scenario {
            preset,
            count,
            bitrate,
            image_size,
            scte,
            dry_run,
        } => {
            let mut opts = preset.opts();
            if let Some(count) = count {
                opts.count = count;
            }
            if let Some(bitrate) = bitrate {
                opts.bitrate = bitrate;
            }
            if let Some(image_size) = image_size {
                opts.image_size = image_size;
            }
            if let Some(pixel_format) = args.pixel_format {
                opts.pixel_format = pixel_format;
            }
            opts.scte104_to_35_conversion = scte;

            let streams = preset.streams(&opts, target)?;
            if dry_run {
                println!("{}", serde_json::to_string_pretty(&streams)?);
                return Ok(());
            }
            apply(controller, &streams, timeout).await
        }
        Commands::Apply { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let streams: Vec<StreamDescription> = serde_json::from_str(&text)
                .with_context(|| format!("invalid stream descriptions in {}", file.display()))?;
            apply(controller, &streams, timeout).await
        }
        Commands::Disable { ids } => {
            let ids = ids
                .into_iter()
                .map(ChannelId::new)
                .collect::<encoder_control::Result<Vec<_>>>()?;
            with_timeout(timeout, controller.disable_streams(&ids)).await?;
            info!(target: "encoder.cli", channels = ids.len(), "Channels disabled");
            Ok(())
        }
        Commands::Reset => {
            with_timeout(timeout, controller.reset()).await?;
            info!(target: "encoder.cli", "Device reset");
            Ok(())
        }
        Commands::Inquiry { modules, json } => inquiry(controller, &modules, json, timeout).await,
        Commands::Menu => Err(anyhow!("menu cannot be nested")),
    }
}

async fn apply(
    controller: &mut StreamController<HttpTransport>,
    streams: &[StreamDescription],
    timeout: Duration,
) -> Result<()> {
    with_timeout(timeout, controller.create_streams(streams)).await?;
    info!(
        target: "encoder.cli",
        streams = streams.len(),
        audio_slots = controller.audio_slots_used(),
        "Streams applied"
    );
    Ok(())
}

async fn inquiry(
    controller: &StreamController<HttpTransport>,
    modules: &[CgiModule],
    json: bool,
    timeout: Duration,
) -> Result<()> {
    if json {
        let values = with_timeout(timeout, controller.inquiry_values(modules)).await?;
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else {
        let text = with_timeout(timeout, controller.inquiry(modules)).await?;
        println!("{text}");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Scenario(Preset),
    Reset,
    InquiryStreams,
    InquirySystem,
    Quit,
}

fn menu_entries() -> Vec<(String, &'static str, MenuAction)> {
    let presets = [
        Preset::AvcMain,
        Preset::AvcDoubleStereo,
        Preset::AvcSingle,
        Preset::HevcMain,
        Preset::HevcDoubleStereo,
        Preset::HevcSingle,
    ];

    let mut entries: Vec<_> = presets
        .into_iter()
        .map(|p| (p.name(), p.title(), MenuAction::Scenario(p)))
        .collect();

    entries.extend([
        (
            "reset".to_string(),
            "Disable all encode and stream channels",
            MenuAction::Reset,
        ),
        (
            "inquiry-streams".to_string(),
            "Inquiry streams",
            MenuAction::InquiryStreams,
        ),
        (
            "inquiry-system".to_string(),
            "Inquiry system",
            MenuAction::InquirySystem,
        ),
        ("quit".to_string(), "Quit", MenuAction::Quit),
    ]);
    entries
}

/// Match a menu answer by number (1-based) or by name.
fn parse_choice(answer: &str, entries: &[(String, &'static str, MenuAction)]) -> Option<MenuAction> {
    let answer = answer.trim();
    if let Ok(n) = answer.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| entries.get(i)).map(|e| e.2);
    }
    entries.iter().find(|e| e.0 == answer).map(|e| e.2)
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, question: &str, default: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{question} [{default}]: ").as_bytes())
        .await?;
    stdout.flush().await?;

    let answer = lines.next_line().await?.unwrap_or_default();
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// Numbered menu on stdin. One controller lives for the whole session, so
/// audio slot accounting carries across commands.
async fn run_menu(device: &DeviceArgs, args: &TargetArgs, timeout: Duration) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut prompted = HashMap::new();
    if device.host.is_none() && std::env::var("ENCODER_HOST").is_err() {
        let host = prompt(&mut lines, "Enter host", DEFAULT_TARGET_IP).await?;
        prompted.insert("ENCODER_HOST".to_string(), host);
    }
    if device.password.is_none() && std::env::var("ENCODER_PASSWORD").is_err() {
        let password = prompt(&mut lines, "Enter password", FACTORY_PASSWORD).await?;
        prompted.insert("ENCODER_PASSWORD".to_string(), password);
    }

    let config = client_config(device, &prompted)?;
    let target = target_opts(args, &config);
    let mut controller = StreamController::new(config.transport()?);
    let entries = menu_entries();

    loop {
        println!("\nSelect command (HOST: {})", config.base_url);
        for (i, (name, title, _)) in entries.iter().enumerate() {
            println!("{:>3}) {name:<20} {title}", i + 1);
        }

        let answer = prompt(&mut lines, "Choice", "quit").await?;
        let Some(action) = parse_choice(&answer, &entries) else {
            println!("Unknown choice: {answer}");
            continue;
        };

        let result = match action {
            MenuAction::Quit => return Ok(()),
            MenuAction::Scenario(preset) => {
                let mut opts = preset.opts();
                if let Some(pixel_format) = args.pixel_format {
                    opts.pixel_format = pixel_format;
                }
                match preset.streams(&opts, &target) {
                    Ok(streams) => apply(&mut controller, &streams, timeout).await,
                    Err(e) => Err(e),
                }
            }
            MenuAction::Reset => with_timeout(timeout, controller.reset()).await,
            MenuAction::InquiryStreams => {
                let modules = [
                    CgiModule::AvInput,
                    CgiModule::Video,
                    CgiModule::Encode,
                    CgiModule::Stream,
                ];
                inquiry(&controller, &modules, false, timeout).await
            }
            MenuAction::InquirySystem => {
                inquiry(&controller, &[CgiModule::System], false, timeout).await
            }
        };

        match result {
            Ok(()) => println!("Command completed!"),
            Err(e) => error!(target: "encoder.cli", error = %format!("{e:#}"), "Command failed"),
        }
    }
}

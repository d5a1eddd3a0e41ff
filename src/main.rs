use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hpc_link_lib::battery::{BatteryKind, PowerStatus, decode_battery, percentage, raw_sentinel};
use hpc_link_lib::constants::*;
use hpc_link_lib::keymap::{self, Keymap};
use hpc_link_lib::touch::decode_samples;
use hpc_link_lib::{Framer, InputEvent, LinkConfig, SerialPort};

/// Offline tools for the Jornada 720 MCU and MobilePro 900/c serial input links.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON link configuration; defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run recorded MobilePro receive episodes (one hex line each, `-` for stdin) through the framer.
    Replay {
        input: PathBuf,
        /// Pause between episodes so deferred polls can go out.
        #[arg(long, default_value_t = 30)]
        gap_ms: u64,
        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
    },
    /// Jornada battery model: a raw main battery reading or a whole GetBatteryData frame.
    Battery {
        #[arg(long, conflicts_with = "frame")]
        raw: Option<u16>,
        /// Three bytes as hex, e.g. `804006`.
        #[arg(long)]
        frame: Option<String>,
        /// Apply the AC correction.
        #[arg(long)]
        ac: bool,
    },
    /// Decode a Jornada GetTouchSamples frame (eight bytes as hex).
    Touch {
        #[arg(long)]
        frame: String,
    },
    /// Device names, touch ranges, keymaps and the default configuration.
    Info,
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // INFO by default, DEBUG with -v, TRACE with -vv; RUST_LOG still wins
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

fn load_config(path: Option<&Path>) -> Result<LinkConfig> {
    let Some(path) = path else {
        return Ok(LinkConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
    let config = LinkConfig::from_json(&text).with_context(|| format!("Invalid config {:?}", path))?;
    debug!(?config, "Loaded configuration");
    Ok(config)
}

fn decode_hex<const N: usize>(text: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(text.trim()).with_context(|| format!("{what} is not valid hex"))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{what} must be {N} bytes, got {len}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file, &cli.verbose)?;
    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Replay { input, gap_ms, json } => run_replay(&input, Duration::from_millis(gap_ms), json, &config).await,
        Commands::Battery { raw, frame, ac } => run_battery(raw, frame.as_deref(), ac, &config),
        Commands::Touch { frame } => run_touch(&frame),
        Commands::Info => run_info(),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }
    Ok(())
}

/// Serial port fed from a recording; whatever the framer transmits is kept.
struct ReplayPort {
    wire: Arc<Mutex<ReplayWire>>,
}

#[derive(Default)]
struct ReplayWire {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl SerialPort for ReplayPort {
    fn overrun(&mut self) -> bool {
        false
    }

    fn flush_rx(&mut self) {
        self.wire.lock().unwrap_or_else(|e| e.into_inner()).rx.clear();
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.wire.lock().unwrap_or_else(|e| e.into_inner()).rx.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        debug!("host -> controller: {:02x}", byte);
        self.wire.lock().unwrap_or_else(|e| e.into_inner()).tx.push(byte);
    }

    fn set_rts(&mut self, _asserted: bool) {}

    fn disable_receive(&mut self) {}
}

fn parse_episodes(text: &str) -> Result<Vec<(usize, Vec<u8>)>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            let compact: String = line.split_whitespace().collect();
            let bytes = hex::decode(&compact).with_context(|| format!("Line {}: not a hex episode", number))?;
            Ok((number, bytes))
        })
        .collect()
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read episodes from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read episodes from {:?}", input))
}

async fn run_replay(input: &Path, gap: Duration, json: bool, config: &LinkConfig) -> Result<()> {
    let episodes = parse_episodes(&read_input(input)?)?;
    if episodes.is_empty() {
        warn!("No episodes in {:?}", input);
        return Ok(());
    }

    let wire = Arc::new(Mutex::new(ReplayWire::default()));
    let port = ReplayPort { wire: Arc::clone(&wire) };
    let framer = Framer::new(port, config.framer, Handle::current());
    framer.start();
    info!(
        "Replaying {} episodes through the {} keymap",
        episodes.len(),
        framer.keymap().name()
    );

    let mut reported = 0usize;
    for (number, episode) in &episodes {
        wire.lock().unwrap_or_else(|e| e.into_inner()).rx.extend(episode.iter().copied());
        let events = framer.handle_interrupt();
        if events.is_empty() {
            debug!("Line {}: {} -> no events", number, hex::encode(episode));
        }
        for event in events {
            print_event(*number, &event, json)?;
            reported += 1;
        }
        tokio::time::sleep(gap).await;
    }

    framer.shutdown().await;
    let tx = wire.lock().unwrap_or_else(|e| e.into_inner()).tx.clone();
    let polls = tx.iter().filter(|&&b| b == MP_KEY_POLL).count();
    info!(
        "{} events, {} key polls, host sent: {}",
        reported,
        polls,
        hex::encode(&tx)
    );
    Ok(())
}

fn print_event(line: usize, event: &InputEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event).context("Failed to encode event")?);
    } else {
        println!("{:>5}: {}", line, event);
    }
    Ok(())
}

fn run_battery(raw: Option<u16>, frame: Option<&str>, ac: bool, config: &LinkConfig) -> Result<()> {
    let calibration = &config.battery;
    let main = match (raw, frame) {
        (Some(raw), _) => Some(raw),
        (None, Some(frame)) => {
            let frame = decode_hex::<BATTERY_FRAME_SIZE>(frame, "battery frame")?;
            let main = decode_battery(frame, BatteryKind::Main);
            let backup = decode_battery(frame, BatteryKind::Backup);
            println!("main raw:   {}", raw_sentinel(main));
            println!("backup raw: {}", raw_sentinel(backup));
            main
        }
        (None, None) => bail!("Pass --raw <N> or --frame <hex>"),
    };

    let life = main.map(|raw| percentage(raw, ac, calibration));
    let status = PowerStatus::classify(life, ac, false);
    match life {
        Some(pct) => println!("main:       {}% ({})", pct, status.status),
        None => println!("main:       {}", status.status),
    }
    Ok(())
}

fn run_touch(frame: &str) -> Result<()> {
    let frame = decode_hex::<TOUCH_FRAME_SIZE>(frame, "touch frame")?;
    let sample = decode_samples(frame);
    println!("{}", sample);

    let in_range = JORNADA_TOUCH_X.contains(sample.x) && JORNADA_TOUCH_Y.contains(sample.y);
    if !in_range {
        warn!(
            "Sample lies outside the panel ({}..{}, {}..{})",
            JORNADA_TOUCH_X.min, JORNADA_TOUCH_X.max, JORNADA_TOUCH_Y.min, JORNADA_TOUCH_Y.max
        );
    }
    Ok(())
}

fn print_keymap(map: &Keymap) {
    println!("  {:<24} {} keys", map.name(), map.keys().len());
}

fn run_info() -> Result<()> {
    println!("{}", JORNADA_KEYBOARD_NAME);
    println!(
        "{}: x {}..{}, y {}..{}",
        JORNADA_TOUCH_NAME, JORNADA_TOUCH_X.min, JORNADA_TOUCH_X.max, JORNADA_TOUCH_Y.min, JORNADA_TOUCH_Y.max
    );
    println!("{}", MOBILEPRO_KEYBOARD_NAME);
    println!(
        "{}: x {}..{}, y {}..{}",
        MOBILEPRO_TOUCH_NAME, MOBILEPRO_TOUCH_X.min, MOBILEPRO_TOUCH_X.max, MOBILEPRO_TOUCH_Y.min, MOBILEPRO_TOUCH_Y.max
    );

    println!("keymaps:");
    for map in [&keymap::JORNADA720, &keymap::MOBILEPRO, &keymap::MOBILEPRO_SPECIAL] {
        print_keymap(map);
    }

    let defaults = serde_json::to_string_pretty(&LinkConfig::default()).context("Failed to encode defaults")?;
    println!("default config:\n{}", defaults);
    Ok(())
}

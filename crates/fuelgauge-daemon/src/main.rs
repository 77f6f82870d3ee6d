//! fuelgauged
//!
//! Samples the handheld's fuel gauge and keeps battery and mains state
//! current. Runs in the foreground until SIGTERM or SIGINT.
//!
//! Signals:
//! - SIGTERM / SIGINT: shut down
//! - SIGUSR1: system is suspending, stop polling
//! - SIGUSR2: system resumed, refresh shortly and resume polling

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use fuelgauge_config::GaugeConfig;
use fuelgauge_core::{
    BatterySupply, ChargeState, MainsSupply, Poller, PowerSupply, RegisterTransport,
    TelemetryReader,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Most recent suspend/resume notification not yet acted on
static POWER_EVENT: AtomicU8 = AtomicU8::new(PowerEvent::NONE);

/// Main loop granularity for signal checks
const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerEvent {
    Suspend,
    Resume,
}

impl PowerEvent {
    const NONE: u8 = 0;

    fn raw(self) -> u8 {
        match self {
            PowerEvent::Suspend => 1,
            PowerEvent::Resume => 2,
        }
    }

    fn post(self) {
        POWER_EVENT.store(self.raw(), Ordering::SeqCst);
    }

    /// Take the latest pending event; earlier ones are superseded
    fn take() -> Option<Self> {
        match POWER_EVENT.swap(Self::NONE, Ordering::SeqCst) {
            1 => Some(PowerEvent::Suspend),
            2 => Some(PowerEvent::Resume),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Dump,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "fuelgauged")]
#[command(about = "Samples the fuel gauge and reports battery and mains state")]
#[command(version)]
struct Args {
    /// Configuration file (default: system file with user overlay)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print POWER_SUPPLY_* lines for both supplies and exit
    #[arg(long, conflicts_with = "json")]
    dump: bool,

    /// Print both supplies as JSON and exit
    #[arg(long)]
    json: bool,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.dump {
            Mode::Dump
        } else if self.json {
            Mode::Json
        } else {
            Mode::Run
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging();

    let config = match &args.config {
        Some(path) => GaugeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GaugeConfig::load_default().context("Failed to load config")?,
    };

    let transport = open_transport(&config)?;
    run(transport, &config, args.mode())
}

/// Setup logging to stderr
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[cfg(target_os = "linux")]
fn open_transport(config: &GaugeConfig) -> Result<impl RegisterTransport + 'static> {
    use fuelgauge_hal::{I2cTransport, open_bus};

    let bus = open_bus(&config.bus.device)
        .with_context(|| format!("Failed to open {}", config.bus.device.display()))?;
    info!(
        "Gauge at {:#04x} on {} ({})",
        config.bus.address,
        config.bus.device.display(),
        config.bus.protocol.as_str()
    );
    Ok(I2cTransport::new(bus, config.bus.address, config.bus.protocol))
}

#[cfg(not(target_os = "linux"))]
fn open_transport(_config: &GaugeConfig) -> Result<fuelgauge_hal::mock::MockTransport> {
    anyhow::bail!("i2c-dev buses are only available on Linux")
}

fn run<T: RegisterTransport + 'static>(transport: T, config: &GaugeConfig, mode: Mode) -> Result<()> {
    let reader = Arc::new(TelemetryReader::with_config(transport, &config.telemetry));
    let battery = BatterySupply::with_config(Arc::clone(&reader), &config.telemetry);
    let mains = MainsSupply::with_config(Arc::clone(&reader), &config.telemetry);

    // Prime the cache so the first report has data
    if let Err(e) = reader.refresh(true) {
        match mode {
            Mode::Run => warn!("Initial telemetry read failed: {}", e),
            Mode::Dump | Mode::Json => {
                return Err(e).context("Failed to read the gauge");
            }
        }
    }

    match mode {
        Mode::Dump => {
            for supply in [&battery as &dyn PowerSupply, &mains] {
                for line in report::uevent_lines(supply)? {
                    println!("{}", line);
                }
            }
            Ok(())
        }
        Mode::Json => {
            let json = report::to_json(&[&battery, &mains])?;
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
        Mode::Run => {
            setup_signal_handlers()?;
            let poller = if config.poller.enabled {
                Some(Poller::start(Arc::clone(&reader), &config.poller)?)
            } else {
                info!("Background polling disabled");
                None
            };
            main_loop(&reader, poller, config.daemon.report_interval())
        }
    }
}

/// Setup signal handlers
fn setup_signal_handlers() -> Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    // SAFETY: the handler only stores to atomics
    unsafe {
        sigaction(Signal::SIGTERM, &action)?;
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGUSR1, &action)?;
        sigaction(Signal::SIGUSR2, &action)?;
    }

    Ok(())
}

extern "C" fn handle_signal(sig: i32) {
    match sig {
        libc::SIGTERM | libc::SIGINT => SHUTDOWN.store(true, Ordering::SeqCst),
        libc::SIGUSR1 => PowerEvent::Suspend.post(),
        libc::SIGUSR2 => PowerEvent::Resume.post(),
        _ => {}
    }
}

fn main_loop<T: RegisterTransport + 'static>(
    reader: &TelemetryReader<T>,
    mut poller: Option<Poller>,
    report_interval: Duration,
) -> Result<()> {
    info!("fuelgauged running");
    log_summary(reader);
    let mut last_report = Instant::now();

    while !SHUTDOWN.load(Ordering::SeqCst) {
        match PowerEvent::take() {
            Some(PowerEvent::Suspend) => {
                info!("Suspending telemetry polling");
                if let Some(poller) = &poller {
                    poller.suspend();
                }
            }
            Some(PowerEvent::Resume) => {
                info!("Resuming telemetry polling");
                if let Some(poller) = &poller {
                    poller.resume();
                }
            }
            None => {}
        }

        if last_report.elapsed() >= report_interval {
            last_report = Instant::now();
            log_summary(reader);
        }

        std::thread::sleep(TICK);
    }

    info!("Shutting down");
    if let Some(poller) = poller.as_mut() {
        poller.shutdown();
    }
    Ok(())
}

fn log_summary<T: RegisterTransport>(reader: &TelemetryReader<T>) {
    let snapshot = reader.snapshot();
    if !snapshot.is_populated() {
        warn!("No telemetry yet");
        return;
    }

    let state = ChargeState::evaluate(&snapshot);
    info!(
        status = state.status.as_str(),
        level = state.level.as_str(),
        percentage = state.percentage,
        ac_online = state.ac_online,
        voltage_mv = snapshot.voltage_now_mv,
        rate_ma = snapshot.rate_now_ma,
        "Battery"
    );
    debug!("Snapshot: {:?}", snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("fuelgauged").chain(list.iter().copied()))
    }

    #[test]
    fn test_args_defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.mode(), Mode::Run);
        assert!(parsed.config.is_none());
    }

    #[test]
    fn test_args_config_and_mode() {
        let parsed = args(&["--config", "/tmp/gauge.toml", "--json"]).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("/tmp/gauge.toml")));
        assert_eq!(parsed.mode(), Mode::Json);

        let parsed = args(&["-c", "/etc/gauge.toml", "--dump"]).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("/etc/gauge.toml")));
        assert_eq!(parsed.mode(), Mode::Dump);
    }

    #[test]
    fn test_args_errors() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["--dump", "--json"]).is_err());
    }

    #[test]
    fn test_latest_power_event_wins() {
        assert_eq!(PowerEvent::take(), None);

        handle_signal(libc::SIGUSR2);
        handle_signal(libc::SIGUSR1);
        assert_eq!(PowerEvent::take(), Some(PowerEvent::Suspend));
        assert_eq!(PowerEvent::take(), None);

        handle_signal(libc::SIGUSR1);
        handle_signal(libc::SIGUSR2);
        assert_eq!(PowerEvent::take(), Some(PowerEvent::Resume));
    }

    #[test]
    fn test_dump_fails_without_gauge() {
        let gauge = fuelgauge_hal::mock::MockTransport::new();
        gauge.set_failing(true);
        assert!(run(gauge, &GaugeConfig::default(), Mode::Dump).is_err());
    }
}

// src/main.rs

mod bridge;
mod publish;
mod recording;
mod sampling;

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use bridge::Bridge;
use publish::{file_publisher, stdout_publisher, FanOut};
use recording::{convert_to_csv, BinarySink, CsvColumns, CsvSink, RecordSink, XlsxSink};
use sampling::{
    wall_clock_millis, JsonLineSource, SampleWindow, SimulatedSource, DEFAULT_WINDOW_SECONDS,
};

#[derive(Parser)]
#[command(
    name = "rigrelay",
    version,
    about = "Sensor-rig sample bridge: rolling window, ladder resistances, session recording, fan-out republication"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest rig samples, maintain the live window, record and republish.
    Run(RunArgs),
    /// Expand a packed .bin session file into a C1..C4 CSV.
    Decode {
        /// Path to the packed session file.
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Rolling window span in seconds.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SECONDS)]
    window_secs: f64,

    /// Record from startup for this many seconds, flush, then keep bridging.
    #[arg(long)]
    record_secs: Option<f64>,

    /// Where finished sessions go.
    #[arg(long, value_enum, default_value = "csv")]
    sink: SinkKind,

    /// Directory session files are written into.
    #[arg(long, default_value = "sessions")]
    out_dir: PathBuf,

    /// Filename label between the date stamp and the session number.
    #[arg(long, default_value = "Trial")]
    label: String,

    /// CSV sessions carry position and resistance columns as well.
    #[arg(long)]
    full_columns: bool,

    /// Re-publish derived readings as JSON lines on stdout.
    #[arg(long)]
    publish_stdout: bool,

    /// Append derived readings as JSON lines to these files.
    #[arg(long = "publish-file", value_name = "PATH")]
    publish_files: Vec<PathBuf>,

    /// Generate simulated rig traffic instead of reading stdin.
    #[arg(long)]
    simulate: bool,

    /// Sample rate of the simulated source in Hz.
    #[arg(long, default_value_t = 20.0)]
    sim_rate_hz: f64,

    /// Log a window summary every this many seconds.
    #[arg(long, value_name = "SECS")]
    stats_secs: Option<u64>,
}

#[derive(Copy, Clone, ValueEnum)]
enum SinkKind {
    Csv,
    Bin,
    Xlsx,
}

fn main() -> Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Decode { path } => {
            let csv = convert_to_csv(&path)
                .with_context(|| format!("decoding {}", path.display()))?;
            println!("{}", csv.display());
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let window = Arc::new(Mutex::new(
        SampleWindow::new(args.window_secs).context("invalid --window-secs")?,
    ));

    let sink: Box<dyn RecordSink> = match args.sink {
        SinkKind::Csv => {
            let columns = if args.full_columns {
                CsvColumns::Full
            } else {
                CsvColumns::Raw
            };
            Box::new(CsvSink::new(&args.out_dir, &args.label, columns))
        }
        SinkKind::Bin => Box::new(BinarySink::new(&args.out_dir, &args.label)),
        SinkKind::Xlsx => Box::new(XlsxSink::new(&args.out_dir, &args.label)),
    };

    let mut fanout = FanOut::new();
    if args.publish_stdout {
        fanout.add(Box::new(stdout_publisher()));
    }
    for path in &args.publish_files {
        let publisher = file_publisher(path)
            .with_context(|| format!("opening publish destination {}", path.display()))?;
        fanout.add(Box::new(publisher));
    }
    info!(
        "bridging to {} destination(s), sessions to {}",
        fanout.len(),
        args.out_dir.display()
    );

    let mut bridge = Bridge::new(window, sink, fanout);
    if let Some(secs) = args.record_secs {
        bridge
            .arm_recording(wall_clock_millis() / 1000.0, Some(secs))
            .context("invalid --record-secs")?;
    }
    if let Some(every) = args.stats_secs {
        spawn_stats_logger(bridge.window(), Duration::from_secs(every));
    }

    if args.simulate {
        let mut source = SimulatedSource::new(args.sim_rate_hz).context("invalid --sim-rate-hz")?;
        bridge.run(&mut source)
    } else {
        let stdin = io::stdin();
        let mut source = JsonLineSource::new(stdin.lock());
        bridge.run(&mut source)
    }
}

fn spawn_stats_logger(window: Arc<Mutex<SampleWindow>>, every: Duration) {
    thread::spawn(move || loop {
        thread::sleep(every);
        let snapshot = window
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot();
        match snapshot.samples.last() {
            Some(last) => info!(
                "window: {} samples, {} events, latest R = [{:.3}, {:.3}, {:.3}]",
                snapshot.samples.len(),
                snapshot.events.len(),
                last.resistances[0],
                last.resistances[1],
                last.resistances[2],
            ),
            None => info!("window: empty"),
        }
    });
}

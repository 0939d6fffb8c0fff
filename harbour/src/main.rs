//! Harbour ship-servicing simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::WrapErr;
use serde::Serialize;
use strum::IntoEnumIterator;

use harbour::{targets, Harbour, HarbourConfig, QueueCategory, ScriptedArrival, Series};

/// Runs the harbour simulation.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Path to a JSON file with the harbour configuration.
    /// Missing fields take their default values.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON array of scripted arrivals to replay instead of random arrivals.
    #[clap(long)]
    arrivals: Option<PathBuf>,

    /// Number of docks.
    #[clap(long)]
    docks: Option<usize>,

    /// Number of tugs.
    #[clap(long)]
    tugs: Option<usize>,

    /// Number of fuel barges.
    #[clap(long)]
    barges: Option<usize>,

    /// Simulated hours.
    #[clap(long)]
    horizon: Option<f64>,

    /// Random seed.
    #[clap(long)]
    seed: Option<u64>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Write each log stream to its own file in this directory.
    #[clap(long)]
    log_dir: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,

    /// Write the monitored series and wait times as CSV files to this directory.
    #[clap(long)]
    series_output: Option<PathBuf>,

    /// Do not display the progress bar.
    #[clap(long)]
    no_progress: bool,
}

impl Opt {
    fn harbour_config(&self) -> eyre::Result<HarbourConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .wrap_err_with(|| format!("unable to open config {}", path.display()))?;
                serde_json::from_reader(file)
                    .wrap_err_with(|| format!("unable to parse config {}", path.display()))?
            }
            None => HarbourConfig::default(),
        };
        if let Some(docks) = self.docks {
            config.docks = docks;
        }
        if let Some(tugs) = self.tugs {
            config.tugs = tugs;
        }
        if let Some(barges) = self.barges {
            config.barges = barges;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }

    fn scripted_arrivals(&self) -> eyre::Result<Option<Vec<ScriptedArrival>>> {
        self.arrivals
            .as_ref()
            .map(|path| {
                let file = File::open(path)
                    .wrap_err_with(|| format!("unable to open arrivals {}", path.display()))?;
                serde_json::from_reader(file)
                    .wrap_err_with(|| format!("unable to parse arrivals {}", path.display()))
            })
            .transpose()
    }
}

fn truncated(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let mut dispatch = fern::Dispatch::new().level(if opt.log_dir.is_some() {
        log_level.max(log::LevelFilter::Info)
    } else {
        log_level
    });
    if let Some(dir) = &opt.log_dir {
        std::fs::create_dir_all(dir)?;
        for (target, file) in &[
            (targets::ARRIVALS, "arrivals.log"),
            (targets::DOCK, "dock.log"),
            (targets::QUEUES, "queues.log"),
        ] {
            let target = *target;
            dispatch = dispatch.chain(
                fern::Dispatch::new()
                    .level(log::LevelFilter::Info)
                    .filter(move |meta| meta.target() == target)
                    .chain(truncated(&dir.join(file))?),
            );
        }
    }
    if !opt.no_stderr {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!("[{}] {}", record.level(), message))
                })
                .level(log_level)
                .chain(std::io::stderr()),
        );
    }
    dispatch.apply()?;
    Ok(())
}

#[derive(Serialize)]
struct Point {
    time: f64,
    value: i64,
}

#[derive(Serialize)]
struct Wait {
    category: String,
    wait: f64,
}

fn write_series(harbour: &Harbour, dir: &Path) -> eyre::Result<()> {
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("unable to create {}", dir.display()))?;
    let monitor = harbour.monitor()?;
    for series in Series::iter() {
        let path = dir.join(format!("{}.csv", series));
        let mut writer = csv::Writer::from_path(&path)
            .wrap_err_with(|| format!("unable to create {}", path.display()))?;
        for &(time, value) in monitor.series(series) {
            writer.serialize(Point { time, value })?;
        }
        writer.flush()?;
    }
    let path = dir.join("waits.csv");
    let mut writer = csv::Writer::from_path(&path)
        .wrap_err_with(|| format!("unable to create {}", path.display()))?;
    for category in QueueCategory::iter() {
        for &wait in monitor.waits(category) {
            writer.serialize(Wait {
                category: category.to_string(),
                wait,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    let config = opt.harbour_config()?;
    let mut harbour = match opt.scripted_arrivals()? {
        Some(arrivals) => Harbour::scripted(&config, arrivals)?,
        None => Harbour::new(&config)?,
    };
    if opt.no_progress {
        harbour.run()?;
    } else {
        harbour.run_with_progress()?;
    }
    harbour.monitor()?.log_summaries();
    if let Some(dir) = &opt.series_output {
        write_series(&harbour, dir)?;
    }
    println!("{}", serde_json::to_string_pretty(&harbour.summary()?)?);
    Ok(())
}

//! # Cascade Runner
//!
//! Runs a pair cascade to `Ngen` generations and writes the NPZ checkpoint.
//!
//! ```bash
//! # defaults: E0 = 1.6e9, 100 generations on a 100-point grid
//! cascade --checkpoint-dir ./runs
//!
//! # config file plus overrides, resuming when a checkpoint exists
//! cascade --config run.json --n-gen 400 --enforce --resume auto --checkpoint-dir ./runs
//! ```
//!
//! Ctrl-C stops at the next generation boundary and saves what was computed.

use cascade_core::observer::LogObserver;
use cascade_core::run::{CancelToken, CascadeRun};
use cascade_types::config::{CascadeConfig, ResumeMode};
use clap::Parser;
use std::path::PathBuf;

/// Grid-based electromagnetic pair cascade
#[derive(Parser, Debug)]
#[command(name = "cascade")]
#[command(about = "Evolve an inverse-Compton / pair-production cascade generation by generation")]
#[command(version)]
struct Args {
    /// JSON configuration file; missing keys take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial lepton energy [m_e c^2]
    #[arg(long)]
    e0: Option<f64>,

    /// Number of generations
    #[arg(long)]
    n_gen: Option<usize>,

    /// Grid points
    #[arg(long)]
    n_grid: Option<usize>,

    /// Seed photon spectral index
    #[arg(long)]
    s: Option<f64>,

    /// Softest seed photon energy
    #[arg(long)]
    es_min: Option<f64>,

    /// Hardest seed photon energy
    #[arg(long)]
    es_max: Option<f64>,

    /// Pair-production threshold (default 1/Esmax)
    #[arg(long)]
    eg_min: Option<f64>,

    /// Rescale each generation's products to conserve energy
    #[arg(long)]
    enforce: bool,

    /// fresh | restart | auto
    #[arg(long, value_parser = parse_resume)]
    resume: Option<ResumeMode>,

    /// Directory holding the checkpoint
    #[arg(long, default_value = ".")]
    checkpoint_dir: PathBuf,
}

fn parse_resume(s: &str) -> Result<ResumeMode, String> {
    match s {
        "fresh" => Ok(ResumeMode::Fresh),
        "restart" => Ok(ResumeMode::Restart),
        "auto" => Ok(ResumeMode::Auto),
        other => Err(format!("unknown resume mode '{other}', expected fresh|restart|auto")),
    }
}

impl Args {
    fn into_config(self) -> Result<(CascadeConfig, PathBuf), Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("Loading configuration from {:?}", path);
                CascadeConfig::from_file(path)?
            }
            None => CascadeConfig::default(),
        };
        if let Some(v) = self.e0 {
            config.e0 = v;
        }
        if let Some(v) = self.n_gen {
            config.n_gen = v;
        }
        if let Some(v) = self.n_grid {
            config.n_grid = v;
        }
        if let Some(v) = self.s {
            config.seed_index = v;
        }
        if let Some(v) = self.es_min {
            config.seed_emin = v;
        }
        if let Some(v) = self.es_max {
            config.seed_emax = v;
        }
        if self.eg_min.is_some() {
            config.eg_min = self.eg_min;
        }
        if self.enforce {
            config.enforce_energy_conservation = true;
        }
        if let Some(mode) = self.resume {
            config.resume = mode;
        }
        config.validate()?;
        Ok((config, self.checkpoint_dir))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, dir) = Args::parse().into_config()?;
    let n_gen = config.n_gen;
    let mode = config.resume;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("Interrupt received, stopping after the current generation");
        handler_token.cancel();
    })?;

    let mut run = CascadeRun::open(config, &dir, mode)?;
    let path = run.checkpoint_path(&dir);
    let outcome = run.run(n_gen, &cancel, &mut LogObserver)?;
    match run.finish(outcome, &path)? {
        Some(saved) => log::info!("Checkpoint: {:?}", saved),
        None => log::info!("Nothing new to save"),
    }
    Ok(())
}

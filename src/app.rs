//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main that sets up logging,
//! parses the CLI, resolves the configuration and dispatches to a handler.

use std::io::IsTerminal;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CalculateArgs, ClassifyArgs, Cli, Command, FireballArgs, SampleArgs, rewrite_args};
use crate::config::EmiConfig;
use crate::data::sample::{SampleConfig, generate_specimens};
use crate::domain::{EntryParameters, Parameter, PerParameter};
use crate::error::{AppError, Result};

pub mod pipeline;

/// Entry point for the `emi` binary.
pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse_from(rewrite_args(std::env::args().collect()));
    let config = EmiConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Classify(args) => handle_classify(args, &config),
        Command::Calculate(args) => handle_calculate(args, &config),
        Command::Fireball(args) => handle_fireball(args, &config),
        Command::Sample(args) => handle_sample(args, &config),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meteorica=info"));
    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn handle_classify(args: ClassifyArgs, config: &EmiConfig) -> Result<()> {
    let ingested = crate::io::load_specimens(&args.input)?;
    let entries = pipeline::classify_batch(&ingested.specimens, config);

    if args.detail || entries.len() == 1 {
        for entry in &entries {
            match &entry.outcome {
                Ok(r) => println!("{}", crate::report::format_result(r)),
                Err(e) => println!("=== {} ===\n{e}\n", entry.specimen_id),
            }
        }
    }
    if entries.len() > 1 {
        println!("{}", crate::report::format_batch(&entries));
        let top = crate::report::rank_most_anomalous(&entries, args.top);
        if !top.is_empty() {
            println!("Most anomalous:");
            for r in top {
                println!("  {:<24} {:.4} {}", r.specimen_id, r.emi, r.level.display_name());
            }
        }
    }

    if let Some(path) = &args.export {
        crate::io::write_results_csv(path, &entries)?;
        info!(path = %path.display(), "wrote results CSV");
    }
    if let Some(path) = &args.json {
        crate::io::write_results_json(path, &entries)?;
        info!(path = %path.display(), "wrote results JSON");
    }
    if let Some(dir) = &args.metbull {
        for (specimen, entry) in ingested.specimens.iter().zip(&entries) {
            if let Ok(r) = &entry.outcome {
                crate::io::write_package(dir, specimen, r)?;
            }
        }
    }

    match entries.iter().find_map(|e| e.outcome.as_ref().err()) {
        Some(first) if entries.iter().all(|e| e.outcome.is_err()) => Err(first.clone()),
        _ => Ok(()),
    }
}

fn raw_scores(args: &CalculateArgs) -> PerParameter<Option<f64>> {
    PerParameter::from_fn(|p| match p {
        Parameter::Mcc => args.mcc,
        Parameter::Smg => args.smg,
        Parameter::Twi => args.twi,
        Parameter::Iaf => args.iaf,
        Parameter::Atp => args.atp,
        Parameter::Pbdr => args.pbdr,
        Parameter::Cnea => args.cnea,
    })
}

fn handle_calculate(args: CalculateArgs, config: &EmiConfig) -> Result<()> {
    let composite = crate::emi::composite(&raw_scores(&args), config)?;
    print!("{}", crate::report::format_composite(&composite));
    Ok(())
}

fn handle_fireball(args: FireballArgs, config: &EmiConfig) -> Result<()> {
    let entry = EntryParameters {
        velocity_km_s: args.velocity,
        angle_deg: args.angle,
        diameter_m: args.diameter,
        composition: args.composition,
    };
    let result = pipeline::run_fireball(&entry, config)?;
    print!("{}", crate::report::format_atp(&result));

    if let Some(path) = &args.series {
        crate::io::write_series_csv(path, &result.series)?;
        info!(path = %path.display(), samples = result.series.len(), "wrote trajectory series");
    }
    Ok(())
}

fn handle_sample(args: SampleArgs, config: &EmiConfig) -> Result<()> {
    let specimens = generate_specimens(&SampleConfig {
        group: args.group,
        count: args.count,
        seed: args.seed,
        scatter: args.scatter,
    })?;
    info!(group = %args.group, count = specimens.len(), seed = args.seed, "generated specimens");

    match &args.export {
        Some(path) => {
            crate::io::write_specimens_json(path, &specimens)?;
            info!(path = %path.display(), "wrote specimen JSON");
        }
        None if !args.classify => {
            let json = serde_json::to_string_pretty(&specimens)
                .map_err(|e| AppError::io(format!("Failed to render specimens: {e}")))?;
            println!("{json}");
        }
        None => {}
    }

    if args.classify {
        let entries = pipeline::classify_batch(&specimens, config);
        println!("{}", crate::report::format_batch(&entries));
    }
    Ok(())
}

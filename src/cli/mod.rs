//! Command-line parsing for the `emi` binary.
//!
//! Argument parsing and command dispatch are kept apart from the calculators;
//! handlers live in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::reference::{EntryComposition, MineralGroup};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "emi", version, about = "METEORICA Extraterrestrial Material Index")]
pub struct Cli {
    /// EMI config TOML (falls back to $METEORICA_CONFIG, then built-in defaults).
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify specimens from a CSV or JSON file.
    Classify(ClassifyArgs),
    /// Combine raw parameter scores into an EMI without running the calculators.
    Calculate(CalculateArgs),
    /// Run the ablation model for a fireball entry.
    Fireball(FireballArgs),
    /// Generate synthetic specimens around a reference group.
    Sample(SampleArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Debug, Args, Clone)]
pub struct ClassifyArgs {
    /// Specimen file (`.csv` or `.json`).
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Export per-specimen results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export per-specimen results to JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,

    /// Write a MetBull submission package per classified specimen into this directory.
    #[arg(long, value_name = "DIR")]
    pub metbull: Option<PathBuf>,

    /// Print the full per-parameter report for every specimen.
    #[arg(long)]
    pub detail: bool,

    /// Show the N most anomalous specimens.
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

/// Raw parameter scores; omitted parameters are skipped and the rest reweighted.
#[derive(Debug, Args, Clone, Default)]
pub struct CalculateArgs {
    /// Mineralogical Classification Coefficient (0..1, 1 = on centroid).
    #[arg(long)]
    pub mcc: Option<f64>,
    /// Shock Metamorphism Grade (GPa-equivalent).
    #[arg(long)]
    pub smg: Option<f64>,
    /// Terrestrial Weathering Index (0..1).
    #[arg(long)]
    pub twi: Option<f64>,
    /// Isotopic Anomaly Fingerprint (0..1, 1 = on centroid).
    #[arg(long)]
    pub iaf: Option<f64>,
    /// Ablation Thermal Profile (peak surface °C).
    #[arg(long)]
    pub atp: Option<f64>,
    /// Parent Body Differentiation Ratio.
    #[arg(long)]
    pub pbdr: Option<f64>,
    /// Cosmogenic Nuclide Exposure Age (Ma).
    #[arg(long)]
    pub cnea: Option<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct FireballArgs {
    /// Entry velocity (km/s).
    #[arg(long)]
    pub velocity: f64,

    /// Entry angle from the horizontal (degrees).
    #[arg(long)]
    pub angle: f64,

    /// Meteoroid diameter (m).
    #[arg(long)]
    pub diameter: f64,

    /// Bulk composition: stony, carbonaceous, stony-iron, iron, or a group label (LL5, CM2, IIIAB).
    #[arg(long, default_value = "stony")]
    pub composition: EntryComposition,

    /// Export the trajectory time series to CSV.
    #[arg(long, value_name = "CSV")]
    pub series: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Reference group to scatter around (H, L, LL, CO, CV, CR, IAB, IIAB, IIIAB, IVA, IVB).
    #[arg(short = 'g', long, default_value = "H")]
    pub group: MineralGroup,

    /// Number of specimens to generate.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Noise multiplier (0 puts every specimen on the centroid).
    #[arg(long, default_value_t = 1.0)]
    pub scatter: f64,

    /// Write the specimens as JSON (readable by `emi classify`).
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Also classify the generated batch and print the summary.
    #[arg(long)]
    pub classify: bool,
}

pub const SUBCOMMANDS: [&str; 5] = ["classify", "calculate", "fireball", "sample", "config"];

/// Rewrite argv so `emi <file>` means `emi classify <file>`.
///
/// - `emi`                       -> unchanged (clap prints usage)
/// - `emi --help/--version/-h`   -> unchanged
/// - `emi specimens.csv ...`     -> `emi classify specimens.csv ...`
pub fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1) else {
        return argv;
    };
    if arg1.starts_with('-') || arg1 == "help" || SUBCOMMANDS.contains(&arg1.as_str()) {
        return argv;
    }
    argv.insert(1, "classify".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_file_defaults_to_classify() {
        let cli = Cli::parse_from(rewrite_args(args(&["emi", "specimens.csv", "--top", "3"])));
        match cli.command {
            Command::Classify(a) => {
                assert_eq!(a.input, PathBuf::from("specimens.csv"));
                assert_eq!(a.top, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn subcommands_and_flags_are_left_alone() {
        assert_eq!(rewrite_args(args(&["emi", "--help"])), args(&["emi", "--help"]));
        assert_eq!(rewrite_args(args(&["emi", "config"])), args(&["emi", "config"]));
        assert_eq!(rewrite_args(args(&["emi"])), args(&["emi"]));
    }

    #[test]
    fn typed_arguments_parse() {
        let cli = Cli::parse_from(args(&[
            "emi",
            "fireball",
            "--velocity",
            "19",
            "--angle",
            "18",
            "--diameter",
            "19",
            "--composition",
            "LL5",
            "--config",
            "emi.toml",
        ]));
        assert_eq!(cli.config, Some(PathBuf::from("emi.toml")));
        match cli.command {
            Command::Fireball(a) => assert_eq!(a.composition, EntryComposition::Stony),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(args(&["emi", "sample", "-g", "ivb", "-n", "3"]));
        match cli.command {
            Command::Sample(a) => {
                assert_eq!(a.group, MineralGroup::IVB);
                assert_eq!(a.count, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(args(&["emi", "sample", "-g", "XYZ"])).is_err());
    }
}

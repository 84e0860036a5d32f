use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use flatsel::Session;
use indicatif::{MultiProgress, ParallelProgressIterator, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::warn;
use rayon::prelude::*;
use walkdir::WalkDir;

mod scenario;

use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile every selector in one scenario file, build its tree, and
    /// print which selector (if any) wins resolution at each element.
    Check {
        /// Path to a scenario JSON file.
        path: PathBuf,
    },
    /// Walk a directory of scenario files, processing each one in its own
    /// session on a thread pool, and report aggregate pass/fail counts.
    Batch {
        /// Directory to walk for `*.json` scenario files.
        dir: PathBuf,
    },
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .progress_chars("━ ━")
        .template("{prefix} {bar:60!.magenta/dim} {pos:>7.cyan}/{len:7.cyan}")
        .unwrap()
}

fn locate_scenario_files(dir: &PathBuf) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".json"))
        .map(|e| e.into_path())
        .collect()
}

/// Builds one scenario's tree and selectors into a fresh session, then
/// resolves every element against the compiled selectors.
///
/// Returns, for each element in document order, its label and the winning
/// selector source (if any).
fn run_scenario(scenario: &Scenario) -> anyhow::Result<Vec<(String, Option<String>)>> {
    let mut session = Session::new();
    let (elements, _selector_indices) = scenario::load(&mut session, scenario)?;

    let mut report = Vec::with_capacity(elements.len());
    for element in &elements {
        let winner = session.resolve(element.node).and_then(|idx| {
            session.selectors().get(idx).and_then(|sel| sel.source().map(str::to_string))
        });
        report.push((element.label.clone(), winner));
    }
    Ok(report)
}

fn check(path: &PathBuf) -> anyhow::Result<()> {
    let text = fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&text)?;
    let report = run_scenario(&scenario)?;

    for (label, winner) in &report {
        match winner {
            Some(source) => println!("{label}: matched by `{source}`"),
            None => println!("{label}: no match"),
        }
    }
    println!("\x1b[0;32m✓ {} elements resolved.\x1b[0m", report.len());
    Ok(())
}

fn batch(dir: &PathBuf, multi: &MultiProgress) -> anyhow::Result<()> {
    let files = locate_scenario_files(dir);
    let progress = multi.add(ProgressBar::new(files.len() as u64).with_style(progress_style())).with_prefix("Matching scenarios");

    let start = Instant::now();
    let results: Vec<bool> = files
        .par_iter()
        .progress_with(progress.clone())
        .map(|path| {
            let outcome = (|| -> anyhow::Result<()> {
                let text = fs::read_to_string(path)?;
                let scenario: Scenario = serde_json::from_str(&text)?;
                run_scenario(&scenario)?;
                Ok(())
            })();
            if let Err(err) = &outcome {
                warn!("scenario {} failed: {err}", path.display());
            }
            outcome.is_ok()
        })
        .collect();

    progress.finish();
    multi.remove(&progress);

    let passed = results.iter().filter(|&&ok| ok).count();
    println!(
        "\x1b[0;32m✓ {passed}/{} scenarios passed in {:.2}s.\x1b[0m",
        results.len(),
        start.elapsed().as_secs_f64()
    );
    if passed < results.len() {
        anyhow::bail!("{} scenario(s) failed", results.len() - passed);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("flatsel=warn")).build();
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger).try_init().unwrap();

    let args = Args::parse();
    match &args.command {
        Command::Check { path } => check(path),
        Command::Batch { dir } => batch(dir, &multi),
    }
}

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use u_allocate::config::{AllocationConfig, CreditLimits};
use u_allocate::io::{self, reader};
use u_allocate::logging;
use u_allocate::models::Catalogue;
use u_allocate::report::AllocationReport;
use u_allocate::search::{AllocationSearch, SearchOutcome};
use u_allocate::{AllocationError, Result};

const ARCHIVE_NAME: &str = "allocation.zip";

#[derive(Parser, Debug)]
#[command(name = "u-allocate")]
#[command(about = "Allocate capacity-limited modules to students by preference")]
struct Cli {
    /// Module table (CSV)
    #[arg(long)]
    modules: PathBuf,

    /// Module rankings per student (CSV)
    #[arg(long)]
    rankings: PathBuf,

    /// Desired credits per group per student (CSV)
    #[arg(long)]
    group_preferences: PathBuf,

    /// Modules students already hold (CSV)
    #[arg(long)]
    prior: Option<PathBuf>,

    /// Run configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Required credits per student; overrides the configuration file
    #[arg(long)]
    required_credits: Option<u32>,

    /// Output directory
    #[arg(long, default_value = "./allocation_output")]
    output: PathBuf,

    /// Also pack the output tables into a zip archive
    #[arg(long)]
    archive: bool,

    /// Number of repetitions
    #[arg(long)]
    repetitions: Option<usize>,

    /// Rounds per repetition
    #[arg(long)]
    rounds: Option<usize>,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Keep runs that miss credit minimums or the exact total
    #[arg(long)]
    no_validate: bool,

    /// Run repetitions on all cores
    #[cfg(feature = "parallel")]
    #[arg(long)]
    parallel: bool,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    json_logs: bool,
}

fn load_config(cli: &Cli) -> Result<AllocationConfig> {
    let mut config = match (&cli.config, cli.required_credits) {
        (Some(path), _) => AllocationConfig::from_file(path)?,
        (None, Some(required)) => AllocationConfig::new(required),
        (None, None) => {
            return Err(AllocationError::Config {
                field: "required_credits".to_string(),
                message: "pass --config or --required-credits".to_string(),
            })
        }
    };
    if let Some(required) = cli.required_credits {
        config.required_credits = required;
    }
    if let Some(repetitions) = cli.repetitions {
        config.search.repetitions = repetitions;
    }
    if let Some(rounds) = cli.rounds {
        config.search.rounds_per_repetition = rounds;
    }
    if let Some(seed) = cli.seed {
        config.search.base_seed = seed;
    }
    if cli.no_validate {
        config.search.validate_hard_constraints = false;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<SearchOutcome> {
    let config = load_config(cli)?;
    tracing::debug!(?config, "configuration loaded");

    let modules = reader::read_modules(&cli.modules)?;
    let students = reader::read_students(&cli.rankings, &cli.group_preferences, &modules)?;
    let catalogue = Arc::new(Catalogue::new(modules, students)?);
    reader::check_group_capacity(&catalogue);

    let limits = CreditLimits::resolve(&config, &catalogue);
    let mut search = AllocationSearch::new(Arc::clone(&catalogue), limits, config.search.clone());
    if let Some(path) = &cli.prior {
        let prior = reader::read_prior(path)?.resolve(&catalogue)?;
        search = search.with_prior(prior);
    }

    tracing::info!(
        students = catalogue.student_count(),
        modules = catalogue.module_count(),
        repetitions = config.search.repetitions,
        rounds = config.search.rounds_per_repetition,
        "starting allocation search"
    );

    #[cfg(feature = "parallel")]
    if cli.parallel {
        return search.run_parallel();
    }

    search.run_with_progress(|progress| {
        tracing::debug!(
            repetition = progress.repetition + 1,
            total = progress.total,
            accepted = progress.accepted,
            best = ?progress.best_repetition,
            "repetition finished"
        );
        ControlFlow::Continue(())
    })
}

fn write_outputs(cli: &Cli, report: &AllocationReport) -> Result<()> {
    io::write_report_dir(report, &cli.output)?;
    if cli.archive {
        io::write_report_zip(report, cli.output.join(ARCHIVE_NAME))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose, cli.json_logs);

    let outcome = match run(&cli) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("allocation failed: {e}");
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    match outcome {
        SearchOutcome::Found(result) => {
            let report = AllocationReport::from_run(&result.run);
            if let Err(e) = write_outputs(&cli, &report) {
                tracing::error!("writing outputs failed: {e}");
                eprintln!("error: {e}");
                return ExitCode::from(1);
            }
            let mean = result
                .kpi
                .mean_satisfaction
                .map_or_else(|| "n/a".to_string(), |m| format!("{m:.3}"));
            println!(
                "Best allocation from repetition {} of {} ({} accepted, {} rejected)",
                result.repetition + 1,
                result.repetitions_run,
                result.accepted,
                result.rejected
            );
            println!(
                "Mean satisfaction {mean}, mean over-request {:.3}, {} students complete",
                result.kpi.mean_over_request, result.kpi.complete_students
            );
            println!("Output saved to: {}", cli.output.display());
            ExitCode::SUCCESS
        }
        SearchOutcome::NoQualifyingAllocation {
            repetitions_run,
            rejected,
        } => {
            eprintln!(
                "No qualifying allocation found: {rejected} of {repetitions_run} repetitions rejected"
            );
            ExitCode::from(2)
        }
    }
}

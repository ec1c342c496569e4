//! buildkick CLI entry point

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use buildkick::cli::{FilesArgs, RunArgs, SummarizeArgs};
use buildkick::report::{read_table, write_run_report, write_table, RunReport};
use buildkick::stats::{format_summary_table, summarize, Insights};
use buildkick::{
    BenchConfig, BenchmarkRun, Cli, Commands, FunctionKicker, Interrupt, KickError, Orchestrator,
    OutputFormat,
};

fn main() -> ExitCode {
    match run() {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run() -> buildkick::Result<String> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => run_benchmark(&cli, args),
        Commands::Summarize(args) => {
            init_logging(cli.verbose, None);
            run_summarize(args)
        }
        Commands::Files(args) => run_files(&cli, args),
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v` and the config level.
fn init_logging(verbose: bool, config_level: Option<&str>) {
    let level = if verbose {
        "debug"
    } else {
        config_level.unwrap_or("info")
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("buildkick={}", level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the config file and fold command-line overrides into it
fn load_config(
    path: &std::path::Path,
    exclude: &[String],
    verbose: bool,
) -> buildkick::Result<BenchConfig> {
    let mut config = BenchConfig::load_from(path)?;
    init_logging(verbose, Some(&config.logging.level));
    tracing::debug!("Loaded configuration from {}", path.display());

    config.benchmark.exclude.extend(exclude.iter().cloned());
    Ok(config)
}

fn run_benchmark(cli: &Cli, args: &RunArgs) -> buildkick::Result<String> {
    let mut config = load_config(&args.config, &args.exclude, cli.verbose)?;
    config.apply_target_overrides(&args.targets)?;
    if let Some(iterations) = args.iterations {
        config.benchmark.iterations = iterations;
    }
    if args.timeout.is_some() {
        config.benchmark.timeout_secs = args.timeout;
    }
    config.validate()?;

    let files = config.discovery.source_query().source_files()?;
    tracing::info!("Discovered {} source file(s)", files.len());

    // from here on Ctrl-C reverts kicked files before exiting
    let interrupt = Interrupt::install()?;
    let mut orchestrator = Orchestrator::new(FunctionKicker::new())
        .with_exclusions(config.exclusion_filter())
        .with_interrupt(interrupt.clone());
    for (tool, color) in config.build_tools()? {
        tracing::debug!("Registered {}: {}", tool.invoker().name(), tool.command_line().join(" "));
        orchestrator.register(tool.with_interrupt(interrupt.clone()), color);
    }

    let run = orchestrator.run(&files, config.benchmark.iterations)?;

    write_table(&args.output_csv, &run.series)?;
    tracing::info!("Measurements written to {}", args.output_csv.display());

    if let Some(json_path) = &args.output_json {
        write_run_report(json_path, &RunReport::from_run(&run))?;
        tracing::info!("Run report written to {}", json_path.display());
    }

    Ok(format_run(&run))
}

fn format_run(run: &BenchmarkRun) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Warm-up builds:");
    for warmup in &run.warmup {
        let _ = writeln!(out, "  {}: {:.2}s", warmup.name, warmup.seconds);
    }

    let _ = writeln!(
        out,
        "\nIncremental builds ({} iteration(s), {} file(s) kicked, {} excluded):",
        run.iterations, run.mutated_files, run.excluded_files
    );
    let summaries = summarize(&run.series);
    out.push_str(&format_summary_table(&summaries));
    out.push_str(&format_insights(Insights::from_summaries(&summaries).as_ref()));
    out
}

fn format_insights(insights: Option<&Insights>) -> String {
    match insights {
        Some(insights) => format!(
            "\nFastest: {}\nSlowest: {}\nMost consistent: {}\n",
            insights.fastest, insights.slowest, insights.most_consistent
        ),
        None => String::new(),
    }
}

fn run_summarize(args: &SummarizeArgs) -> buildkick::Result<String> {
    let series = read_table(&args.table)?;
    let summaries = summarize(&series);
    let insights = Insights::from_summaries(&summaries);

    match args.format {
        OutputFormat::Text => {
            let mut out = format_summary_table(&summaries);
            out.push_str(&format_insights(insights.as_ref()));
            Ok(out)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "summaries": summaries,
                "insights": insights,
            });
            let text = serde_json::to_string_pretty(&json).map_err(|e| KickError::IoFailure {
                path: args.table.clone(),
                message: format!("JSON serialization failed: {}", e),
            })?;
            Ok(format!("{}\n", text))
        }
    }
}

fn run_files(cli: &Cli, args: &FilesArgs) -> buildkick::Result<String> {
    let config = load_config(&args.config, &args.exclude, cli.verbose)?;
    let files = config.discovery.source_query().source_files()?;
    let (eligible, excluded) = config.exclusion_filter().partition(files);

    let kicker = FunctionKicker::new();
    let (supported, unsupported): (Vec<PathBuf>, Vec<PathBuf>) =
        eligible.into_iter().partition(|f| kicker.supports(f));

    let mut out = String::new();
    let _ = writeln!(out, "Eligible ({}):", supported.len());
    for file in &supported {
        let _ = writeln!(out, "  {}", file.display());
    }
    if !unsupported.is_empty() {
        let _ = writeln!(out, "Unsupported type ({}):", unsupported.len());
        for file in &unsupported {
            let _ = writeln!(out, "  {}", file.display());
        }
    }
    let _ = writeln!(out, "Excluded ({}):", excluded.len());
    for file in &excluded {
        let _ = writeln!(out, "  {}", file.display());
    }
    Ok(out)
}

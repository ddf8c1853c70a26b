use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use strokebench::config::{load_config, PipelineConfig};
use strokebench::pipeline;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("STROKEBENCH_LOG", "error,strokebench=info"))
        .init();

    let matches = Command::new("strokebench")
        .version(clap::crate_version!())
        .about("Benchmark ten classifiers on an EEG stroke-prediction dataset")
        .arg(
            Arg::new("input")
                .help("Path to the input CSV dataset. Overrides the path in the configuration file.")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a pipeline JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("label_column")
                .long("label-column")
                .help("Header name of the class label column")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed shared by every stochastic stage")
                .value_parser(clap::value_parser!(u64))
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("report_path")
                .short('o')
                .long("report")
                .help("Path the HTML report is written to")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("no_report")
                .long("no-report")
                .help("Disable HTML report generation.")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let mut config = if let Some(config_path) = matches.get_one::<PathBuf>("config") {
        log::info!("using config: {:?}", config_path);
        load_config(config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?
    } else {
        PipelineConfig::default()
    };

    if let Some(input) = matches.get_one::<String>("input") {
        config.input = input.clone();
    }
    if let Some(label_column) = matches.get_one::<String>("label_column") {
        config.label_column = label_column.clone();
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.seed = seed;
    }
    if let Some(report_path) = matches.get_one::<String>("report_path") {
        config.report_path = report_path.clone();
    }

    let summary = pipeline::run(&config).context("pipeline run failed")?;

    if !matches.get_flag("no_report") {
        summary
            .write_report(&config.report_path)
            .with_context(|| format!("failed to write report to {}", config.report_path))?;
        println!("Report written to {}", config.report_path);
    }

    log::info!("best model: {}", summary.best_model());
    Ok(())
}

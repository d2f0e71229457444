//! Anuvad - Dynamic Text Localization Engine
//!
//! Command-line entry point: translates texts and questionnaire files through
//! the configured translation provider, sharing one cache per run.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use anuvad::cli::{Args, Commands};
use anuvad::config::Config;
use anuvad::extract::{extract, ExclusionRules};
use anuvad::language::Language;
use anuvad::localizer::Localizer;
use anuvad::workflow::Workflow;

const DEFAULT_CONFIG: &str = "anuvad.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting Anuvad - Dynamic Text Localization Engine");

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new(DEFAULT_CONFIG).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
                Config::from_file(DEFAULT_CONFIG)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Translate { text, lang } => {
            let language: Language = lang.parse()?;
            let localizer = Localizer::from_config(&config)?;
            println!("{}", localizer.translate(&text, language).await);
        }
        Commands::Bulk { texts, lang } => {
            let language: Language = lang.parse()?;
            let localizer = Localizer::from_config(&config)?;
            let translations = localizer.translate_bulk(&texts, language).await;
            for text in &texts {
                let translated = translations.get(text).map(String::as_str).unwrap_or(text);
                println!("{}\t{}", text, translated);
            }
        }
        Commands::Structure { input, output, lang } => {
            let language: Language = lang.parse()?;
            let localizer = Localizer::from_config(&config)?;
            let workflow = Workflow::new(&localizer);
            if input.is_dir() {
                let count = workflow.translate_directory(&input, &output, language).await?;
                println!("Translated {} questionnaire files into {}", count, output.display());
            } else {
                let report = workflow.translate_file(&input, &output, language).await?;
                println!(
                    "Translated {} texts ({} leaves rewritten) into {}",
                    report.leaves,
                    report.rewritten,
                    output.display()
                );
            }
            info!("Cache holds {} entries", localizer.cache().len());
        }
        Commands::Extract { input } => {
            let content = std::fs::read_to_string(&input)?;
            let form: serde_json::Value = serde_json::from_str(&content)?;
            let rules = ExclusionRules::from(&config.extract);
            for text in extract(&form, &rules) {
                println!("{}", text);
            }
        }
        Commands::Languages => {
            println!("{:<6} {:<12} {}", "Code", "Name", "Notes");
            println!("{}", "-".repeat(32));
            for language in Language::ALL {
                let note = if language.is_identity() { "source" } else { "" };
                println!("{:<6} {:<12} {}", language.code(), language.name(), note);
            }
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".anuvad").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "anuvad.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output stays on stderr so stdout carries only results
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

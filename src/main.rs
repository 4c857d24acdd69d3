mod audio;
mod cli;
mod config;
mod error;
mod prompt;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use audio::decode::{is_supported_extension, SUPPORTED_EXTENSIONS};
use cli::{Cli, PromptTarget};
use config::AnalysisConfig;
use prompt::Genre;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Config values apply only when the CLI flag is at its default
    let mut analysis_config = AnalysisConfig::default();
    if let Some(path) = config::find_config_path(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            if !cli.json && cli.only.is_none() {
                cli.json = cfg.output.format.eq_ignore_ascii_case("json");
            }
            if !cli.no_report { cli.no_report = !cfg.output.report; }
            if !cli.no_guide { cli.no_guide = !cfg.output.guide; }
            analysis_config = cfg.analysis;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    let input = &cli.input;
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| is_supported_extension(e))
        .map(|e| e.to_ascii_lowercase());
    let Some(extension) = extension else {
        anyhow::bail!(
            "Unsupported file type: {}. Accepted: {}",
            input.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        );
    };

    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read audio file: {}", input.display()))?;
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    log::info!("File loaded: {} ({} bytes)", file_name, bytes.len());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} [{elapsed}]")
            .context("Invalid spinner template")?,
    );
    spinner.set_message("Analyzing your music... This may take a moment...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = if analysis_config == AnalysisConfig::default() {
        audio::analysis::analyze(bytes, Some(&extension))
    } else {
        log::info!(
            "Analysis at {}Hz, n_fft={}, hop={}",
            analysis_config.sample_rate,
            analysis_config.n_fft,
            analysis_config.hop_length
        );
        audio::analysis::analyze_with(bytes, Some(&extension), &analysis_config)
    };
    spinner.finish_and_clear();

    let result = outcome.with_context(|| format!("Error analyzing {}", file_name))?;
    let prompts = prompt::compose(&result);

    if let Some(target) = cli.only {
        match target {
            PromptTarget::Suno => println!("{}", prompts.suno_prompt),
            PromptTarget::Riffusion => println!("{}", prompts.riffusion_prompt),
        }
        return Ok(());
    }

    if cli.json {
        let doc = report::Report {
            file: &file_name,
            genre: Genre::of(&result),
            analysis: &result,
            prompts: &prompts,
        };
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    if !cli.no_report {
        println!("{}\n", report::render_analysis(&result));
    }
    println!("{}", report::render_prompts(&prompts));
    if !cli.no_guide {
        println!("\n{}", report::USAGE_GUIDE);
    }

    Ok(())
}

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PromptTarget {
    Suno,
    Riffusion,
}

#[derive(Parser, Debug)]
#[command(
    name = "afroprompt",
    about = "Analyze an Afrobeat or Amapiano track and generate Suno / Riffusion prompts"
)]
pub struct Cli {
    /// Input audio file (MP3, WAV, FLAC, M4A, AAC)
    pub input: PathBuf,

    /// Config file (defaults to ./afroprompt.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print a single JSON document instead of the text report
    #[arg(long)]
    pub json: bool,

    /// Print only one raw prompt, for piping into a clipboard tool
    #[arg(long, value_enum, conflicts_with = "json")]
    pub only: Option<PromptTarget>,

    /// Skip the analysis report
    #[arg(long)]
    pub no_report: bool,

    /// Skip the usage guide
    #[arg(long)]
    pub no_guide: bool,
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a single text
    Translate {
        /// Text to translate
        text: String,

        /// Target language (code or name)
        #[arg(short, long, default_value = "kn")]
        lang: String,
    },

    /// Translate several texts with one batch request
    Bulk {
        /// Texts to translate
        #[arg(required = true)]
        texts: Vec<String>,

        /// Target language (code or name)
        #[arg(short, long, default_value = "kn")]
        lang: String,
    },

    /// Translate questionnaire JSON files (a file or a directory of *.json)
    Structure {
        /// Input file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output file or directory
        #[arg(short, long)]
        output: PathBuf,

        /// Target language (code or name)
        #[arg(short, long, default_value = "kn")]
        lang: String,
    },

    /// List the translatable texts of a questionnaire JSON file
    Extract {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List supported languages
    Languages,

    /// Write the default configuration to a file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "anuvad.toml")]
        output: PathBuf,
    },
}

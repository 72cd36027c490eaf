//! Command-line argument parsing for MechanicBuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MechanicBuddy - diagnose car symptoms and stream a mechanic's answer
#[derive(Parser, Debug)]
#[command(name = "mechanicbuddy")]
#[command(version)]
#[command(about = "Match car symptoms against a repair database and stream an LLM answer", long_about = None)]
pub struct Args {
    /// Upstream chat-completions URL (overrides config)
    #[arg(long)]
    pub url: Option<String>,

    /// Model name sent upstream (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory holding car_issues.csv and step_by_step.csv (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question and stream the answer to stdout
    Ask {
        /// Message, e.g. "Toyota 2015 rattling noise"
        #[arg(value_name = "MESSAGE")]
        message: String,

        /// Store the exchange under this user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Show how a message is parsed and matched, without calling upstream
    Diagnose {
        #[arg(value_name = "MESSAGE")]
        message: String,
    },

    /// Interactive chat session
    Chat {
        /// Store exchanges under this user id
        #[arg(long)]
        user: Option<String>,
    },

    /// List stored exchanges for a user
    History {
        #[arg(long)]
        user: String,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter for this level
    pub fn filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let args = Args::parse_from(["mechanicbuddy", "ask", "Toyota 2015 rattling noise", "--user", "42"]);
        match args.command {
            Commands::Ask { message, user } => {
                assert_eq!(message, "Toyota 2015 rattling noise");
                assert_eq!(user.as_deref(), Some("42"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let quiet = Args::parse_from(["mechanicbuddy", "-q", "config"]);
        assert_eq!(quiet.verbosity(), Verbosity::Quiet);
        assert_eq!(quiet.verbosity().filter(), "error");

        let normal = Args::parse_from(["mechanicbuddy", "config"]);
        assert_eq!(normal.verbosity(), Verbosity::Normal);

        let very = Args::parse_from(["mechanicbuddy", "-vv", "config"]);
        assert_eq!(very.verbosity(), Verbosity::VeryVerbose);
        assert_eq!(very.verbosity().filter(), "debug");
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "mechanicbuddy",
            "--url",
            "http://gpu-box:8000/v1/chat/completions",
            "--model",
            "llama3",
            "--data-dir",
            "/srv/data",
            "diagnose",
            "Honda 2010 squeal",
        ]);
        assert_eq!(args.model.as_deref(), Some("llama3"));
        assert_eq!(args.data_dir, Some(PathBuf::from("/srv/data")));
        assert!(matches!(args.command, Commands::Diagnose { .. }));
    }
}

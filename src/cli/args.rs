//! Command-line argument parsing for AskBuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::rag::types::{LocalFragment, RetrievalRequest};

/// AskBuddy - answer questions from course material and your own notes
#[derive(Parser, Debug)]
#[command(name = "askbuddy")]
#[command(version)]
#[command(about = "Answer questions from a remote course store and local notes", long_about = None)]
pub struct Args {
    /// Question to answer
    #[arg(value_name = "QUESTION")]
    pub question: Option<String>,

    /// Local note fragment to consider (repeatable)
    #[arg(short, long = "fragment", value_name = "TEXT")]
    pub fragments: Vec<String>,

    /// Matches to request from the remote store (defaults to config)
    #[arg(long)]
    pub match_count: Option<usize>,

    /// Restrict remote matches to one course
    #[arg(long)]
    pub course_id: Option<i64>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (info), -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display the effective configuration
    Config,

    /// Check that the model server is reachable
    Doctor,
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

    /// Check that a question is given exactly when no subcommand is
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_none() && self.question.is_none() {
            return Err(
                "Question required. Use 'askbuddy <QUESTION>' or run a subcommand.".to_string(),
            );
        }

        if self.command.is_some() && self.question.is_some() {
            return Err("Cannot specify question with subcommand.".to_string());
        }

        Ok(())
    }

    /// Build the ask request from the command line
    pub fn to_request(&self) -> RetrievalRequest {
        let fragments = self
            .fragments
            .iter()
            .map(|text| LocalFragment::new(text.clone()))
            .collect();

        RetrievalRequest {
            question: self.question.clone().unwrap_or_default(),
            local_fragments: fragments,
            match_count: self.match_count,
            scope_filter: self.course_id,
        }
    }
}

impl Verbosity {
    /// `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "askbuddy=warn",
            Verbosity::Normal => "askbuddy=info",
            Verbosity::Verbose => "askbuddy=debug",
            Verbosity::VeryVerbose => "askbuddy=trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["askbuddy", "q"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["askbuddy", "-q", "q"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["askbuddy", "-v", "q"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["askbuddy", "-vv", "q"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_validate_requires_question() {
        assert!(parse(&["askbuddy"]).validate().is_err());
        assert!(parse(&["askbuddy", "config"]).validate().is_ok());
    }

    #[test]
    fn test_to_request() {
        let args = parse(&[
            "askbuddy",
            "What is recursion?",
            "--fragment",
            "A function calling itself",
            "-f",
            "Base cases stop it",
            "--match-count",
            "3",
            "--course-id",
            "12",
        ]);
        let request = args.to_request();

        assert_eq!(request.question, "What is recursion?");
        assert_eq!(request.local_fragments.len(), 2);
        assert_eq!(request.match_count, Some(3));
        assert_eq!(request.scope_filter, Some(12));
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(Verbosity::Verbose.filter_directive(), "askbuddy=debug");
    }
}

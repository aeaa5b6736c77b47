//! Command-line argument parsing for pageaudit
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::audit::{AnalysisKind, DetailKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pageaudit - Run remote page analyses and score page health
#[derive(Parser, Debug)]
#[command(name = "pageaudit")]
#[command(version)]
#[command(about = "Submit page analyses to a remote provider, poll for results, and score page health", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (warnings and results only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit an analysis and print its task handle
    Submit {
        /// Analysis to run
        #[arg(value_enum)]
        kind: AnalysisKind,

        /// Page URL or domain
        target: String,

        /// Competitor domains (entity-gap only)
        #[arg(long = "competitor")]
        competitors: Vec<String>,

        /// Crawl budget (site-audit only)
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Check a submitted analysis
    Poll {
        /// Analysis the task belongs to
        #[arg(value_enum)]
        kind: AnalysisKind,

        /// Task id returned by `submit`
        task_id: String,

        /// Keep polling until the task settles (Ctrl-C cancels)
        #[arg(long)]
        wait: bool,
    },

    /// List crawled pages or links of a finished site audit
    Detail {
        /// Listing to fetch
        #[arg(value_enum)]
        kind: DetailKind,

        /// Site-audit task id
        task_id: String,

        /// Provider filter expression as JSON, e.g. '["checks.no_h1_tag","=",true]'
        #[arg(long)]
        filters: Option<String>,

        /// Sort rule such as "meta.title_length,desc" (repeatable)
        #[arg(long = "order-by")]
        order_by: Vec<String>,

        /// Maximum number of entries
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Run an instant-pages analysis and score the page
    Audit {
        /// Page URL
        url: String,
    },

    /// Score measured values from a JSON file
    Score {
        /// Page URL the values belong to
        url: String,

        /// JSON object mapping metric keys to measured values
        #[arg(long)]
        measured: PathBuf,
    },

    /// Display the active rule set
    Rules,

    /// List task ids the provider reports as ready
    Ready,
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
    /// Default log filter for this verbosity
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
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

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["pageaudit", "rules"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["pageaudit", "-q", "rules"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["pageaudit", "-v", "rules"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["pageaudit", "rules", "-vv"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_submit_args() {
        let args = parse(&[
            "pageaudit",
            "submit",
            "entity-gap",
            "example.com",
            "--competitor",
            "a.com",
            "--competitor",
            "b.com",
        ]);

        match args.command {
            Commands::Submit {
                kind,
                target,
                competitors,
                max_pages,
            } => {
                assert_eq!(kind, AnalysisKind::EntityGap);
                assert_eq!(target, "example.com");
                assert_eq!(competitors, ["a.com", "b.com"]);
                assert_eq!(max_pages, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_poll_wait_flag() {
        let args = parse(&["pageaudit", "--json", "poll", "site-audit", "abc", "--wait"]);
        assert!(args.json);
        assert!(matches!(
            args.command,
            Commands::Poll { kind: AnalysisKind::SiteAudit, wait: true, .. }
        ));
    }

    #[test]
    fn test_detail_args() {
        let args = parse(&[
            "pageaudit",
            "detail",
            "pages",
            "abc",
            "--filters",
            r#"["checks.no_h1_tag","=",true]"#,
            "--order-by",
            "meta.title_length,desc",
            "--limit",
            "5",
        ]);

        match args.command {
            Commands::Detail {
                kind,
                task_id,
                filters,
                order_by,
                limit,
            } => {
                assert_eq!(kind, DetailKind::Pages);
                assert_eq!(task_id, "abc");
                assert_eq!(filters.as_deref(), Some(r#"["checks.no_h1_tag","=",true]"#));
                assert_eq!(order_by, ["meta.title_length,desc"]);
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Args::try_parse_from(["pageaudit", "submit", "keywords", "x"]).is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(Verbosity::Quiet.log_filter(), "warn");
        assert_eq!(Verbosity::VeryVerbose.log_filter(), "trace");
        assert!(!Verbosity::Quiet.show_progress());
    }
}

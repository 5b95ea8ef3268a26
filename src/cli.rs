//! Command line interface for Vatio

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Track the rate for electricity in Spain
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "VATIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Day to show on start (YYYY-MM-DD); defaults to today
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Fetch the selected day, render it once, and exit
    #[arg(long)]
    pub once: bool,

    /// Log at INFO level
    #[arg(short, long)]
    pub verbose: bool,

    /// Log at DEBUG level (takes precedence over --verbose)
    #[arg(short = 'D', long)]
    pub debug: bool,
}

impl Args {
    /// Log level implied by the verbosity switches, if any
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.debug {
            Some("DEBUG")
        } else if self.verbose {
            Some("INFO")
        } else {
            None
        }
    }
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {:?}: {}", input, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-11"),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap())
        );
        assert!(parse_date("11/03/2024").is_err());
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["vatio", "--date", "2024-03-11", "--once"]).unwrap();
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 3, 11));
        assert!(args.once);
        assert!(!args.verbose);
    }

    #[test]
    fn test_log_level_override() {
        let args = Args::try_parse_from(["vatio"]).unwrap();
        assert_eq!(args.log_level_override(), None);

        let args = Args::try_parse_from(["vatio", "--verbose"]).unwrap();
        assert_eq!(args.log_level_override(), Some("INFO"));

        let args = Args::try_parse_from(["vatio", "--verbose", "--debug"]).unwrap();
        assert_eq!(args.log_level_override(), Some("DEBUG"));
    }

    #[test]
    fn test_rejects_malformed_date() {
        assert!(Args::try_parse_from(["vatio", "--date", "2024-3"]).is_err());
    }
}

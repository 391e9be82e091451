use std::path::PathBuf;

use clap::Parser;
use mgsat_parser::{ConfigurationError, ParseOptions};

/// Command line arguments of `mgsat-diagnose`.
#[derive(Debug, Parser)]
#[command(name = "mgsat-diagnose")]
#[command(bin_name = "mgsat-diagnose")]
#[command(about = "Parse a corpus of interface conditions with a Minimalist Grammar", long_about = None)]
pub struct DiagnoseCli {
    /// Lexicon file (JSON)
    #[arg(long)]
    pub lexicon: PathBuf,

    /// Corpus file with an `input_sequence` (JSON)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Parse options file (JSON); flags below override it
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Extract all parses instead of the first
    #[arg(short, long)]
    pub all: bool,

    /// Upper limit on parses per condition with --all
    #[arg(long)]
    pub max_parses: Option<usize>,

    /// Ignore PF targets
    #[arg(long)]
    pub no_pf: bool,

    /// Ignore LF targets
    #[arg(long)]
    pub no_lf: bool,

    /// Bound on empty lexical items
    #[arg(long)]
    pub max_empty: Option<usize>,

    /// Bound on phrasal movements
    #[arg(long)]
    pub max_movements: Option<usize>,

    /// Bound on head movements
    #[arg(long)]
    pub max_head_movements: Option<usize>,

    /// Per solver call
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Only parse the interface condition at this position
    #[arg(long)]
    pub index: Option<usize>,

    /// Print derivations as indented trees
    #[arg(short, long)]
    pub tree: bool,
}

impl DiagnoseCli {
    /// The options file, or the defaults, with the flags applied.
    pub fn parse_options(&self) -> Result<ParseOptions, ConfigurationError> {
        let mut options = match &self.options {
            Some(path) => ParseOptions::from_path(path)?,
            None => ParseOptions::default(),
        };

        if self.all {
            options.extract_all_parses = true;
        }
        if let Some(max_parses) = self.max_parses {
            options.max_parses = max_parses;
        }
        if self.no_pf {
            options.include_pf_constraints = false;
        }
        if self.no_lf {
            options.include_lf_constraints = false;
        }
        if let Some(limit) = self.max_empty {
            options.bounds.max_num_empty_lexical_items = limit;
        }
        if let Some(limit) = self.max_movements {
            options.bounds.max_num_movements = limit;
        }
        if let Some(limit) = self.max_head_movements {
            options.bounds.max_num_head_movements = limit;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            options.timeout_ms = Some(timeout_ms);
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgsat_parser::Bounds;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    #[test]
    fn it_applies_flags_over_the_defaults() -> TestResult {
        let cli = DiagnoseCli::try_parse_from([
            "mgsat-diagnose",
            "--lexicon",
            "lexicon.json",
            "--corpus",
            "corpus.json",
            "--all",
            "--no-lf",
            "--max-movements",
            "6",
            "--timeout-ms",
            "500",
        ])?;

        let options = cli.parse_options()?;
        assert!(options.extract_all_parses);
        assert!(options.include_pf_constraints);
        assert!(!options.include_lf_constraints);
        assert_eq!(options.bounds, Bounds::new(4, 6, 2));
        assert_eq!(options.timeout_ms, Some(500));
        Ok(())
    }
}

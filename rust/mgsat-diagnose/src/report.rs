use std::io::Write;

use anyhow::{Context, Result, bail};
use mgsat_lexicon::Lexicon;
use mgsat_parser::{Corpus, Derivation, ParseOutcome, Parser};
use tracing::info;

use crate::DiagnoseCli;

/// Parses the corpus named on the command line and writes a report for each
/// selected interface condition.
pub fn run(cli: &DiagnoseCli, out: &mut impl Write) -> Result<()> {
    let lexicon = Lexicon::from_path(&cli.lexicon)
        .with_context(|| format!("Failed to load lexicon {}", cli.lexicon.display()))?;
    let corpus = Corpus::from_path(&cli.corpus)
        .with_context(|| format!("Failed to load corpus {}", cli.corpus.display()))?;
    let options = cli.parse_options().context("Invalid parse options")?;

    if let Some(index) = cli.index {
        if index >= corpus.input_sequence.len() {
            bail!(
                "Index {index} is out of range; the corpus has {} conditions",
                corpus.input_sequence.len()
            );
        }
    }

    info!(
        items = lexicon.len(),
        conditions = corpus.input_sequence.len(),
        "Loaded corpus"
    );
    let parser = Parser::new(lexicon).with_options(options);

    for (index, condition) in corpus.input_sequence.iter().enumerate() {
        if cli.index.is_some_and(|selected| selected != index) {
            continue;
        }

        let heading = match &condition.pf {
            Some(words) => words.join(" "),
            None => "<no PF target>".to_string(),
        };
        writeln!(out, "#{index} {heading}")?;

        match parser.parse(condition) {
            Ok(outcome) => report(&outcome, cli.tree, out)?,
            Err(error) => writeln!(out, "  ERROR: {error}")?,
        }
        writeln!(out)?;
    }
    Ok(())
}

fn label(outcome: &ParseOutcome) -> &'static str {
    if outcome.is_satisfiable() {
        "SAT"
    } else if outcome.timed_out() {
        "TIMEOUT"
    } else {
        "UNSAT"
    }
}

/// Writes one parse outcome.
pub fn report(outcome: &ParseOutcome, tree: bool, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "  {} ({} derivations, {:?})",
        label(outcome),
        outcome.derivations.len(),
        outcome.termination
    )?;
    for (number, derivation) in outcome.derivations.iter().enumerate() {
        writeln!(out, "  parse {}", number + 1)?;
        describe(derivation, tree, out)?;
    }
    Ok(())
}

fn describe(derivation: &Derivation, tree: bool, out: &mut impl Write) -> Result<()> {
    writeln!(out, "    yield: {}", derivation.pronounced().join(" "))?;
    if tree {
        for line in derivation.pretty().lines() {
            writeln!(out, "    {line}")?;
        }
    } else {
        writeln!(out, "    {derivation}")?;
    }

    let usage = derivation.usage();
    writeln!(
        out,
        "    used: {} empty items, {} movements, {} head movements",
        usage.empty_items, usage.movements, usage.head_movements
    )?;
    for item in &usage.items {
        let form = item.phonological_form.as_deref().unwrap_or("ε");
        writeln!(out, "      {} /{form}/ x{}", item.label, item.count)?;
    }

    for predication in derivation.predications() {
        writeln!(out, "    {predication}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use std::path::PathBuf;
    use testresult::TestResult;

    fn fixture(name: &str) -> String {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../mgsat-parser/tests/fixtures")
            .join(name)
            .display()
            .to_string()
    }

    fn cli(movements: &str, extra: &[&str]) -> Result<DiagnoseCli, clap::Error> {
        let lexicon = fixture("lexicon.json");
        let corpus = fixture("corpus.json");
        let mut args = vec![
            "mgsat-diagnose",
            "--lexicon",
            lexicon.as_str(),
            "--corpus",
            corpus.as_str(),
            "--max-empty",
            "6",
            "--max-movements",
            movements,
        ];
        args.extend_from_slice(extra);
        DiagnoseCli::try_parse_from(args)
    }

    #[test]
    fn it_reports_each_condition() -> TestResult {
        let mut out = Vec::new();
        run(&cli("6", &[])?, &mut out)?;

        let report = String::from_utf8(out)?;
        assert!(report.starts_with("#0 John fears everyone who knows her"));
        assert!(report.contains("  SAT (1 derivations"));
        assert!(report.contains("yield: John fears everyone who knows her"));
        assert!(report.contains("knows(obj: her)"));
        Ok(())
    }

    #[test]
    fn it_reports_unsatisfiable_conditions() -> TestResult {
        let mut out = Vec::new();
        run(&cli("0", &["--index", "0"])?, &mut out)?;

        let report = String::from_utf8(out)?;
        assert!(report.contains("  UNSAT (0 derivations"));
        assert!(!report.contains("yield:"));
        Ok(())
    }

    #[test]
    fn it_rejects_an_index_outside_the_corpus() -> TestResult {
        let mut out = Vec::new();
        assert!(run(&cli("6", &["--index", "7"])?, &mut out).is_err());
        assert!(out.is_empty());
        Ok(())
    }
}

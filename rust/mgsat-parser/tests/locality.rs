//! Two phrases waiting for the same licensor: "who what saw" with both
//! wh-words bearing `-wh` needs the lower attractor to skip the closer one.

use mgsat_lexicon::Lexicon;
use mgsat_parser::{
    Bounds, InterfaceCondition, LocalityContext, LocalityPolicy, ParseOptions, Parser,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use testresult::TestResult;

/// Both wh-words compete for the `+wh` of F.
const COMPETING: &str = r#"{
    "who": { "features": ["~D", "-wh"], "pf": "who" },
    "what": { "features": ["~D", "-wh"], "pf": "what" },
    "saw": { "features": ["=D", "=D", "~V"], "pf": "saw" },
    "F": ["=V", "+wh", "~F"],
    "Q": ["=F", "+wh", "Q"]
}"#;

/// The object moves for case instead, so nothing competes.
const SEPARATE: &str = r#"{
    "who": { "features": ["~D", "-wh"], "pf": "who" },
    "what": { "features": ["~D", "-k"], "pf": "what" },
    "saw": { "features": ["=D", "=D", "~V"], "pf": "saw" },
    "F": ["=V", "+k", "~F"],
    "Q": ["=F", "+wh", "Q"]
}"#;

fn parser(lexicon: &str) -> Parser {
    let lexicon = Lexicon::from_json(lexicon).unwrap();
    Parser::new(lexicon).with_options(ParseOptions::default().with_bounds(Bounds::new(2, 2, 0)))
}

fn sentence() -> InterfaceCondition {
    InterfaceCondition::sentence(["who", "what", "saw"])
}

/// Allows any movement.
#[derive(Debug)]
struct Unconstrained;

impl LocalityPolicy for Unconstrained {
    fn name(&self) -> &str {
        "unconstrained"
    }

    fn constrain(&self, _context: &mut LocalityContext<'_>) {}
}

#[test_log::test]
fn it_moves_phrases_with_distinct_licensees() -> TestResult {
    let outcome = parser(SEPARATE).parse(&sentence())?;

    assert!(outcome.is_satisfiable());
    let derivation = &outcome.derivations[0];
    assert_eq!(derivation.pronounced(), ["who", "what", "saw"]);
    assert_eq!(derivation.usage().movements, 2);
    Ok(())
}

#[test]
fn it_blocks_the_closer_phrase_from_being_skipped() -> TestResult {
    let outcome = parser(COMPETING).parse(&sentence())?;

    assert!(outcome.is_unsatisfiable());
    assert!(!outcome.timed_out());
    Ok(())
}

#[test]
fn it_owes_the_block_to_the_locality_policy() -> TestResult {
    let outcome = parser(COMPETING)
        .with_locality(Arc::new(Unconstrained))
        .parse(&sentence())?;

    assert!(outcome.is_satisfiable());
    assert_eq!(outcome.derivations[0].pronounced(), ["who", "what", "saw"]);
    Ok(())
}

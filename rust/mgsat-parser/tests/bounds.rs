//! Raising a bound never loses a derivation, however large the schema gets.

use mgsat_lexicon::Lexicon;
use mgsat_parser::{Bounds, InterfaceCondition, ParseOptions, Parser};
use pretty_assertions::assert_eq;
use testresult::TestResult;

/// A covert head takes the verb as complement and the subject as specifier.
const LEXICON: &str = r#"{
    "John": { "features": ["~D"], "pf": "John" },
    "sleeps": { "features": ["~V"], "pf": "sleeps" },
    "C": ["=V", "=D", "C"]
}"#;

fn parser(bounds: Bounds) -> Parser {
    let lexicon = Lexicon::from_json(LEXICON).unwrap();
    Parser::new(lexicon).with_options(ParseOptions::default().with_bounds(bounds))
}

#[test]
fn it_stays_satisfiable_with_many_empty_items() -> TestResult {
    let sentence = InterfaceCondition::sentence(["John", "sleeps"]);
    let small = Bounds::new(1, 0, 0);
    let large = Bounds::new(90, 0, 0);
    assert!(large.dominates(&small));

    for bounds in [small, large] {
        let outcome = parser(bounds).parse(&sentence)?;
        assert!(outcome.is_satisfiable(), "{bounds:?}");

        let derivation = &outcome.derivations[0];
        assert_eq!(derivation.pronounced(), ["John", "sleeps"]);
        assert_eq!(derivation.usage().empty_items, 1);
    }

    let problem = parser(large).prepare(&sentence)?;
    assert_eq!(problem.schema().point_count(), 1 + 1 + 90 * 3);
    Ok(())
}

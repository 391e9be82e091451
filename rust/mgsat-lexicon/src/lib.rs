//! # MG-SAT Lexicon
//!
//! Typed lexicons for Minimalist Grammars. A lexicon maps item labels to
//! [`LexicalItem`]s: an ordered sequence of [`Feature`]s together with an
//! optional phonological form and an optional semantic denotation.
//!
//! Items without a phonological form are covert. The parser may insert any
//! number of copies of a covert item (bounded by the caller), while overt items
//! are drawn from the words of the sentence being parsed.
//!
//! ## Feature sequences
//!
//! Every item's features must have the shape
//!
//! ```text
//! (selector | licensor)* (selectee licensee* | category)
//! ```
//!
//! Selectors (`=x`) and licensors (`+x`) drive structure building and belong
//! to the projecting head; the selectee (`~x`) is the item's category as seen
//! by whoever selects it, and licensees (`-x`) are the movements the phrase
//! undergoes afterwards. A bare `x` is a clause-completing category: the item
//! carrying it heads the root of a complete derivation.
//!
//! ```
//! use mgsat_lexicon::{Lexicon, Polarity};
//!
//! let lexicon = Lexicon::from_json(r#"{
//!     "John": { "features": [{"name": "D", "polarity": "selectee"}], "pf": "John" },
//!     "sleeps": { "features": ["=D", "~V"], "pf": "sleeps" },
//!     "C": ["=V", "C"]
//! }"#).unwrap();
//!
//! let (_, sleeps) = lexicon.get("sleeps").unwrap();
//! assert_eq!(sleeps.features()[0].polarity(), Polarity::Selector);
//! assert_eq!(lexicon.covert_items().count(), 1);
//! ```

#![warn(missing_docs)]

mod error;
pub use error::*;

mod feature;
pub use feature::*;

mod item;
pub use item::*;

mod lexicon;
pub use lexicon::*;

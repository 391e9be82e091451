use std::fmt;
use std::ops::Not;

/// A propositional variable, numbered from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    /// Position in a [`crate::Model`].
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The literal that holds when the variable is true.
    pub fn positive(self) -> Lit {
        Lit(self.0 << 1)
    }

    /// The literal that holds when the variable is false.
    pub fn negative(self) -> Lit {
        Lit((self.0 << 1) | 1)
    }
}

/// A variable or its negation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(u32);

impl Lit {
    /// The underlying variable.
    pub fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    /// Whether this is the negated literal.
    pub fn is_negative(self) -> bool {
        self.0 & 1 == 1
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "¬x{}", self.var().0)
        } else {
            write!(f, "x{}", self.var().0)
        }
    }
}

/// Up to this many literals, at-most-one is encoded pairwise.
const PAIRWISE_LIMIT: usize = 6;

/// A formula in conjunctive normal form under construction.
///
/// Variable 0 is reserved for the constant [`Formula::top`], so builders can
/// pass constants around as literals; clauses satisfied by a constant are
/// dropped and falsified constants are removed as clauses are added.
#[derive(Debug, Clone)]
pub struct Formula {
    num_vars: u32,
    clauses: Vec<Vec<Lit>>,
}

impl Default for Formula {
    fn default() -> Self {
        Self::new()
    }
}

impl Formula {
    /// A formula holding only the clause that fixes [`Formula::top`].
    pub fn new() -> Self {
        let truth = Var(0).positive();
        Self {
            num_vars: 1,
            clauses: vec![vec![truth]],
        }
    }

    /// The literal that is always true.
    pub fn top(&self) -> Lit {
        Var(0).positive()
    }

    /// The literal that is always false.
    pub fn bottom(&self) -> Lit {
        Var(0).negative()
    }

    /// [`Formula::top`] or [`Formula::bottom`].
    pub fn constant(&self, value: bool) -> Lit {
        if value { self.top() } else { self.bottom() }
    }

    /// A fresh variable.
    pub fn new_var(&mut self) -> Var {
        let var = Var(self.num_vars);
        self.num_vars += 1;
        var
    }

    /// The positive literal of a fresh variable.
    pub fn new_lit(&mut self) -> Lit {
        self.new_var().positive()
    }

    /// Variables allocated so far, the constant included.
    pub fn num_vars(&self) -> usize {
        self.num_vars as usize
    }

    /// Clauses added so far.
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// All clauses in the order they were added.
    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// Adds the disjunction of `lits`. An empty disjunction makes the
    /// formula unsatisfiable.
    pub fn add_clause(&mut self, lits: impl IntoIterator<Item = Lit>) {
        let (top, bottom) = (self.top(), self.bottom());

        let mut clause: Vec<Lit> = lits.into_iter().filter(|lit| *lit != bottom).collect();
        if clause.contains(&top) {
            return;
        }
        clause.sort_unstable();
        clause.dedup();
        if clause.windows(2).any(|pair| pair[1] == !pair[0]) {
            return;
        }
        if clause.is_empty() {
            clause.push(bottom);
        }
        self.clauses.push(clause);
    }

    /// `premises[0] ∧ premises[1] ∧ … → conclusion`.
    pub fn implies(&mut self, premises: &[Lit], conclusion: Lit) {
        self.add_clause(premises.iter().map(|lit| !*lit).chain([conclusion]));
    }

    /// `premises → conclusions[0] ∨ conclusions[1] ∨ …`.
    pub fn implies_any(&mut self, premises: &[Lit], conclusions: &[Lit]) {
        self.add_clause(
            premises
                .iter()
                .map(|lit| !*lit)
                .chain(conclusions.iter().copied()),
        );
    }

    /// Not all of `lits` are true together.
    pub fn forbid(&mut self, lits: &[Lit]) {
        self.add_clause(lits.iter().map(|lit| !*lit));
    }

    /// A literal equivalent to the conjunction of `lits`.
    pub fn and(&mut self, lits: &[Lit]) -> Lit {
        match lits {
            [] => self.top(),
            [single] => *single,
            _ => {
                let output = self.new_lit();
                for lit in lits {
                    self.implies(&[output], *lit);
                }
                self.implies(lits, output);
                output
            }
        }
    }

    /// A literal equivalent to the disjunction of `lits`.
    pub fn or(&mut self, lits: &[Lit]) -> Lit {
        match lits {
            [] => self.bottom(),
            [single] => *single,
            _ => {
                let output = self.new_lit();
                self.define_or(output, lits);
                output
            }
        }
    }

    /// Constrains `output ⇔ lits[0] ∨ lits[1] ∨ …`.
    pub fn define_or(&mut self, output: Lit, lits: &[Lit]) {
        for lit in lits {
            self.implies(&[*lit], output);
        }
        self.implies_any(&[output], lits);
    }

    /// No two of `lits` hold. Pairwise for short lists, a sequential counter
    /// otherwise.
    pub fn at_most_one(&mut self, lits: &[Lit]) {
        if lits.len() <= PAIRWISE_LIMIT {
            for (index, first) in lits.iter().enumerate() {
                for second in &lits[index + 1..] {
                    self.forbid(&[*first, *second]);
                }
            }
        } else {
            self.at_most(lits, 1);
        }
    }

    /// One of `lits` holds.
    pub fn exactly_one(&mut self, lits: &[Lit]) {
        self.add_clause(lits.iter().copied());
        self.at_most_one(lits);
    }

    /// At most `bound` of `lits` are true, using the sequential counter
    /// encoding (Sinz, 2005). Register `counts[i][j]` holds when at least
    /// `j + 1` of the first `i + 1` literals are true.
    pub fn at_most(&mut self, lits: &[Lit], bound: usize) {
        let n = lits.len();
        if bound >= n {
            return;
        }
        if bound == 0 {
            for lit in lits {
                self.add_clause([!*lit]);
            }
            return;
        }

        let counts: Vec<Vec<Lit>> = (0..n - 1)
            .map(|_| (0..bound).map(|_| self.new_lit()).collect())
            .collect();

        self.implies(&[lits[0]], counts[0][0]);
        for register in &counts[0][1..] {
            self.add_clause([!*register]);
        }

        for i in 1..n - 1 {
            self.implies(&[lits[i]], counts[i][0]);
            self.implies(&[counts[i - 1][0]], counts[i][0]);
            for j in 1..bound {
                self.implies(&[lits[i], counts[i - 1][j - 1]], counts[i][j]);
                self.implies(&[counts[i - 1][j]], counts[i][j]);
            }
            self.forbid(&[lits[i], counts[i - 1][bound - 1]]);
        }

        self.forbid(&[lits[n - 1], counts[n - 2][bound - 1]]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_negates_literals() {
        let mut formula = Formula::new();
        let var = formula.new_var();
        assert_eq!(!var.positive(), var.negative());
        assert_eq!(var.negative().var(), var);
        assert!(var.negative().is_negative());
        assert_eq!(!formula.top(), formula.bottom());
    }

    #[test]
    fn it_simplifies_clauses_with_constants() {
        let mut formula = Formula::new();
        let a = formula.new_lit();
        let b = formula.new_lit();
        let before = formula.num_clauses();

        formula.add_clause([a, formula.top()]);
        formula.add_clause([a, !a]);
        assert_eq!(formula.num_clauses(), before);

        formula.add_clause([b, formula.bottom(), b]);
        assert_eq!(formula.clauses().last(), Some(&vec![b]));

        formula.add_clause([formula.bottom()]);
        assert_eq!(formula.clauses().last(), Some(&vec![formula.bottom()]));
    }

    #[test]
    fn it_folds_trivial_gates() {
        let mut formula = Formula::new();
        let a = formula.new_lit();
        assert_eq!(formula.and(&[]), formula.top());
        assert_eq!(formula.or(&[]), formula.bottom());
        assert_eq!(formula.and(&[a]), a);
        assert_eq!(formula.or(&[a]), a);
    }
}

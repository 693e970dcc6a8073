// ABOUTME: Expression store — {subset -> coefficient} terms, simplification, and printing

use crate::error::{ResourceError, Verdict};
use crate::vartable::{popcount, Mask, VarTable};

/// Coefficients below this magnitude are treated as zero. Part of the
/// contract (the LP round-trips coefficients), not to be silently
/// tightened.
pub const EPS: f64 = 1.5e-10;

/// Upper bound on the number of terms an expression can accumulate.
pub const MAX_TERMS: usize = 550;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Eq,
    Ge,
    Diff,
    Markov,
    MacroBody,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub set: Mask,
    pub coeff: f64,
}

/// An ordered collection of linear terms over nonempty variable subsets,
/// plus the relation they stand for.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: Kind,
    pub terms: Vec<Term>,
}

impl Expr {
    pub fn new(kind: Kind) -> Self {
        Expr {
            kind,
            terms: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    fn locate_or_insert(&mut self, set: Mask) -> Result<usize, ResourceError> {
        if let Some(i) = self.terms.iter().position(|t| t.set == set) {
            return Ok(i);
        }
        if self.terms.len() >= MAX_TERMS {
            return Err(ResourceError::TooLongExpression);
        }
        self.terms.push(Term { set, coeff: 0.0 });
        Ok(self.terms.len() - 1)
    }

    /// Adds `d` to the coefficient of `H(set)`. `set` must be nonempty.
    pub fn add(&mut self, set: Mask, d: f64) -> Result<(), ResourceError> {
        if set == 0 {
            return Ok(());
        }
        let i = self.locate_or_insert(set)?;
        self.terms[i].coeff += d;
        Ok(())
    }

    pub fn sub(&mut self, set: Mask, d: f64) -> Result<(), ResourceError> {
        self.add(set, -d)
    }

    /// `d * I(a;b) = d*(H(a)+H(b)-H(a|b))`.
    pub fn i2(&mut self, a: Mask, b: Mask, d: f64) -> Result<(), ResourceError> {
        self.add(a, d)?;
        self.add(b, d)?;
        self.sub(a | b, d)?;
        Ok(())
    }

    /// `d * I(a;b|c) = d*(H(a,c)+H(b,c)-H(c)-H(a,b,c))`.
    pub fn i3(&mut self, a: Mask, b: Mask, c: Mask, d: f64) -> Result<(), ResourceError> {
        self.add(a | c, d)?;
        self.add(b | c, d)?;
        self.sub(c, d)?;
        self.sub(a | b | c, d)?;
        Ok(())
    }

    /// Drops terms with `|coeff| <= EPS`.
    pub fn collapse(&mut self) {
        self.terms.retain(|t| t.coeff.abs() > EPS);
    }

    /// True iff this is a `Ge` expression and every coefficient is
    /// nonnegative — the "trivially true by positivity" case.
    pub fn is_positive_ge(&self) -> bool {
        self.kind == Kind::Ge && self.terms.iter().all(|t| t.coeff >= 0.0)
    }

    /// Classifies a just-collapsed expression into a `Verdict` that
    /// short-circuits the LP call, or `None` if a real check is needed.
    pub fn trivial_verdict(&self, vars: &VarTable, full_syntax: bool) -> Option<Verdict> {
        if self.terms.is_empty() {
            return match self.kind {
                Kind::Eq => Some(Verdict::SimplifiesToEqZero),
                Kind::Ge => Some(Verdict::SimplifiesToGeZero),
                _ => None,
            };
        }
        if self.is_positive_ge() {
            return Some(Verdict::PositiveCombination);
        }
        if self.terms.len() == 1 {
            let mut printed = self.clone();
            return Some(Verdict::SingleTerm(printed.print(vars, full_syntax)));
        }
        None
    }

    /// Stable sort by ascending popcount, tiebreak by canonical repr.
    pub fn sort_for_print(&mut self, vars: &VarTable, full_syntax: bool) {
        self.terms.sort_by(|a, b| {
            popcount(a.set)
                .cmp(&popcount(b.set))
                .then_with(|| vars.repr(a.set, full_syntax).cmp(&vars.repr(b.set, full_syntax)))
        });
    }

    /// Sorts then renders as `+c1 H(S1) -c2 H(S2) ...` (full syntax) or
    /// `+c1 S1 -c2 S2 ...` (compact syntax), with `+`/`-` alone when
    /// `|c| == 1`.
    pub fn print(&mut self, vars: &VarTable, full_syntax: bool) -> String {
        self.sort_for_print(vars, full_syntax);
        let mut out = String::new();
        for (i, t) in self.terms.iter().enumerate() {
            let sign = if t.coeff < 0.0 { '-' } else { '+' };
            if i > 0 || sign == '-' {
                out.push(sign);
            }
            let mag = t.coeff.abs();
            if (mag - 1.0).abs() > EPS {
                out.push_str(&format_coeff(mag));
            }
            let rendered = vars.repr(t.set, full_syntax);
            if full_syntax {
                out.push_str("H(");
                out.push_str(&rendered);
                out.push(')');
            } else {
                out.push_str(&rendered);
            }
        }
        if out.is_empty() {
            out.push('0');
        }
        out
    }
}

fn format_coeff(v: f64) -> String {
    if (v - v.round()).abs() < EPS {
        format!("{}", v.round() as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_abc() -> VarTable {
        let mut t = VarTable::new();
        t.intern("a");
        t.intern("b");
        t.intern("c");
        t
    }

    #[test]
    fn collapse_drops_small_coefficients() {
        let mut e = Expr::new(Kind::Eq);
        e.add(0b1, 1e-12).unwrap();
        e.add(0b10, 1.0).unwrap();
        e.collapse();
        assert_eq!(e.terms.len(), 1);
    }

    #[test]
    fn i2_expands_to_three_terms() {
        let mut e = Expr::new(Kind::Ge);
        e.i2(0b01, 0b10, 1.0).unwrap();
        e.collapse();
        assert_eq!(e.terms.len(), 3);
    }

    #[test]
    fn positive_ge_is_trivial() {
        let vars = table_abc();
        let mut e = Expr::new(Kind::Ge);
        e.add(0b001, 1.0).unwrap();
        e.add(0b010, 2.0).unwrap();
        e.collapse();
        assert_eq!(e.trivial_verdict(&vars, false), Some(Verdict::PositiveCombination));
    }

    #[test]
    fn empty_eq_simplifies_to_zero() {
        let vars = table_abc();
        let mut e = Expr::new(Kind::Eq);
        e.add(0b001, 1.0).unwrap();
        e.sub(0b001, 1.0).unwrap();
        e.collapse();
        assert_eq!(e.trivial_verdict(&vars, false), Some(Verdict::SimplifiesToEqZero));
    }

    #[test]
    fn print_uses_bare_sign_for_unit_coefficients() {
        let vars = table_abc();
        let mut e = Expr::new(Kind::Diff);
        e.add(0b001, 1.0).unwrap();
        e.add(0b010, -1.0).unwrap();
        e.collapse();
        assert_eq!(e.print(&vars, false), "a-b");
    }
}

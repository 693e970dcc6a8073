// ABOUTME: Session (C12) — owns C1/C3/C4/constraint-table/settings, the single long-lived mutable object

use crate::compaction::Compaction;
use crate::constraint;
use crate::cursor::Cursor;
use crate::error::{Diagnostic, ParseError, ResourceError, SessionError, Verdict};
use crate::expr::{Expr, Kind, Term};
use crate::lp::{self, CheckOutcome, LpSolver, MinilpSolver};
use crate::macros::{FindMode, MacroCatalogue, MacroHead};
use crate::macrodef;
use crate::parser::{self, ExprMode, Style};
use crate::rng::PermSource;
use crate::settings::Settings;
use crate::vartable::{Mask, VarTable};

/// Every way a top-level operation (check, add, macro add/delete, zap)
/// can fail before reaching the point it wanted to reach. Parse failures
/// carry the `Diagnostic` the `Cursor` accumulated; everything else is a
/// named, specific condition.
#[derive(Debug)]
pub enum SessionOpError {
    Parse(Diagnostic),
    Solver(SessionError),
    DuplicateConstraint(usize),
    TooManyConstraints,
    NoSuchConstraint,
    NoMacroMatch,
}

impl From<SessionError> for SessionOpError {
    fn from(e: SessionError) -> Self {
        SessionOpError::Solver(e)
    }
}

/// The result of a `check`: either a short-circuiting `Verdict` (one of
/// the trivial cases caught before reaching the LP) or a genuine LP outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckReport {
    Trivial(Verdict),
    Outcome(CheckOutcome),
}

fn translate_through(e: &Expr, comp: &Compaction) -> Expr {
    if e.kind == Kind::Markov {
        let terms = e
            .terms
            .iter()
            .map(|t| Term { set: comp.translate(t.set), coeff: t.coeff })
            .collect();
        return Expr { kind: Kind::Markov, terms };
    }
    let mut out = Expr::new(e.kind);
    for t in &e.terms {
        let _ = out.add(comp.translate(t.set), t.coeff);
    }
    out
}

/// The single long-lived mutable object: variable table, macro
/// catalogue, the verbatim constraint table, settings, style, and the
/// permutation source, threaded by `&mut self` rather than kept in
/// freestanding statics.
pub struct Session {
    pub vars: VarTable,
    pub macros: MacroCatalogue,
    pub constraints: Vec<String>,
    pub settings: Settings,
    pub style: Style,
    pub silent: bool,
    perm: PermSource,
    solver: Box<dyn LpSolver>,
}

impl Session {
    pub fn new() -> Self {
        let mut macros = MacroCatalogue::new();
        macros.install_standard();
        Session {
            vars: VarTable::new(),
            macros,
            constraints: Vec::new(),
            settings: Settings::default(),
            style: Style::compact(',', false),
            silent: false,
            perm: PermSource::new(),
            solver: Box::new(MinilpSolver),
        }
    }

    /// Swaps in a different solver backend (used by tests to mock the LP
    /// solving boundary behind the `LpSolver` trait).
    pub fn with_solver(mut self, solver: Box<dyn LpSolver>) -> Self {
        self.solver = solver;
        self
    }

    // ---- constraints --------------------------------------------------

    pub fn add_constraint(&mut self, line: &str) -> Result<(), SessionOpError> {
        if let Some(idx) = self.constraints.iter().position(|c| c == line) {
            return Err(SessionOpError::DuplicateConstraint(idx));
        }
        self.vars.reset();
        let mut cur = Cursor::new(line);
        if constraint::parse_constraint(&mut cur, &mut self.vars, &self.macros, &self.style).is_err() {
            return Err(SessionOpError::Parse(cur.diag));
        }
        if self.constraints.len() >= self.settings.constrlimit {
            return Err(SessionOpError::TooManyConstraints);
        }
        self.constraints.push(line.to_string());
        Ok(())
    }

    pub fn del_constraint(&mut self, one_based: usize) -> Result<String, SessionOpError> {
        if one_based == 0 || one_based > self.constraints.len() {
            return Err(SessionOpError::NoSuchConstraint);
        }
        Ok(self.constraints.remove(one_based - 1))
    }

    pub fn del_all_constraints(&mut self) {
        self.constraints.clear();
    }

    pub fn list_constraints(&self) -> &[String] {
        &self.constraints
    }

    // ---- macros ---------------------------------------------------------

    pub fn macro_add(&mut self, def: &str) -> Result<MacroHead, SessionOpError> {
        self.macros.set_capacity(self.settings.macrolimit);
        self.vars.reset();
        let mut cur = Cursor::new(def);
        let (head, body) = macrodef::parse_macro_definition(&mut cur, &mut self.vars, &self.macros, &self.style)
            .map_err(|_| SessionOpError::Parse(cur.diag.clone()))?;
        self.macros
            .add(head, body)
            .map_err(|e| {
                let mut d = Diagnostic::default();
                d.record_soft(e, def.len());
                SessionOpError::Parse(d)
            })?;
        Ok(head)
    }

    pub fn macro_delete(&mut self, idx: usize) -> bool {
        self.macros.delete(idx)
    }

    pub fn macro_delete_by_header(&mut self, head_str: &str) -> Result<(usize, MacroHead), SessionOpError> {
        self.vars.reset();
        let mut cur = Cursor::new(head_str);
        let header = macrodef::parse_macro_header(&mut cur, &mut self.vars, &self.style)
            .map_err(|_| SessionOpError::Parse(cur.diag.clone()))?;
        match self.macros.find(header.head, FindMode::Exact) {
            Some(idx) if !self.macros.get(idx).map(|m| m.standard).unwrap_or(true) => {
                self.macros.delete(idx);
                Ok((idx, header.head))
            }
            _ => Err(SessionOpError::NoMacroMatch),
        }
    }

    /// Renders the macro at `idx` as `Name(a,b,...)=body`, synthesizing
    /// display-only parameter letters over the abstract parameter bits
    /// (the catalogue keeps no record of the names used at definition
    /// time, matching the upstream printer, which does the same).
    pub fn render_macro(&self, idx: usize) -> Option<String> {
        let def = self.macros.get(idx)?;
        let arity = def.head.arity;
        let names: Vec<String> = (0..arity).map(synth_param_name).collect();
        let mut scratch = VarTable::new();
        for n in &names {
            scratch.intern(n);
        }
        let mut body = def.body.clone();
        let rendered_body = body.print(&scratch, self.style.full);

        let mut header = String::new();
        header.push(def.head.name);
        header.push('(');
        for i in 0..arity {
            header.push_str(&names[i]);
            if i + 1 < arity {
                header.push(if def.head.signature & (1 << i) != 0 { '|' } else { self.style.entropy_sep });
            }
        }
        header.push(')');
        Some(format!("{header}={rendered_body}"))
    }

    // ---- style ----------------------------------------------------------

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    // ---- checking ---------------------------------------------------------

    /// Parses `line` as a diff (`==`) expression and prints its collapsed
    /// `H`-form, with no truth judgement (the "zap" operation).
    pub fn zap(&mut self, line: &str) -> Result<String, SessionOpError> {
        self.vars.reset();
        let mut cur = Cursor::new(line);
        let mut e = parser::parse_expression(&mut cur, &mut self.vars, &self.macros, &self.style, ExprMode::Diff)
            .map_err(|_| SessionOpError::Parse(cur.diag.clone()))?;
        Ok(e.print(&self.vars, self.style.full))
    }

    /// Checks `line` as a goal, against the active constraints when
    /// `use_constraints` is set (an `xcheck` passes `false`). Shares the
    /// variable namespace across the goal and every constraint re-parse
    /// (the compaction step needs the same bit assignment everywhere),
    /// resetting it fresh for this one check.
    pub fn check(&mut self, line: &str, use_constraints: bool) -> Result<CheckReport, SessionOpError> {
        self.vars.reset();

        let mut constraint_exprs = Vec::new();
        if use_constraints {
            for c in self.constraints.clone().iter() {
                let mut cur = Cursor::new(c);
                match constraint::parse_constraint(&mut cur, &mut self.vars, &self.macros, &self.style) {
                    Ok(e) => constraint_exprs.push(e),
                    Err(()) => return Err(SessionOpError::Parse(cur.diag)),
                }
            }
        }

        let mut cur = Cursor::new(line);
        let goal = parser::parse_expression(&mut cur, &mut self.vars, &self.macros, &self.style, ExprMode::Relation)
            .map_err(|_| SessionOpError::Parse(cur.diag.clone()))?;

        if let Some(v) = goal.trivial_verdict(&self.vars, self.style.full) {
            return Ok(CheckReport::Trivial(v));
        }

        let mut masks: Vec<Mask> = goal.terms.iter().map(|t| t.set).collect();
        for c in &constraint_exprs {
            masks.extend(c.terms.iter().map(|t| t.set));
        }
        let comp = Compaction::compute(&masks).map_err(|e| {
            let mut d = Diagnostic::default();
            d.record_hard(e, line.len());
            SessionOpError::Parse(d)
        })?;

        let cgoal = translate_through(&goal, &comp);
        let cconstraints: Vec<Expr> = constraint_exprs.iter().map(|c| translate_through(c, &comp)).collect();

        self.perm.mix_line(line);
        let limits = lp::SolveLimits::new(self.settings.iterlimit, self.settings.timelimit);
        let outcome = lp::check(comp.n, &cgoal, &cconstraints, &mut self.perm, self.solver.as_ref(), &limits)?;
        Ok(CheckReport::Outcome(outcome))
    }

    /// `dump FILE`'s script body (without the trailing newline convention
    /// a file writer might add): style line, each non-standard macro via
    /// `macro add`, each constraint via `add`.
    pub fn dump_script(&self) -> String {
        let mut out = String::new();
        if self.style.full {
            out.push_str("style full\n");
        } else {
            out.push_str(&format!("style simple {}\n", self.style.entropy_sep));
        }
        for idx in 0..self.macros.len() {
            if self.macros.get(idx).map(|m| m.standard).unwrap_or(false) {
                continue;
            }
            if let Some(rendered) = self.render_macro(idx) {
                out.push_str(&format!("macro add {rendered}\n"));
            }
        }
        for c in &self.constraints {
            out.push_str(&format!("add {c}\n"));
        }
        out
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn synth_param_name(i: usize) -> String {
    if i < 26 {
        ((b'a' + i as u8) as char).to_string()
    } else {
        format!("v{i}")
    }
}

/// Renders a `CheckReport` as the one- or two-line verdict text the CLI
/// and REPL print.
pub fn render_report(report: &CheckReport) -> String {
    match report {
        CheckReport::Trivial(Verdict::SimplifiesToEqZero) => "TRUE (simplifies to 0=0)".to_string(),
        CheckReport::Trivial(Verdict::SimplifiesToGeZero) => "TRUE (simplifies to 0<=0)".to_string(),
        CheckReport::Trivial(Verdict::PositiveCombination) => {
            "TRUE (positive combination of entropies)".to_string()
        }
        CheckReport::Trivial(Verdict::SingleTerm(s)) => format!("no check performed; single term: {s}"),
        CheckReport::Outcome(CheckOutcome::True) => "TRUE".to_string(),
        CheckReport::Outcome(CheckOutcome::False) => "FALSE".to_string(),
        CheckReport::Outcome(CheckOutcome::EqGeOnly) => "FALSE (only the >= direction holds)".to_string(),
        CheckReport::Outcome(CheckOutcome::EqLeOnly) => "FALSE (only the <= direction holds)".to_string(),
        CheckReport::Outcome(CheckOutcome::SolverError(e)) => format!("solver error: {e}"),
    }
}

/// `true` iff the check report represents an overall-TRUE outcome — used
/// by the CLI to pick the `0`/`1` exit code. A
/// `SingleTerm` verdict means "no check was performed", not a truth
/// judgement, so it is excluded even though it short-circuits the LP call
/// the same way the other trivial verdicts do.
pub fn report_is_true(report: &CheckReport) -> bool {
    matches!(
        report,
        CheckReport::Trivial(Verdict::SimplifiesToEqZero)
            | CheckReport::Trivial(Verdict::SimplifiesToGeZero)
            | CheckReport::Trivial(Verdict::PositiveCombination)
            | CheckReport::Outcome(CheckOutcome::True)
    )
}

pub fn op_error_message(err: &SessionOpError, source: &str) -> String {
    match err {
        SessionOpError::Parse(diag) => diag.render(source).unwrap_or_else(|| "parse error".to_string()),
        SessionOpError::Solver(e) => e.to_string(),
        SessionOpError::DuplicateConstraint(idx) => {
            format!("this constraint is already #{} in the list", idx + 1)
        }
        SessionOpError::TooManyConstraints => "too many constraints (use 'del' to remove some)".to_string(),
        SessionOpError::NoSuchConstraint => "no constraint with that index".to_string(),
        SessionOpError::NoMacroMatch => ParseError::MacroDeleteNoMatch.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_check_with_functional_dependency() {
        let mut s = Session::new();
        s.add_constraint("a:b").unwrap();
        let r = s.check("H(a)<=H(b)", true).unwrap();
        assert!(report_is_true(&r));

        let r2 = s.check("H(a)<=H(b)", false).unwrap();
        assert!(!report_is_true(&r2));
    }

    #[test]
    fn subadditivity_is_trivially_true_by_symmetry() {
        let mut s = Session::new();
        let r = s.check("(a,b)=(b,a)", false).unwrap();
        assert!(report_is_true(&r));
    }

    #[test]
    fn duplicate_constraint_is_rejected() {
        let mut s = Session::new();
        s.add_constraint("a:b").unwrap();
        let err = s.add_constraint("a:b").unwrap_err();
        assert!(matches!(err, SessionOpError::DuplicateConstraint(0)));
    }

    #[test]
    fn zap_prints_collapsed_expression() {
        let mut s = Session::new();
        let out = s.zap("(a,b)==a+b").unwrap();
        assert!(out.contains('a') && out.contains('b'));
    }

    #[test]
    fn macro_definition_then_use_in_zap() {
        let mut s = Session::new();
        s.macro_add("D(a,b,c)=(a,b|c)+(b,c|a)+(c,a|b)").unwrap();
        let out = s.zap("D(x,y,z)==0").unwrap();
        assert!(out.contains('x') && out.contains('y') && out.contains('z'));
    }

    #[test]
    fn zap_with_bare_equals_and_nothing_after_succeeds() {
        let mut s = Session::new();
        s.macro_add("D(a,b,c)=(a,b|c)+(b,c|a)+(c,a|b)").unwrap();
        let out = s.zap("D(x,y,z) ==").unwrap();
        assert!(out.contains('x') && out.contains('y') && out.contains('z'));
    }

    #[test]
    fn redefining_standard_macro_is_rejected() {
        let mut s = Session::new();
        let err = s.macro_add("I(a,b)=a+b").unwrap_err();
        assert!(matches!(err, SessionOpError::Parse(_)));
    }

    #[test]
    fn del_constraint_by_one_based_index() {
        let mut s = Session::new();
        s.add_constraint("a:b").unwrap();
        s.add_constraint("c:d").unwrap();
        assert_eq!(s.del_constraint(1).unwrap(), "a:b");
        assert_eq!(s.list_constraints(), &["c:d".to_string()]);
        assert!(s.del_constraint(5).is_err());
    }
}

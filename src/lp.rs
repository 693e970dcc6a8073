// ABOUTME: LP builder (C9) — elemental Shannon/monotonicity/constraint columns, row/col permutation, solver dispatch

use crate::compaction::Compaction;
use crate::error::SessionError;
use crate::expr::{Expr, Kind};
use crate::rng::PermSource;
use crate::vartable::{popcount, Mask};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// One column of the matrix handed to the solver: a sparse set of
/// `(row, coeff)` entries over the *compacted* universe's nonempty
/// subsets, plus whether the column's variable is free (an equality
/// generator) or bounded below by zero (an inequality generator).
#[derive(Debug, Clone)]
pub struct LpColumn {
    pub entries: Vec<(Mask, f64)>,
    pub free: bool,
}

/// The full problem: `rows` is the compacted universe's row count
/// (`2^n - 1`), `goal` gives the right-hand side per row (the goal
/// expression's coefficient on that subset, 0 where absent), and
/// `columns` are the elemental, monotonicity, and constraint generators.
/// Row and column order in `goal`/`columns` is already the permuted order
/// (see `build`); the solver sees no further structure.
#[derive(Debug, Clone)]
pub struct LpProblem {
    pub rows: usize,
    pub goal: Vec<f64>,
    pub columns: Vec<LpColumn>,
}

/// The result taxonomy for one solver invocation (one side of an `Eq`
/// goal, or the single side of a `Ge` goal).
#[derive(Debug, Clone, PartialEq)]
pub enum LpOutcome {
    /// `OPT`: the checked direction holds.
    Opt,
    /// `NOFEAS`: the checked direction does not hold.
    NoFeasible,
    /// Any other solver status, carried verbatim for display.
    Other(String),
}

/// Bounds on one solve, sourced from `Settings::iterlimit`/`timelimit`.
/// `minilp` exposes no pivot-count hook to cap mid-solve, so
/// `iteration_limit` is enforced up front as a ceiling on total nonzero
/// matrix entries (a coarse proxy for simplex work) rather than a true
/// iteration count; `time_limit` is enforced for real via a watchdog
/// thread around the blocking solve call.
#[derive(Debug, Clone, Copy)]
pub struct SolveLimits {
    pub iteration_limit: u64,
    pub time_limit: Duration,
}

impl SolveLimits {
    pub fn new(iteration_limit: u64, time_limit_secs: u64) -> Self {
        SolveLimits { iteration_limit, time_limit: Duration::from_secs(time_limit_secs) }
    }
}

impl Default for SolveLimits {
    fn default() -> Self {
        SolveLimits::new(80_000, 10)
    }
}

/// C9's solver boundary. Isolates the matrix construction above from the
/// concrete backend so it can be swapped (or mocked) in tests; the
/// default implementation delegates to `minilp`.
pub trait LpSolver {
    fn solve(&self, lp: &LpProblem, limits: &SolveLimits) -> Result<LpOutcome, SessionError>;
}

pub struct MinilpSolver;

impl LpSolver for MinilpSolver {
    fn solve(&self, lp: &LpProblem, limits: &SolveLimits) -> Result<LpOutcome, SessionError> {
        use minilp::{ComparisonOp, OptimizationDirection, Problem};

        let work: u64 = lp.columns.iter().map(|c| c.entries.len() as u64).sum();
        if work > limits.iteration_limit {
            return Err(SessionError::Solver(
                "problem too large for the configured iteration limit".to_string(),
            ));
        }

        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<_> = lp
            .columns
            .iter()
            .map(|col| {
                let bounds = if col.free {
                    (f64::NEG_INFINITY, f64::INFINITY)
                } else {
                    (0.0, f64::INFINITY)
                };
                problem.add_var(0.0, bounds)
            })
            .collect();

        for row in 0..lp.rows {
            let mut terms = Vec::new();
            for (col_idx, col) in lp.columns.iter().enumerate() {
                for &(mask, coeff) in &col.entries {
                    if row_of(mask) == row {
                        terms.push((vars[col_idx], coeff));
                    }
                }
            }
            problem.add_constraint(&terms, ComparisonOp::Eq, lp.goal[row]);
        }

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(problem.solve());
        });

        match rx.recv_timeout(limits.time_limit) {
            Ok(Ok(_)) => Ok(LpOutcome::Opt),
            Ok(Err(minilp::Error::Infeasible)) => Ok(LpOutcome::NoFeasible),
            Ok(Err(minilp::Error::Unbounded)) => Ok(LpOutcome::Other("unbounded".to_string())),
            Ok(Err(e)) => Err(SessionError::Solver(format!("{e:?}"))),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(SessionError::Solver("solver time limit exceeded".to_string()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(SessionError::Solver("solver thread terminated unexpectedly".to_string()))
            }
        }
    }
}

/// Row index (0-based) of a nonempty subset mask: `mask - 1`, since rows
/// are indexed by every nonempty subset of the (compacted) universe in
/// bitmap order.
fn row_of(mask: Mask) -> usize {
    debug_assert!(mask != 0);
    (mask - 1) as usize
}

/// Builds the elemental Shannon inequality columns `I(a;b|K) >= 0` over
/// every unordered pair of singleton bits `{a,b}` and every `K` disjoint
/// from them, for a compacted universe of size `n`.
fn shannon_columns(n: usize) -> Vec<LpColumn> {
    if n < 2 {
        return Vec::new();
    }
    let mut cols = Vec::new();
    for a in 0..n {
        for b in (a + 1)..n {
            let pair = (1u32 << a) | (1u32 << b);
            let rest = ((1u32 << n) - 1) & !pair;
            let mut k = rest;
            loop {
                let mut entries = Vec::new();
                entries.push(((1u32 << a) | k, 1.0));
                entries.push(((1u32 << b) | k, 1.0));
                if k != 0 {
                    entries.push((k, -1.0));
                }
                entries.push((pair | k, -1.0));
                cols.push(LpColumn { entries, free: false });
                if k == 0 {
                    break;
                }
                k = (k - 1) & rest;
            }
        }
    }
    cols
}

/// Expected shannon column count for a compacted universe of size `n`,
/// per the upstream `mklp.c` table.
pub fn shannon_count(n: usize) -> usize {
    if n < 2 {
        0
    } else if n == 2 {
        1
    } else {
        n * (n - 1) * (1usize << (n - 3))
    }
}

/// Builds the `n` monotonicity columns `H(U) - H(U\{i}) >= 0`.
fn monotonicity_columns(n: usize) -> Vec<LpColumn> {
    let full = (1u32 << n) - 1;
    (0..n)
        .map(|i| {
            let without_i = full & !(1u32 << i);
            let mut entries = vec![(full, 1.0)];
            if without_i != 0 {
                entries.push((without_i, -1.0));
            }
            LpColumn { entries, free: false }
        })
        .collect()
}

/// Builds the columns contributed by one constraint expression (already
/// compacted). A `Markov` expression with `k` links contributes `k - 2`
/// columns, one per interior conditional-mutual-information equality; any
/// other kind contributes exactly one column, free for `Eq` and
/// zero-bounded for `Ge`.
pub fn constraint_columns(expr: &Expr) -> Vec<LpColumn> {
    match expr.kind {
        Kind::Markov => {
            let k = expr.terms.len();
            if k < 3 {
                return Vec::new();
            }
            (1..k - 1)
                .map(|i| {
                    let mut left: Mask = 0;
                    let mut right: Mask = 0;
                    for (j, t) in expr.terms.iter().enumerate() {
                        if j < i {
                            left |= t.set;
                        } else if j > i {
                            right |= t.set;
                        }
                    }
                    let mid = expr.terms[i].set;
                    let mut entries = vec![(left | mid, 1.0), (right | mid, 1.0)];
                    if mid != 0 {
                        entries.push((mid, -1.0));
                    }
                    entries.push((left | right | mid, -1.0));
                    LpColumn { entries, free: true }
                })
                .collect()
        }
        _ => {
            let entries = expr.terms.iter().map(|t| (t.set, t.coeff)).collect();
            vec![LpColumn {
                entries,
                free: expr.kind == Kind::Eq,
            }]
        }
    }
}

/// Assembles the full `LpProblem` for one direction of a goal check: `n`
/// is the compacted universe size, `goal` is the goal expression (already
/// compacted and possibly sign-flipped for the second half of an `Eq`
/// check), `constraints` are the compacted active constraint expressions,
/// and `perm` supplies the row/column permutation draw.
pub fn build(n: usize, goal: &Expr, constraints: &[Expr], perm: &mut PermSource) -> LpProblem {
    let rows = (1usize << n) - 1;

    let mut columns = shannon_columns(n);
    columns.extend(monotonicity_columns(n));
    for c in constraints {
        columns.extend(constraint_columns(c));
    }

    let mut goal_vec = vec![0.0; rows];
    for t in &goal.terms {
        goal_vec[row_of(t.set)] += t.coeff;
    }

    // Row permutation: relabel which row index corresponds to which
    // subset. Row 0 (the canonical first nonempty subset) is held fixed,
    // matching the upstream `perm_array`'s "never move arr[0]" rule.
    let row_perm = perm.shuffle(rows);
    let mut permuted_goal = vec![0.0; rows];
    for (old_row, &new_row) in row_perm.iter().enumerate() {
        permuted_goal[new_row] = goal_vec[old_row];
    }
    let remap_row = |mask: Mask| -> Mask {
        let idx = row_of(mask);
        (row_perm[idx] + 1) as Mask
    };
    for col in columns.iter_mut() {
        for entry in col.entries.iter_mut() {
            entry.0 = remap_row(entry.0);
        }
        // rows of each column are sorted ascending before emission.
        col.entries.sort_by_key(|e| e.0);
    }

    // Column permutation: reorder the columns themselves (purely cosmetic
    // for a solver with no inherent column-order sensitivity, but kept
    // for fidelity with the spec's described robustness hack).
    let col_perm = perm.shuffle(columns.len());
    let mut permuted_columns = vec![
        LpColumn {
            entries: Vec::new(),
            free: false
        };
        columns.len()
    ];
    for (old_idx, &new_idx) in col_perm.iter().enumerate() {
        permuted_columns[new_idx] = columns[old_idx].clone();
    }

    LpProblem {
        rows,
        goal: permuted_goal,
        columns: permuted_columns,
    }
}

/// The combined outcome of a full goal check: an `Eq` goal is solved
/// twice (once negated) and the two outcomes combined.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    True,
    False,
    /// `Eq` goal: only the `>=` direction holds.
    EqGeOnly,
    /// `Eq` goal: only the `<=` direction holds.
    EqLeOnly,
    SolverError(String),
}

/// Drives one full check: builds and solves the LP for a `Ge` goal once,
/// or for an `Eq` goal twice (negating the goal the second time),
/// combining the two outcomes per the result taxonomy above.
pub fn check(
    n: usize,
    goal: &Expr,
    constraints: &[Expr],
    perm: &mut PermSource,
    solver: &dyn LpSolver,
    limits: &SolveLimits,
) -> Result<CheckOutcome, SessionError> {
    let lp = build(n, goal, constraints, perm);
    let first = solver.solve(&lp, limits)?;

    if goal.kind != Kind::Eq {
        return Ok(match first {
            LpOutcome::Opt => CheckOutcome::True,
            LpOutcome::NoFeasible => CheckOutcome::False,
            LpOutcome::Other(s) => CheckOutcome::SolverError(s),
        });
    }

    let mut negated = goal.clone();
    for t in negated.terms.iter_mut() {
        t.coeff = -t.coeff;
    }
    let lp2 = build(n, &negated, constraints, perm);
    let second = solver.solve(&lp2, limits)?;

    Ok(match (first, second) {
        (LpOutcome::Opt, LpOutcome::Opt) => CheckOutcome::True,
        (LpOutcome::NoFeasible, LpOutcome::NoFeasible) => CheckOutcome::False,
        (LpOutcome::NoFeasible, LpOutcome::Opt) => CheckOutcome::EqLeOnly,
        (LpOutcome::Opt, LpOutcome::NoFeasible) => CheckOutcome::EqGeOnly,
        (LpOutcome::Other(s), _) | (_, LpOutcome::Other(s)) => CheckOutcome::SolverError(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compaction::Compaction;

    #[test]
    fn shannon_count_matches_formula() {
        assert_eq!(shannon_count(2), shannon_columns(2).len());
        assert_eq!(shannon_count(3), shannon_columns(3).len());
        assert_eq!(shannon_count(4), shannon_columns(4).len());
        assert_eq!(shannon_count(3), 6);
        assert_eq!(shannon_count(4), 24);
    }

    #[test]
    fn monotonicity_has_n_columns() {
        assert_eq!(monotonicity_columns(4).len(), 4);
    }

    #[test]
    fn subadditivity_is_true() {
        // H(a,b) <= H(a)+H(b)  <=>  0 <= H(a)+H(b)-H(a,b) == I(a;b) >= 0.
        let mut goal = Expr::new(Kind::Ge);
        goal.i2(0b01, 0b10, 1.0).unwrap();
        goal.collapse();

        let mut perm = PermSource::new();
        let outcome = check(2, &goal, &[], &mut perm, &MinilpSolver, &SolveLimits::default()).unwrap();
        assert_eq!(outcome, CheckOutcome::True);
    }

    #[test]
    fn conditioning_can_only_decrease_entropy_is_false_unconditionally() {
        // H(a) <= H(a|b) == H(a,b)-H(b), i.e. 0 <= H(a,b)-H(b)-H(a) == -I(a;b).
        let mut goal = Expr::new(Kind::Ge);
        goal.i2(0b01, 0b10, -1.0).unwrap();
        goal.collapse();

        let mut perm = PermSource::new();
        let outcome = check(2, &goal, &[], &mut perm, &MinilpSolver, &SolveLimits::default()).unwrap();
        assert_eq!(outcome, CheckOutcome::False);
    }

    #[test]
    fn functional_dependency_constraint_flips_the_verdict() {
        // a:b (a is a function of b) => H(a)<=H(b) becomes true.
        let mut goal = Expr::new(Kind::Ge);
        goal.add(0b10, 1.0).unwrap(); // H(b)
        goal.sub(0b01, 1.0).unwrap(); // -H(a)
        goal.collapse();

        let mut fdep = Expr::new(Kind::Eq);
        fdep.add(0b11, 1.0).unwrap();
        fdep.sub(0b10, 1.0).unwrap();
        fdep.collapse();

        let masks: Vec<Mask> = goal
            .terms
            .iter()
            .chain(fdep.terms.iter())
            .map(|t| t.set)
            .collect();
        let comp = Compaction::compute(&masks).unwrap();

        let translate = |e: &Expr| {
            let mut out = Expr::new(e.kind);
            for t in &e.terms {
                out.add(comp.translate(t.set), t.coeff).unwrap();
            }
            out
        };
        let cgoal = translate(&goal);
        let cfdep = translate(&fdep);

        let mut perm = PermSource::new();
        let with_constraint =
            check(comp.n, &cgoal, std::slice::from_ref(&cfdep), &mut perm, &MinilpSolver, &SolveLimits::default()).unwrap();
        assert_eq!(with_constraint, CheckOutcome::True);

        let without_constraint = check(comp.n, &cgoal, &[], &mut perm, &MinilpSolver, &SolveLimits::default()).unwrap();
        assert_eq!(without_constraint, CheckOutcome::False);
    }
}

use good_lp::Solution as LpSolution;
use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::solvers::{SolutionStatus, WithTimeLimit};
use good_lp::{
    Expression, ProblemVariables, ResolutionError, SolverModel, Variable, variable, variables,
};
use std::fmt;
use tracing::debug;

use crate::formulation::{
    Comparison, Domain, Formulation, LinearConstraint, LinearExpr, Sense, VarId,
};

/// Terminal status reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// A solution was found but not proven optimal.
    Feasible,
    Infeasible,
    /// Undecided, e.g. stopped by a limit.
    Unknown,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unknown => "unknown",
        })
    }
}

/// One integer value per variable of the solved formulation.
pub type Assignment = Vec<i64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: SolveStatus,
    pub values: Option<Assignment>,
}

impl Outcome {
    pub fn without_solution(status: SolveStatus) -> Self {
        Outcome {
            status,
            values: None,
        }
    }
}

/// A solving backend. Blocks until the engine reaches a terminal status.
pub trait Engine {
    fn solve(&self, formulation: &Formulation) -> Outcome;

    fn name(&self) -> &str;
}

/// COIN-OR CBC through `good_lp`. Reified constraints are linearized with
/// big-M terms taken from the variable domains.
#[derive(Debug, Clone, Default)]
pub struct CbcEngine {
    pub time_limit_seconds: Option<f64>,
}

impl CbcEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, seconds: Option<f64>) -> Self {
        self.time_limit_seconds = seconds;
        self
    }
}

impl Engine for CbcEngine {
    fn solve(&self, formulation: &Formulation) -> Outcome {
        let (problem_vars, lp_vars) = init_variables(formulation);
        let objective = to_expression(formulation.objective().expr.clone(), &lp_vars);

        let mut model = match formulation.objective().sense {
            Sense::Maximise => problem_vars.maximise(objective),
            Sense::Minimise => problem_vars.minimise(objective),
        }
        .using(coin_cbc);
        #[cfg(not(debug_assertions))]
        model.set_parameter("logLevel", "0");
        if let Some(seconds) = self.time_limit_seconds {
            model = model.with_time_limit(seconds);
        }

        let constraints = linear_rows(formulation);
        debug!(
            variables = lp_vars.len(),
            rows = constraints.len(),
            "solving with CBC"
        );
        for row in constraints {
            model = model.with(to_lp_constraint(row, &lp_vars));
        }

        match model.solve() {
            Ok(solution) => {
                let values = lp_vars
                    .iter()
                    .map(|&var| solution.value(var).round() as i64)
                    .collect();
                classify(formulation, solution.status(), values)
            }
            Err(ResolutionError::Infeasible) => Outcome::without_solution(SolveStatus::Infeasible),
            Err(e) => {
                debug!(error = %e, "CBC did not finish");
                Outcome::without_solution(SolveStatus::Unknown)
            }
        }
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }
}

/// Outcome of a solve that returned values. CBC also returns values when it
/// stops on a limit; those are an incumbent only if they satisfy the model.
fn classify(formulation: &Formulation, status: SolutionStatus, values: Assignment) -> Outcome {
    match status {
        SolutionStatus::Optimal => Outcome {
            status: SolveStatus::Optimal,
            values: Some(values),
        },
        SolutionStatus::TimeLimit | SolutionStatus::GapLimit => {
            debug!(?status, "CBC stopped on a limit");
            if formulation.is_satisfied_by(&values) {
                Outcome {
                    status: SolveStatus::Feasible,
                    values: Some(values),
                }
            } else {
                Outcome::without_solution(SolveStatus::Unknown)
            }
        }
    }
}

fn init_variables(formulation: &Formulation) -> (ProblemVariables, Vec<Variable>) {
    let mut problem_vars = variables!();
    let lp_vars = formulation
        .variables()
        .map(|(var, domain)| {
            let definition = match domain {
                Domain::Boolean => variable().binary(),
                Domain::Integer { min, max } => variable().integer().min(min as f64).max(max as f64),
            };
            problem_vars.add(definition.name(formulation.name(var)))
        })
        .collect();
    (problem_vars, lp_vars)
}

/// Every constraint of `formulation` as a plain linear row, reified ones
/// included.
pub fn linear_rows(formulation: &Formulation) -> Vec<LinearConstraint> {
    let mut rows = formulation.linear_constraints().to_vec();
    for reified in formulation.reified_constraints() {
        rows.extend(linearize(formulation, &reified.when_true, reified.indicator, true));
        rows.extend(linearize(formulation, &reified.when_false, reified.indicator, false));
    }
    rows
}

/// Rows enforcing `constraint` only when `indicator == active`.
///
/// With `slack = 1 - b` (active true) or `slack = b` (active false):
/// `expr <= rhs + (max(expr) - rhs) * slack` and
/// `expr >= rhs + (min(expr) - rhs) * slack`.
fn linearize(
    formulation: &Formulation,
    constraint: &LinearConstraint,
    indicator: VarId,
    active: bool,
) -> Vec<LinearConstraint> {
    let (lo, hi) = formulation.expr_bounds(&constraint.expr);
    let rhs = constraint.rhs;

    let relax = |m: i64, cmp: Comparison| {
        let mut expr = constraint.expr.clone();
        if active {
            // expr + m*b <cmp> rhs + m
            expr.add_term(indicator, m);
            LinearConstraint::new(expr, cmp, rhs + m as f64)
        } else {
            // expr - m*b <cmp> rhs
            expr.add_term(indicator, -m);
            LinearConstraint::new(expr, cmp, rhs)
        }
    };

    // Rounded away from rhs so a fractional rhs never tightens the relaxed side.
    let upper = || relax((hi as f64 - rhs).max(0.0).ceil() as i64, Comparison::Le);
    let lower = || relax((lo as f64 - rhs).min(0.0).floor() as i64, Comparison::Ge);

    match constraint.cmp {
        Comparison::Le => vec![upper()],
        Comparison::Ge => vec![lower()],
        Comparison::Eq => vec![upper(), lower()],
    }
}

fn to_expression(expr: LinearExpr, lp_vars: &[Variable]) -> Expression {
    let mut expression = Expression::with_capacity(expr.terms().len());
    for &(var, coefficient) in expr.terms() {
        expression.add_mul(coefficient as f64, lp_vars[var.index()]);
    }
    expression
}

fn to_lp_constraint(row: LinearConstraint, lp_vars: &[Variable]) -> good_lp::Constraint {
    let lhs = to_expression(row.expr, lp_vars);
    match row.cmp {
        Comparison::Le => lhs.leq(row.rhs),
        Comparison::Ge => lhs.geq(row.rhs),
        Comparison::Eq => lhs.eq(row.rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows must accept exactly the assignments the reified form accepts.
    fn rows_agree(formulation: &Formulation, candidates: &[Vec<i64>]) {
        let rows = linear_rows(formulation);
        for values in candidates {
            let by_rows = rows.iter().all(|r| r.is_satisfied(values));
            assert_eq!(by_rows, formulation.is_satisfied_by(values), "{values:?}");
        }
    }

    fn contribution(max: i64) -> (Formulation, VarId, VarId) {
        let mut f = Formulation::new();
        let q = f.new_int("q", 0, max);
        let b = f.new_bool("b");
        (f, q, b)
    }

    #[test]
    fn positive_contribution_linearization() {
        let (mut f, q, b) = contribution(5);
        f.add_reified(b, LinearExpr::term(q, 1).ge(1), LinearExpr::term(q, 1).eq(0));

        let candidates: Vec<Vec<i64>> = (0..=5)
            .flat_map(|q| [vec![q, 0], vec![q, 1]])
            .collect();
        rows_agree(&f, &candidates);
    }

    #[test]
    fn fixed_contribution_linearization() {
        let (mut f, v, b) = contribution(7);
        f.add_reified(b, LinearExpr::term(v, 1).eq(7), LinearExpr::term(v, 1).eq(0));

        let candidates: Vec<Vec<i64>> = (0..=7)
            .flat_map(|v| [vec![v, 0], vec![v, 1]])
            .collect();
        rows_agree(&f, &candidates);
    }

    #[test]
    fn zero_domain_forces_indicator_off() {
        let (mut f, q, b) = contribution(0);
        f.add_reified(b, LinearExpr::term(q, 1).ge(1), LinearExpr::term(q, 1).eq(0));

        let rows = linear_rows(&f);
        assert!(rows.iter().all(|r| r.is_satisfied(&[0, 0])));
        assert!(!rows.iter().all(|r| r.is_satisfied(&[0, 1])));
    }

    #[test]
    fn cbc_solves_small_knapsack() {
        // maximise 3x + 2y with x + y <= 1: picks x
        let mut f = Formulation::new();
        let x = f.new_bool("x");
        let y = f.new_bool("y");
        let mut objective = LinearExpr::term(x, 3);
        objective.add_term(y, 2);
        f.set_objective(Sense::Maximise, objective);
        f.add(LinearExpr::sum(&[x, y]).le(1));

        let outcome = CbcEngine::new().solve(&f);
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.values, Some(vec![1, 0]));
    }

    #[test]
    fn cbc_respects_reification() {
        // the indicator is rewarded, but it needs q >= 1 and q costs more than b earns
        let mut f = Formulation::new();
        let q = f.new_int("q", 0, 3);
        let b = f.new_bool("b");
        f.add_reified(b, LinearExpr::term(q, 1).ge(1), LinearExpr::term(q, 1).eq(0));
        let mut objective = LinearExpr::term(b, 1);
        objective.add_term(q, -2);
        f.set_objective(Sense::Maximise, objective);

        let outcome = CbcEngine::new().solve(&f);
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.values, Some(vec![0, 0]));
    }

    fn pick_one() -> Formulation {
        let mut f = Formulation::new();
        let x = f.new_bool("x");
        let y = f.new_bool("y");
        f.set_objective(Sense::Maximise, LinearExpr::term(x, 1));
        f.add(LinearExpr::sum(&[x, y]).le(1));
        f
    }

    #[test]
    fn stopping_on_a_limit_is_never_optimal() {
        let f = pick_one();
        for status in [SolutionStatus::TimeLimit, SolutionStatus::GapLimit] {
            let outcome = classify(&f, status, vec![1, 0]);
            assert_eq!(outcome.status, SolveStatus::Feasible);
            assert_eq!(outcome.values, Some(vec![1, 0]));

            // no incumbent: CBC hands back the relaxation's column values
            let outcome = classify(&f, status, vec![1, 1]);
            assert_eq!(outcome, Outcome::without_solution(SolveStatus::Unknown));
        }
    }

    #[test]
    fn proven_optimum_keeps_its_values() {
        let outcome = classify(&pick_one(), SolutionStatus::Optimal, vec![1, 0]);
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.values, Some(vec![1, 0]));
    }

    #[test]
    fn time_limited_engine_still_solves_small_models() {
        let outcome = CbcEngine::new().with_time_limit(Some(5.0)).solve(&pick_one());
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.values, Some(vec![1, 0]));
    }

    #[test]
    fn cbc_reports_no_solution_when_infeasible() {
        let mut f = Formulation::new();
        let x = f.new_int("x", 0, 3);
        f.add(LinearExpr::term(x, 1).ge(5));

        let outcome = CbcEngine::new().solve(&f);
        assert_ne!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.values, None);
    }
}

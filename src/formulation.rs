//! Solver-independent description of an integer program with indicator
//! (reified) constraints. Engines translate it into their own model.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Boolean,
    Integer { min: i64, max: i64 },
}

impl Domain {
    pub fn bounds(self) -> (i64, i64) {
        match self {
            Domain::Boolean => (0, 1),
            Domain::Integer { min, max } => (min, max),
        }
    }
}

/// Integer-weighted sum of variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, i64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the given variables, each with coefficient one.
    pub fn sum<'a>(vars: impl IntoIterator<Item = &'a VarId>) -> Self {
        LinearExpr {
            terms: vars.into_iter().map(|&v| (v, 1)).collect(),
        }
    }

    pub fn term(var: VarId, coefficient: i64) -> Self {
        LinearExpr {
            terms: vec![(var, coefficient)],
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: i64) {
        self.terms.push((var, coefficient));
    }

    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    pub fn evaluate(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .map(|&(var, coefficient)| coefficient * values[var.index()])
            .sum()
    }

    pub fn le(self, rhs: impl Into<f64>) -> LinearConstraint {
        LinearConstraint::new(self, Comparison::Le, rhs.into())
    }

    pub fn ge(self, rhs: impl Into<f64>) -> LinearConstraint {
        LinearConstraint::new(self, Comparison::Ge, rhs.into())
    }

    pub fn eq(self, rhs: impl Into<f64>) -> LinearConstraint {
        LinearConstraint::new(self, Comparison::Eq, rhs.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
        })
    }
}

/// `expr <cmp> rhs`. The right-hand side is real-valued because scaled
/// volume bounds need not be integral.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub cmp: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(expr: LinearExpr, cmp: Comparison, rhs: f64) -> Self {
        LinearConstraint { expr, cmp, rhs }
    }

    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let lhs = self.expr.evaluate(values) as f64;
        match self.cmp {
            Comparison::Le => lhs <= self.rhs,
            Comparison::Ge => lhs >= self.rhs,
            Comparison::Eq => lhs == self.rhs,
        }
    }
}

/// `when_true` holds if the indicator is 1, `when_false` if it is 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Reified {
    pub indicator: VarId,
    pub when_true: LinearConstraint,
    pub when_false: LinearConstraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Maximise,
    Minimise,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub expr: LinearExpr,
}

#[derive(Debug, Clone)]
pub struct Formulation {
    domains: Vec<Domain>,
    names: Vec<String>,
    linear: Vec<LinearConstraint>,
    reified: Vec<Reified>,
    objective: Objective,
}

impl Default for Formulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Formulation {
    pub fn new() -> Self {
        Formulation {
            domains: Vec::new(),
            names: Vec::new(),
            linear: Vec::new(),
            reified: Vec::new(),
            objective: Objective {
                sense: Sense::Maximise,
                expr: LinearExpr::new(),
            },
        }
    }

    fn declare(&mut self, name: String, domain: Domain) -> VarId {
        self.domains.push(domain);
        self.names.push(name);
        VarId(self.domains.len() - 1)
    }

    pub fn new_bool(&mut self, name: impl Into<String>) -> VarId {
        self.declare(name.into(), Domain::Boolean)
    }

    /// Integer variable over `[min, max]`.
    pub fn new_int(&mut self, name: impl Into<String>, min: i64, max: i64) -> VarId {
        debug_assert!(min <= max);
        self.declare(name.into(), Domain::Integer { min, max })
    }

    pub fn add(&mut self, constraint: LinearConstraint) {
        self.linear.push(constraint);
    }

    pub fn add_reified(
        &mut self,
        indicator: VarId,
        when_true: LinearConstraint,
        when_false: LinearConstraint,
    ) {
        debug_assert_eq!(self.domains[indicator.index()], Domain::Boolean);
        self.reified.push(Reified {
            indicator,
            when_true,
            when_false,
        });
    }

    pub fn set_objective(&mut self, sense: Sense, expr: LinearExpr) {
        self.objective = Objective { sense, expr };
    }

    pub fn num_variables(&self) -> usize {
        self.domains.len()
    }

    pub fn domain(&self, var: VarId) -> Domain {
        self.domains[var.index()]
    }

    pub fn name(&self, var: VarId) -> &str {
        &self.names[var.index()]
    }

    pub fn variables(&self) -> impl Iterator<Item = (VarId, Domain)> + '_ {
        self.domains.iter().enumerate().map(|(i, &d)| (VarId(i), d))
    }

    pub fn linear_constraints(&self) -> &[LinearConstraint] {
        &self.linear
    }

    pub fn reified_constraints(&self) -> &[Reified] {
        &self.reified
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Smallest and largest value `expr` can take over the variable domains.
    pub fn expr_bounds(&self, expr: &LinearExpr) -> (i64, i64) {
        expr.terms().iter().fold((0, 0), |(lo, hi), &(var, c)| {
            let (min, max) = self.domain(var).bounds();
            if c >= 0 {
                (lo + c * min, hi + c * max)
            } else {
                (lo + c * max, hi + c * min)
            }
        })
    }

    /// Whether `values` (one per variable) respects every domain and constraint.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        if values.len() != self.domains.len() {
            return false;
        }
        let in_domains = self.variables().all(|(var, domain)| {
            let (min, max) = domain.bounds();
            (min..=max).contains(&values[var.index()])
        });
        let linear_ok = self.linear.iter().all(|c| c.is_satisfied(values));
        let reified_ok = self.reified.iter().all(|r| {
            if values[r.indicator.index()] == 1 {
                r.when_true.is_satisfied(values)
            } else {
                r.when_false.is_satisfied(values)
            }
        });
        in_domains && linear_ok && reified_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_bounds_follow_coefficient_sign() {
        let mut f = Formulation::new();
        let x = f.new_int("x", 0, 5);
        let y = f.new_int("y", -2, 3);
        let b = f.new_bool("b");

        let mut expr = LinearExpr::term(x, 2);
        expr.add_term(y, -1);
        expr.add_term(b, 4);
        assert_eq!(f.expr_bounds(&expr), (-3, 16));
    }

    #[test]
    fn satisfaction_checks_active_branch_only() {
        let mut f = Formulation::new();
        let q = f.new_int("q", 0, 4);
        let b = f.new_bool("b");
        f.add_reified(b, LinearExpr::term(q, 1).ge(1), LinearExpr::term(q, 1).eq(0));
        f.add(LinearExpr::sum(&[q]).le(3));

        assert!(f.is_satisfied_by(&[0, 0]));
        assert!(f.is_satisfied_by(&[2, 1]));
        assert!(!f.is_satisfied_by(&[0, 1]));
        assert!(!f.is_satisfied_by(&[2, 0]));
        assert!(!f.is_satisfied_by(&[4, 1]));
        assert!(!f.is_satisfied_by(&[5, 1]));
        assert!(!f.is_satisfied_by(&[1]));
    }
}

//! Condition evaluator: short-circuiting AND over a list of
//! `(field, op, threshold)` triples against a numeric [`Context`].

use crate::field::{Context, Field};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Eq => "==",
            Op::Ne => "!=",
        }
    }

    /// Operators tried longest-first so `>=`/`<=` aren't shadowed by `>`/`<`.
    pub const ALL: [Op; 6] = [Op::Ge, Op::Le, Op::Eq, Op::Ne, Op::Gt, Op::Lt];

    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Op::Gt => lhs > rhs,
            Op::Lt => lhs < rhs,
            Op::Ge => lhs >= rhs,
            Op::Le => lhs <= rhs,
            Op::Eq => lhs == rhs,
            Op::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub op: Op,
    pub threshold: f64,
}

impl Condition {
    pub fn evaluate(&self, ctx: &Context) -> bool {
        match ctx.get(self.field) {
            Some(v) => self.op.apply(v, self.threshold),
            None => false,
        }
    }
}

/// Short-circuiting AND. An empty list evaluates to `true`.
pub fn evaluate_all(conditions: &[Condition], ctx: &Context) -> bool {
    conditions.iter().all(|c| c.evaluate(ctx))
}

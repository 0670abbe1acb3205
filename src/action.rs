//! Compiled actions and the explicit binding-mode tag.
//!
//! The source this engine is modeled on inspects callable signatures at
//! setup time to decide how to invoke an action. A typed language can't do
//! that, so callers declare the binding mode up front via [`Effect`], and
//! the categorizer only ever discriminates on the tag, never on arity
//! introspection.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::field::Field;
use crate::variable::Captures;

pub type NoArgsFn = Rc<dyn Fn()>;
pub type ContextFn = Rc<dyn Fn(&[Option<f64>])>;
pub type VariableFn = Rc<dyn Fn(&Captures)>;

#[derive(Clone)]
pub enum Effect {
    /// Takes no arguments.
    NoArgs(NoArgsFn),
    /// Takes a fixed set of numeric context fields, read at invocation
    /// time and passed positionally in the declared order.
    ContextFields(Vec<Field>, ContextFn),
    /// Takes the variable captures bound by a pattern match. Exempt from
    /// context-field binding.
    VariableCaptures(VariableFn),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::NoArgs(_) => write!(f, "Effect::NoArgs"),
            Effect::ContextFields(fields, _) => write!(f, "Effect::ContextFields({fields:?})"),
            Effect::VariableCaptures(_) => write!(f, "Effect::VariableCaptures"),
        }
    }
}

impl Effect {
    pub fn accepts_variable_captures(&self) -> bool {
        matches!(self, Effect::VariableCaptures(_) | Effect::NoArgs(_))
    }
}

/// A label/effect pair with its decorator-derived throttle/debounce
/// settings, ready for the dispatcher's hot path.
#[derive(Clone, Debug)]
pub struct CompiledAction {
    pub label: String,
    pub effect: Effect,
    pub throttle: Option<Duration>,
    pub debounce: Option<Duration>,
}

impl CompiledAction {
    pub fn invoke(&self, ctx: &crate::field::Context, captures: Option<&Captures>) {
        match &self.effect {
            Effect::NoArgs(f) => f(),
            Effect::ContextFields(fields, f) => {
                let values: Vec<Option<f64>> = fields.iter().map(|fld| ctx.get(*fld)).collect();
                f(&values);
            }
            Effect::VariableCaptures(f) => {
                f(captures.unwrap_or(&Vec::new()));
            }
        }
    }
}

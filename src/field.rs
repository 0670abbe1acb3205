//! The seven numeric fields an input event may carry, and the per-event
//! context built from them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Power,
    F0,
    F1,
    F2,
    X,
    Y,
    Value,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Power,
        Field::F0,
        Field::F1,
        Field::F2,
        Field::X,
        Field::Y,
        Field::Value,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Power => "power",
            Field::F0 => "f0",
            Field::F1 => "f1",
            Field::F2 => "f2",
            Field::X => "x",
            Field::Y => "y",
            Field::Value => "value",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The numeric fields of the event currently being dispatched. Overwritten
/// on every `execute` call; unsupplied fields read back as `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Context {
    pub power: Option<f64>,
    pub f0: Option<f64>,
    pub f1: Option<f64>,
    pub f2: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub value: Option<f64>,
}

impl Context {
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Power => self.power,
            Field::F0 => self.f0,
            Field::F1 => self.f1,
            Field::F2 => self.f2,
            Field::X => self.x,
            Field::Y => self.y,
            Field::Value => self.value,
        }
    }
}

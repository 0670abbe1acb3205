//! Single-input mini-dispatchers: "one input, several behaviors", keyed by
//! name. The user's per-mode value can take three shapes;
//! [`normalize_single_map`] folds all three into the standard mode ->
//! specifier map a [`Dispatcher`] consumes.

use std::collections::HashMap;
use std::rc::Rc;

use crate::action::Effect;
use crate::categorize::RawEntry;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::mode::RawConfig;
use crate::timer::Clock;

/// One mode's behavior in a single-input map, before normalization.
pub enum SingleBehavior {
    /// A bare effect; the mode name itself becomes the label.
    Bare(Effect),
    /// An explicit `(label, effect)` pair.
    Labeled(String, Effect),
    /// A full specifier map for this mode, for singles that want combos,
    /// conditions, or variables rather than one flat trigger.
    FullMap(Vec<RawEntry>),
}

/// Normalizes a single's `mode -> behavior` map (declaration order
/// preserved; the first entry becomes the initial mode) into the
/// `RawConfig::Modes` shape a standard dispatcher consumes.
pub fn normalize_single_map(name: &str, modes: Vec<(String, SingleBehavior)>) -> RawConfig {
    let resolved = modes
        .into_iter()
        .map(|(mode_name, behavior)| {
            let entries = match behavior {
                SingleBehavior::Bare(effect) => vec![RawEntry::new(name, mode_name.as_str(), effect)],
                SingleBehavior::Labeled(label, effect) => vec![RawEntry::new(name, label, effect)],
                SingleBehavior::FullMap(entries) => entries,
            };
            (mode_name, entries)
        })
        .collect();
    RawConfig::Modes(resolved)
}

pub struct SingleRegistry {
    clock: Rc<dyn Clock>,
    singles: HashMap<String, Dispatcher>,
}

impl SingleRegistry {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        SingleRegistry {
            clock,
            singles: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        modes: Vec<(String, SingleBehavior)>,
    ) -> Result<(), DispatchError> {
        if self.singles.contains_key(name) {
            tracing::warn!(single = name, "single already registered; keeping existing instance");
            return Ok(());
        }
        let dispatcher = Dispatcher::new(Rc::clone(&self.clock));
        dispatcher.setup(normalize_single_map(name, modes))?;
        self.singles.insert(name.to_string(), dispatcher);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) {
        self.singles.remove(name);
    }

    pub fn get(&self, name: &str) -> Result<&Dispatcher, DispatchError> {
        self.singles.get(name).ok_or_else(|| DispatchError::UnknownSingle {
            name: name.to_string(),
        })
    }
}

//! Mode controller.
//!
//! Holds the current/previous mode name and a per-mode cache of
//! categorizer outputs. A mode switch is the caller's (dispatcher's)
//! responsibility to pair with clearing transient state; this controller
//! only tracks which tables are current.

use std::collections::HashMap;
use std::rc::Rc;

use crate::categorize::{categorize, CategorizedTables, RawEntry};
use crate::error::DispatchError;

/// A user-supplied mapping is either flat (single implicit mode) or a
/// mode dictionary, detected by the presence of a `"default"` key.
#[derive(Clone)]
pub enum RawConfig {
    Flat(Vec<RawEntry>),
    Modes(Vec<(String, Vec<RawEntry>)>),
}

const FLAT_MODE_NAME: &str = "default";

pub struct ModeController {
    modes: Vec<(String, Vec<RawEntry>)>,
    cache: HashMap<String, Rc<CategorizedTables>>,
    current: Option<String>,
    previous: Option<String>,
}

impl Default for ModeController {
    fn default() -> Self {
        ModeController {
            modes: Vec::new(),
            cache: HashMap::new(),
            current: None,
            previous: None,
        }
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setup(&mut self, config: RawConfig) -> Result<(), DispatchError> {
        self.modes = match config {
            RawConfig::Flat(entries) => vec![(FLAT_MODE_NAME.to_string(), entries)],
            RawConfig::Modes(modes) => modes,
        };
        self.cache.clear();
        self.previous = None;
        self.current = self.modes.first().map(|(name, _)| name.clone());
        if let Some(name) = self.current.clone() {
            self.ensure_built(&name)?;
        }
        Ok(())
    }

    fn ensure_built(&mut self, name: &str) -> Result<(), DispatchError> {
        if self.cache.contains_key(name) {
            return Ok(());
        }
        let entries = self
            .modes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e.as_slice())
            .unwrap_or(&[]);
        let tables = categorize(entries)?;
        self.cache.insert(name.to_string(), Rc::new(tables));
        Ok(())
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn previous_name(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn mode_names(&self) -> Vec<&str> {
        self.modes.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Raw `(specifier, label)` pairs for a mode, for introspection
    /// (`Dispatcher::get`/`get_legend`). Empty if the mode is unknown.
    pub fn raw_entries(&self, name: &str) -> Vec<(String, String)> {
        self.modes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entries)| {
                entries
                    .iter()
                    .map(|e| (e.specifier.clone(), e.label.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Current mode's categorized tables. Panics if `setup` was never
    /// called successfully; callers are expected to `setup` before
    /// dispatching any event.
    pub fn tables(&mut self) -> Rc<CategorizedTables> {
        let name = self
            .current
            .clone()
            .expect("ModeController::tables called before setup");
        self.ensure_built(&name)
            .expect("cached mode must already be valid");
        Rc::clone(self.cache.get(&name).expect("just built"))
    }

    pub fn mode_set(&mut self, name: &str) -> Result<(), DispatchError> {
        if !self.modes.iter().any(|(n, _)| n == name) {
            return Err(DispatchError::UnknownMode {
                name: name.to_string(),
            });
        }
        self.ensure_built(name)?;
        self.previous = self.current.take();
        self.current = Some(name.to_string());
        Ok(())
    }

    pub fn mode_cycle(&mut self) -> Result<String, DispatchError> {
        let names = self.mode_names();
        if names.is_empty() {
            return Err(DispatchError::UnknownMode {
                name: String::new(),
            });
        }
        let current = self.current.as_deref().unwrap_or(names[0]);
        let idx = names.iter().position(|n| *n == current).unwrap_or(0);
        let next = names[(idx + 1) % names.len()].to_string();
        self.mode_set(&next)?;
        Ok(next)
    }

    pub fn mode_revert(&mut self) -> Result<String, DispatchError> {
        let target = self
            .previous
            .clone()
            .ok_or_else(|| DispatchError::UnknownMode {
                name: String::new(),
            })?;
        self.mode_set(&target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Effect;
    use std::rc::Rc as StdRc;

    fn noop_entry(spec: &str) -> RawEntry {
        RawEntry::new(spec, "L", Effect::NoArgs(StdRc::new(|| {})))
    }

    #[test]
    fn flat_config_becomes_default_mode() {
        let mut mc = ModeController::new();
        mc.setup(RawConfig::Flat(vec![noop_entry("pop")])).unwrap();
        assert_eq!(mc.current_name(), Some("default"));
    }

    #[test]
    fn mode_set_and_revert_roundtrip() {
        let mut mc = ModeController::new();
        mc.setup(RawConfig::Modes(vec![
            ("a".to_string(), vec![noop_entry("pop")]),
            ("b".to_string(), vec![noop_entry("cluck")]),
        ]))
        .unwrap();
        assert_eq!(mc.current_name(), Some("a"));
        mc.mode_set("b").unwrap();
        assert_eq!(mc.current_name(), Some("b"));
        let reverted = mc.mode_revert().unwrap();
        assert_eq!(reverted, "a");
        assert_eq!(mc.current_name(), Some("a"));
    }

    #[test]
    fn mode_cycle_wraps_around() {
        let mut mc = ModeController::new();
        mc.setup(RawConfig::Modes(vec![
            ("a".to_string(), vec![noop_entry("pop")]),
            ("b".to_string(), vec![noop_entry("cluck")]),
        ]))
        .unwrap();
        assert_eq!(mc.mode_cycle().unwrap(), "b");
        assert_eq!(mc.mode_cycle().unwrap(), "a");
    }

    #[test]
    fn unknown_mode_errors() {
        let mut mc = ModeController::new();
        mc.setup(RawConfig::Flat(vec![noop_entry("pop")])).unwrap();
        assert!(mc.mode_set("nope").is_err());
    }
}

//! Named channel dispatchers: independent instances, each with its own
//! subscriber list, addressed by name. Re-registering an already-registered
//! name is refused (the existing instance is kept and a diagnostic is
//! logged) rather than silently replacing live state.

use std::collections::HashMap;
use std::rc::Rc;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::mode::RawConfig;
use crate::timer::Clock;

pub struct ChannelRegistry {
    clock: Rc<dyn Clock>,
    channels: HashMap<String, Dispatcher>,
}

impl ChannelRegistry {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        ChannelRegistry {
            clock,
            channels: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, config: RawConfig) -> Result<(), DispatchError> {
        if self.channels.contains_key(name) {
            tracing::warn!(channel = name, "channel already registered; keeping existing instance");
            return Ok(());
        }
        let dispatcher = Dispatcher::new(Rc::clone(&self.clock));
        dispatcher.setup(config)?;
        self.channels.insert(name.to_string(), dispatcher);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) {
        self.channels.remove(name);
    }

    pub fn get(&self, name: &str) -> Result<&Dispatcher, DispatchError> {
        self.channels.get(name).ok_or_else(|| DispatchError::UnknownChannel {
            name: name.to_string(),
        })
    }

    pub fn list(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Effect;
    use crate::categorize::RawEntry;
    use crate::timer::ManualClock;
    use std::cell::Cell;

    fn flat(entries: Vec<RawEntry>) -> RawConfig {
        RawConfig::Flat(entries)
    }

    #[test]
    fn register_then_unregister_then_register_behaves_as_first() {
        let clock: Rc<dyn Clock> = Rc::new(ManualClock::new());
        let mut registry = ChannelRegistry::new(clock);
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        registry
            .register(
                "mic",
                flat(vec![RawEntry::new("pop", "P", Effect::NoArgs(Rc::new(move || c.set(c.get() + 1))))]),
            )
            .unwrap();
        registry.get("mic").unwrap().handle("pop");
        assert_eq!(count.get(), 1);

        registry.unregister("mic");
        assert!(registry.get("mic").is_err());

        let c2 = Rc::clone(&count);
        registry
            .register(
                "mic",
                flat(vec![RawEntry::new("pop", "P", Effect::NoArgs(Rc::new(move || c2.set(c2.get() + 1))))]),
            )
            .unwrap();
        registry.get("mic").unwrap().handle("pop");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn duplicate_registration_keeps_existing_instance() {
        let clock: Rc<dyn Clock> = Rc::new(ManualClock::new());
        let mut registry = ChannelRegistry::new(clock);
        registry
            .register("mic", flat(vec![RawEntry::new("pop", "P", Effect::NoArgs(Rc::new(|| {})))]))
            .unwrap();
        registry
            .register("mic", flat(vec![RawEntry::new("cluck", "C", Effect::NoArgs(Rc::new(|| {})))]))
            .unwrap();
        // Still the first mapping: "pop" is known, "cluck" is not.
        assert_eq!(registry.get("mic").unwrap().get(None).len(), 1);
        assert_eq!(registry.get("mic").unwrap().get(None)[0].0, "pop");
    }

    #[test]
    fn unknown_channel_errors() {
        let clock: Rc<dyn Clock> = Rc::new(ManualClock::new());
        let registry = ChannelRegistry::new(clock);
        assert!(registry.get("nope").is_err());
    }
}

//! Instance registry: the three shapes multiple independent dispatchers are
//! exposed under, a hot-reloading ambient singleton, named channels, and
//! named single-input mini-dispatchers.

pub mod channel;
pub mod single;

use std::cell::RefCell;
use std::rc::Rc;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::mode::RawConfig;
use crate::timer::Clock;

/// Supplies the live configuration mapping for the ambient instance. The
/// host is expected to return the *same* `Rc` when nothing changed;
/// `AmbientDispatcher` re-runs setup only when the pointer differs from
/// the last-installed one, never by deep comparison.
pub trait ConfigProvider {
    fn config(&self) -> Rc<RawConfig>;
}

/// Process-wide singleton dispatcher bound to a [`ConfigProvider`] hook.
/// Every access re-checks the hook and re-runs setup if the returned
/// mapping is a different `Rc` than the one currently installed; this is
/// the hot-reload path for live editing.
pub struct AmbientDispatcher {
    dispatcher: Dispatcher,
    provider: Rc<dyn ConfigProvider>,
    installed: RefCell<Option<Rc<RawConfig>>>,
}

impl AmbientDispatcher {
    pub fn new(clock: Rc<dyn Clock>, provider: Rc<dyn ConfigProvider>) -> Self {
        AmbientDispatcher {
            dispatcher: Dispatcher::new(clock),
            provider,
            installed: RefCell::new(None),
        }
    }

    /// Re-syncs against the config provider, then hands back the
    /// dispatcher for use. Every public operation should go through this.
    pub fn dispatcher(&self) -> Result<&Dispatcher, DispatchError> {
        self.ensure_fresh()?;
        Ok(&self.dispatcher)
    }

    fn ensure_fresh(&self) -> Result<(), DispatchError> {
        let latest = self.provider.config();
        let stale = match &*self.installed.borrow() {
            Some(installed) => !Rc::ptr_eq(installed, &latest),
            None => true,
        };
        if stale {
            tracing::debug!("ambient config identity changed; re-running setup");
            self.dispatcher.setup((*latest).clone())?;
            *self.installed.borrow_mut() = Some(latest);
        }
        Ok(())
    }
}

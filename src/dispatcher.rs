//! The per-event dispatch state machine.
//!
//! `Dispatcher` is a cheap `Rc`-wrapped handle so it can be cloned into
//! timer callbacks and re-enter itself when a combo, throttle, or debounce
//! timer fires, without ever sharing mutable state across threads. Every
//! public operation updates the chain/region/busy state *before* invoking
//! a user action, and releases its `RefCell` borrow before doing so; an
//! action is free to call back into the dispatcher (mode-change, register)
//! without deadlocking on its own state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use crate::action::CompiledAction;
use crate::categorize::CategorizedTables;
use crate::condition::evaluate_all;
use crate::error::DispatchError;
use crate::event::{Event, EventBus, Subscriber};
use crate::field::Context;
use crate::mode::{ModeController, RawConfig};
use crate::timer::{Clock, TimerHandle};
use crate::variable::Captures;

pub const DEFAULT_COMBO_WINDOW_MS: u64 = 300;
pub const DEFAULT_CHORD_TAIL_THROTTLE_MS: u64 = 90;

/// The ELSE region sentinel.
pub const ELSE_REGION: i64 = -1;

struct Inner {
    modes: ModeController,
    combo_chain: String,
    pending_combo: Option<String>,
    timer_handle: Option<TimerHandle>,
    throttle_busy: HashMap<String, bool>,
    debounce_busy: HashMap<String, Option<TimerHandle>>,
    active_region: HashMap<String, i64>,
    context: Context,
    clock: Rc<dyn Clock>,
    combo_window: Duration,
    chord_tail_throttle: Duration,
    bus: EventBus,
}

/// A cheap, cloneable handle onto one dispatcher instance's state.
pub struct Dispatcher {
    inner: Rc<RefCell<Inner>>,
}

impl Clone for Dispatcher {
    fn clone(&self) -> Self {
        Dispatcher {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Dispatcher {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self::with_config(
            clock,
            Duration::from_millis(DEFAULT_COMBO_WINDOW_MS),
            Duration::from_millis(DEFAULT_CHORD_TAIL_THROTTLE_MS),
        )
    }

    pub fn with_config(clock: Rc<dyn Clock>, combo_window: Duration, chord_tail_throttle: Duration) -> Self {
        Dispatcher {
            inner: Rc::new(RefCell::new(Inner {
                modes: ModeController::new(),
                combo_chain: String::new(),
                pending_combo: None,
                timer_handle: None,
                throttle_busy: HashMap::new(),
                debounce_busy: HashMap::new(),
                active_region: HashMap::new(),
                context: Context::default(),
                clock,
                combo_window,
                chord_tail_throttle,
                bus: EventBus::new(),
            })),
        }
    }

    pub fn setup(&self, config: RawConfig) -> Result<(), DispatchError> {
        self.inner.borrow_mut().modes.setup(config)?;
        self.flush_transient_state();
        Ok(())
    }

    // ---- §6 public operations -------------------------------------------------

    pub fn handle(&self, name: &str) {
        self.execute(name, Context::default());
    }

    pub fn handle_parrot(
        &self,
        name: &str,
        power: Option<f64>,
        f0: Option<f64>,
        f1: Option<f64>,
        f2: Option<f64>,
    ) {
        self.execute(
            name,
            Context {
                power,
                f0,
                f1,
                f2,
                ..Context::default()
            },
        );
    }

    pub fn handle_xy(&self, name: &str, x: Option<f64>, y: Option<f64>) {
        self.execute(
            name,
            Context {
                x,
                y,
                ..Context::default()
            },
        );
    }

    pub fn handle_value(&self, name: &str, value: Option<f64>) {
        self.execute(
            name,
            Context {
                value,
                ..Context::default()
            },
        );
    }

    pub fn handle_bool(&self, name: &str, active: bool) {
        if active {
            self.handle(name);
        } else {
            self.handle(&format!("{name}_stop"));
        }
    }

    pub fn mode_get(&self) -> Option<String> {
        self.inner.borrow().modes.current_name().map(String::from)
    }

    pub fn mode_set(&self, name: &str) -> Result<(), DispatchError> {
        self.inner.borrow_mut().modes.mode_set(name)?;
        self.flush_transient_state();
        Ok(())
    }

    pub fn mode_cycle(&self) -> Result<String, DispatchError> {
        let next = self.inner.borrow_mut().modes.mode_cycle()?;
        self.flush_transient_state();
        Ok(next)
    }

    pub fn mode_revert(&self) -> Result<String, DispatchError> {
        let prior = self.inner.borrow_mut().modes.mode_revert()?;
        self.flush_transient_state();
        Ok(prior)
    }

    pub fn get(&self, mode: Option<&str>) -> Vec<(String, String)> {
        let inner = self.inner.borrow();
        let target = mode
            .map(str::to_string)
            .or_else(|| inner.modes.current_name().map(String::from));
        let Some(target) = target else {
            return Vec::new();
        };
        inner.modes.raw_entries(&target)
    }

    pub fn get_legend(&self, mode: Option<&str>) -> Vec<(String, String)> {
        self.get(mode)
            .into_iter()
            .filter(|(_, label)| !label.is_empty())
            .map(|(specifier, label)| {
                let stripped = specifier.split(':').next().unwrap_or("").to_string();
                (stripped, label)
            })
            .collect()
    }

    pub fn event_register(&self, cb: Subscriber) {
        self.inner.borrow_mut().bus.register(cb);
    }

    pub fn event_unregister(&self, cb: &Subscriber) {
        self.inner.borrow_mut().bus.unregister(cb);
    }

    pub fn combo_chain(&self) -> String {
        self.inner.borrow().combo_chain.clone()
    }

    pub fn active_region(&self, base: &str) -> Option<i64> {
        self.inner.borrow().active_region.get(base).copied()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.inner.borrow().timer_handle.is_some()
    }

    // ---- internal: execution algorithm (§4.6) ----------------------------

    fn execute(&self, input_name: &str, ctx: Context) {
        self.inner.borrow_mut().context = ctx;

        let tables = self.inner.borrow_mut().modes.tables();
        let mode_name = self.inner.borrow().modes.current_name().map(String::from);

        if !tables.base_inputs.contains(input_name) {
            return;
        }

        if tables.base_pairs.contains(input_name) {
            let stop_key = format!("{input_name}_stop");
            let prior = self.inner.borrow_mut().debounce_busy.remove(&stop_key).flatten();
            if let Some(handle) = prior {
                self.clock_ref().cancel(handle);
                return;
            }
        }

        let prior_pending = self.inner.borrow().pending_combo.clone();
        self.cancel_timer_if_any();

        {
            let mut inner = self.inner.borrow_mut();
            if inner.combo_chain.is_empty() {
                inner.combo_chain = input_name.to_string();
            } else {
                inner.combo_chain.push(' ');
                inner.combo_chain.push_str(input_name);
            }
        }
        let chain = self.inner.borrow().combo_chain.clone();

        self.resolve(&tables, &chain, input_name, ctx, mode_name, prior_pending);
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve(
        &self,
        tables: &Rc<CategorizedTables>,
        chain: &str,
        input_name: &str,
        ctx: Context,
        mode_name: Option<String>,
        prior_pending: Option<String>,
    ) {
        let in_delayed_literal = tables.delayed_literal.contains_key(chain);
        let in_delayed_conditional = tables.delayed_conditional.contains_key(chain);

        // Rule A
        if in_delayed_literal || in_delayed_conditional {
            if let Some(action) = tables.immediate_literal.get(chain).cloned() {
                self.fire_action(chain, action, ctx, None, mode_name.clone());
                self.maybe_chord_tail_throttle(tables, chain);
            }
            self.arm_delayed_flush(chain);
            return;
        }

        // Rule B
        if tables.immediate_conditional.contains_key(chain) {
            let matched = self.dispatch_conditional(tables, chain, false, &ctx, mode_name.clone());
            if !matched {
                if let Some(action) = tables.immediate_literal.get(chain).cloned() {
                    self.fire_action(chain, action, ctx, None, mode_name.clone());
                }
            }
            self.maybe_chord_tail_throttle(tables, chain);
            self.clear_chain();
            return;
        }

        // Rule C
        if let Some(action) = tables.immediate_literal.get(chain).cloned() {
            if could_extend_variable(tables, chain) {
                self.arm_potential_combo(chain);
            } else {
                self.fire_action(chain, action, ctx, None, mode_name.clone());
                self.maybe_chord_tail_throttle(tables, chain);
                self.clear_chain();
            }
            return;
        }

        // Rule D
        if let Some((idx, captures)) = first_match(&tables.immediate_variable, chain) {
            let action = tables.immediate_variable[idx].1.clone();
            self.fire_action(chain, action, ctx, Some(captures), mode_name.clone());
            self.clear_chain();
            return;
        }

        // Rule E
        if tables
            .delayed_variable
            .iter()
            .any(|(pattern, _)| pattern.try_match(chain).is_some())
        {
            self.arm_delayed_variable_flush(chain);
            return;
        }

        // Rule F
        if tables.immediate_conditional.contains_key(input_name) {
            self.flush_prior_pending(tables, prior_pending, mode_name.clone());
            let matched = self.dispatch_conditional(tables, input_name, false, &ctx, mode_name.clone());
            if !matched {
                if let Some(action) = tables.immediate_literal.get(input_name).cloned() {
                    self.fire_action(input_name, action, ctx, None, mode_name.clone());
                }
            }
            self.clear_chain();
            return;
        }

        // Rule G
        if let Some(action) = tables.immediate_literal.get(input_name).cloned() {
            self.flush_prior_pending(tables, prior_pending, mode_name.clone());
            self.fire_action(input_name, action, ctx, None, mode_name.clone());
            self.clear_chain();
            return;
        }

        // Rule H
        self.arm_potential_combo(chain);
    }

    fn dispatch_conditional(
        &self,
        tables: &Rc<CategorizedTables>,
        base: &str,
        delayed: bool,
        ctx: &Context,
        mode_name: Option<String>,
    ) -> bool {
        let group = if delayed {
            tables.delayed_conditional.get(base)
        } else {
            tables.immediate_conditional.get(base)
        };
        let Some(group) = group else {
            return false;
        };

        if tables.edge_triggered_bases.contains(base) {
            let mut new_region = ELSE_REGION;
            let mut action: Option<CompiledAction> = None;
            for (idx, entry) in group.iter().enumerate() {
                if let Some(conditions) = &entry.conditions {
                    if evaluate_all(conditions, ctx) {
                        new_region = idx as i64;
                        action = Some(entry.action.clone());
                        break;
                    }
                }
            }
            if action.is_none() {
                action = tables.edge_else_actions.get(base).cloned();
            }

            let prior_region = self.inner.borrow().active_region.get(base).copied();
            self.inner
                .borrow_mut()
                .active_region
                .insert(base.to_string(), new_region);

            if prior_region == Some(new_region) {
                return true; // suppressed: same region as before, consumed silently
            }
            if let Some(action) = action {
                self.fire_action(base, action, *ctx, None, mode_name);
            }
            true
        } else {
            for entry in group {
                if let Some(conditions) = &entry.conditions {
                    if evaluate_all(conditions, ctx) {
                        self.fire_action(base, entry.action.clone(), *ctx, None, mode_name);
                        return true;
                    }
                }
            }
            false
        }
    }

    fn flush_prior_pending(
        &self,
        tables: &Rc<CategorizedTables>,
        prior_pending: Option<String>,
        mode_name: Option<String>,
    ) {
        let Some(chain) = prior_pending else {
            return;
        };
        let ctx = self.current_context();
        let matched = self.dispatch_conditional(tables, &chain, true, &ctx, mode_name.clone());
        if !matched {
            if let Some(action) = tables.delayed_literal.get(&chain).cloned() {
                self.fire_action(&chain, action, ctx, None, mode_name);
            }
        }
    }

    fn on_delayed_flush(&self) {
        let (pending, tables, mode_name) = {
            let mut inner = self.inner.borrow_mut();
            inner.timer_handle = None;
            let pending = inner.pending_combo.take();
            (pending, inner.modes.tables(), inner.modes.current_name().map(String::from))
        };
        let Some(chain) = pending else {
            self.clear_chain();
            return;
        };
        let ctx = self.current_context();
        let matched = self.dispatch_conditional(&tables, &chain, true, &ctx, mode_name.clone());
        if !matched {
            if let Some(action) = tables.delayed_literal.get(&chain).cloned() {
                self.fire_action(&chain, action, ctx, None, mode_name);
            }
        }
        self.maybe_chord_tail_throttle(&tables, &chain);
        self.clear_chain();
    }

    fn on_delayed_variable_flush(&self) {
        let (pending, tables, mode_name) = {
            let mut inner = self.inner.borrow_mut();
            inner.timer_handle = None;
            let pending = inner.pending_combo.take();
            (pending, inner.modes.tables(), inner.modes.current_name().map(String::from))
        };
        let Some(chain) = pending else {
            self.clear_chain();
            return;
        };
        if let Some((idx, captures)) = first_match(&tables.delayed_variable, &chain) {
            let action = tables.delayed_variable[idx].1.clone();
            self.fire_action(&chain, action, self.current_context(), Some(captures), mode_name);
        }
        self.clear_chain();
    }

    fn on_potential_combo_flush(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.timer_handle = None;
        inner.pending_combo = None;
        inner.combo_chain.clear();
    }

    // ---- timer plumbing ---------------------------------------------------

    fn arm_delayed_flush(&self, chain: &str) {
        self.cancel_timer_if_any();
        self.inner.borrow_mut().pending_combo = Some(chain.to_string());
        let window = self.inner.borrow().combo_window;
        let disp = self.clone();
        let handle = self
            .clock_ref()
            .schedule(window, Box::new(move || disp.on_delayed_flush()));
        self.inner.borrow_mut().timer_handle = Some(handle);
    }

    fn arm_delayed_variable_flush(&self, chain: &str) {
        self.cancel_timer_if_any();
        self.inner.borrow_mut().pending_combo = Some(chain.to_string());
        let window = self.inner.borrow().combo_window;
        let disp = self.clone();
        let handle = self
            .clock_ref()
            .schedule(window, Box::new(move || disp.on_delayed_variable_flush()));
        self.inner.borrow_mut().timer_handle = Some(handle);
    }

    fn arm_potential_combo(&self, _chain: &str) {
        self.cancel_timer_if_any();
        let window = self.inner.borrow().combo_window;
        let disp = self.clone();
        let handle = self
            .clock_ref()
            .schedule(window, Box::new(move || disp.on_potential_combo_flush()));
        self.inner.borrow_mut().timer_handle = Some(handle);
    }

    fn cancel_timer_if_any(&self) {
        let handle = self.inner.borrow_mut().timer_handle.take();
        if let Some(handle) = handle {
            self.clock_ref().cancel(handle);
        }
        self.inner.borrow_mut().pending_combo = None;
    }

    fn clear_chain(&self) {
        self.cancel_timer_if_any();
        self.inner.borrow_mut().combo_chain.clear();
    }

    fn current_context(&self) -> Context {
        self.inner.borrow().context
    }

    fn clock_ref(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.inner.borrow().clock)
    }

    fn flush_transient_state(&self) {
        self.cancel_timer_if_any();
        let mut inner = self.inner.borrow_mut();
        inner.combo_chain.clear();
        inner.active_region.clear();
    }

    fn maybe_chord_tail_throttle(&self, tables: &CategorizedTables, chain: &str) {
        if !chain.contains(' ') {
            return;
        }
        let Some(last) = chain.rsplit(' ').next() else {
            return;
        };
        if !tables.base_pairs.contains(last) {
            return;
        }
        let dur = self.inner.borrow().chord_tail_throttle;
        for key in [last.to_string(), format!("{last}_stop")] {
            self.inner.borrow_mut().throttle_busy.insert(key.clone(), true);
            let disp = self.clone();
            let key_for_timer = key.clone();
            self.clock_ref().schedule(
                dur,
                Box::new(move || {
                    disp.inner.borrow_mut().throttle_busy.insert(key_for_timer, false);
                }),
            );
        }
    }

    /// Applies throttle/debounce bookkeeping around one action invocation,
    /// then (if not suppressed) invokes it and publishes an event.
    fn fire_action(
        &self,
        base_key: &str,
        action: CompiledAction,
        ctx: Context,
        captures: Option<Captures>,
        mode_name: Option<String>,
    ) {
        if let Some(delay) = action.debounce {
            let prior = self
                .inner
                .borrow_mut()
                .debounce_busy
                .remove(base_key)
                .flatten();
            if let Some(handle) = prior {
                self.clock_ref().cancel(handle);
            }
            let disp = self.clone();
            let key_owned = base_key.to_string();
            let action_for_timer = action.clone();
            let captures_for_timer = captures.clone();
            let handle = self.clock_ref().schedule(
                delay,
                Box::new(move || {
                    disp.inner.borrow_mut().debounce_busy.remove(&key_owned);
                    disp.invoke_and_publish(
                        &key_owned,
                        &action_for_timer,
                        ctx,
                        captures_for_timer,
                        mode_name.clone(),
                    );
                }),
            );
            self.inner
                .borrow_mut()
                .debounce_busy
                .insert(base_key.to_string(), Some(handle));
            return;
        }

        if let Some(delay) = action.throttle {
            let busy = self
                .inner
                .borrow()
                .throttle_busy
                .get(base_key)
                .copied()
                .unwrap_or(false);
            if busy {
                tracing::trace!(base = base_key, "throttle suppressed invocation");
                return;
            }
            self.inner
                .borrow_mut()
                .throttle_busy
                .insert(base_key.to_string(), true);
            let disp = self.clone();
            let key_owned = base_key.to_string();
            self.clock_ref().schedule(
                delay,
                Box::new(move || {
                    disp.inner.borrow_mut().throttle_busy.insert(key_owned, false);
                }),
            );
            self.invoke_and_publish(base_key, &action, ctx, captures, mode_name);
            return;
        }

        self.invoke_and_publish(base_key, &action, ctx, captures, mode_name);
    }

    fn invoke_and_publish(
        &self,
        base_key: &str,
        action: &CompiledAction,
        ctx: Context,
        captures: Option<Captures>,
        mode_name: Option<String>,
    ) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            action.invoke(&ctx, captures.as_ref());
        }));
        if result.is_err() {
            tracing::error!(base = base_key, "action panicked; event not published");
            return;
        }
        let event = Event {
            input: base_key.to_string(),
            label: action.label.clone(),
            mode: mode_name,
            context: ctx,
        };
        self.inner.borrow().bus.publish(&event);
    }
}

fn could_extend_variable(tables: &CategorizedTables, chain: &str) -> bool {
    let prefix = format!("{chain} ");
    tables
        .immediate_variable
        .iter()
        .chain(tables.delayed_variable.iter())
        .any(|(pattern, _)| pattern.source().starts_with(&prefix))
}

fn first_match(
    patterns: &[(crate::variable::VariablePattern, CompiledAction)],
    chain: &str,
) -> Option<(usize, Captures)> {
    for (idx, (pattern, _)) in patterns.iter().enumerate() {
        if let Some(captures) = pattern.try_match(chain) {
            return Some((idx, captures));
        }
    }
    None
}

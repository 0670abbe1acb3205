//! The setup-time categorizer: compiles a flat mapping of input specifier
//! to `(label, effect)` into the six indexed tables the dispatcher
//! consults on the hot path.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::action::{CompiledAction, Effect};
use crate::condition::Condition;
use crate::error::DispatchError;
use crate::spec::{parse_specifier, BaseToken};
use crate::variable::VariablePattern;

/// One entry of the user-supplied flat mapping for a single mode.
#[derive(Clone)]
pub struct RawEntry {
    pub specifier: String,
    pub label: String,
    pub effect: Effect,
}

impl RawEntry {
    pub fn new(specifier: impl Into<String>, label: impl Into<String>, effect: Effect) -> Self {
        RawEntry {
            specifier: specifier.into(),
            label: label.into(),
            effect,
        }
    }
}

#[derive(Clone)]
pub struct ConditionalEntry {
    /// `None` marks the `else` fallback.
    pub conditions: Option<Vec<Condition>>,
    pub action: CompiledAction,
}

#[derive(Default, Clone)]
pub struct CategorizedTables {
    pub immediate_literal: HashMap<String, CompiledAction>,
    pub delayed_literal: HashMap<String, CompiledAction>,
    pub immediate_variable: Vec<(VariablePattern, CompiledAction)>,
    pub delayed_variable: Vec<(VariablePattern, CompiledAction)>,
    pub immediate_conditional: HashMap<String, Vec<ConditionalEntry>>,
    pub delayed_conditional: HashMap<String, Vec<ConditionalEntry>>,
    pub edge_triggered_bases: HashSet<String>,
    pub edge_else_actions: HashMap<String, CompiledAction>,
    pub base_inputs: HashSet<String>,
    pub base_pairs: HashSet<String>,
    pub unique_combos: HashSet<String>,
}

struct ClassifiedEntry {
    chain: String,
    now: bool,
    action: CompiledAction,
}

struct ClassifiedVariable {
    pattern: VariablePattern,
    action: CompiledAction,
}

struct ClassifiedConditional {
    chain: String,
    conditions: Option<Vec<Condition>>,
    action: CompiledAction,
}

pub fn categorize(entries: &[RawEntry]) -> Result<CategorizedTables, DispatchError> {
    let mut active: Vec<ClassifiedEntry> = Vec::new();
    let mut variables: Vec<ClassifiedVariable> = Vec::new();
    let mut conditionals: Vec<ClassifiedConditional> = Vec::new();

    // Pass 1: classify.
    for entry in entries {
        let parsed = parse_specifier(&entry.specifier);
        if parsed.bases.is_empty() {
            warn!(specifier = %entry.specifier, "empty base after parsing; skipping entry");
            continue;
        }

        let compiled = CompiledAction {
            label: entry.label.clone(),
            effect: entry.effect.clone(),
            throttle: parsed.throttle().map(std::time::Duration::from_millis),
            debounce: parsed.debounce().map(std::time::Duration::from_millis),
        };

        if parsed.has_variables() {
            if !compiled.effect.accepts_variable_captures() {
                warn!(
                    specifier = %entry.specifier,
                    "variable-capturing entry declared a context-field effect; skipping"
                );
                continue;
            }
            variables.push(ClassifiedVariable {
                pattern: VariablePattern::compile(&parsed.bases),
                action: compiled,
            });
        } else if parsed.is_else() || !parsed.conditions().is_empty() {
            let conditions = if parsed.is_else() {
                None
            } else {
                Some(parsed.conditions())
            };
            conditionals.push(ClassifiedConditional {
                chain: parsed.base_chain(),
                conditions,
                action: compiled,
            });
        } else {
            active.push(ClassifiedEntry {
                chain: parsed.base_chain(),
                now: parsed.now(),
                action: compiled,
            });
        }
    }

    // Pass 2: metadata sets.
    let mut base_inputs: HashSet<String> = HashSet::new();
    let mut combo_input_set: Vec<String> = Vec::new();
    let mut unique_combos: HashSet<String> = HashSet::new();

    let collect_tokens = |chain: &str, base_inputs: &mut HashSet<String>| {
        for tok in chain.split_whitespace() {
            if !tok.starts_with('$') {
                base_inputs.insert(tok.to_string());
            }
        }
    };

    for e in &active {
        collect_tokens(&e.chain, &mut base_inputs);
        combo_input_set.push(e.chain.clone());
        if e.chain.contains(' ') {
            unique_combos.insert(e.chain.clone());
        }
    }
    for c in &conditionals {
        collect_tokens(&c.chain, &mut base_inputs);
        combo_input_set.push(c.chain.clone());
        if c.chain.contains(' ') {
            unique_combos.insert(c.chain.clone());
        }
    }
    for v in &variables {
        let chain = v.pattern.source().to_string();
        collect_tokens(&chain, &mut base_inputs);
        combo_input_set.push(chain.clone());
        if chain.contains(' ') {
            unique_combos.insert(chain);
        }
    }

    let mut base_pairs: HashSet<String> = HashSet::new();
    for tok in &base_inputs {
        if let Some(root) = tok.strip_suffix("_stop") {
            if base_inputs.contains(root) {
                base_pairs.insert(root.to_string());
            }
        }
    }

    let is_extended = |chain: &str, combo_input_set: &[String]| -> bool {
        let prefix = format!("{chain} ");
        combo_input_set
            .iter()
            .any(|other| other != chain && other.starts_with(&prefix))
    };

    let mut tables = CategorizedTables {
        base_inputs,
        base_pairs,
        unique_combos,
        ..Default::default()
    };

    // Pass 3: literal immediate/delayed split.
    for e in active {
        let delayed = is_extended(&e.chain, &combo_input_set);
        if delayed {
            tables
                .delayed_literal
                .insert(e.chain.clone(), e.action.clone());
            if e.now {
                tables.immediate_literal.insert(e.chain, e.action);
            }
        } else {
            tables.immediate_literal.insert(e.chain, e.action);
        }
    }

    // Pass 4: variable pattern immediate/delayed split.
    for v in variables {
        let chain = v.pattern.source().to_string();
        if is_extended(&chain, &combo_input_set) {
            tables.delayed_variable.push((v.pattern, v.action));
        } else {
            tables.immediate_variable.push((v.pattern, v.action));
        }
    }

    // Pass 5: conditional categorization, preserving declaration order per base.
    let mut immediate_groups: HashMap<String, Vec<ConditionalEntry>> = HashMap::new();
    let mut delayed_groups: HashMap<String, Vec<ConditionalEntry>> = HashMap::new();
    for c in conditionals {
        let entry = ConditionalEntry {
            conditions: c.conditions,
            action: c.action,
        };
        if is_extended(&c.chain, &combo_input_set) {
            delayed_groups.entry(c.chain).or_default().push(entry);
        } else {
            immediate_groups.entry(c.chain).or_default().push(entry);
        }
    }

    // Pass 6: extract else entries, validate no duplicate condition sets.
    for (chain, group) in immediate_groups {
        finalize_conditional_group(chain, group, &mut tables, false)?;
    }
    for (chain, group) in delayed_groups {
        finalize_conditional_group(chain, group, &mut tables, true)?;
    }

    Ok(tables)
}

fn finalize_conditional_group(
    chain: String,
    group: Vec<ConditionalEntry>,
    tables: &mut CategorizedTables,
    delayed: bool,
) -> Result<(), DispatchError> {
    let mut rest: Vec<ConditionalEntry> = Vec::new();
    let mut seen_condition_sets: Vec<Vec<Condition>> = Vec::new();

    for entry in group {
        match &entry.conditions {
            None => {
                tables.edge_triggered_bases.insert(chain.clone());
                tables.edge_else_actions.insert(chain.clone(), entry.action);
            }
            Some(conditions) => {
                if seen_condition_sets.iter().any(|c| c == conditions) {
                    return Err(DispatchError::DuplicateConditionSet { base: chain });
                }
                seen_condition_sets.push(conditions.clone());
                rest.push(entry);
            }
        }
    }

    if !rest.is_empty() {
        if delayed {
            tables.delayed_conditional.insert(chain, rest);
        } else {
            tables.immediate_conditional.insert(chain, rest);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Effect;
    use std::cell::Cell;
    use std::rc::Rc;

    fn noop() -> Effect {
        Effect::NoArgs(Rc::new(|| {}))
    }

    #[test]
    fn simple_literal_is_immediate() {
        let entries = vec![RawEntry::new("pop", "P", noop())];
        let tables = categorize(&entries).unwrap();
        assert!(tables.immediate_literal.contains_key("pop"));
        assert!(tables.base_inputs.contains("pop"));
    }

    #[test]
    fn prefix_chain_delays_shorter_literal() {
        let entries = vec![
            RawEntry::new("pop", "P", noop()),
            RawEntry::new("pop cluck", "PC", noop()),
        ];
        let tables = categorize(&entries).unwrap();
        assert!(tables.delayed_literal.contains_key("pop"));
        assert!(!tables.immediate_literal.contains_key("pop"));
        assert!(tables.immediate_literal.contains_key("pop cluck"));
        assert!(tables.unique_combos.contains("pop cluck"));
    }

    #[test]
    fn now_keeps_both_tables() {
        let entries = vec![
            RawEntry::new("pop:now", "P", noop()),
            RawEntry::new("pop cluck", "PC", noop()),
        ];
        let tables = categorize(&entries).unwrap();
        assert!(tables.delayed_literal.contains_key("pop"));
        assert!(tables.immediate_literal.contains_key("pop"));
    }

    #[test]
    fn base_pairs_detected() {
        let entries = vec![
            RawEntry::new("trigger", "T", noop()),
            RawEntry::new("trigger_stop", "S", noop()),
        ];
        let tables = categorize(&entries).unwrap();
        assert!(tables.base_pairs.contains("trigger"));
    }

    #[test]
    fn else_marks_edge_triggered_base() {
        let fired: Rc<Cell<u32>> = Rc::new(Cell::new(0));
        let f1 = Rc::clone(&fired);
        let entries = vec![
            RawEntry::new(
                "gaze:x<500",
                "L",
                Effect::NoArgs(Rc::new(move || f1.set(1))),
            ),
            RawEntry::new("gaze:else", "E", noop()),
        ];
        let tables = categorize(&entries).unwrap();
        assert!(tables.edge_triggered_bases.contains("gaze"));
        assert!(tables.edge_else_actions.contains_key("gaze"));
        assert_eq!(tables.immediate_conditional.get("gaze").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_condition_set_rejected() {
        let entries = vec![
            RawEntry::new("gaze:x<500", "L1", noop()),
            RawEntry::new("gaze:x<500", "L2", noop()),
        ];
        assert!(categorize(&entries).is_err());
    }

    #[test]
    fn variable_pattern_categorized() {
        let entries = vec![RawEntry::new(
            "tut $noise",
            "T",
            Effect::VariableCaptures(Rc::new(|_| {})),
        )];
        let tables = categorize(&entries).unwrap();
        assert_eq!(tables.immediate_variable.len(), 1);
        assert!(tables.base_inputs.contains("tut"));
        assert!(!tables.base_inputs.contains("$noise"));
    }

    #[test]
    fn variable_pattern_with_context_effect_is_skipped() {
        let entries = vec![RawEntry::new(
            "tut $noise",
            "T",
            Effect::ContextFields(vec![], Rc::new(|_| {})),
        )];
        let tables = categorize(&entries).unwrap();
        assert!(tables.immediate_variable.is_empty());
    }
}

//! Demo driver for the input dispatch engine.
//!
//! Reads a line-oriented script (`<delay_ms> <input>[,field=value,...]`)
//! from a file or stdin, replays it against a dispatcher built from a JSON
//! specifier map, and prints every action invocation and published event.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result};
use colored::*;
use serde::Deserialize;

use input_dispatch::action::Effect;
use input_dispatch::categorize::RawEntry;
use input_dispatch::cli;
use input_dispatch::config::Config;
use input_dispatch::dispatcher::Dispatcher;
use input_dispatch::field::Field;
use input_dispatch::mode::RawConfig;
use input_dispatch::telemetry;
use input_dispatch::timer::{Clock, CooperativeClock};

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum EffectKind {
    #[default]
    NoArgs,
    Context,
    Variable,
}

#[derive(Deserialize)]
struct EntryFile {
    label: String,
    #[serde(default)]
    kind: EffectKind,
    #[serde(default)]
    fields: Vec<String>,
}

type SpecMap = HashMap<String, EntryFile>;

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Modes(HashMap<String, SpecMap>),
    Flat(SpecMap),
}

fn build_raw_config(path: &std::path::Path) -> Result<RawConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed: ConfigFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing {} as a flat or mode-keyed specifier map", path.display()))?;

    let compile_map = |map: SpecMap| -> Vec<RawEntry> {
        map.into_iter()
            .map(|(specifier, entry)| {
                let label = entry.label.clone();
                let effect = match entry.kind {
                    EffectKind::NoArgs => {
                        let l = label.clone();
                        Effect::NoArgs(Rc::new(move || println!("{} {}", "fired:".green(), l)))
                    }
                    EffectKind::Context => {
                        let fields: Vec<Field> = entry
                            .fields
                            .iter()
                            .filter_map(|n| Field::from_name(n))
                            .collect();
                        let l = label.clone();
                        Effect::ContextFields(
                            fields,
                            Rc::new(move |values| println!("{} {} {:?}", "fired:".green(), l, values)),
                        )
                    }
                    EffectKind::Variable => {
                        let l = label.clone();
                        Effect::VariableCaptures(Rc::new(move |caps| {
                            println!("{} {} {:?}", "fired:".green(), l, caps)
                        }))
                    }
                };
                RawEntry::new(specifier, label, effect)
            })
            .collect()
    };

    match parsed {
        ConfigFile::Flat(map) => Ok(RawConfig::Flat(compile_map(map))),
        ConfigFile::Modes(modes) => {
            Ok(RawConfig::Modes(modes.into_iter().map(|(n, m)| (n, compile_map(m))).collect()))
        }
    }
}

struct ScriptLine {
    delay_ms: u64,
    input: String,
    fields: HashMap<String, f64>,
}

fn parse_line(line: &str) -> Result<Option<ScriptLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let delay_str = parts.next().context("missing delay field")?;
    let rest = parts.next().context("missing input field")?.trim();
    let delay_ms: u64 = delay_str.parse().with_context(|| format!("bad delay `{delay_str}`"))?;

    let mut segments = rest.split(',');
    let input = segments.next().context("missing input name")?.to_string();
    let mut fields = HashMap::new();
    for seg in segments {
        let (name, value) = seg.split_once('=').with_context(|| format!("bad field `{seg}`"))?;
        fields.insert(name.to_string(), value.parse::<f64>().with_context(|| format!("bad value `{value}`"))?);
    }
    Ok(Some(ScriptLine { delay_ms, input, fields }))
}

fn dispatch_line(dispatcher: &Dispatcher, line: &ScriptLine) {
    let get = |k: &str| line.fields.get(k).copied();
    if get("x").is_some() || get("y").is_some() {
        dispatcher.handle_xy(&line.input, get("x"), get("y"));
    } else if get("value").is_some() {
        dispatcher.handle_value(&line.input, get("value"));
    } else if get("power").is_some() || get("f0").is_some() || get("f1").is_some() || get("f2").is_some() {
        dispatcher.handle_parrot(&line.input, get("power"), get("f0"), get("f1"), get("f2"));
    } else {
        dispatcher.handle(&line.input);
    }
}

fn main() -> Result<()> {
    let args = cli::parse_args();
    let cfg = Config::from(&args);
    telemetry::init_tracing(&cfg);

    let raw_config = build_raw_config(&args.map)?;

    let clock = Rc::new(CooperativeClock::new());
    let dispatcher = Dispatcher::with_config(
        Rc::clone(&clock) as Rc<dyn Clock>,
        cfg.combo_window(),
        cfg.chord_tail_throttle(),
    );
    dispatcher.setup(raw_config)?;

    let reader: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(io::BufReader::new(
            fs::File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::BufReader::new(io::stdin())),
    };

    for line in reader.lines() {
        let line = line?;
        let Some(parsed) = parse_line(&line)? else {
            continue;
        };
        if parsed.delay_ms > 0 {
            thread::sleep(Duration::from_millis(parsed.delay_ms));
        }
        clock.poll();
        dispatch_line(&dispatcher, &parsed);
    }

    // Drain any trailing combo/throttle/debounce timers.
    let drain_budget = cfg.combo_window_ms.max(cfg.chord_tail_throttle_ms) * 2 + 50;
    thread::sleep(Duration::from_millis(drain_budget));
    clock.poll();

    println!("{}", "-- replay complete --".dimmed());
    Ok(())
}

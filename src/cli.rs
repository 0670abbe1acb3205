use clap::Parser;

/// A demo driver for the input dispatch engine.
/// Reads a line-oriented script of input names (plus optional signal
/// data) from a file or stdin, feeds each line through a dispatcher, and
/// prints every action invocation and published event to stdout.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "A demo driver for the input dispatch engine.\n\
Reads a line-oriented script of input names from a file or stdin, feeds each\n\
line through a dispatcher built from a JSON specifier map, and prints every\n\
action invocation and published event to stdout.\n\
\n\
EXAMPLES:\n\
  # Replay a script against a mapping file:\n\
  dispatch-demo --map mapping.json --script session.txt\n\
\n\
  # Read the script from stdin, with a 500ms combo window:\n\
  cat session.txt | dispatch-demo --map mapping.json --combo-window 500\n\
\n\
  # Debugging - verbose structured logs of every decision point:\n\
  dispatch-demo --map mapping.json --script session.txt --verbose\n\
\n\
See README for the mapping file format."
)]
pub struct Args {
    /// Path to the JSON specifier map (flat or mode dictionary).
    #[arg(short = 'm', long, value_name = "PATH")]
    pub map: std::path::PathBuf,

    /// Path to the input script to replay; reads stdin if omitted.
    #[arg(short = 's', long, value_name = "PATH")]
    pub script: Option<std::path::PathBuf>,

    /// Combo window, in milliseconds. (Default: 300ms)
    #[arg(long, default_value = "300", value_name = "MS")]
    pub combo_window: u64,

    /// Chord-tail force-throttle duration, in milliseconds. (Default: 90ms)
    #[arg(long, default_value = "90", value_name = "MS")]
    pub chord_tail_throttle: u64,

    /// Default throttle duration for `:th` with no explicit value.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub default_throttle: u64,

    /// Default debounce duration for `:db` with no explicit value.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub default_debounce: u64,

    /// `tracing`'s `EnvFilter` directive string.
    #[arg(long, default_value = "input_dispatch=info", value_name = "FILTER")]
    pub log_filter: String,

    /// Log every dispatch decision, not just action invocations.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}

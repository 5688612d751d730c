use anyhow::Result;

use crate::cli::{actions::Action, commands, dispatch::handler};

/// Parse arguments, install logging, and resolve the action to run.
/// # Errors
/// Returns an error if the arguments do not map to an action.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    // RUST_LOG still wins over -v.
    let directive = match matches.get_count("verbosity") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    fieldline_observability::init_with_default(directive);

    handler(&matches)
}

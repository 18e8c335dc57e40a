// One module per subcommand; main.rs only parses arguments and dispatches.

pub mod check;
pub mod records;
pub mod refresh;
pub mod schedule;

/// Process environment as a config lookup.
pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

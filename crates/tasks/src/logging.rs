use std::env;

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `verbose` forces `debug`, otherwise
/// `RUST_LOG` decides and defaults to `info`.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if verbose {
        debug!("verbose logging enabled");
    }
}

pub fn env_flag() -> bool {
    env::var("RAGBENCH_VERBOSE")
        .map(|value| parse_bool(value.trim()))
        .unwrap_or(false)
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for raw in ["1", "true", "YES", " on "] {
            assert!(parse_bool(raw), "{raw}");
        }
        for raw in ["0", "false", "", "verbose"] {
            assert!(!parse_bool(raw), "{raw}");
        }
    }
}

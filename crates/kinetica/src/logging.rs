// Logging bootstrap: a `tracing-subscriber` fmt layer filtered by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs the fmt subscriber with `RUST_LOG`, or `info` when it is unset.
pub fn init() -> bool {
    init_with_filter("info")
}

/// Installs the fmt subscriber with `RUST_LOG`, or `fallback` when it is
/// unset or invalid. Returns `false` if a global subscriber already exists.
pub fn init_with_filter(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_with_filter("kinetica=debug");
        assert!(!init());
    }
}

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "tcgen=info,tcgen_core=info";

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` overrides the
/// default directives.
pub fn init(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Quiet by default so log lines never land on top of the TUI.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting framecheck");
    fc_cli::run()
}

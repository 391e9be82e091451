use anyhow::Result;
use clap::Parser;
use mgsat_diagnose::{DiagnoseCli, run};
use tracing_subscriber::EnvFilter;

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = DiagnoseCli::parse();
    let stdout = std::io::stdout();
    run(&cli, &mut stdout.lock())
}

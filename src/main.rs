use clap::Parser;
use tracing_subscriber::EnvFilter;

use map_refine::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("map_refine=debug,info")
    } else {
        EnvFilter::new("map_refine=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Align(args) => {
            cli::align::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Validate(args) => {
            cli::validate::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}

use clap::Parser;
use lockbox::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr log subscriber.
///
/// `LOCKBOX_LOG` takes an `EnvFilter` directive; `-v` forces debug output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("lockbox=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_env("LOCKBOX_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lockbox=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Set { ref key, ref value } => {
            lockbox::cli::commands::set::execute(&cli, key, value.as_deref())
        }
        Commands::Get { ref key } => lockbox::cli::commands::get::execute(&cli, key),
        Commands::List => lockbox::cli::commands::list::execute(&cli),
        Commands::Delete { ref key, force } => {
            lockbox::cli::commands::delete::execute(&cli, key, force)
        }
        Commands::Verify => lockbox::cli::commands::verify::execute(&cli),
    };

    if let Err(e) = result {
        lockbox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

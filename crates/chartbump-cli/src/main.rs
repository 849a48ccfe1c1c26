//! chartbump CLI - bump chart, app and image versions in Helm charts

use clap::Parser;
use clap::builder::BoolishValueParser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

#[derive(Parser)]
#[command(name = "chartbump")]
#[command(author = "chartbump contributors")]
#[command(
    about = "Bump chart, app and image versions in Helm charts without losing comments",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    args: commands::bump::BumpArgs,

    /// Enable debug output
    #[arg(
        long,
        env = "PLUGIN_DEBUG",
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "chartbump=debug,chartbump_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    match commands::bump::run(&cli.args) {
        Ok(_) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code as u8)
        }
    }
}

use clap::Parser;

mod args;
mod cmd;

use args::{Cli, Command};

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Run(args) => cmd::run::execute(args),
        Command::Audit(args) => cmd::audit::execute(args),
        Command::Inspect(args) => cmd::inspect::execute(args),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            1
        }
    };
    std::process::exit(code);
}

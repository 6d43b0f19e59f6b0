mod bootstrap;
mod cli;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Preprocess(args)) => run::preprocess(args),
        None => run::run(cli.run),
    }
}

mod cli;
mod render;
mod run;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    engine_logging::initialize(args.log_destination(), args.log_level);
    run::run(args).await
}

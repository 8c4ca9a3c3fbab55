use anyhow::Result;
use clap::Parser;
use log::info;
use refscout::cli::Cli;
use refscout::output;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting refscout - GitLab ref discovery");
    cli.execute().await?;

    Ok(())
}

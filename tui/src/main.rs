use clap::Parser;
use kiosk_tui::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    kiosk_tui::run_main(cli).await
}

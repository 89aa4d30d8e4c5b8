use clap::Parser;
use flasher_lib::commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = flasher_lib::run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

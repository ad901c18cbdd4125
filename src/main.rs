use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = sfrelay::cli::Cli::parse();
    if let Err(e) = sfrelay::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

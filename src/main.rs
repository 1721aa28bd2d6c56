// main.rs
mod cli;
mod conversation;

use clap::Parser;
use cli::{Args, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("carbon_calc=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = args.data_dir;

    let result = match args.command {
        Commands::Calculate {
            lifestyle,
            json,
            all_tips,
        } => cli::handle_calculate(data_dir, lifestyle, json, all_tips),
        Commands::Chat { session } => cli::handle_chat(data_dir, session).await,
        Commands::Ask { message, session } => cli::handle_ask(data_dir, message, session).await,
        Commands::Tips { category } => cli::handle_tips(category),
        Commands::Regions => cli::handle_regions(data_dir),
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

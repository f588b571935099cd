use dotenvy::dotenv;
use log::info;
use mpe_server::{cli::handle_command_line_args, config::ServerConfig, server::run_server};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();

    let chains = config.chains.iter().map(|c| c.currency.as_str()).collect::<Vec<_>>().join(", ");
    info!("🚀️ Starting the payment engine for {chains}");
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

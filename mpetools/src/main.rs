use clap::Parser;
use dotenvy::dotenv;

mod command_def;
mod command_handler;
mod formatting;

use crate::{command_def::Arguments, command_handler::handle_command};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if let Err(e) = handle_command(cli.command).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

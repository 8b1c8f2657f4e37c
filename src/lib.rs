// Declare the modules
pub mod api;
pub mod auth;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod state;
pub mod storage;
pub mod view;

use clap::Parser;

pub async fn run() -> anyhow::Result<()> {
    // Initialize logging; sqlx logs every statement at info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,sqlx=warn"))
        .init();

    let cli = cli::Cli::parse();
    cli::execute(cli).await
}

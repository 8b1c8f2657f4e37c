use crate::commands;
use crate::config::{self, ChatConfig};
use crate::dashboard::Dashboard;
use crate::models::LogEntry;
use crate::state::AppState;
use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};
use crate::view::{format_entry, ChatView};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "bookchat", version, about = "Bookstore chat assistant and admin dashboard")]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database holding the session and message log
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Keep all state in memory for this run
    #[arg(long, global = true, conflicts_with = "db")]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive chat (default)
    Chat,
    /// Show the session id and context memory status
    Session,
    /// Log in as admin
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log out
    Logout,
    /// Show the message log, newest first
    Logs,
    /// Delete the message log
    ClearLogs,
    /// Show dashboard analytics
    Dashboard,
    /// List books
    Books {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// List orders
    Orders {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Store the admin password in the OS keyring
    SetAdminPassword {
        #[arg(long)]
        password: String,
    },
}

struct TerminalView;

impl ChatView for TerminalView {
    fn render_message(&self, entry: &LogEntry) {
        println!("{}", format_entry(entry));
    }

    fn set_typing(&self, active: bool) {
        if active {
            println!("   ...");
        }
    }

    fn reset_transcript(&self, welcome: &LogEntry) {
        println!("{}", format_entry(welcome));
    }
}

async fn open_store(cli: &Cli) -> Result<Arc<dyn KeyValueStore>> {
    if cli.ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = match &cli.db {
        Some(p) => p.clone(),
        None => config::default_database_path()
            .ok_or_else(|| anyhow!("Could not determine a data directory; pass --db"))?,
    };
    Ok(Arc::new(SqliteStore::open(&path).await?))
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config = ChatConfig::load(cli.config.as_deref())?;
    let kv = open_store(&cli).await?;
    let state = AppState::new(config, kv).await?;

    log::info!("Session ID: {}", state.session_id);
    log::info!(
        "Context memory: {}",
        if state.config.enable_context_memory { "ENABLED" } else { "DISABLED" }
    );

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat_loop(&state).await,
        Command::Session => {
            let info = commands::session_info(&state).await.map_err(|e| anyhow!(e))?;
            println!("Session ID:     {}", info.session_id);
            println!(
                "Context memory: {} (last {} messages)",
                if info.context_memory_enabled { "enabled" } else { "disabled" },
                info.max_context_messages
            );
            println!("Admin:          {}", if info.authenticated { "logged in" } else { "logged out" });
            Ok(())
        }
        Command::Login { username, password } => {
            commands::login(&state, &username, &password)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("Login successful!");
            Ok(())
        }
        Command::Logout => {
            commands::logout(&state).await.map_err(|e| anyhow!(e))?;
            println!("Logged out successfully");
            Ok(())
        }
        Command::Logs => {
            let logs = commands::list_logs(&state).await.map_err(|e| anyhow!(e))?;
            for entry in logs {
                println!(
                    "{}  {:<4}  {}",
                    entry.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
                    entry.role.as_str(),
                    entry.text
                );
            }
            Ok(())
        }
        Command::ClearLogs => {
            commands::clear_logs(&state).await.map_err(|e| anyhow!(e))?;
            println!("Chat logs cleared");
            Ok(())
        }
        Command::Dashboard => {
            let dashboard = commands::load_dashboard(&state).await.map_err(|e| anyhow!(e))?;
            print_dashboard(&dashboard);
            Ok(())
        }
        Command::Books { search } => {
            let books = commands::search_books(&state, &search)
                .await
                .map_err(|e| anyhow!(e))?;
            for b in books {
                println!(
                    "{:<40} {:<24} {:<18} ${:<8} {}",
                    dash(&b.title),
                    dash(&b.author),
                    dash(&b.genre),
                    dash(&b.price),
                    dash(&b.available)
                );
            }
            Ok(())
        }
        Command::Orders { search } => {
            let orders = commands::search_orders(&state, &search)
                .await
                .map_err(|e| anyhow!(e))?;
            for o in orders {
                println!(
                    "#{:<8} {:<24} {:<12} {:<12} {}",
                    dash(&o.order_id),
                    dash(&o.customer_name),
                    dash(&o.status),
                    dash(&o.eta),
                    dash(&o.book)
                );
            }
            Ok(())
        }
        Command::SetAdminPassword { password } => {
            commands::set_admin_password(&state, &password).map_err(|e| anyhow!(e))?;
            println!("Admin password stored in keyring");
            Ok(())
        }
    }
}

fn dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

async fn chat_loop(state: &AppState) -> Result<()> {
    let pipeline = state.pipeline(Arc::new(TerminalView));
    pipeline.replay().await?;
    println!("(type /clear to clear the chat, /quit to exit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                if let Err(e) = commands::clear_chat(&pipeline).await {
                    eprintln!("{}", e);
                }
            }
            _ => {
                // Awaited before the next line is read
                if let Err(e) = commands::send_message(&pipeline, &line).await {
                    eprintln!("{}", e);
                }
            }
        }
    }
    Ok(())
}

fn print_dashboard(d: &Dashboard) {
    println!(
        "Books: {}   Orders: {}   Chats: {}",
        d.summary.total_books, d.summary.total_orders, d.summary.total_chats
    );

    println!("\nOrder status");
    for s in &d.order_status {
        println!("  {:<12} {:>4} ({:.1}%)", s.status, s.count, s.percentage);
    }

    println!("\nChat activity (last 7 days)");
    let max = d.chat_activity.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for bar in &d.chat_activity {
        let width = bar.count * 30 / max;
        println!("  {} {:<30} {}", bar.label, "#".repeat(width), bar.count);
    }

    println!("\nTop books");
    if d.top_books.is_empty() {
        println!("  No data available");
    }
    for b in &d.top_books {
        println!("  {}. {} ({} • {}) {}", b.rank, b.title, b.author, b.genre, b.order_count);
    }

    println!("\nGenres");
    for g in &d.genres {
        let width = (g.width_percent * 0.3).round() as usize;
        println!("  {:<18} {:<30} {}", g.genre, "=".repeat(width), g.count);
    }

    println!("\nRecent activity");
    if d.recent_activity.is_empty() {
        println!("  No recent activity");
    }
    for a in &d.recent_activity {
        println!("  {:<15} {} ({})", a.title, a.description, a.relative_time);
    }
}

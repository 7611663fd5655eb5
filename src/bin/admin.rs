//! CLI administration tool for shortlink-engine.
//!
//! Inspects statistics, entries and durable reminders stored in PostgreSQL
//! without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Global counters
//! cargo run --bin admin -- stats
//!
//! # Counters for one domain
//! cargo run --bin admin -- stats --domain example.com
//!
//! # Inspect an entry
//! cargo run --bin admin -- entry q1w2e3r4t5y6
//!
//! # List or purge durable reminders
//! cargo run --bin admin -- reminders list
//! cargo run --bin admin -- reminders purge
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//!
//! Purging reminders removes their rows only; a running server keeps its
//! in-process tasks until restart, and entries without a reminder still
//! expire lazily on their next resolution.

use shortlink_engine::domain::entities::StatsScope;
use shortlink_engine::domain::repositories::{
    CounterRepository, EntryRepository, ReminderRepository,
};
use shortlink_engine::infrastructure::persistence::{
    PgCounterRepository, PgEntryRepository, PgReminderRepository,
};
use shortlink_engine::utils::extract_domain::domain_key;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing shortlink-engine.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Show activation statistics
    Stats {
        /// Restrict to one source domain
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Show one stored entry
    Entry {
        /// Short code
        code: String,
    },

    /// Manage durable expiration reminders
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Reminder subcommands.
#[derive(Subcommand)]
enum ReminderAction {
    /// List persisted reminders
    List,

    /// Delete every persisted reminder
    Purge {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Stats { domain } => handle_stats(&pool, domain).await?,
        Commands::Entry { code } => handle_entry(&pool, &code).await?,
        Commands::Reminders { action } => handle_reminder_action(action, &pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Displays activation counters and entry totals.
async fn handle_stats(pool: &PgPool, domain: Option<String>) -> Result<()> {
    let repo = PgCounterRepository::new(Arc::new(pool.clone()));

    let scope = match domain {
        Some(d) => StatsScope::Domain(domain_key(&d).context("Domain must not be empty")?),
        None => StatsScope::Global,
    };

    println!(
        "{} {}",
        "📊 Statistics".bright_blue().bold(),
        format!("({})", scope).bright_black()
    );
    println!();

    let counters = repo
        .load(&scope)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load counters: {}", e))?;

    println!(
        "  Total activations: {}",
        counters.total_activations.to_string().bright_green().bold()
    );
    println!(
        "  Active entries:    {}",
        counters.active_count.to_string().bright_green().bold()
    );

    if scope == StatsScope::Global {
        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(pool)
            .await?;
        let reminders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reminders")
            .fetch_one(pool)
            .await?;

        println!(
            "  Stored entries:    {}",
            stored.to_string().bright_green().bold()
        );
        println!(
            "  Reminders:         {}",
            reminders.to_string().bright_green().bold()
        );
    }
    println!();

    Ok(())
}

/// Prints every field of one entry.
async fn handle_entry(pool: &PgPool, code: &str) -> Result<()> {
    let repo = PgEntryRepository::new(Arc::new(pool.clone()));

    let entry = repo
        .load(code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("Entry not found")?;

    let state = if entry.is_active() && !entry.is_past_expiry(Utc::now()) {
        entry.state.to_string().green()
    } else {
        entry.state.to_string().red()
    };

    println!("{}", "🔗 Entry".bright_blue().bold());
    println!();
    println!("  Code:        {}", entry.code.cyan());
    println!("  Target:      {}", entry.target_url.bright_white());
    println!("  Domain:      {}", entry.domain);
    println!("  State:       {}", state);
    println!("  One-shot:    {}", entry.one_shot);
    println!("  TTL:         {}s", entry.ttl_seconds);
    println!("  Invocations: {}", entry.invocation_count);
    println!(
        "  Created:     {}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string().bright_black()
    );
    println!(
        "  Expires:     {}",
        entry.expires_at.format("%Y-%m-%d %H:%M:%S").to_string().bright_black()
    );
    match &entry.scheduler {
        Some(handle) => println!(
            "  Scheduler:   {} (ticket {})",
            handle.kind.as_str(),
            handle.ticket.to_string().bright_black()
        ),
        None => println!("  Scheduler:   {}", "none".bright_black()),
    }
    println!();

    Ok(())
}

/// Dispatches reminder commands.
async fn handle_reminder_action(action: ReminderAction, pool: &PgPool) -> Result<()> {
    let repo = PgReminderRepository::new(Arc::new(pool.clone()));

    match action {
        ReminderAction::List => list_reminders(&repo).await?,
        ReminderAction::Purge { yes } => purge_reminders(&repo, yes).await?,
    }

    Ok(())
}

async fn list_reminders(repo: &PgReminderRepository) -> Result<()> {
    println!("{}", "⏰ Durable Reminders".bright_blue().bold());
    println!();

    let reminders = repo
        .list()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list reminders: {}", e))?;

    if reminders.is_empty() {
        println!("{}", "  No reminders found".yellow());
        return Ok(());
    }

    println!(
        "  {:<24} {:<10} {:<20} {:<10}",
        "Name".bright_white().bold(),
        "Period".bright_white().bold(),
        "Registered".bright_white().bold(),
        "Next fire".bright_white().bold()
    );
    println!("  {}", "─".repeat(70).bright_black());

    let now = Utc::now();
    for reminder in &reminders {
        println!(
            "  {:<24} {:<10} {:<20} {}",
            reminder.name.cyan(),
            format!("{}s", reminder.period_seconds),
            reminder
                .registered_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            format!("in {}s", reminder.next_fire_in(now).as_secs())
        );
    }

    println!();
    println!(
        "  Total: {}",
        reminders.len().to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

async fn purge_reminders(repo: &PgReminderRepository, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Purge Reminders".bright_blue().bold());
    println!();

    let reminders = repo
        .list()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list reminders: {}", e))?;

    if reminders.is_empty() {
        println!("{}", "  Nothing to purge".yellow());
        return Ok(());
    }

    println!(
        "  {} reminders will be deleted",
        reminders.len().to_string().bright_yellow().bold()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete all reminders?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let mut deleted = 0usize;
    for reminder in &reminders {
        if repo
            .delete(&reminder.name)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete '{}': {}", reminder.name, e))?
        {
            deleted += 1;
        }
    }

    println!();
    println!(
        "{} {}",
        "✅ Reminders deleted:".green().bold(),
        deleted.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}

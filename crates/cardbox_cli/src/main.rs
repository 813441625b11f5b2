//! Operator CLI for the card service.
//!
//! # Responsibility
//! - Load configuration, start logging and build the application context.
//! - Run one card use-case per invocation and print its envelope as JSON.

use anyhow::{Context, Result};
use cardbox_core::{
    core_version, init_logging, AddCardRequest, AppConfig, AppContext, DeleteCardRequest,
    Envelope, GetCardRequest, ListCardsRequest, RequestContext, UpdateCardRequest,
};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "cardbox", version, about = "Manage cards in the cardbox datastore")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CARDBOX_CONFIG", default_value = "config/cardbox.toml")]
    config: PathBuf,

    /// Abort the datastore call after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Correlation id attached to every log line of this call.
    #[arg(long)]
    request_id: Option<String>,

    /// Identity recorded on add/update/delete events.
    #[arg(long, env = "CARDBOX_CALLER")]
    caller: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Establish the datastore client and check liveness.
    Ping,
    /// Fetch one card.
    Get { card_id: String },
    /// List cards.
    List {
        /// Comma-separated `field:value` pairs (`status`, `title`).
        #[arg(long, default_value = "")]
        filter: String,
        /// `created_at`, `updated_at` or `title`.
        #[arg(long)]
        order_by: Option<String>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        page_num: Option<u32>,
    },
    /// Create a card.
    Add {
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        /// `#`-delimited tags, e.g. `work#urgent`.
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Change selected fields of a card.
    Update {
        card_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
    /// Soft-delete a card.
    Delete { card_id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    init_logging(config.logging.level(), config.logging.dir.as_deref())
        .context("initializing logging")?;
    info!(
        "event=cli_start module=cli status=ok core_version={} config={}",
        core_version(),
        cli.config.display()
    );

    let app = AppContext::new(config).context("building application context")?;

    let mut ctx = RequestContext::new();
    if let Some(request_id) = cli.request_id {
        ctx = ctx.with_request_id(request_id);
    }
    if let Some(caller) = cli.caller {
        ctx = ctx.with_caller(caller);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(timeout_ms));
    }

    let envelope = run(&app, &ctx, cli.command)?;
    println!("{}", envelope.encode()?);
    Ok(())
}

fn run(app: &AppContext, ctx: &RequestContext, command: Command) -> Result<Envelope> {
    let service = app.card_service();
    let envelope = match command {
        Command::Ping => {
            app.connections().get_client()?.ping(ctx)?;
            Envelope::empty()
        }
        Command::Get { card_id } => service.get_card(ctx, &GetCardRequest { card_id })?,
        Command::List {
            filter,
            order_by,
            page_size,
            page_num,
        } => service.list_cards(
            ctx,
            &ListCardsRequest {
                filter,
                order_by,
                page_size,
                page_num,
            },
        )?,
        Command::Add {
            title,
            content,
            tags,
        } => service.add_card(
            ctx,
            &AddCardRequest {
                title,
                content,
                tags,
            },
        )?,
        Command::Update {
            card_id,
            title,
            content,
            tags,
        } => service.update_card(
            ctx,
            &UpdateCardRequest {
                card_id,
                title,
                content,
                tags,
            },
        )?,
        Command::Delete { card_id } => service.delete_card(ctx, &DeleteCardRequest { card_id })?,
    };
    Ok(envelope)
}

//! Pipeline Board command line

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pipeline_backend::domain::{Deal, DealId, DomainError, DomainResult, Priority, Stage};
use pipeline_backend::repository::{open_store, DealStore, Repository, SharedDealStore};
use pipeline_backend::AppConfig;
use pipeline_board::board::MoveOutcome;
use pipeline_board::{BoardCache, BoardController, ToastQueue};

#[derive(Parser)]
#[command(name = "pipeline-board", version, about = "Sales pipeline kanban board")]
struct Cli {
    /// Config file (JSON); defaults are used when it does not exist
    #[arg(long, default_value = "pipeline.json")]
    config: PathBuf,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every column with its deals
    Board,
    /// Move a deal to a position in a stage
    Move {
        card_id: String,
        stage: String,
        index: usize,
    },
    /// Rewrite a stage's order values as 0..n-1
    Renumber { stage: String },
    /// Insert a small demo pipeline
    Seed,
    /// Write the effective configuration to the config file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = rolling_logger::init_logger(&cli.log_dir, "pipeline-board") {
        eprintln!("Logging disabled: {}", e);
    }

    if let Err(e) = run(cli).await {
        let _ = rolling_logger::error(&format!("{}", e));
        eprintln!("error [{}]: {}", e.kind(), e);
        std::process::exit(1);
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> DomainResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| DomainError::Internal(e.to_string()))
}

async fn run(cli: Cli) -> DomainResult<()> {
    let config = AppConfig::load(&cli.config)?.with_env_overrides();
    if let Command::Init = cli.command {
        config.save(&cli.config)?;
        println!("Wrote {}", cli.config.display());
        return Ok(());
    }

    let store = open_store(&config.store).await?;
    let _ = rolling_logger::info(&format!("Store ready ({})", cli.config.display()));

    let toasts = Arc::new(ToastQueue::new(config.board.toast_capacity));
    let controller = BoardController::new(
        store.clone(),
        Arc::new(BoardCache::new()),
        toasts.clone(),
        config.board.clone(),
    );

    match cli.command {
        Command::Board => {
            controller.load().await?;
            print_board(&controller);
        }
        Command::Move { card_id, stage, index } => {
            let report = controller
                .move_card(&DealId::new(card_id), &Stage::new(stage), index)
                .await;
            if let MoveOutcome::RolledBack(e) = &report.outcome {
                let _ = rolling_logger::warn(&format!("Move rolled back: {}", e));
            }
            println!("{}", to_json(&report)?);
            print_board(&controller);
        }
        Command::Renumber { stage } => {
            let changed = controller.renumber(&Stage::new(stage)).await?;
            println!("{} deals renumbered", changed);
        }
        // Written before the store is opened
        Command::Init => {}
        Command::Seed => {
            let created = seed(&store).await?;
            println!("{} deals created", created);
        }
    }

    for toast in toasts.drain() {
        let json =
            serde_json::to_string(&toast).map_err(|e| DomainError::Internal(e.to_string()))?;
        println!("{}", json);
    }
    Ok(())
}

fn print_board(controller: &BoardController) {
    for column in controller.columns() {
        println!("== {} ({} deals, {:.2}) ==", column.stage, column.len(), column.total_value());
        for deal in &column.deals {
            println!(
                "  [{:>4}] {} {} ({}, {:.2})",
                deal.order_index,
                deal.id,
                deal.title,
                deal.priority.as_str(),
                deal.value
            );
        }
    }
}

async fn seed(store: &SharedDealStore) -> DomainResult<usize> {
    let demo = [
        ("Website redesign", "lead", 4_500.0, Priority::Medium, "Ana Souza"),
        ("Annual support plan", "lead", 12_000.0, Priority::High, "Bruno Lima"),
        ("Mobile app pilot", "qualified", 30_000.0, Priority::High, "Carla Dias"),
        ("Data migration", "proposal", 8_200.0, Priority::Low, "Diego Alves"),
        ("Team training", "negotiation", 2_700.0, Priority::Medium, "Elisa Rocha"),
        ("CRM rollout", "won", 18_000.0, Priority::High, "Fabio Nunes"),
    ];

    let mut created = 0;
    for (title, stage, value, priority, contact) in demo {
        let stage = Stage::from(stage);
        let order_index = store.next_order_index(&stage).await?;
        let deal = Deal::new("", title, stage, order_index)
            .with_value(value)
            .with_priority(priority)
            .with_contact(contact);
        store.create(&deal).await?;
        created += 1;
    }
    Ok(created)
}

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::CountLogId;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/counter.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    ListLogs,
    AppendLog { message: String },
    DeleteLog { id: i64 },
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::ListLogs => {
            let logs = storage.list_count_logs().await?;
            for log in &logs {
                println!(
                    "{}\t{}\t{}",
                    log.id.0,
                    log.created_at.to_rfc3339(),
                    log.message
                );
            }
            println!("{} entries", logs.len());
        }
        Command::AppendLog { message } => {
            let id = storage.insert_count_log(&message).await?;
            println!("appended log_id={}", id.0);
        }
        Command::DeleteLog { id } => {
            if !storage.delete_count_log(CountLogId(id)).await? {
                bail!("no count log entry with id {id}");
            }
            println!("deleted log_id={id}");
        }
        Command::Health => {
            storage.health_check().await?;
            println!("ok");
        }
    }

    Ok(())
}

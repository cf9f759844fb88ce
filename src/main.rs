use clap::{Parser, Subcommand, builder::styling};
use elastic_index_tailer::cli;
use eyre::Result;
use owo_colors::OwoColorize;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Elastic Index Tailer: --{estail}-> follows an Elasticsearch index the way tail follows a file, with durable resume offsets
#[derive(Parser)]
#[command(name = "estail", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export documents from an index, resuming where the last run stopped
    Export {
        /// Directory holding export.yml; receives export.ndjson and offset.json
        #[arg(default_value = ".")]
        project_dir: String,

        /// Keep polling for new documents instead of stopping at the first empty page
        #[arg(short, long)]
        follow: bool,

        /// Seconds to wait between polls when following
        #[arg(long, default_value_t = 10, requires = "follow")]
        poll_seconds: u64,
    },

    /// Test authorization to an Elasticsearch remote
    Auth,

    /// List index names on the remote
    Indices {
        /// Only list indices starting with this prefix
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Force an index refresh so recent writes become searchable
    Refresh {
        /// The index to refresh
        index: String,
    },

    /// Show the persisted export offset
    Offset {
        /// Directory holding the offset.json file
        #[arg(default_value = ".")]
        project_dir: String,

        /// Delete the offset so the next export starts from the manifest
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::from_filename(&cli.env)?;

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    match cli.command {
        Commands::Export {
            project_dir,
            follow,
            poll_seconds,
        } => {
            log::info!(
                "Exporting {} documents from: {}",
                match follow {
                    true => "and following",
                    false => "new",
                }
                .cyan(),
                project_dir.bright_black(),
            );
            let poll = match follow {
                true => Some(poll_seconds),
                false => None,
            };
            cli::run_export(&project_dir, poll).await?;
        }
        Commands::Auth => {
            log::info!("Testing authorization");
            cli::check_auth().await?;
        }
        Commands::Indices { prefix } => {
            log::info!("Listing indices matching: {}", prefix.bright_black());
            cli::list_indices(&prefix).await?;
        }
        Commands::Refresh { index } => {
            log::info!("Refreshing index: {}", index.bright_black());
            cli::refresh_index(&index).await?;
        }
        Commands::Offset { project_dir, reset } => match reset {
            true => cli::reset_offset(&project_dir)?,
            false => cli::show_offset(&project_dir)?,
        },
    }

    Ok(())
}

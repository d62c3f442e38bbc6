//! Seqflow CLI — drive a remote sequential-workflow execution server.
//!
//! Reuses the core client (seqflow-core) for everything wire-facing; this
//! binary only parses arguments and formats output.

mod commands;

use clap::{Parser, Subcommand};

/// Seqflow CLI — sequential workflows on a remote execution server
#[derive(Parser)]
#[command(name = "seqflow", version, about = "Seqflow CLI — sequential workflows on a remote execution server")]
pub struct Cli {
    /// Base URL of the workflow server
    #[arg(
        long,
        env = "SEQFLOW_BASE_URL",
        default_value = "http://localhost:8080"
    )]
    base_url: String,

    /// Per-request timeout in seconds (also bounds a streaming response)
    #[arg(long, env = "SEQFLOW_TIMEOUT_SECS", default_value_t = 300)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// List available agents on the server
    Agents,

    /// Run a workflow from a YAML file
    Run {
        /// Path to the workflow YAML file
        file: String,
        /// Stream live progress instead of waiting for completion
        #[arg(long)]
        stream: bool,
        /// Input context as a JSON object string
        #[arg(long)]
        context: Option<String>,
        /// Override the file's workflow_id
        #[arg(long)]
        id: Option<String>,
        /// Show per-step outputs in the final summary
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Validate a workflow YAML file without executing it
    Validate {
        /// Path to the workflow YAML file
        file: String,
    },

    /// List workflows registered on the server
    List,

    /// Show execution status for a workflow
    Status {
        /// Workflow id
        workflow_id: String,
    },

    /// Fetch the last execution result for a workflow
    Result {
        /// Workflow id
        workflow_id: String,
    },

    /// Cancel a running workflow
    Cancel {
        /// Workflow id
        workflow_id: String,
    },

    /// Remove a registered workflow
    Unregister {
        /// Workflow id
        workflow_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seqflow_core=warn,seqflow_cli=info".into()),
        )
        .init();

    let mut client = commands::init_client(&cli.base_url, cli.timeout_secs);

    let result = match cli.command {
        Commands::Health => commands::agents::health(&client).await,
        Commands::Agents => commands::agents::list(&mut client).await,
        Commands::Run {
            file,
            stream,
            context,
            id,
            verbose,
        } => {
            commands::run::run(
                &mut client,
                &file,
                stream,
                context.as_deref(),
                id.as_deref(),
                verbose,
            )
            .await
        }
        Commands::Validate { file } => commands::run::validate(&file).await,
        Commands::List => commands::workflows::list(&client).await,
        Commands::Status { workflow_id } => {
            commands::workflows::status(&client, &workflow_id).await
        }
        Commands::Result { workflow_id } => {
            commands::workflows::result(&client, &workflow_id).await
        }
        Commands::Cancel { workflow_id } => {
            commands::workflows::cancel(&client, &workflow_id).await
        }
        Commands::Unregister { workflow_id } => {
            commands::workflows::unregister(&client, &workflow_id).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod client;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use client::ReconClient;
use commands::run::RunOptions;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the reconnoiter server
    #[arg(long, env = "RECONNOITER_ENDPOINT", default_value = "http://127.0.0.1:8000", global = true)]
    endpoint: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the agents the server exposes
    Agents,

    /// Send a message to an agent and print its answer
    Run {
        message: String,

        #[arg(short, long, default_value = "Mr. Burnham")]
        agent: String,

        /// Backend model, e.g. gemini-2.0-flash
        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        session_id: Option<String>,

        /// UTF-8 text files whose contents are sent along with the message
        #[arg(long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,

        /// Mime type of the attached files, text/plain when omitted
        #[arg(long, requires = "attachments")]
        mime_type: Option<String>,

        /// Wait for the final answer instead of streaming chunks
        #[arg(long)]
        no_stream: bool,

        /// Print every chunk as raw JSON
        #[arg(long)]
        raw: bool,
    },

    /// Print the CLI version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ReconClient::new(cli.endpoint)?;

    match cli.command {
        Command::Agents => commands::agents::execute(&client).await,
        Command::Run {
            message,
            agent,
            model,
            user_id,
            session_id,
            attachments,
            mime_type,
            no_stream,
            raw,
        } => {
            let options = RunOptions {
                agent,
                model,
                user_id,
                session_id,
                attachments,
                mime_type,
                stream: !no_stream,
                raw,
            };
            commands::run::execute(&client, &message, options).await
        }
        Command::Version => commands::version::execute().await,
    }
}

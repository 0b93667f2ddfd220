// Chatdesk - chat front-end over a locally hosted model
// Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use chatdesk::config::load_config;
use chatdesk::publish::{GitLogPublisher, LogPublisher};
use chatdesk::server;
use chatdesk::ChatApp;

#[derive(Parser)]
#[command(name = "chatdesk", version, about = "Chat front-end over a locally hosted model")]
struct Cli {
    /// Config file (default: ~/.chatdesk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the chat server (default)
    Serve {
        /// Override server.bind_address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Fetch the model bundle if absent, then exit
    Provision,
    /// Publish one log file to the log repository, then exit
    Publish {
        #[arg(long)]
        log: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (RUST_LOG wins over --debug)
    let default_filter = if cli.debug {
        "chatdesk=debug,tower_http=debug"
    } else {
        "chatdesk=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            let bind_address = config.server.bind_address.clone();
            let app = Arc::new(ChatApp::from_config(config));

            // Nothing to serve without the model bundle
            app.provision().await.context("Startup aborted")?;

            server::serve(app, &bind_address).await
        }
        Command::Provision => {
            let app = ChatApp::from_config(config);
            app.provision().await?;
            eprintln!("✓ Model bundle ready");
            Ok(())
        }
        Command::Publish { log } => {
            let publisher = GitLogPublisher::from_config(&config.publish)
                .context("publish.repo_url (or CHATDESK_LOG_REPO_URL) is not set")?;
            publisher.publish(&log).await?;
            eprintln!("✓ Published {}", log.display());
            Ok(())
        }
    }
}

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use flowsync_rs::config::Settings;
use flowsync_rs::coordinator::{BroadcastReporter, LogReporter, SaveCoordinator};
use flowsync_rs::flow::{FlowDraft, FlowId, FlowMeta};
use flowsync_rs::server::{self, AppState};
use flowsync_rs::store::{FlowStore, HttpFlowStore};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional YAML settings file (environment overrides it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve an editing session over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Save a flow draft file to the remote store
    Save {
        /// Path to the draft (YAML or JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Display name of the flow
        #[arg(short, long)]
        name: String,

        /// Description of the flow
        #[arg(short, long, default_value = "")]
        description: String,

        /// Make the flow visible to other users
        #[arg(long)]
        public: bool,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Fetch a persisted flow and print it
    Show {
        /// Identifier assigned by the store
        #[arg(long)]
        flow_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    let store = Arc::new(HttpFlowStore::from_settings(&settings)?);

    if !store.is_configured() {
        log::warn!("FLOW_API_BASE_URL is not set; saves will fail until it is configured");
    }

    match args.command {
        Commands::Serve { port } => {
            let events = BroadcastReporter::new(64);
            let coordinator =
                SaveCoordinator::from_settings(&settings, store, Arc::new(events.clone()));

            log::info!(
                "Editing session {} (auto-save {}, debounce {:?})",
                coordinator.session_id(),
                if settings.auto_save { "on" } else { "off" },
                settings.debounce()
            );

            let state = AppState {
                coordinator,
                events,
            };
            server::serve(port.unwrap_or(settings.port), state).await?;
        }
        Commands::Save {
            file,
            name,
            description,
            public,
            tags,
        } => {
            let draft = FlowDraft::load(&file)?;
            log::info!(
                "Loaded draft {:?}: {} nodes, {} edges",
                file,
                draft.graph.node_count(),
                draft.graph.edge_count()
            );

            let coordinator =
                SaveCoordinator::from_settings(&settings, store, Arc::new(LogReporter));
            if let Some(user_id) = draft.user_id {
                coordinator.set_user(Some(user_id)).await;
            }
            // Explicit save only; the draft is not edited further
            coordinator.set_auto_save(false).await;
            coordinator.set_scenario(draft.scenario).await;
            coordinator.set_graph(draft.graph).await;

            let meta = FlowMeta::new(name)
                .with_description(description)
                .public(public)
                .with_tags(tags);

            let response = coordinator.save_flow(&meta).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Show { flow_id } => {
            let record = store.fetch(&FlowId::from(flow_id)).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

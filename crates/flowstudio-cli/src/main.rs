//! Flowstudio CLI - edit local flows from the terminal.
//!
//! - `flowstudio flows` - create, list, rename and delete flows
//! - `flowstudio show` / `add-node` / `connect` / ... - edit one flow
//! - `flowstudio configure` - fill a node's form from a field schema
//! - `flowstudio watch` - follow external edits to a flow document
//! - `flowstudio remote` - talk to the hosted backend

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::{fmt, EnvFilter};

use flowstudio_core::backend::{BackendApi, HttpBackend};
use flowstudio_core::forms::{FieldSchema, FormState, RequiredFields, SubmitOutcome};
use flowstudio_core::graph::{FrontmatterPatch, NodeChange};
use flowstudio_core::{FlowCatalog, FlowSession, Position, StudioConfig, SyncOutcome};

#[derive(Parser)]
#[command(name = "flowstudio")]
#[command(about = "Local-first flow editor", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a project config
    Init,

    /// Flow management
    Flows {
        #[command(subcommand)]
        command: FlowCommands,
    },

    /// Print a flow's frontmatter, nodes and edges
    Show {
        flow: String,

        /// Print the raw document instead
        #[arg(long)]
        raw: bool,
    },

    /// Add a node
    AddNode {
        flow: String,
        node_type: String,

        #[arg(long, default_value_t = 0.0)]
        x: f64,

        #[arg(long, default_value_t = 0.0)]
        y: f64,

        /// Node data as a JSON object
        #[arg(long)]
        data: Option<String>,
    },

    /// Connect two nodes
    Connect {
        flow: String,
        source: String,
        target: String,

        #[arg(long)]
        source_handle: Option<String>,

        #[arg(long)]
        target_handle: Option<String>,
    },

    /// Remove a node and its edges
    RmNode { flow: String, id: String },

    /// Move a node
    Move {
        flow: String,
        id: String,
        x: f64,
        y: f64,
    },

    /// Update flow settings
    Set {
        flow: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        active: Option<bool>,

        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Fill a node's configuration form
    Configure {
        flow: String,
        node: String,

        /// JSON file with the node's field schema (a list of fields)
        #[arg(long)]
        schema: PathBuf,

        /// field=value edits, applied in order
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        values: Vec<String>,
    },

    /// Follow changes to a flow document until interrupted
    Watch { flow: String },

    /// Hosted backend
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
}

#[derive(Subcommand)]
enum FlowCommands {
    /// List flows
    Ls,

    /// Create a flow
    New { name: String },

    /// Rename a flow
    Rename { from: String, to: String },

    /// Delete a flow
    Rm { name: String },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// List workflows of the configured account
    Ls,

    /// Register a local flow with the backend and record its id
    Push {
        flow: String,

        #[arg(long, default_value = "")]
        description: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if let Commands::Init = cli.command {
        return init_project(&project_root);
    }

    let mut config = StudioConfig::load_from_project(&project_root)?;
    config.resolve_paths(&project_root);

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Flows { command } => handle_flows(&config, command).await,
        Commands::Show { flow, raw } => show_flow(&config, &flow, raw).await,
        Commands::AddNode {
            flow,
            node_type,
            x,
            y,
            data,
        } => {
            let payload = match data {
                Some(text) => serde_json::from_str(&text).context("--data is not valid JSON")?,
                None => Value::Object(Map::new()),
            };
            edit(&config, &flow, |session| {
                let id = session.add_node(&node_type, Position::new(x, y), payload);
                println!("Added node {}", id);
                Ok(())
            })
            .await
        }
        Commands::Connect {
            flow,
            source,
            target,
            source_handle,
            target_handle,
        } => {
            edit(&config, &flow, |session| {
                for id in [&source, &target] {
                    if session.graph().node(id).is_none() {
                        bail!("No node '{}' in flow '{}'", id, flow);
                    }
                }
                match session.connect(&source, &target, source_handle, target_handle) {
                    Some(id) => println!("Added edge {}", id),
                    None => println!("Connection rejected by edge policy"),
                }
                Ok(())
            })
            .await
        }
        Commands::RmNode { flow, id } => {
            edit(&config, &flow, |session| {
                if session.graph().node(&id).is_none() {
                    bail!("No node '{}' in flow '{}'", id, flow);
                }
                let before = session.graph().edges().len();
                session.apply_node_changes(&[NodeChange::Remove { id: id.clone() }]);
                let dropped = before - session.graph().edges().len();
                println!("Removed node {} ({} edges)", id, dropped);
                Ok(())
            })
            .await
        }
        Commands::Move { flow, id, x, y } => {
            edit(&config, &flow, |session| {
                if session.graph().node(&id).is_none() {
                    bail!("No node '{}' in flow '{}'", id, flow);
                }
                session.apply_node_changes(&[NodeChange::Position {
                    id: id.clone(),
                    position: Some(Position::new(x, y)),
                    dragging: Some(false),
                }]);
                Ok(())
            })
            .await
        }
        Commands::Set {
            flow,
            name,
            active,
            version,
            description,
        } => {
            let patch = FrontmatterPatch {
                name,
                active,
                version,
                flow_id: None,
                description,
            };
            edit(&config, &flow, |session| {
                if !session.update_frontmatter(patch) {
                    println!("Nothing changed");
                }
                Ok(())
            })
            .await
        }
        Commands::Configure {
            flow,
            node,
            schema,
            values,
        } => configure_node(&config, &flow, &node, &schema, &values).await,
        Commands::Watch { flow } => watch_flow(&config, &flow).await,
        Commands::Remote { command } => handle_remote(&config, command).await,
    }
}

/// Load a flow, apply `f`, and wait for the resulting writes.
async fn edit<F>(config: &StudioConfig, flow: &str, f: F) -> Result<()>
where
    F: FnOnce(&mut FlowSession) -> Result<()>,
{
    let catalog = FlowCatalog::new(config);
    let mut session = FlowSession::new(catalog.location(flow)?, config);
    session.load().await?;
    let result = f(&mut session);
    session.close().await;
    result
}

async fn handle_flows(config: &StudioConfig, command: FlowCommands) -> Result<()> {
    let catalog = FlowCatalog::new(config);

    match command {
        FlowCommands::Ls => {
            let entries = catalog.list().await?;
            println!("Flows: {}", entries.len());
            for entry in entries {
                match &entry.flow {
                    Some(flow) => println!(
                        "  {} - {} nodes, {} edges, active: {}, version: {}",
                        entry.name, entry.nodes, entry.edges, flow.active, flow.version
                    ),
                    None => println!("  {} - (no readable document)", entry.name),
                }
            }
        }
        FlowCommands::New { name } => {
            let location = catalog.create(&name).await?;
            println!("Created {}", location.document_path().display());
        }
        FlowCommands::Rename { from, to } => {
            let location = catalog.rename(&from, &to).await?;
            println!("Renamed to {}", location.flow_dir().display());
        }
        FlowCommands::Rm { name } => {
            catalog.delete(&name).await?;
            println!("Deleted {}", name);
        }
    }

    Ok(())
}

async fn show_flow(config: &StudioConfig, flow: &str, raw: bool) -> Result<()> {
    let catalog = FlowCatalog::new(config);
    let mut session = FlowSession::new(catalog.location(flow)?, config);
    session.load().await?;

    if raw {
        print!("{}", session.document_text());
        session.close().await;
        return Ok(());
    }

    let graph = session.graph();
    let meta = graph.frontmatter();
    println!("Flow: {}", meta.name);
    println!("====================");
    println!("Active: {}", meta.active);
    println!("Version: {}", meta.version);
    if let Some(flow_id) = &meta.flow_id {
        println!("Remote id: {}", flow_id);
    }
    if let Some(description) = &meta.description {
        println!("Description: {}", description);
    }
    println!();
    println!("Nodes: {}", graph.nodes().len());
    for node in graph.nodes() {
        println!(
            "  {} [{}] {} at ({}, {})",
            node.id, node.node_type, node.data.label, node.position.x, node.position.y
        );
    }
    println!();
    println!("Edges: {}", graph.edges().len());
    for edge in graph.edges() {
        println!("  {}: {} -> {}", edge.id, edge.source, edge.target);
    }

    session.close().await;
    Ok(())
}

async fn configure_node(
    config: &StudioConfig,
    flow: &str,
    node_id: &str,
    schema_path: &Path,
    edits: &[String],
) -> Result<()> {
    let text = std::fs::read_to_string(schema_path)
        .with_context(|| format!("Failed to read schema from {}", schema_path.display()))?;
    let fields: Vec<FieldSchema> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse schema from {}", schema_path.display()))?;

    edit(config, flow, |session| {
        let node = session
            .graph()
            .node(node_id)
            .with_context(|| format!("No node '{}' in flow '{}'", node_id, flow))?;
        let stored: Map<String, Value> = node.data.config.clone().into_iter().collect();

        let mut form = FormState::new(node_id, fields, &stored);
        let schema = form.fields().to_vec();
        let validator = RequiredFields::new(&schema);

        for entry in edits {
            let (field, value) = entry
                .split_once('=')
                .with_context(|| format!("Expected FIELD=VALUE, got '{}'", entry))?;
            if !form.change(field, value, &validator) {
                tracing::warn!(field, "Edit ignored");
            }
        }

        let mut submitted = None;
        match form.submit(&validator, |values| submitted = Some(values)) {
            SubmitOutcome::Submitted => {}
            SubmitOutcome::Invalid(errors) => {
                for (field, message) in &errors {
                    eprintln!("  {}: {}", field, message);
                }
                bail!("{} field(s) failed validation", errors.len());
            }
            SubmitOutcome::Disabled => bail!("Form is disabled"),
        }

        if let Some(values) = submitted {
            session.update_node_data(node_id, Value::Object(values));
            println!("Updated node {}", node_id);
        }
        Ok(())
    })
    .await
}

async fn watch_flow(config: &StudioConfig, flow: &str) -> Result<()> {
    let catalog = FlowCatalog::new(config);
    let mut session = FlowSession::open(catalog.location(flow)?, config).await?;
    println!(
        "Watching {} (Ctrl-C to stop)",
        session.location().document_path().display()
    );

    loop {
        let outcome = tokio::select! {
            outcome = session.follow() => outcome,
            _ = tokio::signal::ctrl_c() => None,
        };
        match outcome {
            Some(SyncOutcome::Applied) => {
                let graph = session.graph();
                println!(
                    "Reloaded: {} nodes, {} edges",
                    graph.nodes().len(),
                    graph.edges().len()
                );
            }
            Some(SyncOutcome::Unchanged) => {}
            Some(SyncOutcome::Rejected) => println!("Ignored an unreadable document"),
            None => break,
        }
    }

    session.close().await;
    Ok(())
}

async fn handle_remote(config: &StudioConfig, command: RemoteCommands) -> Result<()> {
    let backend = HttpBackend::from_config(&config.backend)?;
    let account = config
        .backend
        .account_id
        .as_deref()
        .context("backend.account_id is not configured")?;

    match command {
        RemoteCommands::Ls => {
            let flows = backend.list_flows(account).await?;
            println!("Remote workflows: {}", flows.len());
            for flow in flows {
                println!("  {} - {} (active: {})", flow.workflow_id, flow.name, flow.active);
            }
        }
        RemoteCommands::Push { flow, description } => {
            let record = backend
                .create_flow(account, &flow, &description, "default")
                .await?;
            let flow_id = record.workflow_id.clone();
            edit(config, &flow, |session| {
                session.update_frontmatter(FrontmatterPatch {
                    flow_id: Some(flow_id),
                    ..FrontmatterPatch::default()
                });
                Ok(())
            })
            .await?;
            println!("Registered {} as {}", flow, record.workflow_id);
        }
    }

    Ok(())
}

fn init_project(project_root: &Path) -> Result<()> {
    let config_dir = project_root.join(".flowstudio");
    std::fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.yaml");
    if !config_path.exists() {
        let default_config = r#"# Flowstudio Configuration

documents_root: documents
flows_dir: flows
document_name: flow.toml

watch:
  debounce_ms: 50
  poll_interval_ms: 100

edges:
  allow_duplicates: true
  allow_self_loops: true

backend:
  # base_url: https://api.example.com/v1
  api_key_env: FLOWSTUDIO_API_KEY
  # account_id: your-account
"#;
        std::fs::write(&config_path, default_config)?;
    }

    println!("Initialized Flowstudio project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .flowstudio/config.yaml - studio configuration");
    println!();
    println!("Next steps:");
    println!("  1. Run: flowstudio flows new my-flow");
    println!("  2. Run: flowstudio add-node my-flow trigger");

    Ok(())
}

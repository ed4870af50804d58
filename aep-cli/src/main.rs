//! `aep`: a demonstration command-line binary wiring the Agent Environment
//! Protocol capability broker core ([`aep_core`]) to its MCP bridge
//! ([`aep_mcp`]) and default subprocess collaborators ([`aep_runtime`]).
//!
//! Subcommands mirror the capability handlers one-to-one; `aep repl` drives
//! an interactive [`aep_core::Session`] loop over stdin, the same
//! command-interpreter surface an agent harness would script against.

mod config;
mod error;

use aep_core::binder::WorkspaceBinder;
use aep_core::error::AepError;
use aep_core::handlers::{LibrariesHandler, SkillsHandler, ToolsHandler};
use aep_core::provisioner::Provisioner;
use aep_core::store::ConfigStore;
use aep_mcp::McpHandler;
use aep_runtime::{PythonInterpreter, UvInstaller};
use clap::{Parser, Subcommand};
use config::CliConfig;
use error::{CliError, CliResult};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "aep", about = "Agent Environment Protocol capability broker")]
struct Cli {
    /// Path to an `aep.toml` configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Attach the capability config store to a workspace directory.
    Attach {
        /// Workspace directory to bind.
        workspace: PathBuf,
    },
    /// Detach the capability config store from a workspace directory.
    Detach {
        /// Workspace directory to unbind.
        workspace: PathBuf,
    },
    /// Manage plain tool modules.
    Tools {
        #[command(subcommand)]
        action: CapabilityAction,
    },
    /// Manage skill directories.
    Skills {
        #[command(subcommand)]
        action: CapabilityAction,
    },
    /// Manage library reference items.
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
    /// Manage configured MCP servers.
    Mcp {
        #[command(subcommand)]
        action: McpAction,
    },
    /// Run an interactive command-interpreter session over a workspace.
    Repl {
        /// Workspace directory, previously attached via `aep attach`.
        workspace: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum CapabilityAction {
    /// Add a tool or skill from `source`.
    Add {
        /// File or directory to install.
        source: PathBuf,
        /// Override the installed name (defaults to the source's basename).
        #[arg(long)]
        name: Option<String>,
        /// Dependency specifiers to provision alongside it.
        #[arg(long = "dep")]
        dependencies: Vec<String>,
    },
    /// List installed names.
    List,
    /// Remove an installed capability.
    Remove {
        /// Name to remove.
        name: String,
    },
    /// Print documentation for one capability.
    Info {
        /// Name to describe.
        name: String,
    },
}

#[derive(Debug, Subcommand)]
enum LibraryAction {
    /// Add a reference document.
    Add {
        /// File to install.
        source: PathBuf,
        /// Override the installed name (defaults to the source's basename).
        #[arg(long)]
        name: Option<String>,
    },
    /// List installed names.
    List,
    /// Remove an installed library item.
    Remove {
        /// Name to remove.
        name: String,
    },
}

#[derive(Debug, Subcommand)]
enum McpAction {
    /// Register a stdio-launched MCP server.
    AddStdio {
        /// Server name.
        name: String,
        /// Launcher command and arguments, e.g. `npx -y some-server`.
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
        /// Environment variables for the launched process (`KEY=VALUE`).
        #[arg(long = "env")]
        env: Vec<String>,
    },
    /// Register a streamable-HTTP MCP server.
    AddHttp {
        /// Server name.
        name: String,
        /// Server URL.
        url: String,
        /// Extra HTTP headers (`Key: Value`).
        #[arg(long = "header")]
        headers: Vec<String>,
    },
    /// Re-run discovery against a configured server and regenerate its stub.
    Refresh {
        /// Server name.
        name: String,
    },
    /// Remove a configured server and its generated stub.
    Remove {
        /// Server name.
        name: String,
    },
    /// List configured server names.
    List,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("aep.toml"));
    let config = CliConfig::load(&config_path)?;
    init_tracing(&config);

    let mut store = ConfigStore::open(&config.config_root);
    store.ensure_directories()?;

    let installer = Arc::new(if let Some(uv_bin) = &config.uv_bin {
        UvInstaller::with_binary(uv_bin.clone())
    } else {
        UvInstaller::discover().map_err(CliError::InstallerUnavailable)?
    });
    let provisioner = Provisioner::new(installer);

    match cli.command {
        Command::Attach { workspace } => {
            let handle = WorkspaceBinder::attach(&workspace, store, &config.protocol_dir)?;
            println!("attached {}", handle.workspace().display());
        }
        Command::Detach { workspace } => {
            let handle = WorkspaceBinder::attach(&workspace, store, &config.protocol_dir)?;
            handle.detach()?;
            println!("detached {}", workspace.display());
        }
        Command::Tools { action } => run_tools(&store, &provisioner, action).await?,
        Command::Skills { action } => run_skills(&store, &provisioner, action).await?,
        Command::Library { action } => run_library(&store, action)?,
        Command::Mcp { action } => run_mcp(&store, action).await?,
        Command::Repl { workspace } => run_repl(store, &workspace, &config.protocol_dir).await?,
    }

    Ok(())
}

fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run_tools(store: &ConfigStore, provisioner: &Provisioner, action: CapabilityAction) -> CliResult<()> {
    let handler = ToolsHandler::new(store, provisioner);
    match action {
        CapabilityAction::Add { source, name, dependencies } => {
            let dest = handler.add(&source, name.as_deref(), &dependencies).await?;
            handler.generate_index()?;
            println!("installed {}", dest.display());
        }
        CapabilityAction::List => {
            for name in handler.list()? {
                println!("{name}");
            }
        }
        CapabilityAction::Remove { name } => {
            handler.remove(&name)?;
            handler.generate_index()?;
            println!("removed {name}");
        }
        CapabilityAction::Info { name } => match handler.doc_sidecar(&name)? {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|e| CliError::io(&path, e))?;
                println!("{contents}");
            }
            None => println!("(no documentation recorded for '{name}')"),
        },
    }
    Ok(())
}

async fn run_skills(store: &ConfigStore, provisioner: &Provisioner, action: CapabilityAction) -> CliResult<()> {
    let handler = SkillsHandler::new(store, provisioner);
    match action {
        CapabilityAction::Add { source, name, dependencies } => {
            let dest = handler.add(&source, name.as_deref(), &dependencies).await?;
            handler.generate_index()?;
            println!("installed {}", dest.display());
        }
        CapabilityAction::List => {
            for name in handler.list()? {
                println!("{name}");
            }
        }
        CapabilityAction::Remove { name } => {
            handler.remove(&name)?;
            handler.generate_index()?;
            println!("removed {name}");
        }
        CapabilityAction::Info { name } => {
            let dir = store.path_of(aep_core::store::Kind::Skill, &name);
            let skill_md = dir.join("SKILL.md");
            if skill_md.is_file() {
                println!("{}", std::fs::read_to_string(&skill_md).map_err(|e| CliError::io(&skill_md, e))?);
            } else {
                return Err(CliError::Core(AepError::NotFound {
                    kind: aep_core::error::CapabilityKind::Skill,
                    name,
                }));
            }
        }
    }
    Ok(())
}

fn run_library(store: &ConfigStore, action: LibraryAction) -> CliResult<()> {
    let handler = LibrariesHandler::new(store);
    match action {
        LibraryAction::Add { source, name } => {
            let dest = handler.add(&source, name.as_deref())?;
            handler.generate_index()?;
            println!("installed {}", dest.display());
        }
        LibraryAction::List => {
            for name in handler.list()? {
                println!("{name}");
            }
        }
        LibraryAction::Remove { name } => {
            handler.remove(&name)?;
            handler.generate_index()?;
            println!("removed {name}");
        }
    }
    Ok(())
}

async fn run_mcp(store: &ConfigStore, action: McpAction) -> CliResult<()> {
    let handler = McpHandler::new(store);
    match action {
        McpAction::AddStdio { name, command, env } => {
            let env = parse_assignments(&env);
            let path = handler.add_stdio(&name, command, (!env.is_empty()).then_some(env)).await?;
            println!("stub written to {}", path.display());
        }
        McpAction::AddHttp { name, url, headers } => {
            let headers = parse_assignments(&headers);
            let path = handler.add_http(&name, url, (!headers.is_empty()).then_some(headers)).await?;
            println!("stub written to {}", path.display());
        }
        McpAction::Refresh { name } => {
            let path = handler.refresh(&name).await?;
            println!("stub refreshed at {}", path.display());
        }
        McpAction::Remove { name } => {
            handler.remove(&name)?;
            println!("removed {name}");
        }
        McpAction::List => {
            for name in store.list_mcp_servers()? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

async fn run_repl(store: ConfigStore, workspace: &std::path::Path, protocol_dir: &str) -> CliResult<()> {
    let handle = WorkspaceBinder::attach(workspace, store, protocol_dir)?;
    let interpreter = Arc::new(PythonInterpreter::new());
    let mut session = handle.create_session(interpreter);

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("aep> ");
        std::io::stdout().flush().map_err(|e| CliError::io("<stdout>", e))?;
        line.clear();
        let bytes_read = stdin.read_line(&mut line).map_err(|e| CliError::io("<stdin>", e))?;
        if bytes_read == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }
        let result = session.exec(trimmed).await;
        if !result.stdout.is_empty() {
            println!("{}", result.stdout);
        }
        if !result.stderr.is_empty() {
            eprintln!("{}", result.stderr);
        }
    }
    Ok(())
}

fn parse_assignments(entries: &[String]) -> HashMap<String, String> {
    entries
        .iter()
        .filter_map(|entry| entry.split_once(['=', ':']))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

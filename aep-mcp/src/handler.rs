//! MCP handler (§4.4): the public orchestrator over discovery and stub
//! compilation, returning the same `aep_core::AepError` surface as the
//! capability handlers in `aep-core`.

use crate::discovery;
use aep_core::error::{AepError, AepResult, CapabilityKind};
use aep_core::model::{McpServerRecord, Transport};
use aep_core::store::{ConfigStore, Kind};
use std::collections::HashMap;
use std::path::PathBuf;

/// Installation hints surfaced with [`AepError::PrerequisiteMissing`] for
/// the handful of stdio launchers an agent is likely to configure.
fn launcher_hint(command: &str) -> String {
    match command {
        "npx" | "node" => "install Node.js (https://nodejs.org)".to_string(),
        "uvx" | "uv" => "install uv (https://docs.astral.sh/uv/)".to_string(),
        "python" | "python3" => "install Python 3".to_string(),
        other => format!("ensure '{other}' is installed and on PATH"),
    }
}

/// Orchestrates `add`/`refresh`/`remove` for MCP servers: persisting the
/// record, connecting to discover tools, and writing the generated stub.
pub struct McpHandler<'a> {
    store: &'a ConfigStore,
}

impl<'a> McpHandler<'a> {
    /// Builds a handler bound to the given store.
    #[must_use]
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    fn stub_path(&self, name: &str) -> PathBuf {
        self.store.kind_dir(Kind::Tool).join(format!("{name}.py"))
    }

    /// Registers a stdio MCP server, probing that `command[0]` resolves on
    /// `PATH` before attempting a connection.
    #[tracing::instrument(skip(self, command, env))]
    pub async fn add_stdio(
        &self,
        name: &str,
        command: Vec<String>,
        env: Option<HashMap<String, String>>,
    ) -> AepResult<PathBuf> {
        let launcher = command.first().cloned().unwrap_or_default();
        if which::which(&launcher).is_err() {
            return Err(AepError::PrerequisiteMissing {
                command: launcher.clone(),
                hint: launcher_hint(&launcher),
            });
        }
        let record = McpServerRecord {
            name: name.to_string(),
            transport: Transport::Stdio,
            command: Some(command),
            env,
            url: None,
            headers: None,
            tools: Vec::new(),
        };
        self.add(record).await
    }

    /// Registers an HTTP/streamable MCP server.
    #[tracing::instrument(skip(self, headers))]
    pub async fn add_http(
        &self,
        name: &str,
        url: String,
        headers: Option<HashMap<String, String>>,
    ) -> AepResult<PathBuf> {
        let record = McpServerRecord {
            name: name.to_string(),
            transport: Transport::Http,
            command: None,
            env: None,
            url: Some(url),
            headers,
            tools: Vec::new(),
        };
        self.add(record).await
    }

    async fn add(&self, mut record: McpServerRecord) -> AepResult<PathBuf> {
        record
            .validate_transport_args()
            .map_err(AepError::BadRunSyntax)?;

        // Persist the `tools: []` placeholder record before discovery, per
        // §4.4 step 3: a failed discovery still leaves a record behind so a
        // later `refresh` is meaningful.
        self.store.save_mcp_record(&record)?;

        let tools = discovery::discover(&record)
            .await
            .map_err(|e| AepError::DiscoveryFailed { cause: e.to_string() })?;
        record.tools = tools;
        self.store.save_mcp_record(&record)?;

        let stub_source = crate::stub::compile(&record);
        let stub_path = self.stub_path(&record.name);
        std::fs::write(&stub_path, stub_source).map_err(|e| AepError::io(&stub_path, e))?;

        tracing::info!(server = %record.name, tools = record.tools.len(), "MCP server added");
        Ok(stub_path)
    }

    /// Re-runs discovery against a previously stored record and regenerates
    /// its stub.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, name: &str) -> AepResult<PathBuf> {
        let mut record = self
            .store
            .load_mcp_record(name)?
            .ok_or_else(|| AepError::NotFound { kind: CapabilityKind::McpServer, name: name.to_string() })?;

        let tools = discovery::discover(&record)
            .await
            .map_err(|e| AepError::DiscoveryFailed { cause: e.to_string() })?;
        record.tools = tools;
        self.store.save_mcp_record(&record)?;

        let stub_source = crate::stub::compile(&record);
        let stub_path = self.stub_path(name);
        std::fs::write(&stub_path, stub_source).map_err(|e| AepError::io(&stub_path, e))?;
        Ok(stub_path)
    }

    /// Removes an MCP server's record and its generated stub.
    pub fn remove(&self, name: &str) -> AepResult<()> {
        self.store.remove_mcp_record(name)?;
        let stub_path = self.stub_path(name);
        if stub_path.is_file() {
            std::fs::remove_file(&stub_path).map_err(|e| AepError::io(&stub_path, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_stdio_with_unresolvable_launcher_is_prerequisite_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        let handler = McpHandler::new(&store);
        let result = handler
            .add_stdio(
                "ghost",
                vec!["definitely-not-a-real-launcher-binary".to_string()],
                None,
            )
            .await;
        assert!(matches!(result, Err(AepError::PrerequisiteMissing { .. })));
    }

    #[tokio::test]
    async fn add_http_without_url_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        let handler = McpHandler::new(&store);
        let result = handler.add_http("broken", String::new(), None).await;
        assert!(matches!(result, Err(AepError::BadRunSyntax(_))));
    }

    #[tokio::test]
    async fn remove_without_existing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        let handler = McpHandler::new(&store);
        let result = handler.remove("absent");
        assert!(matches!(result, Err(AepError::NotFound { kind: CapabilityKind::McpServer, .. })));
    }
}

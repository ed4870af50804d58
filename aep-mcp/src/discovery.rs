//! MCP discovery protocol (§4.4.1): connect, `initialize`, `tools/list`,
//! disconnect. One short-lived session per discovery attempt — no
//! connection pooling, matching the broker's short-lived-session policy.

use crate::error::{McpBridgeError, McpBridgeResult};
use aep_core::model::{McpServerRecord, ToolDescriptor, Transport};
use rmcp::model::{ClientCapabilities, ClientInfo, Implementation};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransport, StreamableHttpClientTransportConfig,
};
use rmcp::ServiceExt;
use tokio::process::Command;

type Session = RunningService<RoleClient, ClientInfo>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "aep".to_string(),
            title: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            icons: None,
            website_url: None,
        },
    }
}

fn convert_tool(tool: rmcp::model::Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.unwrap_or_default().to_string(),
        input_schema: serde_json::to_value(tool.input_schema).unwrap_or_else(|_| serde_json::json!({})),
    }
}

/// Connects to the server described by `record`, runs `initialize` +
/// `tools/list`, and closes the session. Returns the discovered tools.
///
/// `list_tools` failing after a successful `initialize` is logged but not
/// fatal — the caller still gets an empty tool list and the stub compiler
/// falls back to a generic `call` entry point, per §4.4.1.
#[tracing::instrument(skip(record), fields(server = %record.name))]
pub async fn discover(record: &McpServerRecord) -> McpBridgeResult<Vec<ToolDescriptor>> {
    match record.transport {
        Transport::Stdio => discover_stdio(record).await,
        Transport::Http => discover_http(record).await,
    }
}

async fn discover_stdio(record: &McpServerRecord) -> McpBridgeResult<Vec<ToolDescriptor>> {
    let command = record
        .command
        .as_ref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| McpBridgeError::InvalidRecord("stdio transport requires a command".to_string()))?;

    let mut cmd = Command::new(&command[0]);
    cmd.args(&command[1..]);
    if let Some(env) = &record.env {
        for (key, value) in env {
            cmd.env(key, value);
        }
    }

    let transport = TokioChildProcess::new(cmd).map_err(|e| McpBridgeError::Connect {
        server: record.name.clone(),
        cause: e.to_string(),
    })?;

    let service = client_info()
        .serve(transport)
        .await
        .map_err(|e| McpBridgeError::Connect {
            server: record.name.clone(),
            cause: e.to_string(),
        })?;

    let tools = list_tools(&service, &record.name).await;
    let _ = service.cancel().await;
    tools
}

async fn discover_http(record: &McpServerRecord) -> McpBridgeResult<Vec<ToolDescriptor>> {
    let url = record
        .url
        .as_ref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| McpBridgeError::InvalidRecord("http transport requires a url".to_string()))?;

    let config = StreamableHttpClientTransportConfig::with_uri(url.clone());

    let client = if let Some(headers) = &record.headers {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| McpBridgeError::Connect { server: record.name.clone(), cause: e.to_string() })?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| McpBridgeError::Connect { server: record.name.clone(), cause: e.to_string() })?;
            header_map.insert(name, value);
        }
        reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(|e| McpBridgeError::Connect { server: record.name.clone(), cause: e.to_string() })?
    } else {
        reqwest::Client::new()
    };

    let transport = StreamableHttpClientTransport::with_client(client, config);
    let service = client_info()
        .serve(transport)
        .await
        .map_err(|e| McpBridgeError::Connect {
            server: record.name.clone(),
            cause: e.to_string(),
        })?;

    let tools = list_tools(&service, &record.name).await;
    let _ = service.cancel().await;
    tools
}

async fn list_tools(service: &Session, server_name: &str) -> McpBridgeResult<Vec<ToolDescriptor>> {
    match service.peer().list_tools(None).await {
        Ok(result) => Ok(result.tools.into_iter().map(convert_tool).collect()),
        Err(e) => {
            tracing::warn!(server = %server_name, error = %e, "MCP list_tools failed; stub will fall back to generic call()");
            Ok(Vec::new())
        }
    }
}

//! Stub compilation (§4.4.2).
//!
//! Emits a self-contained Python source file that projects an MCP server's
//! discovered tools into the local tool namespace. Schema→signature mapping
//! and doc-comment synthesis are implemented against the small internal
//! [`StubIr`] below so a non-Python interpreter collaborator could plug in a
//! different emitter without touching the discovery or handler layers.
//!
//! Every generated callable is self-contained: it opens a brand-new MCP
//! session, makes exactly one call, decodes the response, and closes the
//! session — matching the broker's short-lived-session policy (§5).

use aep_core::model::{McpServerRecord, Transport};
use serde_json::Value;

/// Parameter extracted from a tool's JSON-schema `inputSchema`.
struct StubParam {
    name: String,
    required: bool,
    py_type: Option<&'static str>,
    description: Option<String>,
}

/// One callable the stub will expose.
struct StubTool {
    name: String,
    description: String,
    params: Vec<StubParam>,
}

/// Internal IR the emitter walks. Built once per `compile` call from a
/// [`McpServerRecord`] plus its discovered tools.
struct StubIr {
    server_name: String,
    transport: Transport,
    command: Vec<String>,
    env: Vec<(String, String)>,
    url: String,
    headers: Vec<(String, String)>,
    tools: Vec<StubTool>,
}

fn json_type_to_py(value: &Value) -> Option<&'static str> {
    match value.get("type").and_then(Value::as_str) {
        Some("string") => Some("str"),
        Some("integer") => Some("int"),
        Some("number") => Some("float"),
        Some("boolean") => Some("bool"),
        Some("array") => Some("list"),
        Some("object") => Some("dict"),
        _ => None,
    }
}

fn build_ir(record: &McpServerRecord) -> StubIr {
    let mut env: Vec<(String, String)> = record
        .env
        .clone()
        .unwrap_or_default()
        .into_iter()
        .collect();
    env.sort();
    let mut headers: Vec<(String, String)> = record
        .headers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .collect();
    headers.sort();

    let tools = record
        .tools
        .iter()
        .map(|tool| {
            let required: Vec<String> = tool
                .input_schema
                .get("required")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let mut params: Vec<StubParam> = tool
                .input_schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, schema)| StubParam {
                            name: name.clone(),
                            required: required.contains(name),
                            py_type: json_type_to_py(schema),
                            description: schema
                                .get("description")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        })
                        .collect()
                })
                .unwrap_or_default();

            // Required params first (Python forbids a non-default parameter
            // after a defaulted one); `sort_by` is stable, so within each
            // group the schema's own `properties` insertion order survives.
            params.sort_by(|a, b| b.required.cmp(&a.required));

            StubTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                params,
            }
        })
        .collect();

    StubIr {
        server_name: record.name.clone(),
        transport: record.transport,
        command: record.command.clone().unwrap_or_default(),
        env,
        url: record.url.clone().unwrap_or_default(),
        headers,
        tools,
    }
}

fn py_literal_str(s: &str) -> String {
    format!("{:?}", s)
}

fn py_literal_list(items: &[String]) -> String {
    let inner: Vec<String> = items.iter().map(|s| py_literal_str(s)).collect();
    format!("[{}]", inner.join(", "))
}

fn py_literal_dict(pairs: &[(String, String)]) -> String {
    let inner: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}: {}", py_literal_str(k), py_literal_str(v)))
        .collect();
    format!("{{{}}}", inner.join(", "))
}

fn emit_transport_config(ir: &StubIr) -> String {
    match ir.transport {
        Transport::Stdio => format!(
            "_TRANSPORT = \"stdio\"\n_COMMAND = {}\n_ENV = {}\n",
            py_literal_list(&ir.command),
            py_literal_dict(&ir.env),
        ),
        Transport::Http => format!(
            "_TRANSPORT = \"http\"\n_URL = {}\n_HEADERS = {}\n",
            py_literal_str(&ir.url),
            py_literal_dict(&ir.headers),
        ),
    }
}

/// Shared JSON-RPC session plumbing, identical across every generated stub.
/// Stdlib-only (`json`, `subprocess`, `urllib.request`) so the stub carries
/// no dependency on the shared `requirements.txt`.
const RUNTIME_PRELUDE: &str = r#"
import itertools
import json
import os
import subprocess
import urllib.request

_ids = itertools.count(1)


class McpCallError(RuntimeError):
    pass


def _stdio_roundtrip(messages):
    env = dict(os.environ)
    env.update(_ENV)
    proc = subprocess.Popen(
        _COMMAND,
        stdin=subprocess.PIPE,
        stdout=subprocess.PIPE,
        stderr=subprocess.PIPE,
        env=env,
        text=True,
    )
    try:
        responses = []
        for message in messages:
            proc.stdin.write(json.dumps(message) + "\n")
            proc.stdin.flush()
            if "id" in message:
                line = proc.stdout.readline()
                if not line:
                    stderr = proc.stderr.read()
                    raise McpCallError(f"MCP server closed the connection: {stderr}")
                responses.append(json.loads(line))
        return responses
    finally:
        proc.terminate()
        try:
            proc.wait(timeout=5)
        except subprocess.TimeoutExpired:
            proc.kill()


def _http_roundtrip(messages):
    # Assumes a unary JSON-RPC response per request, not a chunked SSE stream.
    responses = []
    for message in messages:
        request = urllib.request.Request(
            _URL,
            data=json.dumps(message).encode("utf-8"),
            headers={**_HEADERS, "Content-Type": "application/json"},
            method="POST",
        )
        with urllib.request.urlopen(request, timeout=60) as resp:
            body = resp.read().decode("utf-8")
        if "id" in message and body:
            responses.append(json.loads(body))
    return responses


def _roundtrip(messages):
    if _TRANSPORT == "stdio":
        return _stdio_roundtrip(messages)
    return _http_roundtrip(messages)


def _extract_text(result):
    if result is None:
        return None
    content = result.get("content") or []
    texts = [item.get("text", "") for item in content if item.get("type") == "text"]
    joined = "".join(texts)
    return joined or None


def call(tool_name, **kwargs):
    """Generic entry point: invokes any tool on this server by name."""
    arguments = {k: v for k, v in kwargs.items() if v is not None}
    init_id = next(_ids)
    call_id = next(_ids)
    messages = [
        {
            "jsonrpc": "2.0",
            "id": init_id,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "aep", "version": "0.1"},
            },
        },
        {"jsonrpc": "2.0", "method": "notifications/initialized"},
        {
            "jsonrpc": "2.0",
            "id": call_id,
            "method": "tools/call",
            "params": {"name": tool_name, "arguments": arguments},
        },
    ]
    responses = _roundtrip(messages)
    call_response = next((r for r in responses if r.get("id") == call_id), None)
    if call_response is None:
        raise McpCallError(f"no response for tool call '{tool_name}'")
    if "error" in call_response:
        raise McpCallError(call_response["error"].get("message", "unknown MCP error"))
    return _extract_text(call_response.get("result"))
"#;

fn emit_tool_function(tool: &StubTool) -> String {
    let mut signature_parts = vec!["".to_string()];
    for param in &tool.params {
        let ty = param.py_type.map(|t| format!(": {t}")).unwrap_or_default();
        if param.required {
            signature_parts.push(format!("{}{}", param.name, ty));
        } else {
            signature_parts.push(format!("{}{} = None", param.name, ty));
        }
    }
    let signature = signature_parts.join(", ");
    let signature = signature.strip_prefix(", ").unwrap_or(&signature);

    let mut doc_lines = vec![tool.description.clone()];
    for param in &tool.params {
        if let Some(description) = &param.description {
            doc_lines.push(format!("{}: {}", param.name, description));
        }
    }
    let doc = doc_lines.join("\n    ");

    let kwargs: Vec<String> = tool
        .params
        .iter()
        .map(|p| format!("{0}={0}", p.name))
        .collect();

    format!(
        "\n\ndef {name}({signature}):\n    \"\"\"{doc}\"\"\"\n    return call({tool_name!r}, {kwargs})\n",
        name = sanitize_identifier(&tool.name),
        signature = signature,
        doc = doc,
        tool_name = tool.name,
        kwargs = kwargs.join(", "),
    )
}

fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Compiles the Python stub source for `record`. Deterministic: the same
/// record and tool list always produce byte-identical output.
#[must_use]
pub fn compile(record: &McpServerRecord) -> String {
    let ir = build_ir(record);

    let mut out = String::new();
    out.push_str(&format!(
        "\"\"\"Generated MCP stub for server '{}'.\n\nProduced and consumed by the aep-runtime Python code-interpreter\ncollaborator; do not hand-edit, `aep mcp refresh {}` regenerates it.\n\"\"\"\n\n",
        ir.server_name, ir.server_name,
    ));
    out.push_str(&emit_transport_config(&ir));
    out.push_str(RUNTIME_PRELUDE);
    for tool in &ir.tools {
        out.push_str(&emit_tool_function(tool));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aep_core::model::ToolDescriptor;
    use serde_json::json;

    fn sample_record() -> McpServerRecord {
        McpServerRecord {
            name: "echo_stdio".to_string(),
            transport: Transport::Stdio,
            command: Some(vec!["python3".to_string(), "server.py".to_string()]),
            env: None,
            url: None,
            headers: None,
            tools: vec![
                ToolDescriptor {
                    name: "echo".to_string(),
                    description: "Echoes a message back".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {"message": {"type": "string", "description": "text to echo"}},
                        "required": ["message"],
                    }),
                },
                ToolDescriptor {
                    name: "add".to_string(),
                    description: "Adds two integers".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "a": {"type": "integer"},
                            "b": {"type": "integer"},
                        },
                        "required": ["a", "b"],
                    }),
                },
            ],
        }
    }

    #[test]
    fn compiles_deterministically() {
        let record = sample_record();
        let first = compile(&record);
        let second = compile(&record);
        assert_eq!(first, second);
    }

    #[test]
    fn exposes_one_function_per_tool_with_required_args() {
        let source = compile(&sample_record());
        assert!(source.contains("def echo(message: str):"));
        assert!(source.contains("def add(a: int, b: int):"));
        assert!(source.contains("def call(tool_name, **kwargs):"));
    }

    #[test]
    fn optional_params_default_to_none_after_required_ones() {
        let mut record = sample_record();
        record.tools.push(ToolDescriptor {
            name: "search".to_string(),
            description: "Searches".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "limit": {"type": "integer"},
                },
                "required": ["query"],
            }),
        });
        let source = compile(&record);
        assert!(source.contains("def search(query: str, limit: int = None):"));
    }
}

use anyhow::{Context, Result};
use serde_json::{json, Value as JsonValue};
use sillage::{FacetEntry, FilterCriteria, FragranceId, FragranceRecord, Gender, SortKey};
use sillage_browse::{Browser, QuerySession, SessionConfig, ViewResult};
use std::env;
use std::io::{self, BufRead, BufReader, Write};

const MAX_MESSAGE_BYTES: usize = 1_048_576; // 1 MiB
const MAX_QUERY_BYTES: usize = 8 * 1024; // 8 KiB
const MAX_LABEL_BYTES: usize = 512;
const MAX_OPTION_LIMIT: usize = 500;

struct AppState {
    browser: Browser,
    session: QuerySession,
}

impl AppState {
    fn open() -> Result<Self> {
        let path =
            env::var("SILLAGE_CATALOG_PATH").unwrap_or_else(|_| "./fragrances.json".to_string());
        let config = session_config_from_env()?;
        let browser = Browser::open(&path)
            .with_context(|| format!("failed to load catalog from {path}"))?;
        Ok(Self::new(browser, config))
    }

    fn new(browser: Browser, config: SessionConfig) -> Self {
        let session = browser.session_with(config);
        Self { browser, session }
    }
}

fn session_config_from_env() -> Result<SessionConfig> {
    let mut config = SessionConfig::default();
    if let Ok(raw) = env::var("SILLAGE_INITIAL_WINDOW") {
        config.initial_window = raw
            .trim()
            .parse()
            .context("SILLAGE_INITIAL_WINDOW must be a non-negative integer")?;
    }
    if let Ok(raw) = env::var("SILLAGE_WINDOW_INCREMENT") {
        config.window_increment = raw
            .trim()
            .parse()
            .context("SILLAGE_WINDOW_INCREMENT must be a non-negative integer")?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut state = AppState::open().context("failed to open sillage catalog")?;
    tracing::info!(records = state.browser.catalog().len(), "sillage-mcp ready");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    loop {
        let maybe = match read_message(&mut reader) {
            Ok(m) => m,
            Err(e) => {
                // Bad framing answers with a JSON-RPC parse error (-32700);
                // the server keeps reading.
                tracing::warn!(error = %e, "rejected malformed message");
                let err_resp = json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32700, "message": format!("Parse error: {e}") }
                });
                write_message(&mut writer, &err_resp)?;
                continue;
            }
        };
        let Some(request) = maybe else {
            break;
        };
        if let Some(response) = handle_request(&mut state, &request) {
            write_message(&mut writer, &response)?;
        }
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<JsonValue>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        if let Some((name, value)) = trimmed.split_once(':') {
            if name.eq_ignore_ascii_case("Content-Length") {
                content_length = Some(
                    value
                        .trim()
                        .parse::<usize>()
                        .context("invalid Content-Length")?,
                );
            }
        }
    }

    let len = content_length.context("missing Content-Length header")?;
    if len > MAX_MESSAGE_BYTES {
        anyhow::bail!(
            "Content-Length {} exceeds max allowed {} bytes",
            len,
            MAX_MESSAGE_BYTES
        );
    }
    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;
    let value: JsonValue = serde_json::from_slice(&payload).context("invalid JSON payload")?;
    Ok(Some(value))
}

fn write_message<W: Write>(writer: &mut W, value: &JsonValue) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    write!(writer, "Content-Length: {}\r\n\r\n", payload.len())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

fn handle_request(state: &mut AppState, req: &JsonValue) -> Option<JsonValue> {
    let id = req.get("id").cloned();
    let method = req.get("method").and_then(JsonValue::as_str)?;
    tracing::debug!(method, "request");

    match method {
        "initialize" => id.map(|id_val| {
            json!({
                "jsonrpc": "2.0",
                "id": id_val,
                "result": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "sillage-mcp", "version": env!("CARGO_PKG_VERSION") }
                }
            })
        }),
        "notifications/initialized" => None,
        "tools/list" => id.map(|id_val| {
            json!({
                "jsonrpc": "2.0",
                "id": id_val,
                "result": {
                    "tools": tools_schema()
                }
            })
        }),
        "tools/call" => id.map(|id_val| {
            let result = call_tool(state, req.get("params"));
            match result {
                Ok(tool_result) => json!({
                    "jsonrpc": "2.0",
                    "id": id_val,
                    "result": tool_result
                }),
                Err(err) => json!({
                    "jsonrpc": "2.0",
                    "id": id_val,
                    "result": {
                        "content": [{ "type": "text", "text": format!("tool error: {err}") }],
                        "isError": true
                    }
                }),
            }
        }),
        "ping" => id.map(|id_val| json!({ "jsonrpc": "2.0", "id": id_val, "result": {} })),
        _ => id.map(|id_val| {
            json!({
                "jsonrpc": "2.0",
                "id": id_val,
                "error": {
                    "code": -32601,
                    "message": format!("method not found: {method}")
                }
            })
        }),
    }
}

fn tools_schema() -> Vec<JsonValue> {
    let sort_names: Vec<JsonValue> = SortKey::ALL
        .iter()
        .map(|k| serde_json::to_value(k).unwrap_or(JsonValue::Null))
        .collect();
    vec![
        json!({
            "name": "search_fragrances",
            "description": "Filter and sort the catalog. Replaces the session's current criteria.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "gender": {"type": "string", "enum": ["male", "female", "unisex"]},
                    "designer": {"type": "string"},
                    "note": {"type": "string"},
                    "sort": {"type": "string", "enum": sort_names}
                }
            }
        }),
        json!({
            "name": "reveal_more",
            "description": "Show the next page of the current results.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "clear_filters",
            "description": "Reset the text query and all facet selections.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "get_fragrance",
            "description": "Return one fragrance with similar and same-designer fragrances.",
            "inputSchema": {
                "type": "object",
                "properties": { "id": {"type": "integer", "minimum": 0} },
                "required": ["id"]
            }
        }),
        json!({
            "name": "list_designers",
            "description": "Designers with fragrance counts, most common first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "search": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": MAX_OPTION_LIMIT}
                }
            }
        }),
        json!({
            "name": "list_notes",
            "description": "Notes with fragrance counts, most common first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "search": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": MAX_OPTION_LIMIT}
                }
            }
        }),
    ]
}

fn call_tool(state: &mut AppState, params: Option<&JsonValue>) -> Result<JsonValue> {
    let name = params
        .and_then(|v| v.get("name"))
        .and_then(JsonValue::as_str)
        .context("missing tool name")?;
    let args = params
        .and_then(|v| v.get("arguments"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    match name {
        "search_fragrances" => {
            let query = optional_str(&args, "query", MAX_QUERY_BYTES)?;
            let gender = optional_str(&args, "gender", MAX_LABEL_BYTES)?
                .map(|g| g.parse::<Gender>())
                .transpose()?;
            let designer = optional_str(&args, "designer", MAX_LABEL_BYTES)?;
            let note = optional_str(&args, "note", MAX_LABEL_BYTES)?;
            let sort_key = optional_str(&args, "sort", MAX_LABEL_BYTES)?
                .map(|s| s.parse::<SortKey>())
                .transpose()?
                .unwrap_or_default();

            let criteria = FilterCriteria {
                query: query.map(str::to_string),
                gender: gender.map(String::from),
                designer: designer.map(str::to_string),
                note: note.map(str::to_string),
            };
            let view = state.session.apply_query(criteria, sort_key);
            Ok(listing_result(&view))
        }
        "reveal_more" => {
            state.session.reveal_more();
            Ok(listing_result(&state.session.view()))
        }
        "clear_filters" => {
            state.session.clear_filters();
            Ok(listing_result(&state.session.view()))
        }
        "get_fragrance" => {
            let id = args
                .get("id")
                .and_then(JsonValue::as_u64)
                .context("id is required")?;
            let detail = state.browser.detail(FragranceId(id))?;
            Ok(json!({
                "content": [{
                    "type": "text",
                    "text": format!(
                        "{} by {}: {} similar, {} from the same designer",
                        detail.record.name,
                        detail.record.brand,
                        detail.similar.len(),
                        detail.same_designer.len()
                    )
                }],
                "structuredContent": {
                    "fragrance": detail.record,
                    "similar": detail.similar.iter().map(|r| summary(r)).collect::<Vec<_>>(),
                    "same_designer": detail.same_designer.iter().map(|r| summary(r)).collect::<Vec<_>>()
                }
            }))
        }
        "list_designers" => {
            let search = optional_str(&args, "search", MAX_LABEL_BYTES)?.unwrap_or("");
            let limit = option_limit(&args)?;
            let options = state.browser.designers().search(search, limit);
            Ok(options_result("designer", &options))
        }
        "list_notes" => {
            let search = optional_str(&args, "search", MAX_LABEL_BYTES)?.unwrap_or("");
            let limit = option_limit(&args)?.or(Some(state.session.config().note_option_limit));
            let options = state.browser.notes().search(search, limit);
            Ok(options_result("note", &options))
        }
        _ => anyhow::bail!("unknown tool: {name}"),
    }
}

fn optional_str<'a>(args: &'a JsonValue, key: &str, max_bytes: usize) -> Result<Option<&'a str>> {
    let Some(value) = args.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let s = value
        .as_str()
        .with_context(|| format!("{key} must be a string"))?;
    if s.len() > max_bytes {
        anyhow::bail!("{key} exceeds max allowed size ({max_bytes} bytes)");
    }
    Ok(Some(s))
}

fn option_limit(args: &JsonValue) -> Result<Option<usize>> {
    match args.get("limit").and_then(JsonValue::as_u64) {
        Some(limit) if limit as usize > MAX_OPTION_LIMIT => {
            anyhow::bail!("limit exceeds max allowed value ({MAX_OPTION_LIMIT})")
        }
        Some(limit) => Ok(Some(limit as usize)),
        None => Ok(None),
    }
}

fn summary(record: &FragranceRecord) -> JsonValue {
    json!({
        "id": record.id,
        "name": record.name,
        "brand": record.brand,
        "gender": record.gender,
    })
}

fn listing_result(view: &ViewResult<'_>) -> JsonValue {
    let visible: Vec<JsonValue> = view.visible_records().iter().map(|r| summary(r)).collect();
    json!({
        "content": [{
            "type": "text",
            "text": format!("showing {} of {} fragrance(s)", view.visible, view.total())
        }],
        "structuredContent": {
            "total": view.total(),
            "visible": view.visible,
            "has_more": view.has_more(),
            "sort": view.sort_key,
            "criteria": view.criteria,
            "fragrances": visible
        }
    })
}

fn options_result(kind: &str, options: &[&FacetEntry]) -> JsonValue {
    json!({
        "content": [{ "type": "text", "text": format!("{} {kind} option(s)", options.len()) }],
        "structuredContent": { "options": options }
    })
}

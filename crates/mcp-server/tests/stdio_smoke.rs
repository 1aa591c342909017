use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

const CATALOG: &str = r#"[
    {"ID": 1, "Name": "Aventus", "Brand": "Creed", "Gender": "male", "Longevity": "70",
     "Notes": {"Top": ["Pineapple", "Bergamot"], "Middle": ["Birch"], "Base": ["Musk"]}},
    {"ID": 2, "Name": "Green Irish Tweed", "Brand": "Creed", "Gender": "male", "Longevity": "85",
     "Notes": {"Top": ["Lemon", "Verbena"], "Middle": ["Violet Leaf"], "Base": ["Ambergris"]}},
    {"ID": 3, "Name": "Club de Nuit Intense", "Brand": "Armaf", "Gender": "male", "Longevity": "90",
     "Notes": {"Top": ["Pineapple", "Bergamot"], "Middle": ["Birch", "Rose"], "Base": ["Musk"]}}
]"#;

fn write_mcp_message(stdin: &mut impl Write, payload: &Value) {
    let body = serde_json::to_vec(payload).unwrap();
    write!(stdin, "Content-Length: {}\r\n\r\n", body.len()).unwrap();
    stdin.write_all(&body).unwrap();
    stdin.flush().unwrap();
}

fn read_mcp_message(stdout: &mut impl BufRead) -> Value {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let n = stdout.read_line(&mut line).unwrap();
        assert!(n > 0, "unexpected EOF");
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            if name.eq_ignore_ascii_case("Content-Length") {
                content_length = Some(value.trim().parse::<usize>().unwrap());
            }
        }
    }
    let len = content_length.expect("missing Content-Length");
    let mut buf = vec![0_u8; len];
    stdout.read_exact(&mut buf).unwrap();
    serde_json::from_slice(&buf).unwrap()
}

#[test]
fn stdio_server_search_and_detail() {
    let mut catalog = NamedTempFile::new().unwrap();
    catalog.write_all(CATALOG.as_bytes()).unwrap();

    let bin = env!("CARGO_BIN_EXE_sillage-mcp");
    let mut child = Command::new(bin)
        .env("SILLAGE_CATALOG_PATH", catalog.path())
        .env("SILLAGE_INITIAL_WINDOW", "2")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    write_mcp_message(
        &mut stdin,
        &serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {}
        }),
    );
    let init = read_mcp_message(&mut stdout);
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["serverInfo"]["name"], "sillage-mcp");

    write_mcp_message(
        &mut stdin,
        &serde_json::json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {
                "name": "search_fragrances",
                "arguments": { "sort": "Longest longevity" }
            }
        }),
    );
    let search = read_mcp_message(&mut stdout);
    assert_eq!(search["id"], 2);
    let content = &search["result"]["structuredContent"];
    assert_eq!(content["total"], 3);
    assert_eq!(content["visible"], 2);
    let ids: Vec<u64> = content["fragrances"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 2]);

    write_mcp_message(
        &mut stdin,
        &serde_json::json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "get_fragrance",
                "arguments": { "id": 1 }
            }
        }),
    );
    let detail = read_mcp_message(&mut stdout);
    assert_eq!(detail["id"], 3);
    let content = &detail["result"]["structuredContent"];
    assert_eq!(content["similar"][0]["id"], 3);
    assert_eq!(content["same_designer"][0]["id"], 2);

    write_mcp_message(
        &mut stdin,
        &serde_json::json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {
                "name": "get_fragrance",
                "arguments": { "id": 404 }
            }
        }),
    );
    let missing = read_mcp_message(&mut stdout);
    assert_eq!(missing["result"]["isError"], true);

    // Stop child cleanly.
    drop(stdin);
    let _ = child.wait();
}

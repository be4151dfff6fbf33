//! Ollama tool loop against a local scripted HTTP server.
#![cfg(feature = "ollama")]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use sucupira_core::{Llm, LlmRequest, ParamKind, ParamSpec, Result, Tool, ToolArgs, ToolRegistry};
use sucupira_model::{OllamaConfig, OllamaModel};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

async fn read_request(socket: &mut TcpStream) -> Value {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a full request");
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(split) = text.find("\r\n\r\n") {
            let length = text[..split]
                .lines()
                .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            let body = &buf[split + 4..];
            if body.len() >= length {
                return serde_json::from_slice(&body[..length]).unwrap();
            }
        }
    }
}

/// Answer each incoming `/api/chat` with the next reply; return the bodies seen.
async fn scripted_server(replies: Vec<Value>) -> (String, JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for reply in replies {
            let (mut socket, _) = listener.accept().await.unwrap();
            seen.push(read_request(&mut socket).await);
            let body = reply.to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
        seen
    });
    (host, handle)
}

fn assistant(content: &str, tool_calls: Value) -> Value {
    json!({"model": "m", "message": {"role": "assistant", "content": content, "tool_calls": tool_calls}, "done": true})
}

struct Issn;

#[async_trait]
impl Tool for Issn {
    fn name(&self) -> &str {
        "issn_of"
    }

    fn description(&self) -> &str {
        "ISSN of a journal"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("title", ParamKind::String, "journal title")]
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        Ok(format!("{} ISSN=2222-2222", args.require_str("title")?))
    }
}

fn tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(Issn)).unwrap();
    registry
}

#[tokio::test]
async fn tool_calls_are_executed_and_fed_back() {
    let (host, server) = scripted_server(vec![
        assistant("", json!([{"function": {"name": "issn_of", "arguments": {"title": "Medical Review"}}}])),
        assistant("The ISSN is 2222-2222.", json!([])),
    ])
    .await;

    let model = OllamaModel::new(OllamaConfig::new("llama3.2").with_host(host)).unwrap();
    let answer = model.generate(LlmRequest::new("You are a librarian.", "ISSN?"), &tools()).await.unwrap();
    assert_eq!(answer, "The ISSN is 2222-2222.");

    let seen = server.await.unwrap();
    assert_eq!(seen[0]["tools"][0]["function"]["name"], "issn_of");
    assert_eq!(seen[0]["messages"][0]["role"], "system");
    let follow_up = seen[1]["messages"].as_array().unwrap();
    let observation = follow_up.last().unwrap();
    assert_eq!(observation["role"], "tool");
    assert_eq!(observation["content"], "Medical Review ISSN=2222-2222");
}

#[tokio::test]
async fn tools_are_withheld_after_the_last_round() {
    let call = json!([{"function": {"name": "issn_of", "arguments": {"title": "X"}}}]);
    let (host, server) = scripted_server(vec![assistant("", call), assistant("done", json!([]))]).await;

    let model = OllamaModel::new(OllamaConfig::new("m").with_host(host).with_max_tool_rounds(1)).unwrap();
    let answer = model.generate(LlmRequest::new("", "go"), &tools()).await.unwrap();
    assert_eq!(answer, "done");

    let seen = server.await.unwrap();
    assert!(seen[0].get("tools").is_some());
    assert!(seen[1].get("tools").is_none());
}

#[tokio::test]
async fn empty_answer_is_a_model_error() {
    let (host, _server) = scripted_server(vec![assistant("  ", json!([]))]).await;
    let model = OllamaModel::new(OllamaConfig::new("m").with_host(host)).unwrap();
    assert!(model.generate(LlmRequest::new("", "go"), &ToolRegistry::new()).await.is_err());
}

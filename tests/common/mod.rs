//! Shared fixtures for the mock vLLM server tests

#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::{Request, Respond, ResponseTemplate};

/// Encode `text` arrays as a NUL-delimited stream body
pub fn frames(texts: &[&[&str]]) -> Vec<u8> {
    let mut body = Vec::new();
    for text in texts {
        body.extend(serde_json::to_vec(&json!({ "text": text })).unwrap());
        body.push(0);
    }
    body
}

/// Cumulative frames for one slot, growing by one word each time
pub fn growing_frames(prompt: &str, words: &[&str]) -> (Vec<u8>, String) {
    let mut body = Vec::new();
    let mut text = prompt.to_string();
    for word in words {
        text.push_str(word);
        body.extend(serde_json::to_vec(&json!({ "text": [text] })).unwrap());
        body.push(0);
    }
    (body, text)
}

/// Deterministic server: every completion is the prompt plus a fixed tail
///
/// Honors `n` (default 1) and `stream`. Completion `i` is
/// `"{prompt} reply number {i}"`, cut to `max_tokens` words.
pub struct EchoServer;

impl EchoServer {
    fn completions(body: &Value) -> Vec<String> {
        let prompt = body["prompt"].as_str().unwrap_or_default();
        let n = body["n"].as_u64().unwrap_or(1);
        let max_tokens = body["max_tokens"].as_u64().unwrap_or(16) as usize;

        (0..n)
            .map(|i| {
                let words = vec![" reply".to_string(), " number".to_string(), format!(" {}", i)];
                let tail: String = words.into_iter().take(max_tokens).collect();
                format!("{}{}", prompt, tail)
            })
            .collect()
    }
}

impl Respond for EchoServer {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400).set_body_string("bad json"),
        };
        let completions = Self::completions(&body);

        if body["stream"].as_bool() == Some(true) {
            // One frame per growing prefix, the last equal to the full text
            let mut stream = Vec::new();
            let longest = completions.iter().map(|c| c.len()).max().unwrap_or(0);
            let mut cut = body["prompt"].as_str().unwrap_or_default().len();
            loop {
                cut = (cut + 3).min(longest);
                let partial: Vec<&str> = completions
                    .iter()
                    .map(|c| &c[..cut.min(c.len())])
                    .collect();
                stream.extend(serde_json::to_vec(&json!({ "text": partial })).unwrap());
                stream.push(0);
                if cut == longest {
                    break;
                }
            }
            return ResponseTemplate::new(200).set_body_bytes(stream);
        }

        ResponseTemplate::new(200).set_body_json(json!({ "text": completions }))
    }
}

/// Bare TCP server that answers every request with `response` verbatim,
/// then holds the connection open for `hold` before closing it.
///
/// Covers what a mock server cannot: a body that stalls after some frames,
/// or a connection cut short of its declared length.
pub async fn raw_server(response: Vec<u8>, hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let response = response.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                socket.write_all(&response).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(hold).await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Chunked 200 response head followed by one chunk per frame
pub fn chunked_response(body: &[u8]) -> Vec<u8> {
    let mut response =
        b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nTransfer-Encoding: chunked\r\n\r\n"
            .to_vec();
    response.extend(format!("{:x}\r\n", body.len()).into_bytes());
    response.extend_from_slice(body);
    response.extend_from_slice(b"\r\n");
    response
}

async fn read_request(socket: &mut TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);

        if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                return;
            }
        }
    }
}

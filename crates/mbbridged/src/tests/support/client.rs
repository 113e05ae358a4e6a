//! Minimal blocking HTTP client for loopback tests.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::auth::TOKEN_HEADER;

/// Status and body of a bridge response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    /// Parses the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body should be JSON")
    }
}

/// Writes `request` verbatim and reads the response until the server closes.
pub fn send_raw(addr: SocketAddr, request: &[u8]) -> HttpReply {
    let mut stream = TcpStream::connect(addr).expect("connect to bridge");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set client timeout");
    stream.write_all(request).expect("write request");
    let _ = stream.shutdown(Shutdown::Write);
    let mut raw = String::new();
    stream.read_to_string(&mut raw).expect("read response");
    parse_reply(&raw)
}

/// Posts `body` to `/cmd`, optionally with the token header.
pub fn post_cmd(addr: SocketAddr, body: &[u8], token: Option<&str>) -> HttpReply {
    let token_header = token
        .map(|token| format!("{TOKEN_HEADER}: {token}\r\n"))
        .unwrap_or_default();
    let mut request = format!(
        "POST /cmd HTTP/1.1\r\nHost: {addr}\r\nContent-Length: {}\r\n{token_header}\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    send_raw(addr, &request)
}

/// Sends a `GET` for `path`.
pub fn get(addr: SocketAddr, path: &str) -> HttpReply {
    send_raw(
        addr,
        format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n\r\n").as_bytes(),
    )
}

fn parse_reply(raw: &str) -> HttpReply {
    let (head, body) = raw
        .split_once("\r\n\r\n")
        .expect("response should contain a blank line");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("response should start with a status line");
    HttpReply {
        status,
        body: body.to_owned(),
    }
}

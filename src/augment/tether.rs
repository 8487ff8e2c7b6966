//! TCP client for an external similarity-search service.
//!
//! One JSON request per connection, e.g. `{"cmd":"search","query":"...","top_k":5}`
//! or `{"cmd":"status"}`, answered by one JSON document. The response is read
//! until it parses or the peer closes the connection.

use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::SimilaritySearch;
use crate::error::{MindError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const IO_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

pub struct TetherClient {
    host: String,
    port: u16,
}

impl TetherClient {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    fn request(&self, body: &Value) -> Result<Value> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| unavailable(&self.host, self.port, e))?
            .next()
            .ok_or_else(|| MindError::Augment(format!("no address for {}:{}", self.host, self.port)))?;

        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| unavailable(&self.host, self.port, e))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        let payload = serde_json::to_vec(body).map_err(|e| MindError::Augment(e.to_string()))?;
        stream.write_all(&payload)?;
        stream.flush()?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Ok(value) = serde_json::from_slice::<Value>(&buf) {
                return Ok(value);
            }
            if buf.len() > MAX_RESPONSE_BYTES {
                return Err(MindError::Augment("similarity response too large".into()));
            }
        }
        serde_json::from_slice(&buf)
            .map_err(|e| MindError::Augment(format!("invalid similarity response: {e}")))
    }
}

fn unavailable(host: &str, port: u16, e: std::io::Error) -> MindError {
    MindError::Augment(format!("similarity service at {host}:{port} unreachable: {e}"))
}

impl SimilaritySearch for TetherClient {
    fn search(&self, query: &str, top_k: usize) -> Result<Value> {
        self.request(&json!({ "cmd": "search", "query": query, "top_k": top_k }))
    }

    fn status(&self) -> Result<Value> {
        self.request(&json!({ "cmd": "status" }))
    }
}

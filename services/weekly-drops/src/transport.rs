//!
//! src/transport.rs  Oct 19th, 2026
//!
//! JSON-RPC 2.0 over the stdin/stdout of a child process, one frame per
//! line. One request is in flight at a time; responses are matched by id.
//!

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace, warn};

use crate::config::ServerConfig;
use crate::errors::TransportError;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const CLIENT_NAME: &str = "weekly-new-drops-creator";

///
/// Request/response channel to the catalog server
///
#[async_trait]
pub trait Transport: Send {
    /// Handshake; returns the server's initialize result
    async fn initialize(&mut self) -> Result<Value, TransportError>;

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Stops the server; the transport is unusable afterwards
    async fn shutdown(&mut self) -> Result<(), TransportError>;
}

pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String
}

#[derive(Debug, Deserialize)]
struct RpcFrame {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>
}

pub struct StdioTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    request_timeout: Duration,
    shutdown_grace: Duration
}

impl StdioTransport {
    pub fn spawn(server: &ServerConfig) -> Result<Self, TransportError> {
        debug!(command = %server.command, args = ?server.args, "transport.spawn");

        let mut command = Command::new(&server.command);
        command.args(&server.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // own process group, so a terminal ctrl-c reaches us and not the server
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()
            .map_err(|e| TransportError::Spawn(
                format!("{}: {e}", server.command)
            ))?;

        let stdin = child.stdin.take()
            .ok_or_else(|| TransportError::Spawn("stdin not piped".to_string()))?;
        let stdout = child.stdout.take()
            .ok_or_else(|| TransportError::Spawn("stdout not piped".to_string()))?;

        // server diagnostics go to our log, never to the protocol stream
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(%line, "transport.server.stderr");
                }
            });
        }

        Ok( Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            request_timeout: server.request_timeout,
            shutdown_grace: server.shutdown_grace
        })
    }

    async fn send(&mut self, request: &RpcRequest<'_>) -> Result<(), TransportError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| TransportError::Io(
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin already closed")
        ))?;

        let mut frame = serde_json::to_string(request)?;
        frame.push('\n');
        trace!(%frame, "transport.send");

        stdin.write_all(frame.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    pub async fn notify(&mut self, method: &str, params: Option<Value>) ->
        Result<(), TransportError> {
        self.send(&RpcRequest { jsonrpc: "2.0", id: None, method, params }).await
    }

    async fn read_response(&mut self, id: u64) -> Result<Value, TransportError> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(TransportError::Closed(id));
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            trace!(%line, "transport.recv");

            let frame: RpcFrame = serde_json::from_str(line)?;

            // server-initiated traffic (logging notifications, pings)
            if let Some(method) = frame.method.as_deref() {
                debug!(method, "transport.server.message");
                continue;
            }

            match frame.id.as_ref().and_then(Value::as_u64) {
                Some(got) if got == id => {}
                other => {
                    warn!(expected = id, got = ?other, "transport.stale_response");
                    continue;
                }
            }

            if let Some(err) = frame.error {
                return Err(TransportError::Rpc { code: err.code, message: err.message });
            }
            return frame.result.ok_or_else(|| TransportError::Malformed(
                format!("response {id} has neither result nor error")
            ));
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn initialize(&mut self) -> Result<Value, TransportError> {
        let result = self.call("initialize", initialize_params()).await?;
        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id;
        self.next_id += 1;

        self.send(&RpcRequest { jsonrpc: "2.0", id: Some(id), method, params: Some(params) })
            .await?;

        let limit = self.request_timeout;
        match tokio::time::timeout(limit, self.read_response(id)).await {
            Ok(response) => response,
            Err(_) => Err(TransportError::Timeout {
                method: method.to_string(),
                ms: limit.as_millis()
            })
        }
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        // closing stdin is the polite stop signal for stdio servers
        drop(self.stdin.take());

        match tokio::time::timeout(self.shutdown_grace, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                debug!(?status, "transport.exit");
            }
            Err(_) => {
                warn!(grace_ms = self.shutdown_grace.as_millis() as u64, "transport.kill");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}

///
/// In-memory transport for unit tests. Every call is recorded and answered
/// by the supplied responder.
///
#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Responder = Box<dyn FnMut(&str, &Value) -> Result<Value, TransportError> + Send>;

    pub struct FakeTransport {
        pub calls: Arc<Mutex<Vec<(String, Value)>>>,
        pub closed: Arc<Mutex<bool>>,
        responder: Responder
    }

    impl FakeTransport {
        pub fn new<F>(responder: F) -> Self
        where
            F: FnMut(&str, &Value) -> Result<Value, TransportError> + Send + 'static
        {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(false)),
                responder: Box::new(responder)
            }
        }

        /// Tool results the way the server wraps them
        pub fn text_result(text: &str) -> Value {
            json!({ "content": [{ "type": "text", "text": text }] })
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn initialize(&mut self) -> Result<Value, TransportError> {
            self.call("initialize", initialize_params()).await
        }

        async fn call(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
            self.calls.lock().unwrap().push((method.to_string(), params.clone()));
            (self.responder)(method, &params)
        }

        async fn shutdown(&mut self) -> Result<(), TransportError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(script: &str, timeout_ms: u64) -> ServerConfig {
        ServerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            server_path: None,
            request_timeout: Duration::from_millis(timeout_ms),
            shutdown_grace: Duration::from_millis(500)
        }
    }

    #[tokio::test]
    async fn test_call_frames_request_and_skips_notifications() {
        let script = r#"read line
echo '{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}'
echo ''
printf '{"jsonrpc":"2.0","id":1,"result":{"echo":%s}}\n' "$line""#;
        let mut transport = StdioTransport::spawn(&scripted(script, 5_000)).unwrap();

        let result = transport.call("tools/list", json!({ "cursor": "abc" })).await.unwrap();
        assert_eq!(result["echo"]["jsonrpc"], "2.0");
        assert_eq!(result["echo"]["id"], 1);
        assert_eq!(result["echo"]["method"], "tools/list");
        assert_eq!(result["echo"]["params"]["cursor"], "abc");

        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_sends_initialized_notification() {
        let script = r#"read first
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05"}}'
read note
read next
printf '{"jsonrpc":"2.0","id":2,"result":{"note":%s,"init":%s}}\n' "$note" "$first""#;
        let mut transport = StdioTransport::spawn(&scripted(script, 5_000)).unwrap();

        let init = transport.initialize().await.unwrap();
        assert_eq!(init["protocolVersion"], PROTOCOL_VERSION);

        let result = transport.call("ping", json!({})).await.unwrap();
        assert_eq!(result["note"]["method"], "notifications/initialized");
        assert!(result["note"].get("id").is_none());
        assert_eq!(result["init"]["params"]["clientInfo"]["name"], CLIENT_NAME);

        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_ids_are_skipped() {
        let script = r#"read line
echo '{"jsonrpc":"2.0","id":99,"result":{"n":99}}'
echo '{"jsonrpc":"2.0","id":1,"result":{"n":1}}'"#;
        let mut transport = StdioTransport::spawn(&scripted(script, 5_000)).unwrap();
        let result = transport.call("ping", json!({})).await.unwrap();
        assert_eq!(result["n"], 1);
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced() {
        let script = r#"read line
echo '{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}'"#;
        let mut transport = StdioTransport::spawn(&scripted(script, 5_000)).unwrap();
        match transport.call("nope", json!({})).await {
            Err(TransportError::Rpc { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("expected rpc error, got {other:?}")
        }
    }

    #[tokio::test]
    async fn test_malformed_line() {
        let script = "read line\necho 'this is not json'";
        let mut transport = StdioTransport::spawn(&scripted(script, 5_000)).unwrap();
        let err = transport.call("ping", json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_eof_before_response() {
        let script = "read line\nexit 0";
        let mut transport = StdioTransport::spawn(&scripted(script, 5_000)).unwrap();
        let err = transport.call("ping", json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed(1)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut transport = StdioTransport::spawn(&scripted("sleep 5", 100)).unwrap();
        let err = transport.call("ping", json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }), "got {err:?}");
        transport.shutdown().await.unwrap();
    }

    // the server leads its own group, so a terminal ctrl-c only reaches us
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_server_runs_in_own_process_group() {
        let script = r#"read line
read -r pid comm state ppid pgrp rest < /proc/$$/stat
printf '{"jsonrpc":"2.0","id":1,"result":{"pid":%s,"pgrp":%s}}\n' "$pid" "$pgrp""#;
        let mut transport = StdioTransport::spawn(&scripted(script, 5_000)).unwrap();
        let result = transport.call("ping", json!({})).await.unwrap();

        assert_eq!(result["pid"], result["pgrp"]);
        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let server = ServerConfig {
            command: "/nonexistent/weekly-drops-server".to_string(),
            args: Vec::new(),
            server_path: None,
            request_timeout: Duration::from_millis(100),
            shutdown_grace: Duration::from_millis(100)
        };
        let err = StdioTransport::spawn(&server).err().unwrap();
        assert!(matches!(err, TransportError::Spawn(_)), "got {err:?}");
    }
}

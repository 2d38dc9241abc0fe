//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use logserver_cli::api::{ApiError, ApiResult, LogService};

// ============================================================
// In-memory LogService
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Enroll(String),
    Fetch {
        user: String,
        token: String,
        entries: u64,
    },
    Submit {
        user: String,
        token: String,
        body: Vec<u8>,
    },
}

/// Scripted logserver: answers with `enroll_status` / `request_status` and
/// records every call.
pub struct FakeService {
    pub calls: RefCell<Vec<Call>>,
    pub issued_token: String,
    pub logs: Vec<u8>,
    pub enroll_status: u16,
    pub request_status: u16,
}

impl FakeService {
    pub fn issuing(token: &str) -> Self {
        FakeService {
            calls: RefCell::new(Vec::new()),
            issued_token: token.to_string(),
            logs: Vec::new(),
            enroll_status: 200,
            request_status: 200,
        }
    }

    pub fn with_logs(mut self, logs: &[u8]) -> Self {
        self.logs = logs.to_vec();
        self
    }

    pub fn enroll_status(mut self, status: u16) -> Self {
        self.enroll_status = status;
        self
    }

    pub fn request_status(mut self, status: u16) -> Self {
        self.request_status = status;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn answer<T>(status: u16, ok: T) -> ApiResult<T> {
        if status == 200 {
            Ok(ok)
        } else {
            Err(ApiError::Server {
                status,
                reason: "Scripted".into(),
                body: "scripted failure\n".into(),
            })
        }
    }
}

impl LogService for FakeService {
    fn enroll(&self, user: &str) -> ApiResult<String> {
        self.calls.borrow_mut().push(Call::Enroll(user.to_string()));
        Self::answer(self.enroll_status, self.issued_token.clone())
    }

    fn fetch_logs(&self, user: &str, token: &str, entries: u64) -> ApiResult<Vec<u8>> {
        self.calls.borrow_mut().push(Call::Fetch {
            user: user.to_string(),
            token: token.to_string(),
            entries,
        });
        Self::answer(self.request_status, self.logs.clone())
    }

    fn submit_logs(&self, user: &str, token: &str, body: Vec<u8>) -> ApiResult<()> {
        self.calls.borrow_mut().push(Call::Submit {
            user: user.to_string(),
            token: token.to_string(),
            body,
        });
        Self::answer(self.request_status, ())
    }
}

// ============================================================
// Stub HTTP server on a local port
// ============================================================

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct Reply {
    pub status: u16,
    pub reason: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Reply {
            status: 200,
            reason: "OK",
            body: body.into(),
        }
    }

    pub fn status(status: u16, reason: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Reply {
            status,
            reason,
            body: body.into(),
        }
    }
}

pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    /// Serve one request per connection with `handler`, forever.
    pub fn start<F>(mut handler: F) -> Self
    where
        F: FnMut(&Recorded) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let Some(request) = read_request(&mut stream) else { continue };
                seen.lock().unwrap().push(request.clone());
                let reply = handler(&request);
                let head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n",
                    reply.status,
                    reply.reason,
                    reply.body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&reply.body);
                let _ = stream.flush();
            }
        });

        StubServer { addr, requests }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (k, v) = line.split_once(':')?;
        headers.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
    }

    let len = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; len];
    reader.read_exact(&mut body).ok()?;

    Some(Recorded {
        method,
        target,
        headers,
        body,
    })
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

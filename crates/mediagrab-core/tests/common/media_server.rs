//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves fixed bodies keyed by request path (query strings ignored) and
//! answers 404 for anything else. Every request's `Referer` header is recorded.
//! Bodies are sent with `Content-Length`, or for servers started with
//! [`start_close_delimited`] without it, ending the body by closing the
//! connection.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;

pub struct MediaServer {
    /// Base URL without trailing slash, e.g. "http://127.0.0.1:12345".
    pub base: String,
    referers: Arc<Mutex<Vec<Option<String>>>>,
}

impl MediaServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `Referer` of each request received so far, in arrival order.
    pub fn referers(&self) -> Vec<Option<String>> {
        self.referers.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Copy)]
enum Framing {
    ContentLength,
    CloseDelimited,
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(routes: &[(&str, &[u8])]) -> MediaServer {
    start_with(routes, Framing::ContentLength)
}

/// Like `start`, but responses carry no size header.
pub fn start_close_delimited(routes: &[(&str, &[u8])]) -> MediaServer {
    start_with(routes, Framing::CloseDelimited)
}

fn start_with(routes: &[(&str, &[u8])], framing: Framing) -> MediaServer {
    let routes: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        routes
            .iter()
            .map(|(p, b)| (p.to_string(), b.to_vec()))
            .collect(),
    );
    let referers = Arc::new(Mutex::new(Vec::new()));
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let seen = Arc::clone(&referers);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &routes, &seen, framing));
        }
    });
    MediaServer {
        base: format!("http://127.0.0.1:{}", port),
        referers,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<String, Vec<u8>>,
    seen: &Mutex<Vec<Option<String>>>,
    framing: Framing,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, referer) = parse_request(request);
    seen.lock().unwrap().push(referer);

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    let path = path.split('?').next().unwrap_or("");
    match routes.get(path) {
        Some(body) => {
            let head = match framing {
                Framing::ContentLength => format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                ),
                Framing::CloseDelimited => "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string(),
            };
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
            let _ = stream.shutdown(Shutdown::Write);
        }
        None => {
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
    }
}

/// Returns (method, path, Referer header).
fn parse_request(request: &str) -> (&str, &str, Option<String>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("/");
    let mut referer = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("referer") {
                referer = Some(value.trim().to_string());
            }
        }
    }
    (method, path, referer)
}

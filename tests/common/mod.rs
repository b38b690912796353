//! Shared helpers: a one-shot HTTP server and fixture archives.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the test server answers to every request.
#[derive(Clone)]
pub struct Reply {
    pub status: &'static str,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: "200 OK",
            content_length: Some(body.len() as u64),
            body,
        }
    }

    /// Announce `declared` bytes but send only `body`, then hang up.
    pub fn short(body: Vec<u8>, declared: u64) -> Self {
        Self {
            status: "200 OK",
            content_length: Some(declared),
            body,
        }
    }

    pub fn without_length(body: Vec<u8>) -> Self {
        Self {
            status: "200 OK",
            content_length: None,
            body,
        }
    }

    pub fn status(status: &'static str) -> Self {
        Self {
            status,
            content_length: Some(0),
            body: Vec::new(),
        }
    }
}

/// Serve `reply` on a fresh localhost port until the test ends.
pub async fn serve(reply: Reply) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = Arc::new(reply);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(respond(socket, reply.clone()));
        }
    });

    addr
}

async fn respond(mut socket: TcpStream, reply: Arc<Reply>) {
    // Drain the request head so closing the socket does not reset it.
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(1) => head.push(byte[0]),
            _ => return,
        }
    }

    let mut response = format!("HTTP/1.1 {}\r\nConnection: close\r\n", reply.status);
    if let Some(len) = reply.content_length {
        response.push_str(&format!("Content-Length: {}\r\n", len));
    }
    response.push_str("\r\n");

    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.write_all(&reply.body).await;
    let _ = socket.flush().await;
    let _ = socket.shutdown().await;
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}/{}", addr, path.trim_start_matches('/'))
}

/// Deflated archive; `None` content marks a directory.
pub fn archive(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in entries {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        match content {
            Some(data) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            None => writer.add_directory(*name, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Every regular file under `root`, keyed by its path relative to `root`.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(relative, std::fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use fetch_serve::{serve, Fetch, ServeOptions, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Start `fetch` on a free loopback port with the listen log silenced.
pub async fn start(fetch: impl Fetch) -> Server {
    start_with(ServeOptions::new(fetch)).await
}

/// Start with custom options, bound to a free loopback port.
pub async fn start_with(options: ServeOptions) -> Server {
    serve(options.hostname("127.0.0.1").port(0).on_listen(|_| {}))
        .await
        .expect("server should start")
}

pub fn socket_addr(server: &Server) -> SocketAddr {
    SocketAddr::new(server.hostname().parse().unwrap(), server.port())
}

pub fn url(server: &Server, path: &str) -> String {
    format!("{}{}", server.addr().url(), path)
}

/// Client without connection pooling, so every request opens a connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Send raw bytes and read until the server closes the connection.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server should close the connection")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:8060";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let addr = parse_arg_value(&args, "--addr")
        .or_else(|| std::env::var("TVLINK_MOCK_ECP_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let addr_file = parse_arg_value(&args, "--addr-file").map(PathBuf::from);
    let run_for = parse_arg_value(&args, "--run-for-ms")
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis);

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("mock_ecp: cannot bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    let local = match listener.local_addr() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("mock_ecp: {e}");
            std::process::exit(1);
        }
    };
    if let Some(path) = &addr_file {
        let _ = fs::write(path, local.to_string());
    }
    println!("mock_ecp listening on http://{local}");

    let serve = async {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    tokio::spawn(async move {
                        if let Err(e) = handle(stream).await {
                            debug!(%peer, error = %e, "connection ended early");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
    };

    match run_for {
        Some(limit) => {
            let _ = tokio::time::timeout(limit, serve).await;
        }
        None => serve.await,
    }
}

async fn handle(stream: TcpStream) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    // Drain headers; ECP commands carry no body.
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();
    let command = path.trim_start_matches('/').split_once('/');
    match command {
        Some((sub @ ("keypress" | "keydown" | "keyup"), key)) if method == "POST" => {
            info!(sub, key, "ecp");
        }
        _ => warn!(method, path, "unexpected request"),
    }

    write
        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
        .await?;
    write.shutdown().await
}

fn parse_arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

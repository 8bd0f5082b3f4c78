//! Shared helpers: a scripted in-memory GTP engine over duplex pipes.

use std::sync::{Arc, Mutex};

use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

use katago_driver::transport::Transport;

/// Initialize tracing for a test binary; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Spawn a stub engine whose behavior is a pure function of each received
/// command line. The returned log records every command, in order.
///
/// The script returns the raw bytes to write back, typically `"= ...\n\n"`,
/// telemetry lines, or nothing for commands the stub should ignore.
pub fn scripted_engine(
    script: impl Fn(&str) -> Vec<String> + Send + 'static,
) -> (Transport, Arc<Mutex<Vec<String>>>) {
    let (client, server) = duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_handle = log.clone();

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let mut out = server_write;
        while let Ok(Some(line)) = lines.next_line().await {
            log_handle.lock().unwrap().push(line.clone());
            if line == "quit" {
                let _ = out.write_all(b"=\n\n").await;
                break;
            }
            for chunk in script(&line) {
                let _ = out.write_all(chunk.as_bytes()).await;
            }
            let _ = out.flush().await;
        }
    });

    let (client_read, client_write) = tokio::io::split(client);
    (
        Transport::from_streams(client_read, client_write),
        log,
    )
}

/// Engine that behaves until `kata-analyze`, streams the given telemetry,
/// then exits, dropping its side of the pipes.
pub fn dying_engine(telemetry: Vec<String>) -> Transport {
    let (client, server) = duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server);

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let mut out = server_write;
        while let Ok(Some(line)) = lines.next_line().await {
            if line.starts_with("kata-analyze") {
                for chunk in &telemetry {
                    let _ = out.write_all(chunk.as_bytes()).await;
                }
                let _ = out.flush().await;
                break;
            }
            for chunk in ok_response(&line) {
                let _ = out.write_all(chunk.as_bytes()).await;
            }
            let _ = out.flush().await;
        }
        // Dropping the halves closes both pipes: a dead engine.
    });

    let (client_read, client_write) = tokio::io::split(client);
    Transport::from_streams(client_read, client_write)
}

/// The default well-behaved engine: answers the handshake and board
/// commands with success, streams nothing.
pub fn ok_response(line: &str) -> Vec<String> {
    match line.split_whitespace().next() {
        Some("protocol_version") => vec!["= 2\n\n".to_string()],
        Some("boardsize") | Some("clear_board") | Some("komi") | Some("play")
        | Some("undo") => vec!["=\n\n".to_string()],
        _ => vec![],
    }
}

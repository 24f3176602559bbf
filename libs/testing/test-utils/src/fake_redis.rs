//! In-process Redis stand-in for stream tests that must run without Docker
//!
//! Speaks just enough RESP2 for the stream transport: `PING`, `CLIENT`,
//! `XGROUP`, `XADD`, `XREADGROUP` (with `BLOCK`), `XACK`, `XLEN`. Like Redis,
//! each connection is served strictly in order, so a blocked `XREADGROUP`
//! holds up every later command on the same connection. One consumer group
//! per stream.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Fields = Vec<(String, String)>;

#[derive(Default)]
struct Stream {
    entries: Vec<(String, Fields)>,
    /// Index of the first entry not yet delivered to the group
    next_undelivered: usize,
    /// Delivered but not acknowledged, in delivery order
    pending: Vec<String>,
}

#[derive(Default)]
struct State {
    streams: HashMap<String, Stream>,
    sequence: u64,
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> std::sync::MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A listening fake server; stops when dropped
pub struct FakeRedis {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeRedis {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Redis");
        let addr = listener.local_addr().expect("Fake Redis has no address");
        let state = Shared::default();

        let accept_state = state.clone();
        let server = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, accept_state.clone()));
            }
        });

        tracing::debug!(%addr, "Fake Redis listening");
        Self {
            addr,
            state,
            server,
        }
    }

    pub fn url(&self) -> String {
        format!("redis://{}", self.addr)
    }

    /// Entries currently stored in a stream
    pub fn len(&self, stream: &str) -> usize {
        lock(&self.state)
            .streams
            .get(stream)
            .map_or(0, |s| s.entries.len())
    }

    /// Delivered but unacknowledged entries of a stream
    pub fn pending(&self, stream: &str) -> usize {
        lock(&self.state)
            .streams
            .get(stream)
            .map_or(0, |s| s.pending.len())
    }
}

impl Drop for FakeRedis {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve(socket: TcpStream, state: Shared) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    while let Ok(Some(args)) = read_command(&mut reader).await {
        let reply = execute(&args, &state).await;
        if write.write_all(&reply).await.is_err() {
            break;
        }
    }
}

async fn read_command<R>(reader: &mut R) -> std::io::Result<Option<Vec<String>>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let count = parse_len(&line, '*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len = parse_len(&line, '$')?;

        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(Some(args))
}

fn parse_len(line: &str, prefix: char) -> std::io::Result<usize> {
    line.trim_end()
        .strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, line.to_string()))
}

async fn execute(args: &[String], state: &Shared) -> Vec<u8> {
    let name = args.first().map(|a| a.to_ascii_uppercase()).unwrap_or_default();

    match name.as_str() {
        "PING" => simple("PONG"),
        "XADD" => xadd(args, state),
        "XREADGROUP" => xreadgroup(args, state).await,
        "XACK" => xack(args, state),
        "XLEN" => {
            let stream = arg(args, 1);
            integer(lock(state).streams.get(stream).map_or(0, |s| s.entries.len()))
        }
        // CLIENT SETINFO, XGROUP CREATE and anything else the transport sends
        _ => simple("OK"),
    }
}

fn xadd(args: &[String], state: &Shared) -> Vec<u8> {
    let stream = arg(args, 1).to_string();
    let Some(star) = args.iter().position(|a| a == "*") else {
        return error("ERR fake Redis only supports auto-generated ids");
    };
    let fields = args[star + 1..]
        .chunks(2)
        .filter_map(|pair| match pair {
            [k, v] => Some((k.clone(), v.clone())),
            _ => None,
        })
        .collect();

    let mut state = lock(state);
    state.sequence += 1;
    let id = format!("{}-0", state.sequence);
    state
        .streams
        .entry(stream)
        .or_default()
        .entries
        .push((id.clone(), fields));
    bulk(&id)
}

async fn xreadgroup(args: &[String], state: &Shared) -> Vec<u8> {
    let block = args
        .iter()
        .position(|a| a.eq_ignore_ascii_case("BLOCK"))
        .and_then(|i| args.get(i + 1))
        .and_then(|ms| ms.parse::<u64>().ok());
    let Some(streams_at) = args.iter().position(|a| a.eq_ignore_ascii_case("STREAMS")) else {
        return error("ERR syntax error");
    };
    let stream = arg(args, streams_at + 1).to_string();
    let from = arg(args, streams_at + 2);

    if from != ">" {
        let state = lock(state);
        let entry = state.streams.get(&stream).and_then(|s| {
            let id = s.pending.first()?;
            s.entries.iter().find(|(entry_id, _)| entry_id == id).cloned()
        });
        return read_reply(&stream, entry);
    }

    let deadline = block.map(|ms| Instant::now() + Duration::from_millis(ms));
    loop {
        {
            let mut state = lock(state);
            let s = state.streams.entry(stream.clone()).or_default();
            if let Some(entry) = s.entries.get(s.next_undelivered).cloned() {
                s.next_undelivered += 1;
                s.pending.push(entry.0.clone());
                return read_reply(&stream, Some(entry));
            }
        }

        match deadline {
            Some(deadline) if Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            _ => return b"*-1\r\n".to_vec(),
        }
    }
}

fn xack(args: &[String], state: &Shared) -> Vec<u8> {
    let stream = arg(args, 1);
    let mut state = lock(state);
    let Some(s) = state.streams.get_mut(stream) else {
        return integer(0);
    };

    let before = s.pending.len();
    s.pending.retain(|id| !args[3..].contains(id));
    integer(before - s.pending.len())
}

fn arg(args: &[String], index: usize) -> &str {
    args.get(index).map(String::as_str).unwrap_or_default()
}

/// `[[stream, [[id, [field, value, ...]]]]]`, or an empty entry list
fn read_reply(stream: &str, entry: Option<(String, Fields)>) -> Vec<u8> {
    let mut out = b"*1\r\n*2\r\n".to_vec();
    out.extend(bulk(stream));
    match entry {
        None => out.extend(b"*0\r\n"),
        Some((id, fields)) => {
            out.extend(b"*1\r\n*2\r\n");
            out.extend(bulk(&id));
            out.extend(format!("*{}\r\n", fields.len() * 2).into_bytes());
            for (k, v) in fields {
                out.extend(bulk(&k));
                out.extend(bulk(&v));
            }
        }
    }
    out
}

fn simple(s: &str) -> Vec<u8> {
    format!("+{}\r\n", s).into_bytes()
}

fn error(s: &str) -> Vec<u8> {
    format!("-{}\r\n", s).into_bytes()
}

fn integer(n: usize) -> Vec<u8> {
    format!(":{}\r\n", n).into_bytes()
}

fn bulk(s: &str) -> Vec<u8> {
    format!("${}\r\n{}\r\n", s.len(), s).into_bytes()
}

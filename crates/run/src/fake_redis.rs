//! FakeRedisServer - minimal RESP2 server for running playbook Apps locally
//!
//! Only the hash commands the playbook context uses are implemented. The
//! server runs on its own thread with a current-thread tokio runtime and is
//! shut down when the handle is dropped.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tcex_shared::{Result, TcexError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;

type Hash = BTreeMap<String, String>;
type Database = HashMap<String, Hash>;
type SharedStore = Arc<Mutex<HashMap<u32, Database>>>;

const LOCAL_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "::1", "0.0.0.0"];

/// RESP2 reply
#[derive(Debug, Clone, PartialEq)]
enum Reply {
    Simple(&'static str),
    Error(String),
    Integer(i64),
    Bulk(Option<String>),
    Array(Vec<Reply>),
}

impl Reply {
    fn bulk(value: impl Into<String>) -> Self {
        Reply::Bulk(Some(value.into()))
    }

    fn strings<I: IntoIterator<Item = String>>(items: I) -> Self {
        Reply::Array(items.into_iter().map(Reply::bulk).collect())
    }

    fn wrong_args(command: &str) -> Self {
        Reply::Error(format!(
            "ERR wrong number of arguments for '{}' command",
            command.to_ascii_lowercase()
        ))
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => out.extend_from_slice(format!("+{}\r\n", s).as_bytes()),
            Reply::Error(e) => out.extend_from_slice(format!("-{}\r\n", e).as_bytes()),
            Reply::Integer(i) => out.extend_from_slice(format!(":{}\r\n", i).as_bytes()),
            Reply::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
            Reply::Bulk(Some(s)) => {
                out.extend_from_slice(format!("${}\r\n", s.len()).as_bytes());
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Array(items) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode(out);
                }
            }
        }
    }
}

/// Per-connection state
struct Session {
    db: u32,
    store: SharedStore,
}

impl Session {
    /// Execute one command, returning the reply and whether to close
    fn execute(&mut self, args: &[String]) -> (Reply, bool) {
        let Some(command) = args.first().map(|c| c.to_ascii_uppercase()) else {
            return (Reply::Error("ERR empty command".to_string()), false);
        };
        let rest = &args[1..];

        let reply = match command.as_str() {
            "PING" => match rest {
                [] => Reply::Simple("PONG"),
                [msg] => Reply::bulk(msg.clone()),
                _ => Reply::wrong_args(&command),
            },
            "ECHO" => match rest {
                [msg] => Reply::bulk(msg.clone()),
                _ => Reply::wrong_args(&command),
            },
            "SELECT" => match rest {
                [db] => match db.parse::<u32>() {
                    Ok(db) => {
                        self.db = db;
                        Reply::Simple("OK")
                    }
                    Err(_) => Reply::Error("ERR invalid DB index".to_string()),
                },
                _ => Reply::wrong_args(&command),
            },
            "QUIT" => return (Reply::Simple("OK"), true),
            "CLIENT" => Reply::Simple("OK"),
            "INFO" => Reply::bulk("# Server\r\nredis_version:7.0.0\r\nredis_mode:standalone\r\n"),
            "COMMAND" => Reply::Array(Vec::new()),
            _ => self.execute_data(&command, rest),
        };
        (reply, false)
    }

    /// Commands that touch the store
    fn execute_data(&mut self, command: &str, args: &[String]) -> Reply {
        let Ok(mut store) = self.store.lock() else {
            return Reply::Error("ERR store unavailable".to_string());
        };
        if command == "FLUSHALL" {
            store.clear();
            return Reply::Simple("OK");
        }
        let db = store.entry(self.db).or_default();

        match (command, args) {
            ("HSET", [key, pairs @ ..]) if !pairs.is_empty() && pairs.len() % 2 == 0 => {
                let hash = db.entry(key.clone()).or_default();
                let added = pairs
                    .chunks(2)
                    .filter(|pair| hash.insert(pair[0].clone(), pair[1].clone()).is_none())
                    .count();
                Reply::Integer(added as i64)
            }
            ("HGET", [key, field]) => {
                Reply::Bulk(db.get(key).and_then(|h| h.get(field)).cloned())
            }
            ("HGETALL", [key]) => Reply::strings(
                db.get(key)
                    .into_iter()
                    .flatten()
                    .flat_map(|(f, v)| [f.clone(), v.clone()]),
            ),
            ("HDEL", [key, fields @ ..]) if !fields.is_empty() => {
                let Some(hash) = db.get_mut(key) else {
                    return Reply::Integer(0);
                };
                let removed = fields.iter().filter(|f| hash.remove(*f).is_some()).count();
                if hash.is_empty() {
                    db.remove(key);
                }
                Reply::Integer(removed as i64)
            }
            ("HKEYS", [key]) => {
                Reply::strings(db.get(key).into_iter().flat_map(|h| h.keys().cloned()))
            }
            ("HLEN", [key]) => Reply::Integer(db.get(key).map_or(0, |h| h.len()) as i64),
            ("DEL", keys) if !keys.is_empty() => {
                Reply::Integer(keys.iter().filter(|k| db.remove(*k).is_some()).count() as i64)
            }
            ("EXISTS", keys) if !keys.is_empty() => {
                Reply::Integer(keys.iter().filter(|k| db.contains_key(*k)).count() as i64)
            }
            ("KEYS", [pattern]) => match glob::Pattern::new(pattern) {
                Ok(pattern) => {
                    let mut keys: Vec<String> =
                        db.keys().filter(|k| pattern.matches(k)).cloned().collect();
                    keys.sort();
                    Reply::strings(keys)
                }
                Err(_) => Reply::Error("ERR invalid pattern".to_string()),
            },
            ("FLUSHDB", []) => {
                db.clear();
                Reply::Simple("OK")
            }
            ("HSET" | "HGET" | "HGETALL" | "HDEL" | "HKEYS" | "HLEN" | "DEL" | "EXISTS"
            | "KEYS" | "FLUSHDB", _) => Reply::wrong_args(command),
            _ => Reply::Error(format!("ERR unknown command '{}'", command.to_ascii_lowercase())),
        }
    }
}

/// Most arguments accepted in one multibulk request
const MAX_MULTIBULK_LEN: usize = 1024 * 1024;

/// Largest bulk string accepted, 512 MiB
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

fn protocol_error(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

/// Read one request in multibulk or inline form. None at end of stream.
async fn read_request<R>(reader: &mut R) -> io::Result<Option<Vec<String>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let line = line.trim_end();
    let Some(count) = line.strip_prefix('*') else {
        return Ok(Some(line.split_whitespace().map(String::from).collect()));
    };

    let count: usize = count
        .parse()
        .ok()
        .filter(|&n| n <= MAX_MULTIBULK_LEN)
        .ok_or_else(|| protocol_error("invalid multibulk length"))?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let mut header = String::new();
        reader.read_line(&mut header).await?;
        let len: usize = header
            .trim_end()
            .strip_prefix('$')
            .and_then(|l| l.parse::<usize>().ok())
            .ok_or_else(|| protocol_error("expected '$'"))?;
        if len > MAX_BULK_LEN {
            return Err(protocol_error("invalid bulk length"));
        }
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

async fn serve_connection(stream: tokio::net::TcpStream, store: SharedStore) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut session = Session { db: 0, store };

    loop {
        let args = match read_request(&mut reader).await {
            Ok(Some(args)) => args,
            Ok(None) => break,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                tracing::debug!(action = "fake-redis", error = %e, "closing connection on protocol error");
                let mut out = Vec::new();
                Reply::Error(format!("ERR Protocol error: {}", e)).encode(&mut out);
                writer.write_all(&out).await?;
                break;
            }
            Err(e) => return Err(e),
        };
        if args.is_empty() {
            continue;
        }
        let (reply, close) = session.execute(&args);
        let mut out = Vec::new();
        reply.encode(&mut out);
        writer.write_all(&out).await?;
        if close {
            break;
        }
    }
    Ok(())
}

/// Fake Redis server
pub struct FakeRedisServer;

impl FakeRedisServer {
    /// Bind `addr` and serve on a background thread
    pub fn start(addr: &str) -> Result<FakeRedisHandle> {
        let listener = std::net::TcpListener::bind(addr)
            .map_err(|e| TcexError::KvStore(format!("Failed to bind {}: {}", addr, e)))?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let store = SharedStore::default();

        let thread = std::thread::Builder::new()
            .name("fake-redis".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            tracing::error!(action = "fake-redis", error = %e, "listener setup failed");
                            return;
                        }
                    };
                    loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => break,
                            accepted = listener.accept() => match accepted {
                                Ok((stream, peer)) => {
                                    tracing::trace!(action = "fake-redis", %peer, "connection");
                                    let store = store.clone();
                                    tokio::spawn(async move {
                                        if let Err(e) = serve_connection(stream, store).await {
                                            tracing::debug!(action = "fake-redis", error = %e, "connection closed");
                                        }
                                    });
                                }
                                Err(e) => tracing::warn!(action = "fake-redis", error = %e, "accept failed"),
                            },
                        }
                    }
                });
            })?;

        tracing::info!(action = "fake-redis", addr = %local_addr, "fake Redis server started");
        Ok(FakeRedisHandle {
            addr: local_addr,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

/// Running fake server. Dropping it stops the server.
pub struct FakeRedisHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeRedisHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for FakeRedisHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        tracing::debug!(action = "fake-redis", addr = %self.addr, "fake Redis server stopped");
    }
}

/// Start a fake server when nothing is listening on a local `host:port`
pub fn ensure_kvstore(host: &str, port: u16) -> Option<FakeRedisHandle> {
    if is_listening(host, port) {
        tracing::debug!(action = "fake-redis", host, port, "Redis already running");
        return None;
    }
    if !LOCAL_HOSTS.contains(&host) {
        tracing::warn!(action = "fake-redis", host, port, "Redis not reachable on a remote host");
        return None;
    }

    let bind_host = if host == "localhost" { "127.0.0.1" } else { host };
    let addr = if bind_host.contains(':') {
        format!("[{}]:{}", bind_host, port)
    } else {
        format!("{}:{}", bind_host, port)
    };
    match FakeRedisServer::start(&addr) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(action = "fake-redis", error = %e, "could not start fake Redis server");
            None
        }
    }
}

fn is_listening(host: &str, port: u16) -> bool {
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        return false;
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvstore::{KvStore, RedisKvStore};
    use std::io::{BufRead, BufReader as StdBufReader, Read, Write};

    fn session() -> Session {
        Session {
            db: 0,
            store: SharedStore::default(),
        }
    }

    fn run(session: &mut Session, line: &str) -> Reply {
        let args: Vec<String> = line.split_whitespace().map(String::from).collect();
        session.execute(&args).0
    }

    // ============== Commands ==============

    #[test]
    fn test_hash_commands() {
        let mut s = session();
        assert_eq!(run(&mut s, "HSET ctx a 1 b 2"), Reply::Integer(2));
        assert_eq!(run(&mut s, "HSET ctx a 3"), Reply::Integer(0));
        assert_eq!(run(&mut s, "HGET ctx a"), Reply::bulk("3"));
        assert_eq!(run(&mut s, "HGET ctx zz"), Reply::Bulk(None));
        assert_eq!(run(&mut s, "HLEN ctx"), Reply::Integer(2));
        assert_eq!(
            run(&mut s, "HGETALL ctx"),
            Reply::strings(["a", "3", "b", "2"].map(String::from))
        );
        assert_eq!(run(&mut s, "HKEYS ctx"), Reply::strings(["a", "b"].map(String::from)));
        assert_eq!(run(&mut s, "HDEL ctx a zz"), Reply::Integer(1));
        assert_eq!(run(&mut s, "HDEL ctx b"), Reply::Integer(1));
        assert_eq!(run(&mut s, "EXISTS ctx"), Reply::Integer(0));
    }

    #[test]
    fn test_keys_del_and_flush() {
        let mut s = session();
        run(&mut s, "HSET ctx-1 a 1");
        run(&mut s, "HSET ctx-2 a 1");
        run(&mut s, "HSET other a 1");
        assert_eq!(
            run(&mut s, "KEYS ctx-*"),
            Reply::strings(["ctx-1", "ctx-2"].map(String::from))
        );
        assert_eq!(run(&mut s, "DEL ctx-1 nope"), Reply::Integer(1));
        assert_eq!(run(&mut s, "EXISTS ctx-1 ctx-2 other"), Reply::Integer(2));
        assert_eq!(run(&mut s, "FLUSHDB"), Reply::Simple("OK"));
        assert_eq!(run(&mut s, "KEYS *"), Reply::Array(Vec::new()));
    }

    #[test]
    fn test_select_namespaces() {
        let mut s = session();
        run(&mut s, "HSET ctx a 1");
        assert_eq!(run(&mut s, "SELECT 3"), Reply::Simple("OK"));
        assert_eq!(run(&mut s, "HGET ctx a"), Reply::Bulk(None));
        run(&mut s, "HSET ctx a 2");
        run(&mut s, "SELECT 0");
        assert_eq!(run(&mut s, "HGET ctx a"), Reply::bulk("1"));
        assert!(matches!(run(&mut s, "SELECT x"), Reply::Error(_)));

        assert_eq!(run(&mut s, "FLUSHALL"), Reply::Simple("OK"));
        run(&mut s, "SELECT 3");
        assert_eq!(run(&mut s, "HLEN ctx"), Reply::Integer(0));
    }

    #[test]
    fn test_misc_commands() {
        let mut s = session();
        assert_eq!(run(&mut s, "ping"), Reply::Simple("PONG"));
        assert_eq!(run(&mut s, "ECHO hi"), Reply::bulk("hi"));
        assert_eq!(run(&mut s, "CLIENT SETNAME x"), Reply::Simple("OK"));
        assert_eq!(run(&mut s, "COMMAND"), Reply::Array(Vec::new()));
        assert_eq!(
            run(&mut s, "FROB x"),
            Reply::Error("ERR unknown command 'frob'".to_string())
        );
        assert_eq!(
            run(&mut s, "HSET ctx a"),
            Reply::Error("ERR wrong number of arguments for 'hset' command".to_string())
        );
        let args = vec!["QUIT".to_string()];
        assert!(s.execute(&args).1);
    }

    #[test]
    fn test_encode() {
        let mut out = Vec::new();
        Reply::Array(vec![Reply::bulk("ab"), Reply::Bulk(None), Reply::Integer(4)]).encode(&mut out);
        assert_eq!(out, b"*3\r\n$2\r\nab\r\n$-1\r\n:4\r\n");
    }

    // ============== Server ==============

    fn read_reply(reader: &mut StdBufReader<std::net::TcpStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if let Some(len) = line.trim_end().strip_prefix('$') {
            let len: i64 = len.parse().unwrap();
            if len < 0 {
                return line;
            }
            let mut buf = vec![0u8; len as usize + 2];
            reader.read_exact(&mut buf).unwrap();
            line.push_str(&String::from_utf8_lossy(&buf));
        }
        line
    }

    #[test]
    fn test_raw_resp_round_trip() {
        let handle = FakeRedisServer::start("127.0.0.1:0").unwrap();
        let mut stream = std::net::TcpStream::connect(handle.addr()).unwrap();
        let mut reader = StdBufReader::new(stream.try_clone().unwrap());

        stream
            .write_all(b"*4\r\n$4\r\nHSET\r\n$3\r\nctx\r\n$5\r\nfield\r\n$7\r\n\"value\"\r\n")
            .unwrap();
        assert_eq!(read_reply(&mut reader), ":1\r\n");

        stream
            .write_all(b"*3\r\n$4\r\nHGET\r\n$3\r\nctx\r\n$5\r\nfield\r\n")
            .unwrap();
        assert_eq!(read_reply(&mut reader), "$7\r\n\"value\"\r\n");

        stream.write_all(b"HGETALL ctx\r\n").unwrap();
        assert_eq!(read_reply(&mut reader), "*2\r\n");
        assert_eq!(read_reply(&mut reader), "$5\r\nfield\r\n");
        assert_eq!(read_reply(&mut reader), "$7\r\n\"value\"\r\n");

        stream.write_all(b"PING\r\n").unwrap();
        assert_eq!(read_reply(&mut reader), "+PONG\r\n");
    }

    #[test]
    fn test_oversized_requests_close_only_that_connection() {
        let handle = FakeRedisServer::start("127.0.0.1:0").unwrap();

        for request in [
            &b"*99999999999999\r\n"[..],
            &b"*1\r\n$99999999999999\r\n"[..],
            &b"*2\r\nPING\r\n"[..],
        ] {
            let mut stream = std::net::TcpStream::connect(handle.addr()).unwrap();
            let mut reader = StdBufReader::new(stream.try_clone().unwrap());
            stream.write_all(request).unwrap();
            assert!(read_reply(&mut reader).starts_with("-ERR Protocol error"));
            let mut rest = String::new();
            assert_eq!(reader.read_line(&mut rest).unwrap_or(0), 0);
        }

        let mut stream = std::net::TcpStream::connect(handle.addr()).unwrap();
        let mut reader = StdBufReader::new(stream.try_clone().unwrap());
        stream.write_all(b"PING\r\n").unwrap();
        assert_eq!(read_reply(&mut reader), "+PONG\r\n");
    }

    #[test]
    fn test_redis_client_against_fake_server() {
        let handle = FakeRedisServer::start("127.0.0.1:0").unwrap();
        let store = RedisKvStore::connect("127.0.0.1", handle.addr().port(), 2).unwrap();

        assert!(store.hset("ctx", "#App:1:a!String", "\"x\"").unwrap());
        assert_eq!(
            store.hget("ctx", "#App:1:a!String").unwrap().as_deref(),
            Some("\"x\"")
        );
        assert_eq!(store.hgetall("ctx").unwrap().len(), 1);
    }

    #[test]
    fn test_drop_stops_server() {
        let handle = FakeRedisServer::start("127.0.0.1:0").unwrap();
        let addr = handle.addr();
        drop(handle);
        assert!(std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_ensure_kvstore_skips_running_server() {
        let handle = FakeRedisServer::start("127.0.0.1:0").unwrap();
        assert!(ensure_kvstore("127.0.0.1", handle.addr().port()).is_none());
    }
}

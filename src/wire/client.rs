//! Socket client for the feature store and matcher
//!
//! One connection per exchange. Every connect, read and write is bounded by the
//! configured timeouts; expiry surfaces as a network failure.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::TouchprintError;
use crate::stroke::FeatureRecord;
use crate::wire::codec::{
    content_length, encode_auth_request, encode_count, encode_store, header_end,
    interpret_auth_response, parse_count, parse_http_response, MAX_RESPONSE_BYTES,
};
use crate::wire::{AuthVerdict, MatchService};

/// Blocking client speaking the store and matcher protocols
#[derive(Debug, Clone)]
pub struct WireClient {
    config: ClientConfig,
}

impl WireClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn connect(&self, addr: &str) -> Result<TcpStream, TouchprintError> {
        let candidates: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|e| TouchprintError::NetworkFailure(format!("cannot resolve {addr}: {e}")))?
            .collect();
        if candidates.is_empty() {
            return Err(TouchprintError::NetworkFailure(format!(
                "{addr} resolved to no addresses"
            )));
        }

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.config.connect_timeout()) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.config.read_timeout()))?;
                    stream.set_write_timeout(Some(self.config.write_timeout()))?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }
        let err = last_err.map(|e| e.to_string()).unwrap_or_default();
        Err(TouchprintError::NetworkFailure(format!(
            "failed to connect to {addr}: {err}"
        )))
    }

    /// Write one framed payload and read one response buffer
    fn exchange(&self, payload: &str) -> Result<String, TouchprintError> {
        let mut stream = self.connect(&self.config.store_addr)?;
        stream
            .write_all(payload.as_bytes())
            .map_err(|e| network("failed to write request", e))?;
        stream.flush().ok();
        // Signal end of request; some stores read until EOF
        let _ = stream.shutdown(Shutdown::Write);

        // The store answers with a single write and may keep the socket open
        let raw = read_until(&mut stream, |buf| !buf.is_empty())?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl MatchService for WireClient {
    fn store(&self, record: &FeatureRecord) -> Result<String, TouchprintError> {
        let payload = encode_store(record)?;
        let response = self.exchange(&payload)?;
        debug!(
            user_id = record.user_id,
            response = %response.trim(),
            "Feature record stored"
        );
        Ok(response)
    }

    fn count(&self, user_id: i64) -> Result<u64, TouchprintError> {
        let response = self.exchange(&encode_count(user_id))?;
        let count = parse_count(&response)?;
        debug!(user_id, count, "Fetched stored stroke count");
        Ok(count)
    }

    fn authenticate(&self, record: &FeatureRecord) -> Result<AuthVerdict, TouchprintError> {
        let request_id = Uuid::new_v4().to_string();
        let request = encode_auth_request(
            &self.config.auth_addr,
            &self.config.auth_path,
            record,
            &request_id,
        )?;

        let mut stream = self.connect(&self.config.auth_addr)?;
        stream
            .write_all(&request)
            .map_err(|e| network("failed to write authentication request", e))?;
        stream.flush().ok();

        let raw = read_until(&mut stream, http_response_complete)?;
        let response = parse_http_response(&raw)?;
        if !response.is_success() {
            warn!(
                user_id = record.user_id,
                status = response.status,
                request_id = %request_id,
                "Matcher returned non-success status"
            );
        }
        let verdict = interpret_auth_response(&response)?;
        debug!(
            user_id = record.user_id,
            matched = verdict.matched,
            request_id = %request_id,
            "Authentication verdict received"
        );
        Ok(verdict)
    }
}

fn network(context: &str, err: std::io::Error) -> TouchprintError {
    TouchprintError::NetworkFailure(format!("{context}: {err}"))
}

/// Read until EOF, until `complete` says the buffer holds a full response, or
/// until the size cap is exceeded.
fn read_until(
    stream: &mut TcpStream,
    complete: impl Fn(&[u8]) -> bool,
) -> Result<Vec<u8>, TouchprintError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_RESPONSE_BYTES {
                    return Err(TouchprintError::ProtocolFailure(
                        "response exceeded maximum size".to_string(),
                    ));
                }
                if complete(&buffer) {
                    break;
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(TouchprintError::NetworkFailure(
                    "timed out waiting for response".to_string(),
                ));
            }
            Err(err) => return Err(network("failed to read response", err)),
        }
    }

    Ok(buffer)
}

fn http_response_complete(buf: &[u8]) -> bool {
    let Some(end) = header_end(buf) else {
        return false;
    };
    let Ok(head) = std::str::from_utf8(&buf[..end]) else {
        return false;
    };
    match content_length(head) {
        Some(len) => buf.len() - end >= len,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{FeatureExtractor, Stroke, TouchSample};
    use crate::wire::codec::{decode_request, WireRequest};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn record(user_id: i64) -> FeatureRecord {
        let stroke = Stroke::from_samples(vec![
            TouchSample::at(0.0, 0.0, 0).with_pressure(0.5),
            TouchSample::at(0.0, 10.0, 50).with_pressure(0.4),
        ]);
        FeatureExtractor::default().extract(user_id, &stroke)
    }

    /// Accept one connection, hand the received bytes to the test, reply with `reply`
    fn one_shot_server(
        reply: &'static [u8],
        read_to_eof: bool,
    ) -> (String, mpsc::Receiver<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        received.extend_from_slice(&chunk[..n]);
                        if !read_to_eof && http_response_complete(&received) {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = stream.write_all(reply);
            let _ = tx.send(received);
        });

        (addr, rx)
    }

    fn client(store_addr: &str, auth_addr: &str) -> WireClient {
        WireClient::new(ClientConfig {
            store_addr: store_addr.to_string(),
            auth_addr: auth_addr.to_string(),
            connect_timeout_ms: 2_000,
            read_timeout_ms: 2_000,
            write_timeout_ms: 2_000,
            ..ClientConfig::default()
        })
    }

    fn refused_addr() -> String {
        // Bind then drop to obtain a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    #[test]
    fn test_store_sends_framed_record() {
        let (addr, rx) = one_shot_server(b"OK", true);
        let rec = record(7);
        let response = client(&addr, &addr).store(&rec).unwrap();
        assert_eq!(response, "OK");

        let received = String::from_utf8(rx.recv().unwrap()).unwrap();
        assert_eq!(decode_request(&received).unwrap(), WireRequest::Store(rec));
    }

    #[test]
    fn test_count_parses_plain_text() {
        let (addr, rx) = one_shot_server(b"23\n", true);
        assert_eq!(client(&addr, &addr).count(5).unwrap(), 23);
        assert_eq!(rx.recv().unwrap(), b"FCOUNT|5".to_vec());
    }

    #[test]
    fn test_count_returns_first_buffer_while_socket_stays_open() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let _ = stream.read_to_end(&mut request);
            stream.write_all(b"23").unwrap();
            thread::sleep(Duration::from_millis(1_500));
        });

        let wire = WireClient::new(ClientConfig {
            store_addr: addr.clone(),
            auth_addr: addr,
            read_timeout_ms: 500,
            ..ClientConfig::default()
        });
        let started = Instant::now();
        assert_eq!(wire.count(5).unwrap(), 23);
        assert!(started.elapsed() < Duration::from_millis(500));
        server.join().unwrap();
    }

    #[test]
    fn test_count_garbage_is_protocol_failure() {
        let (addr, _rx) = one_shot_server(b"abc", true);
        assert!(matches!(
            client(&addr, &addr).count(5),
            Err(TouchprintError::ProtocolFailure(_))
        ));
    }

    #[test]
    fn test_count_unreachable_is_network_failure() {
        let addr = refused_addr();
        assert!(matches!(
            client(&addr, &addr).count(5),
            Err(TouchprintError::NetworkFailure(_))
        ));
    }

    #[test]
    fn test_authenticate_posts_to_user_path() {
        let reply: &'static [u8] = concat!(
            "HTTP/1.1 200 OK\r\nContent-Length: 37\r\n\r\n",
            "{\"match\":\"true\",\"message\":\"verified\"}"
        )
        .as_bytes();
        let (addr, rx) = one_shot_server(reply, false);
        let verdict = client(&addr, &addr).authenticate(&record(11)).unwrap();
        assert!(verdict.matched);
        assert_eq!(verdict.message, "verified");

        let received = String::from_utf8(rx.recv().unwrap()).unwrap();
        assert!(received.starts_with("POST /authenticate/11 HTTP/1.1\r\n"));
        assert!(received.contains("\"userID\":11"));
    }

    #[test]
    fn test_authenticate_server_fault() {
        let reply: &'static [u8] =
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\n\r\nboom";
        let (addr, _rx) = one_shot_server(reply, false);
        assert!(matches!(
            client(&addr, &addr).authenticate(&record(1)),
            Err(TouchprintError::ServerFault { status: 500, .. })
        ));
    }

    #[test]
    fn test_authenticate_unreachable() {
        let addr = refused_addr();
        assert!(matches!(
            client(&addr, &addr).authenticate(&record(1)),
            Err(TouchprintError::NetworkFailure(_))
        ));
    }
}

use std::{
    io::{ErrorKind, Read},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use nalgebra::Vector3;
use shared_definitions::interpreted::InterpretedTarget;

use crate::{
    config::constants::{NETWORK_DEFAULT_PORT, NETWORK_MESSAGE_PREFIX},
    control::control_loops::{RoutineHandle, RoutineRequest},
    util::error::{AppError, AppResult},
};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const CONNECTION_READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Well above the longest valid line.
const MAX_LINE_BYTES: usize = 1024;

/// Parses `PositionSystemInterpreted px py pz nx ny nz [tx ty tz]`.
///
/// Anything else, including non-finite numbers, yields `None`.
pub fn parse_interpreted_line(line: &str) -> Option<InterpretedTarget> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != NETWORK_MESSAGE_PREFIX {
        return None;
    }

    let mut values = [0.0_f32; 9];
    let mut count = 0;
    for token in tokens {
        if count == values.len() {
            return None;
        }
        let value: f32 = token.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        values[count] = value;
        count += 1;
    }

    let vector_at = |start: usize| Vector3::new(values[start], values[start + 1], values[start + 2]);
    match count {
        6 => Some(InterpretedTarget::direct(vector_at(0), vector_at(3), None)),
        9 => Some(InterpretedTarget::direct(
            vector_at(0),
            vector_at(3),
            Some(vector_at(6)),
        )),
        _ => None,
    }
}

/// TCP endpoint that turns incoming text lines into direct targets for the routine.
pub struct NetworkListener {
    local_addr: SocketAddr,
    stop_requested: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl NetworkListener {
    pub fn bind(address: impl ToSocketAddrs + ToString, routine: RoutineHandle) -> AppResult<Self> {
        let bind_error = |source| AppError::NetworkBind {
            address: address.to_string(),
            source,
        };
        let listener = TcpListener::bind(&address).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        log::info!("Listening for interpreted targets on {}", local_addr);

        let stop_requested = Arc::new(AtomicBool::new(false));
        let accept_thread = {
            let stop_requested = stop_requested.clone();
            thread::Builder::new()
                .name("network-listener".into())
                .spawn(move || accept_loop(listener, routine, stop_requested))
                .map_err(|source| AppError::ThreadSpawn {
                    name: "network-listener",
                    source,
                })?
        };

        Ok(NetworkListener {
            local_addr,
            stop_requested,
            accept_thread: Some(accept_thread),
        })
    }

    /// Listens on every interface at the well known port.
    pub fn bind_default(routine: RoutineHandle) -> AppResult<Self> {
        Self::bind(format!("0.0.0.0:{}", NETWORK_DEFAULT_PORT), routine)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::Release);
        if let Some(accept_thread) = self.accept_thread.take() {
            if accept_thread.join().is_err() {
                log::error!("Network listener thread panicked");
            }
        }
    }
}

impl Drop for NetworkListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: TcpListener, routine: RoutineHandle, stop_requested: Arc<AtomicBool>) {
    let mut connections = Vec::new();

    while !stop_requested.load(Ordering::Acquire) && !routine.is_finished() {
        match listener.accept() {
            Ok((stream, peer)) => {
                log::info!("Network client connected from {}", peer);
                let routine = routine.clone();
                let stop_requested = stop_requested.clone();
                let spawned = thread::Builder::new()
                    .name("network-connection".into())
                    .spawn(move || serve_connection(stream, peer, routine, stop_requested));
                match spawned {
                    Ok(connection) => connections.push(connection),
                    Err(error) => log::error!("Could not serve {}: {}", peer, error),
                }
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL)
            }
            Err(error) => {
                log::error!("Network accept failed: {}", error);
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
        connections.retain(|connection: &JoinHandle<()>| !connection.is_finished());
    }

    for connection in connections {
        let _ = connection.join();
    }
}

fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    routine: RoutineHandle,
    stop_requested: Arc<AtomicBool>,
) {
    if let Err(error) = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(Some(CONNECTION_READ_TIMEOUT)))
    {
        log::error!("Could not configure connection from {}: {}", peer, error);
        return;
    }

    let mut lines = LineBuffer::default();
    let mut chunk = [0_u8; 512];

    while !stop_requested.load(Ordering::Acquire) {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => {
                for line in lines.push(&chunk[..read]) {
                    if !forward_line(&line, &routine) {
                        log::info!("Routine gone, closing connection from {}", peer);
                        return;
                    }
                }
            }
            Err(error)
                if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => {
                log::error!("Network read from {} failed: {}", peer, error);
                break;
            }
        }
    }

    log::info!("Network client {} disconnected", peer);
}

/// Splits a byte stream into newline terminated lines, dropping lines over [`MAX_LINE_BYTES`].
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineBuffer {
    fn push(&mut self, mut bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();

        while !bytes.is_empty() {
            let (segment, terminated) = match bytes.iter().position(|&byte| byte == b'\n') {
                Some(newline) => {
                    let segment = &bytes[..newline];
                    bytes = &bytes[newline + 1..];
                    (segment, true)
                }
                None => {
                    let segment = bytes;
                    bytes = &[];
                    (segment, false)
                }
            };

            if !self.discarding {
                self.pending.extend_from_slice(segment);
                if self.pending.len() > MAX_LINE_BYTES {
                    log::trace!("Dropped network line longer than {} bytes", MAX_LINE_BYTES);
                    self.pending.clear();
                    self.discarding = true;
                }
            }

            if terminated {
                if !self.discarding {
                    lines.push(std::mem::take(&mut self.pending));
                }
                self.discarding = false;
            }
        }

        lines
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Returns false once the routine can no longer receive requests.
fn forward_line(line: &[u8], routine: &RoutineHandle) -> bool {
    let text = String::from_utf8_lossy(line);
    match parse_interpreted_line(text.trim_end()) {
        Some(target) => routine.send(RoutineRequest::DirectTarget(target)).is_ok(),
        None => {
            log::trace!("Dropped malformed network line {:?}", text);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Arc, time::Instant};

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        communication_interfaces::{
            capture::{CaptureBackend, NoRuntimeSession},
            transmitter::Transmitter,
        },
        config::settings::RoutineConfig,
        control::control_loops::{Routine, RoutineCollaborators},
        shared_core_values::AtomicTelemetry,
    };
    use shared_definitions::{
        extraction::{ExtractionCoordinates, ExtractionResult},
        robotics::RoboticsCoordinates,
    };

    #[test]
    fn parses_six_float_line() {
        let target = parse_interpreted_line("PositionSystemInterpreted 0.1 0.2 0.3 0 0 2").unwrap();
        assert!(target.has_target);
        assert!(target.has_normal);
        assert!(!target.has_tangent);
        assert_relative_eq!(target.position, Vector3::new(0.1, 0.2, 0.3));
        assert_relative_eq!(target.normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn parses_tangent_from_last_three_tokens() {
        let target =
            parse_interpreted_line("PositionSystemInterpreted 0 0 0 0 1 0 3 0 0").unwrap();
        assert!(target.has_tangent);
        assert_relative_eq!(target.tangent, Vector3::new(1.0, 0.0, 0.0));
        assert!(!target.is_hole);
        assert!(!target.is_ring);
    }

    #[test]
    fn drops_malformed_lines() {
        assert!(parse_interpreted_line("").is_none());
        assert!(parse_interpreted_line("PositionSystemInterpreted").is_none());
        assert!(parse_interpreted_line("PositionSystemInterpreted 1 2 3 4 5").is_none());
        assert!(parse_interpreted_line("PositionSystemInterpreted 1 2 3 4 5 6 7").is_none());
        assert!(parse_interpreted_line("PositionSystemInterpreted 1 2 3 4 5 6 7 8 9 10").is_none());
        assert!(parse_interpreted_line("PositionSystemInterpreted 1 2 x 4 5 6").is_none());
        assert!(parse_interpreted_line("PositionSystemInterpreted 1 2 NaN 4 5 6").is_none());
        assert!(parse_interpreted_line("OtherPrefix 1 2 3 4 5 6").is_none());
    }

    #[test]
    fn line_buffer_joins_split_lines() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"first pa").is_empty());
        assert_eq!(
            buffer.push(b"rt\nsecond\nthi"),
            vec![b"first part".to_vec(), b"second".to_vec()]
        );
        assert_eq!(buffer.pending_len(), 3);
    }

    #[test]
    fn line_buffer_bounds_unterminated_input() {
        let mut buffer = LineBuffer::default();
        let noise = [b'x'; 512];
        for _ in 0..64 {
            assert!(buffer.push(&noise).is_empty());
            assert!(buffer.pending_len() <= MAX_LINE_BYTES);
        }

        // The rest of the oversized line is dropped, the next one comes through.
        assert_eq!(
            buffer.push(b"tail\nPositionSystemInterpreted 0 0 0 0 1 0\n"),
            vec![b"PositionSystemInterpreted 0 0 0 0 1 0".to_vec()]
        );
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn tolerates_extra_whitespace() {
        assert!(parse_interpreted_line("  PositionSystemInterpreted  1 2 3\t4 5 6  ").is_some());
    }

    struct NoCapture;

    impl CaptureBackend for NoCapture {
        fn extract(&mut self, _: &ExtractionCoordinates) -> ExtractionResult {
            ExtractionResult::failed()
        }
    }

    struct ClosedTransmitter;

    impl Transmitter for ClosedTransmitter {
        fn is_open(&self) -> bool {
            false
        }
        fn open(&mut self) -> AppResult<()> {
            Err(AppError::TransmitterClosed)
        }
        fn close(&mut self) {}
        fn provide_new_target(&mut self, _: &RoboticsCoordinates) {}
        fn update(&mut self, _: u64) {}
    }

    #[test]
    fn forwards_lines_received_over_tcp() {
        let (mut routine, handle) = Routine::new(
            RoutineConfig::default(),
            RoutineCollaborators {
                vr_capture: Box::new(NoCapture),
                window_capture: Box::new(NoCapture),
                runtime: Box::new(NoRuntimeSession),
                transmitter: Box::new(ClosedTransmitter),
            },
            Arc::new(AtomicTelemetry::new()),
        );
        let mut listener = NetworkListener::bind("127.0.0.1:0", handle).unwrap();

        let mut client = TcpStream::connect(listener.local_addr()).unwrap();
        client
            .write_all(b"garbage\nPositionSystemInterpreted 0.25 0.5 ")
            .unwrap();
        client.write_all(b"0 0 0 1\n").unwrap();
        client.flush().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !routine.interpreted().has_target && Instant::now() < deadline {
            routine.tick();
            thread::sleep(Duration::from_millis(10));
        }

        assert!(routine.interpreted().has_target);
        assert_relative_eq!(routine.interpreted().position, Vector3::new(0.25, 0.5, 0.0));
        drop(client);
        listener.stop();
    }
}

use std::time::Duration;

/// Largest datagram either side puts on the wire.
pub const PACKET_SIZE: usize = 1024;
/// Width of the big-endian signed sequence-id prefix.
pub const SEQ_ID_SIZE: usize = 4;
/// Maximum payload bytes carried by one segment.
pub const MESSAGE_SIZE: usize = PACKET_SIZE - SEQ_ID_SIZE;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5002";
pub const DEFAULT_PEER_ADDR: &str = "127.0.0.1:5001";
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 1000;

/// Window capacity of the fixed sliding-window sender, in segments.
pub const FIXED_WINDOW_SIZE: usize = 100;

/// Weight of the previous estimate in Reno's smoothed RTT.
pub const RENO_RTT_ALPHA: f64 = 0.85;
/// Reno's slow-start threshold at transfer start.
pub const RENO_INITIAL_SSTHRESH: u32 = 64;
/// Reno derives its retransmission timeout as this multiple of the estimate.
pub const RENO_TIMEOUT_FACTOR: f64 = 100.0;
/// How long Reno keeps polling the socket for stale duplicates after a fast
/// retransmit.
pub const ACK_DRAIN_WINDOW: Duration = Duration::from_millis(50);

/// Weight of the previous estimate in Vegas's smoothed RTT.
pub const VEGAS_RTT_GAMMA: f64 = 0.85;
/// Throughput deltas below this grow the Vegas window.
pub const VEGAS_ALPHA: f64 = 20.0;
/// Throughput deltas above this shrink the Vegas window.
pub const VEGAS_BETA: f64 = 40.0;
/// Expected-minus-actual throughput gap that ends Vegas slow start.
pub const VEGAS_DELTA: f64 = 1000.0;
/// Rate tolerance of the Vegas timeout heuristic.
pub const VEGAS_EPSILON: f64 = 0.8;
/// Vegas never moves its retransmission timeout.
pub const VEGAS_FIXED_TIMEOUT: Duration = Duration::from_secs(1);

/// RTT samples at or below this are treated as clock noise when tracking the
/// base RTT.
pub const MIN_RTT_SAMPLE: Duration = Duration::from_micros(100);

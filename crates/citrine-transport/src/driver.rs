//! Windowed transfer driver shared by the fixed, Reno and Vegas senders.

use crate::congestion::{AckReaction, CcState, CongestionControl, TimeoutReaction};
use crate::consts::{ACK_DRAIN_WINDOW, PACKET_SIZE};
use crate::error::{TransferError, TransferResult};
use crate::metrics::{TransferMetrics, TransferReport};
use crate::rtt::RttEstimator;
use crate::segment::Segmenter;
use crate::window::SendWindow;
use crate::wire::{Ack, DataPacket, Finack};
use log::{debug, trace, warn};
use std::io::Read;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Drives one transfer: fills the send window from the segmenter, emits
/// segments within the congestion window, feeds acknowledgements and
/// timeouts to the controller and retransmits on its verdicts.
///
/// Single task; the only suspension points are the bounded receive and the
/// post-fast-retransmit drain, so window mutation, ack processing and
/// congestion decisions never interleave.
pub struct Transfer<C, R> {
    socket: UdpSocket,
    peer: SocketAddr,
    recv_timeout: Duration,
    segmenter: Segmenter<R>,
    window: SendWindow,
    rtt: RttEstimator,
    ctrl: C,
    metrics: TransferMetrics,
    last_ack: i32,
    duplicate_acks: u32,
}

impl<C: CongestionControl, R: Read> Transfer<C, R> {
    /// Binds the sender socket and prepares a transfer towards `peer`.
    pub async fn bind(
        bind_addr: SocketAddr,
        peer: SocketAddr,
        recv_timeout: Duration,
        ctrl: C,
        rtt: RttEstimator,
        segmenter: Segmenter<R>,
    ) -> TransferResult<Self> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| TransferError::Bind {
                addr: bind_addr,
                source,
            })?;
        debug!("sender bound on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            peer,
            recv_timeout,
            segmenter,
            window: SendWindow::new(),
            rtt,
            ctrl,
            metrics: TransferMetrics::start(),
            last_ack: -1,
            duplicate_acks: 0,
        })
    }

    /// Runs the transfer to completion and returns the final report.
    pub async fn run(mut self) -> TransferResult<TransferReport> {
        let mut buf = [0u8; PACKET_SIZE];
        loop {
            self.refill()?;
            self.send_pass().await?;

            match timeout(self.recv_timeout, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((len, _src))) => {
                    if self.handle_datagram(&buf[..len]).await? {
                        // Fast retransmit re-armed the window; start the
                        // next iteration without a timeout sweep.
                        continue;
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_elapsed) => {
                    if self.ctrl.done_on_recv_timeout() {
                        self.metrics.finish();
                        break;
                    }
                    trace!("receive timeout");
                    match self.ctrl.on_recv_timeout() {
                        TimeoutReaction::Rearm => {
                            self.window.reset_in_transit_flags();
                            continue;
                        }
                        TimeoutReaction::Ignore => {}
                    }
                }
            }

            self.sweep_head_timeout();
            self.ctrl.on_tick_end();
        }

        debug!(
            "transfer complete: {} payload bytes on the wire",
            self.metrics.total_bytes()
        );
        Ok(self.metrics.report())
    }

    /// Tops the window up to `floor(cwnd)` segments until the input ends.
    fn refill(&mut self) -> TransferResult<()> {
        while self.window.len() < self.ctrl.window_limit()
            && self.ctrl.state() < CcState::SendingEof
        {
            match self.segmenter.next_segment().map_err(TransferError::Input)? {
                Some(segment) => {
                    trace!(
                        "queued segment {} ({} bytes)",
                        segment.seq_id,
                        segment.payload.len()
                    );
                    self.window.push_back(segment);
                }
                None => {
                    debug!("end of input at seq {}", self.segmenter.next_seq_id());
                    self.ctrl.on_eof();
                    break;
                }
            }
        }
        Ok(())
    }

    /// Emits segments that are not in transit (all of them in the timeout
    /// phase), budgeted by the window capacity at entry. Once the window has
    /// drained in the EOF phase, emits FINACK instead.
    async fn send_pass(&mut self) -> TransferResult<()> {
        let limit = self.ctrl.window_limit();
        if !self.window.is_empty() {
            if self.window.in_transit() >= limit {
                // The window shrank below the in-flight count. Transient:
                // capacity comes back through acks, or through the re-arm a
                // timeout verdict carries.
                trace!(
                    "send pass idle: {} in transit, window limit {}",
                    self.window.in_transit(),
                    limit
                );
                return Ok(());
            }
            let mut budget = limit - self.window.in_transit();
            for index in 0..self.window.len() {
                if budget == 0 {
                    break;
                }
                let resend_all = self.ctrl.state() == CcState::Timeout;
                let segment = match self.window.get_mut(index) {
                    Some(segment) => segment,
                    None => break,
                };
                if segment.in_transit && !resend_all {
                    continue;
                }

                self.ctrl.before_send(segment);
                let datagram = DataPacket::from_segment(segment).encode()?;
                if segment.send_time.is_none() {
                    segment.send_time = Some(Instant::now());
                }
                let seq_id = segment.seq_id;
                let payload_len = segment.payload.len();

                self.socket.send_to(&datagram, self.peer).await?;
                self.metrics.record_sent(payload_len);
                self.window.mark_in_transit(index);
                trace!("sent segment {} ({} bytes)", seq_id, payload_len);
                budget -= 1;
            }
        } else if self.ctrl.state() >= CcState::SendingEof {
            self.ctrl.on_window_drained();
            let finack = Finack {
                seq_id: self.segmenter.next_seq_id(),
            }
            .encode()?;
            self.socket.send_to(&finack, self.peer).await?;
            trace!("sent FINACK at seq {}", self.segmenter.next_seq_id());
        }
        Ok(())
    }

    /// Dispatches one inbound datagram. Returns true when the rest of the
    /// iteration should be skipped.
    async fn handle_datagram(&mut self, datagram: &[u8]) -> TransferResult<bool> {
        let ack = match Ack::decode(datagram) {
            Ok(ack) => ack,
            Err(e) => {
                warn!("ignoring undecodable datagram: {}", e);
                return Ok(false);
            }
        };

        if ack.ack_id == self.last_ack {
            self.duplicate_acks += 1;
            trace!("duplicate ack {} (x{})", ack.ack_id, self.duplicate_acks);
            if self.ctrl.on_duplicate_ack(self.duplicate_acks) == AckReaction::FastRetransmit {
                debug!("fast retransmit from seq {}", ack.ack_id);
                self.duplicate_acks = 0;
                self.drain_queued_acks().await?;
                self.window.reset_in_transit_flags();
                return Ok(true);
            }
            return Ok(false);
        }

        trace!("received ack {}", ack.ack_id);
        self.last_ack = ack.ack_id;
        self.duplicate_acks = 0;

        // One sample covers the whole batch this ack removes: the time the
        // current head has spent in flight.
        let sample = self
            .window
            .head()
            .and_then(|head| head.send_time)
            .map(|sent_at| sent_at.elapsed());
        if let Some(sample) = sample {
            self.rtt.observe(sample);
            self.ctrl.on_new_ack(sample, &self.rtt);
            for segment in self.window.pop_acked(ack.ack_id) {
                trace!("acked segment {}", segment.seq_id);
                self.metrics.record_delay(sample);
                self.ctrl.on_segment_acked(&segment, sample);
            }
        }
        Ok(false)
    }

    /// Discards acknowledgements already queued on the socket. Bounded by
    /// the drain window per read, so it returns once the socket goes quiet.
    async fn drain_queued_acks(&mut self) -> TransferResult<()> {
        let mut buf = [0u8; PACKET_SIZE];
        loop {
            match timeout(ACK_DRAIN_WINDOW, self.socket.recv_from(&mut buf)).await {
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e.into()),
                Err(_elapsed) => break,
            }
        }
        Ok(())
    }

    /// Lazily checks the head segment's age against the current timeout.
    fn sweep_head_timeout(&mut self) {
        let head_timeout = self.rtt.timeout();
        if let Some(head) = self.window.head() {
            if let Some(sent_at) = head.send_time {
                if sent_at.elapsed() >= head_timeout {
                    debug!("head segment {} exceeded {:?}", head.seq_id, head_timeout);
                    if self.ctrl.on_head_timeout(head) == TimeoutReaction::Rearm {
                        self.window.reset_in_transit_flags();
                    }
                }
            }
        }
    }
}

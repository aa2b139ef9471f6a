//! Stop-and-wait sender: one datagram in flight, acknowledged synchronously.

use crate::consts::PACKET_SIZE;
use crate::error::{TransferError, TransferResult};
use crate::metrics::{TransferMetrics, TransferReport};
use crate::segment::Segmenter;
use crate::wire::{self, Ack, DataPacket, Finack};
use bytes::Bytes;
use log::{debug, trace};
use std::io::Read;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwState {
    SendingData,
    SendingEof,
    SendingFinack,
    Complete,
}

/// Sends one segment at a time and blocks for its acknowledgement before
/// advancing. End of file is announced with an empty datagram answered by a
/// `fin` token, then FINACK repeats until the peer goes quiet.
pub struct StopAndWait<R> {
    socket: UdpSocket,
    peer: SocketAddr,
    recv_timeout: Duration,
    segmenter: Segmenter<R>,
    metrics: TransferMetrics,
}

impl<R: Read> StopAndWait<R> {
    /// Binds the sender socket and prepares a transfer towards `peer`.
    pub async fn bind(
        bind_addr: SocketAddr,
        peer: SocketAddr,
        recv_timeout: Duration,
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
            metrics: TransferMetrics::start(),
        })
    }

    /// Runs the transfer to completion and returns the final report.
    pub async fn run(mut self) -> TransferResult<TransferReport> {
        let mut state = SwState::SendingData;
        let mut buf = [0u8; PACKET_SIZE];

        loop {
            let seq_id = self.segmenter.next_seq_id();
            let mut chunk: Option<Bytes> = None;
            if state == SwState::SendingData {
                match self.segmenter.next_segment().map_err(TransferError::Input)? {
                    Some(segment) => chunk = Some(segment.payload),
                    None => {
                        debug!("end of input at seq {}", seq_id);
                        state = SwState::SendingEof;
                    }
                }
            }

            let payload = chunk.as_deref().unwrap_or(&[]);
            let datagram = match state {
                SwState::SendingFinack => Finack { seq_id }.encode()?,
                // The EOF announcement is a data datagram with no payload.
                _ => DataPacket { seq_id, payload }.encode()?,
            };
            let expected_ack = seq_id + payload.len() as i32;

            let send_time = Instant::now();
            let mut acked = false;
            while !acked {
                self.socket.send_to(&datagram, self.peer).await?;
                if state != SwState::SendingFinack {
                    self.metrics.record_sent(payload.len());
                }

                match timeout(self.recv_timeout, self.socket.recv_from(&mut buf)).await {
                    Ok(Ok((len, _src))) => {
                        let response = &buf[..len];
                        match state {
                            SwState::SendingData => {
                                if let Ok(ack) = Ack::decode(response) {
                                    trace!("received ack {}", ack.ack_id);
                                    if ack.ack_id == expected_ack {
                                        self.metrics.record_delay(send_time.elapsed());
                                        acked = true;
                                    }
                                }
                            }
                            SwState::SendingEof => {
                                if wire::contains_fin(response) {
                                    debug!("peer confirmed end of file");
                                    self.metrics.record_delay(send_time.elapsed());
                                    state = SwState::SendingFinack;
                                    acked = true;
                                }
                            }
                            // Any response while pushing FINACK means the
                            // peer is still alive; keep pushing.
                            SwState::SendingFinack | SwState::Complete => {}
                        }
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_elapsed) => {
                        if state == SwState::SendingFinack {
                            state = SwState::Complete;
                            acked = true;
                        } else {
                            trace!("timeout, resending seq {}", seq_id);
                        }
                    }
                }
            }

            if state == SwState::Complete {
                self.metrics.finish();
                break;
            }
        }

        debug!(
            "transfer complete: {} payload bytes on the wire",
            self.metrics.total_bytes()
        );
        Ok(self.metrics.report())
    }
}

use super::{CcState, CongestionControl, TimeoutReaction};
use crate::consts::FIXED_WINDOW_SIZE;
use log::debug;

/// Fixed sliding window: constant capacity and no congestion dynamics.
/// A receive timeout re-arms the whole window; once the window drains after
/// EOF, the sender pushes FINACK until the peer goes quiet.
#[derive(Debug)]
pub struct FixedWindow {
    state: CcState,
}

impl FixedWindow {
    pub fn new() -> Self {
        Self {
            state: CcState::CongestionAvoidance,
        }
    }
}

impl Default for FixedWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionControl for FixedWindow {
    fn cwnd(&self) -> f64 {
        FIXED_WINDOW_SIZE as f64
    }

    fn state(&self) -> CcState {
        self.state
    }

    fn on_eof(&mut self) {
        self.state = CcState::SendingEof;
    }

    fn on_window_drained(&mut self) {
        if self.state == CcState::SendingEof {
            debug!("window drained, pushing FINACK");
            self.state = CcState::SendingFinack;
        }
    }

    fn done_on_recv_timeout(&self) -> bool {
        self.state == CcState::SendingFinack
    }

    fn on_recv_timeout(&mut self) -> TimeoutReaction {
        debug!("receive timeout, retransmitting the whole window");
        TimeoutReaction::Rearm
    }
}

//! The frame pipeline state machine (§4.7).

use anari_types::ErrorCode;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameState {
    Unconfigured = 0,
    Configured = 1,
    Idle = 2,
    InFlight = 3,
    Ready = 4,
}

impl FrameState {
    fn from_u8(v: u8) -> FrameState {
        match v {
            0 => FrameState::Unconfigured,
            1 => FrameState::Configured,
            2 => FrameState::Idle,
            3 => FrameState::InFlight,
            _ => FrameState::Ready,
        }
    }
}

/// One frame's state machine plus the set of channels currently mapped by
/// the client (§4.7's transition table).
pub struct FrameStateMachine {
    state: AtomicU8,
    mapped_channels: Mutex<HashSet<String>>,
}

impl FrameStateMachine {
    pub fn new() -> Self {
        FrameStateMachine {
            state: AtomicU8::new(FrameState::Unconfigured as u8),
            mapped_channels: Mutex::new(HashSet::new()),
        }
    }

    pub fn state(&self) -> FrameState {
        FrameState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: FrameState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Called once `size` and at least one `channel.*` parameter have been
    /// committed. Unconfigured -> Configured.
    pub fn mark_configured(&self) {
        if self.state() == FrameState::Unconfigured {
            self.set(FrameState::Configured);
        }
    }

    /// `renderFrame`: requires Configured or Idle, enters InFlight.
    pub fn render(&self) -> Result<(), ErrorCode> {
        match self.state() {
            FrameState::Configured | FrameState::Idle => {
                self.set(FrameState::InFlight);
                Ok(())
            }
            _ => Err(ErrorCode::StateViolation),
        }
    }

    /// `frameReady(WAIT)`: InFlight -> Ready. The actual blocking happens
    /// in the caller (it owns the backend call that does the real wait);
    /// this only performs the state transition once the backend reports
    /// readiness.
    pub fn mark_ready(&self) {
        if self.state() == FrameState::InFlight {
            self.set(FrameState::Ready);
        }
    }

    /// `discardFrame`: InFlight -> Ready directly, with
    /// implementation-defined contents (§4.7, S6).
    pub fn discard(&self) -> Result<(), ErrorCode> {
        if self.state() == FrameState::InFlight {
            self.set(FrameState::Ready);
            Ok(())
        } else {
            Err(ErrorCode::StateViolation)
        }
    }

    /// `mapFrame`: requires Ready. Tracks the channel as mapped.
    pub fn map_channel(&self, channel: &str) -> Result<(), ErrorCode> {
        if self.state() != FrameState::Ready {
            return Err(ErrorCode::StateViolation);
        }
        let mut mapped = self.mapped_channels.lock().unwrap();
        if !mapped.insert(channel.to_string()) {
            return Err(ErrorCode::BusyResource);
        }
        Ok(())
    }

    /// `unmapFrame`: releases a mapped channel. Once the last mapped
    /// channel is released from Ready, the frame returns to Idle.
    pub fn unmap_channel(&self, channel: &str) -> Result<(), ErrorCode> {
        let mut mapped = self.mapped_channels.lock().unwrap();
        if !mapped.remove(channel) {
            return Err(ErrorCode::StateViolation);
        }
        if mapped.is_empty() && self.state() == FrameState::Ready {
            self.set(FrameState::Idle);
        }
        Ok(())
    }
}

impl Default for FrameStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

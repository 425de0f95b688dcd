use std::time::Duration;

use super::buffer::TransmissionBuffer;

/// Bytes drained per pacing tick. Matches the protocol framing chunk size.
pub const CHUNK_SIZE: usize = 2048;

/// Interval between pacing ticks, approximating real-time audio
/// production so the buffer stays bounded and the service receives audio
/// at a consumable rate.
pub const PACE_INTERVAL: Duration = Duration::from_millis(40);

/// Outcome of one pacing tick.
#[derive(Debug, PartialEq, Eq)]
pub enum PaceStep {
    /// Send this audio slice.
    Send(Vec<u8>),
    /// Buffer drained after an explicit stop: the terminal marker is due
    /// and pacing halts. Yielded exactly once.
    Finish,
    /// Nothing to do this tick.
    Idle,
}

/// Pacing policy shared by both protocol variants.
///
/// The first tick fires as soon as the handshake completes (the driving
/// interval's immediate first tick), sending the initial slice; each
/// later tick drains one more slice.
#[derive(Debug, Default)]
pub struct Pacer {
    finished: bool,
}

impl Pacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, buffer: &mut TransmissionBuffer, stopped: bool) -> PaceStep {
        if self.finished {
            return PaceStep::Idle;
        }

        let slice = buffer.drain(CHUNK_SIZE);
        if !slice.is_empty() {
            PaceStep::Send(slice)
        } else if stopped {
            self.finished = true;
            PaceStep::Finish
        } else {
            PaceStep::Idle
        }
    }
}

//! The acquire-decide-gate loop.
//!
//! A cycle first waits for the channel to become busy (some bin exceeds the
//! threshold), polling once per `poll_interval`. Any poll numbered past
//! `exceed_timeout_polls` ends the cycle as a timeout, even one that saw the
//! burst. After a burst it spins back-to-back until a poll comes back
//! entirely clear and asserts transmit on that poll. Transmit is deasserted
//! at the start and end of every cycle.
//!
//! Cancellation is cooperative and only checked between cycles, so a cycle
//! blocked in acquisition finishes before the run stops.

use std::{
    io,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    capture::numbered_capture_name,
    decision::Decision,
    detector::{Detector, Poll},
    error::SenseError,
    gate::TransmitGate,
    monitoring::{PollTiming, TimingReport},
    EXCEED_TIMEOUT_POLLS,
};

// Recorder file name suffixes tried before giving up on a frame
const MAX_CAPTURES_PER_SECOND: u32 = 1000;

#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    /// Backoff between polls while waiting for a burst
    pub poll_interval: Duration,
    /// Polls allowed while waiting for a burst before the cycle times out
    pub exceed_timeout_polls: u32,
    /// Bound on polls while waiting for the channel to clear, `None` spins forever
    pub clear_timeout_polls: Option<u32>,
    /// Pause between cycles in repeat mode
    pub cycle_pause: Duration,
    pub repeat: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            exceed_timeout_polls: EXCEED_TIMEOUT_POLLS,
            clear_timeout_polls: None,
            cycle_pause: Duration::from_secs(1),
            repeat: false,
        }
    }
}

/// The bin that first exceeded the threshold in a cycle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Burst {
    pub index: usize,
    pub magnitude: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleOutcome {
    /// The channel went busy, then clear, and transmit was asserted
    Transmitted {
        polls: u32,
        burst: Burst,
        timing: PollTiming,
    },
    /// The threshold was never exceeded
    TimedOut { polls: u32 },
    /// The channel never cleared within the configured bound
    ClearTimedOut { polls: u32, burst: Burst },
}

impl CycleOutcome {
    pub fn polls(&self) -> u32 {
        match *self {
            CycleOutcome::Transmitted { polls, .. }
            | CycleOutcome::TimedOut { polls }
            | CycleOutcome::ClearTimedOut { polls, .. } => polls,
        }
    }

    pub fn transmitted(&self) -> bool {
        matches!(self, CycleOutcome::Transmitted { .. })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u32,
    pub transmitted: u32,
    pub timed_out: u32,
}

pub struct SenseLoop<D, G> {
    detector: D,
    gate: G,
    config: LoopConfig,
    timing: TimingReport,
    record_dir: Option<PathBuf>,
}

impl<D: Detector, G: TransmitGate> SenseLoop<D, G> {
    pub fn new(detector: D, gate: G, config: LoopConfig) -> Self {
        Self {
            detector,
            gate,
            config,
            timing: TimingReport::default(),
            record_dir: None,
        }
    }

    /// Save the frame that cleared the channel in each transmitting cycle
    pub fn with_recorder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.record_dir = Some(dir.into());
        self
    }

    pub fn timing(&self) -> &TimingReport {
        &self.timing
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn into_parts(self) -> (D, G) {
        (self.detector, self.gate)
    }

    /// Run cycles until done: once, or in repeat mode until `cancel` fires
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<RunStats, SenseError> {
        let mut stats = RunStats::default();
        loop {
            let outcome = self.run_cycle()?;
            stats.cycles += 1;
            match outcome {
                CycleOutcome::Transmitted { .. } => stats.transmitted += 1,
                CycleOutcome::TimedOut { .. } | CycleOutcome::ClearTimedOut { .. } => {
                    stats.timed_out += 1
                }
            }
            if !self.config.repeat || cancel.is_cancelled() {
                break;
            }
            info!("Ctrl-C to end program after this loop");
            thread::sleep(self.config.cycle_pause);
            if cancel.is_cancelled() {
                break;
            }
        }
        Ok(stats)
    }

    /// One cycle. Transmit is always left deasserted afterwards, even on error.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, SenseError> {
        self.gate.deassert_transmit().map_err(SenseError::Gate)?;
        let result = self.sense_cycle();
        let teardown = self.gate.deassert_transmit();
        let outcome = match (result, teardown) {
            (Ok(outcome), Ok(())) => outcome,
            (Ok(_), Err(e)) => return Err(SenseError::Gate(e)),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(gate)) => {
                warn!("Failed to disable TX after error: {gate}");
                return Err(e);
            }
        };
        match outcome {
            CycleOutcome::Transmitted {
                polls,
                burst,
                timing,
            } => {
                self.timing.record(&timing);
                info!(
                    polls,
                    exceeded_index = burst.index,
                    exceeded_mag = burst.magnitude,
                    acquire_us = timing.acquire.as_secs_f32() * 1e6,
                    sense_us = timing.sense.as_secs_f32() * 1e6,
                    decide_us = timing.decide.as_secs_f32() * 1e6,
                    "Channel cleared, transmitted"
                );
                self.record_frame();
            }
            CycleOutcome::TimedOut { polls } => {
                warn!(polls, "TIMEOUT: Threshold never exceeded")
            }
            CycleOutcome::ClearTimedOut { polls, burst } => warn!(
                polls,
                exceeded_index = burst.index,
                "TIMEOUT: Channel never cleared"
            ),
        }
        Ok(outcome)
    }

    fn poll(&mut self, polls: &mut u32) -> Result<Poll, SenseError> {
        *polls += 1;
        self.detector
            .poll()
            .map_err(|source| SenseError::Acquisition {
                poll: *polls,
                source,
            })
    }

    fn sense_cycle(&mut self) -> Result<CycleOutcome, SenseError> {
        let mut polls = 0;

        // Wait for the channel to go busy
        let burst = loop {
            let decision = self.poll(&mut polls)?.decision;
            // The bound applies to every poll, including one that saw the burst
            if polls > self.config.exceed_timeout_polls {
                return Ok(CycleOutcome::TimedOut { polls });
            }
            if let Decision::Exceeded { index, magnitude } = decision {
                break Burst { index, magnitude };
            }
            thread::sleep(self.config.poll_interval);
        };
        debug!(
            polls,
            index = burst.index,
            magnitude = burst.magnitude,
            "Threshold exceeded, waiting for clear channel"
        );

        // Spin until a poll is entirely clear
        let mut busy = 0;
        loop {
            let poll = self.poll(&mut polls)?;
            if poll.decision.is_clear() {
                self.gate.assert_transmit().map_err(SenseError::Gate)?;
                return Ok(CycleOutcome::Transmitted {
                    polls,
                    burst,
                    timing: poll.timing,
                });
            }
            busy += 1;
            if let Some(limit) = self.config.clear_timeout_polls {
                if busy >= limit {
                    return Ok(CycleOutcome::ClearTimedOut { polls, burst });
                }
            }
        }
    }

    fn record_frame(&self) {
        let Some(dir) = &self.record_dir else {
            return;
        };
        let now = Utc::now();
        for n in 0..MAX_CAPTURES_PER_SECOND {
            let path = dir.join(numbered_capture_name(self.detector.capture_kind(), &now, n));
            match self.detector.save_frame(&path) {
                Ok(()) => {
                    info!(?path, "Recorded frame");
                    return;
                }
                Err(e) if e.source.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    warn!("{e}");
                    return;
                }
            }
        }
        warn!(?dir, "Too many captures this second, frame not recorded");
    }
}

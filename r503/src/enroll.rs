//! Enrollment
//!
//! Enrolling a finger takes several captures. Each capture is turned into a
//! feature set in its own character buffer; once enough samples are in, the
//! buffers are merged into one template and stored in the library.
//!
//! ```text
//! WaitingForFinger -> Capturing -> ExtractingFeature -> AccumulatingSample
//!        ^                                 |                    |
//!        +---------------------------------+--------------------+
//!                                                               v
//!                                   Storing <- Registering <----+
//! ```
//!
//! The whole run is bounded by a deadline that is checked before every step.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use r503_core::constants::buffers::{CHAR_BUFFER_1, MAX_ENROLL_BUFFER};

use crate::{
    device::Device,
    error::Result,
    reply::Reply,
};

/// Monotonic time source
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time and real sleeps
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Enrollment settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentConfig {
    samples_needed: u8,
    timeout: Duration,
    poll_interval: Duration,
}

impl EnrollmentConfig {
    pub const DEFAULT_SAMPLES: u8 = 2;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new() -> Self {
        Self {
            samples_needed: Self::DEFAULT_SAMPLES,
            timeout: Self::DEFAULT_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Captures merged into the template (1 to 6)
    pub fn with_samples_needed(mut self, samples: u8) -> Self {
        self.samples_needed = samples;
        self
    }

    /// Give up after this long
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pause between capture attempts
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn samples_needed(&self) -> u8 {
        self.samples_needed
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_ENROLL_BUFFER).contains(&self.samples_needed) {
            return Err(r503_core::Error::InvalidParameter(format!(
                "samples needed must be 1..={}, got {}",
                MAX_ENROLL_BUFFER, self.samples_needed
            ))
            .into());
        }
        Ok(())
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Step of an enrollment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStage {
    WaitingForFinger,
    Capturing,
    ExtractingFeature,
    AccumulatingSample,
    Registering,
    Storing,
}

impl fmt::Display for EnrollmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitingForFinger => "waiting for finger",
            Self::Capturing => "capturing",
            Self::ExtractingFeature => "extracting feature",
            Self::AccumulatingSample => "accumulating sample",
            Self::Registering => "registering",
            Self::Storing => "storing",
        };
        f.write_str(name)
    }
}

/// How an enrollment run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    /// Template stored
    Enrolled { location: u16, attempts: u32 },

    /// Merging or storing was refused
    Failed {
        stage: EnrollmentStage,
        reply: Reply<()>,
    },

    /// Deadline passed
    TimedOut {
        stage: EnrollmentStage,
        samples_captured: u8,
    },

    /// No free library location left
    LibraryFull,
}

impl EnrollmentOutcome {
    pub fn is_enrolled(&self) -> bool {
        matches!(self, Self::Enrolled { .. })
    }

    /// Library location of the stored template
    pub fn location(&self) -> Option<u16> {
        match self {
            Self::Enrolled { location, .. } => Some(*location),
            _ => None,
        }
    }

    /// Numeric status in the style of a confirmation code
    pub fn status(&self) -> u8 {
        match self {
            Self::Enrolled { .. } => 0,
            Self::Failed { reply, .. } => reply.status(),
            Self::TimedOut { .. } => r503_core::constants::NO_RESPONSE_STATUS,
            Self::LibraryFull => r503_types::ConfirmationCode::LIBRARY_FULL.value(),
        }
    }
}

#[derive(Debug)]
struct EnrollmentState {
    target_location: u16,
    samples_needed: u8,
    samples_captured: u8,
    attempt_count: u32,
    deadline: Instant,
    stage: EnrollmentStage,
}

impl EnrollmentState {
    /// Character buffer for the sample being captured
    fn buffer(&self) -> u8 {
        self.samples_captured + 1
    }
}

impl Device {
    /// Enroll a finger at `location`
    pub fn enroll(&mut self, location: u16, config: &EnrollmentConfig) -> Result<EnrollmentOutcome> {
        self.enroll_with_clock(location, config, &SystemClock)
    }

    /// Enroll a finger at the first free library location
    pub fn enroll_next_free(&mut self, config: &EnrollmentConfig) -> Result<EnrollmentOutcome> {
        config.validate()?;

        match self.find_free_location()?.into_result()? {
            Some(location) => self.enroll(location, config),
            None => {
                warn!("Library full");
                Ok(EnrollmentOutcome::LibraryFull)
            }
        }
    }

    /// Enroll with an explicit time source
    ///
    /// Rejected or missing replies during capture and extraction are retried
    /// until the deadline. Rejections while merging or storing end the run.
    /// Transport and decode errors abort with `Err`.
    pub fn enroll_with_clock(
        &mut self,
        location: u16,
        config: &EnrollmentConfig,
        clock: &dyn Clock,
    ) -> Result<EnrollmentOutcome> {
        config.validate()?;
        self.ensure_connected()?;

        info!(
            "Enrolling at {} ({} samples)",
            location, config.samples_needed
        );

        let mut state = EnrollmentState {
            target_location: location,
            samples_needed: config.samples_needed,
            samples_captured: 0,
            attempt_count: 0,
            deadline: clock.now() + config.timeout,
            stage: EnrollmentStage::WaitingForFinger,
        };

        loop {
            if clock.now() >= state.deadline {
                warn!(
                    "Enrollment timed out while {} ({} of {} samples)",
                    state.stage, state.samples_captured, state.samples_needed
                );
                return Ok(EnrollmentOutcome::TimedOut {
                    stage: state.stage,
                    samples_captured: state.samples_captured,
                });
            }

            state.stage = match state.stage {
                EnrollmentStage::WaitingForFinger => match self.get_image_extended()? {
                    Reply::Success(()) => EnrollmentStage::Capturing,
                    _ => {
                        clock.sleep(config.poll_interval);
                        EnrollmentStage::WaitingForFinger
                    }
                },
                EnrollmentStage::Capturing => {
                    state.attempt_count += 1;
                    debug!(
                        "Capture {} into buffer {}",
                        state.attempt_count,
                        state.buffer()
                    );
                    EnrollmentStage::ExtractingFeature
                }
                EnrollmentStage::ExtractingFeature => match self.image_to_feature(state.buffer())? {
                    Reply::Success(()) => {
                        state.samples_captured += 1;
                        info!(
                            "Sample {} of {} captured",
                            state.samples_captured, state.samples_needed
                        );
                        EnrollmentStage::AccumulatingSample
                    }
                    reply => {
                        warn!("Sample discarded (status {})", reply.status());
                        state.attempt_count = state.attempt_count.saturating_sub(1);
                        clock.sleep(config.poll_interval);
                        EnrollmentStage::WaitingForFinger
                    }
                },
                EnrollmentStage::AccumulatingSample => {
                    if state.samples_captured >= state.samples_needed {
                        EnrollmentStage::Registering
                    } else {
                        clock.sleep(config.poll_interval);
                        EnrollmentStage::WaitingForFinger
                    }
                }
                EnrollmentStage::Registering => match self.register_model()? {
                    Reply::Success(()) => EnrollmentStage::Storing,
                    reply => {
                        warn!("Merging samples failed (status {})", reply.status());
                        return Ok(EnrollmentOutcome::Failed {
                            stage: EnrollmentStage::Registering,
                            reply,
                        });
                    }
                },
                EnrollmentStage::Storing => {
                    match self.store(CHAR_BUFFER_1, state.target_location)? {
                        Reply::Success(()) => {
                            info!(
                                "Enrolled at {} after {} attempts",
                                state.target_location, state.attempt_count
                            );
                            return Ok(EnrollmentOutcome::Enrolled {
                                location: state.target_location,
                                attempts: state.attempt_count,
                            });
                        }
                        reply => {
                            warn!("Storing template failed (status {})", reply.status());
                            return Ok(EnrollmentOutcome::Failed {
                                stage: EnrollmentStage::Storing,
                                reply,
                            });
                        }
                    }
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::test_support::*;
    use pretty_assertions::assert_eq;

    use std::cell::Cell;

    use r503_core::Opcode;
    use r503_types::ConfirmationCode;

    /// Clock that only moves when slept on
    struct FakeClock {
        base: Instant,
        offset: Cell<Duration>,
        sleeps: Cell<u32>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Cell::new(Duration::ZERO),
                sleeps: Cell::new(0),
            }
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.base + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.offset.set(self.offset.get() + duration);
            self.sleeps.set(self.sleeps.get() + 1);
        }
    }

    fn config(samples: u8) -> EnrollmentConfig {
        EnrollmentConfig::new()
            .with_samples_needed(samples)
            .with_timeout(Duration::from_secs(2))
            .with_poll_interval(Duration::from_millis(100))
    }

    fn opcodes(probe: &r503_transport::MemoryTransport) -> Vec<u8> {
        sent_frames(probe)
            .iter()
            .filter_map(|f| f.opcode())
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = EnrollmentConfig::default();
        assert_eq!(config.samples_needed(), 2);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.poll_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_enroll_two_samples() {
        let (mut device, probe) = connected();
        for _ in 0..6 {
            probe.push_response(ok(&[]));
        }

        let clock = FakeClock::new();
        let outcome = device.enroll_with_clock(7, &config(2), &clock).unwrap();

        assert_eq!(
            outcome,
            EnrollmentOutcome::Enrolled {
                location: 7,
                attempts: 2
            }
        );
        assert_eq!(outcome.status(), 0);
        assert_eq!(outcome.location(), Some(7));

        let frames = sent_frames(&probe);
        assert_eq!(
            opcodes(&probe),
            vec![
                u8::from(Opcode::GetImageEx),
                u8::from(Opcode::Img2Tz),
                u8::from(Opcode::GetImageEx),
                u8::from(Opcode::Img2Tz),
                u8::from(Opcode::RegModel),
                u8::from(Opcode::Store),
            ]
        );
        assert_eq!(frames[1].body().as_ref(), &[1]);
        assert_eq!(frames[3].body().as_ref(), &[2]);
        assert_eq!(frames[5].body().as_ref(), &[1, 0, 7]);
    }

    #[test]
    fn test_no_finger_retries() {
        let (mut device, probe) = connected();
        probe.push_response(ack(ConfirmationCode::NO_FINGER, &[]));
        probe.push_response(ack(ConfirmationCode::NO_FINGER, &[]));
        for _ in 0..4 {
            probe.push_response(ok(&[]));
        }

        let clock = FakeClock::new();
        let outcome = device.enroll_with_clock(0, &config(1), &clock).unwrap();

        assert!(outcome.is_enrolled());
        assert_eq!(clock.sleeps.get(), 2);
    }

    #[test]
    fn test_bad_sample_is_discarded() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[]));
        probe.push_response(ack(ConfirmationCode::IMAGE_TOO_DISORDERLY, &[]));
        for _ in 0..4 {
            probe.push_response(ok(&[]));
        }

        let clock = FakeClock::new();
        let outcome = device.enroll_with_clock(3, &config(1), &clock).unwrap();

        // The discarded sample does not count as an attempt
        assert_eq!(
            outcome,
            EnrollmentOutcome::Enrolled {
                location: 3,
                attempts: 1
            }
        );

        // Both extractions went to buffer 1
        let frames = sent_frames(&probe);
        assert_eq!(frames[1].body().as_ref(), &[1]);
        assert_eq!(frames[3].body().as_ref(), &[1]);
    }

    #[test]
    fn test_merge_failure_is_terminal() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[]));
        probe.push_response(ok(&[]));
        probe.push_response(ack(ConfirmationCode::MERGE_FAILED, &[]));

        let clock = FakeClock::new();
        let outcome = device.enroll_with_clock(3, &config(1), &clock).unwrap();

        assert_eq!(
            outcome,
            EnrollmentOutcome::Failed {
                stage: EnrollmentStage::Registering,
                reply: Reply::Rejected(ConfirmationCode::MERGE_FAILED)
            }
        );
        assert_eq!(outcome.status(), 0x0A);
        assert_eq!(probe.written().len(), 3);
    }

    #[test]
    fn test_store_failure_is_terminal() {
        let (mut device, probe) = connected();
        for _ in 0..3 {
            probe.push_response(ok(&[]));
        }
        probe.push_response(ack(ConfirmationCode::LOCATION_OUT_OF_RANGE, &[]));

        let clock = FakeClock::new();
        let outcome = device.enroll_with_clock(999, &config(1), &clock).unwrap();

        assert!(matches!(
            outcome,
            EnrollmentOutcome::Failed {
                stage: EnrollmentStage::Storing,
                ..
            }
        ));
    }

    #[test]
    fn test_times_out_without_finger() {
        let (mut device, probe) = connected();
        // Nothing scripted: every capture goes unanswered

        let clock = FakeClock::new();
        let config = config(2);
        let outcome = device.enroll_with_clock(0, &config, &clock).unwrap();

        assert_eq!(
            outcome,
            EnrollmentOutcome::TimedOut {
                stage: EnrollmentStage::WaitingForFinger,
                samples_captured: 0
            }
        );
        assert_eq!(outcome.status(), 99);

        // One capture per poll interval until the deadline
        assert_eq!(clock.sleeps.get(), 20);
        assert_eq!(probe.written().len(), 20);
        assert!(clock.offset.get() <= config.timeout() + config.poll_interval());
    }

    #[test]
    fn test_invalid_sample_count() {
        let (mut device, probe) = connected();
        let clock = FakeClock::new();

        for samples in [0, 7] {
            let err = device
                .enroll_with_clock(0, &config(samples), &clock)
                .unwrap_err();
            assert!(err.is_invalid_input());
        }
        assert!(probe.written().is_empty());
    }

    #[test]
    fn test_enroll_next_free_full_library() {
        let (mut device, probe) = connected();
        let mut params = vec![0u8; 16];
        params[5] = 8; // capacity 8
        probe.push_response(ok(&params));
        probe.push_response(ok(&[0xFF; 32]));

        let outcome = device.enroll_next_free(&config(1)).unwrap();
        assert_eq!(outcome, EnrollmentOutcome::LibraryFull);
    }
}

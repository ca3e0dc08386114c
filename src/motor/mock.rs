// Recording PWM double for tests and dry runs
//
// Every clone of a `RecordingPwm` shares one call log, so a test can hand one
// clone to the controller and keep another to inspect what was written.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::pwm::PwmController;

/// Error returned once the injected failure budget is exhausted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("simulated PWM failure on channel {channel}")]
pub struct MockPwmError {
    pub channel: u8,
}

#[derive(Debug, Default)]
struct RecordingInner {
    calls: Vec<(u8, u16, u16)>,
    freq_hz: Option<u16>,
    fail_after: Option<usize>,
    fail_freq: bool,
}

/// In-memory PWM controller that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingPwm {
    inner: Arc<Mutex<RecordingInner>>,
}

impl RecordingPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed for `writes` more `set_pwm` calls, then fail every call
    pub fn fail_after(self, writes: usize) -> Self {
        self.lock().fail_after = Some(writes);
        self
    }

    /// Make `set_pwm_freq` fail
    pub fn fail_freq(self) -> Self {
        self.lock().fail_freq = true;
        self
    }

    /// All successful `set_pwm` calls as `(channel, on, off)`
    pub fn calls(&self) -> Vec<(u8, u16, u16)> {
        self.lock().calls.clone()
    }

    /// `off` values written to one channel, in order
    pub fn pulses(&self, channel: u8) -> Vec<u16> {
        self.lock()
            .calls
            .iter()
            .filter(|(ch, _, _)| *ch == channel)
            .map(|&(_, _, off)| off)
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn freq_hz(&self) -> Option<u16> {
        self.lock().freq_hz
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PwmController for RecordingPwm {
    type Error = MockPwmError;

    fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), MockPwmError> {
        let mut inner = self.lock();
        if let Some(remaining) = inner.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(MockPwmError { channel });
            }
            *remaining -= 1;
        }
        inner.calls.push((channel, on, off));
        Ok(())
    }

    fn set_pwm_freq(&mut self, freq_hz: u16) -> Result<(), MockPwmError> {
        let mut inner = self.lock();
        if inner.fail_freq {
            return Err(MockPwmError { channel: 0 });
        }
        inner.freq_hz = Some(freq_hz);
        Ok(())
    }
}

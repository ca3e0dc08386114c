// PWM controller capability consumed by the drive core
//
// The drive core never talks to a peripheral directly: anything that can set a
// channel's on/off ticks and the carrier frequency (a PCA9685 over I2C, a
// simulator, a test double) plugs in through `PwmController`.

use std::convert::Infallible;

use tracing::debug;

/// Two-method PWM capability
///
/// Errors are opaque to the drive core; they are boxed into
/// [`DriveError::Hardware`](super::DriveError::Hardware) and returned to the
/// caller of the motion operation.
pub trait PwmController: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Command a channel's pulse on/off tick counts
    fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Self::Error>;

    /// Set the carrier frequency (called once at controller construction)
    fn set_pwm_freq(&mut self, freq_hz: u16) -> Result<(), Self::Error>;
}

impl<T: PwmController + ?Sized> PwmController for Box<T> {
    type Error = T::Error;

    fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Self::Error> {
        (**self).set_pwm(channel, on, off)
    }

    fn set_pwm_freq(&mut self, freq_hz: u16) -> Result<(), Self::Error> {
        (**self).set_pwm_freq(freq_hz)
    }
}

/// Backend that only logs the writes it receives, for running without hardware
#[derive(Debug, Default)]
pub struct DryRunPwm {
    freq_hz: Option<u16>,
    writes: usize,
}

impl DryRunPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn freq_hz(&self) -> Option<u16> {
        self.freq_hz
    }

    /// Number of `set_pwm` calls seen so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PwmController for DryRunPwm {
    type Error = Infallible;

    fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Infallible> {
        self.writes += 1;
        debug!("dry-run PWM: channel={} on={} off={}", channel, on, off);
        Ok(())
    }

    fn set_pwm_freq(&mut self, freq_hz: u16) -> Result<(), Infallible> {
        debug!("dry-run PWM: frequency={}Hz", freq_hz);
        self.freq_hz = Some(freq_hz);
        Ok(())
    }
}

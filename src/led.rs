//! Single LED on a GPIO pin
//!
//! Supports digital (on/off) and PWM writes, an optional inverted polarity
//! for LEDs wired active-low, and playback of an [`Animation`].

use alloc::rc::Rc;

use crate::animation::{Animation, Listener};
use crate::error::{Error, Result};
use crate::scheduler::{Scheduler, TimerQueue};
use crate::{OutputDriver, SharedDriver};

/// Highest PWM duty cycle
pub const MAX_DUTY: u8 = 255;

/// Value written to a channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    /// On/off level
    Digital(bool),
    /// PWM duty cycle in `0..=255`
    Pwm(f64),
}

impl ChannelValue {
    /// Check if both values use the same representation
    pub const fn same_kind(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Digital(_), Self::Digital(_)) | (Self::Pwm(_), Self::Pwm(_))
        )
    }

    /// Proportion of full brightness this value stands for
    pub fn ratio(self) -> f64 {
        match self {
            Self::Digital(level) => f64::from(u8::from(level)),
            Self::Pwm(duty) => duty / f64::from(MAX_DUTY),
        }
    }

    /// Validate the duty cycle of a PWM value
    pub(crate) fn check_range(self) -> Result<()> {
        match self {
            Self::Pwm(duty) => checked_duty(duty).map(|_| ()),
            Self::Digital(_) => Ok(()),
        }
    }
}

impl From<bool> for ChannelValue {
    fn from(level: bool) -> Self {
        Self::Digital(level)
    }
}

impl From<u8> for ChannelValue {
    fn from(duty: u8) -> Self {
        Self::Pwm(f64::from(duty))
    }
}

impl From<f64> for ChannelValue {
    fn from(duty: f64) -> Self {
        Self::Pwm(duty)
    }
}

/// Converts a duty cycle to a byte, rounding fractional values.
///
/// `-0.0` passes the range check.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn checked_duty(duty: f64) -> Result<u8> {
    if !(0.0..=f64::from(MAX_DUTY)).contains(&duty) {
        return Err(Error::OutOfRange { value: duty });
    }
    Ok(libm::round(duty) as u8)
}

/// Writes to one pin of the shared driver, applying the invert transform
pub(crate) struct PinWriter<D> {
    pin: u32,
    invert: bool,
    driver: SharedDriver<D>,
}

impl<D> Clone for PinWriter<D> {
    fn clone(&self) -> Self {
        Self {
            pin: self.pin,
            invert: self.invert,
            driver: Rc::clone(&self.driver),
        }
    }
}

impl<D: OutputDriver> PinWriter<D> {
    pub(crate) fn digital(&self, level: bool) {
        self.driver
            .borrow_mut()
            .write_digital(self.pin, level != self.invert);
    }

    pub(crate) fn duty(&self, duty: u8) {
        let duty = if self.invert { MAX_DUTY - duty } else { duty };
        self.driver.borrow_mut().write_pwm(self.pin, duty);
    }

    /// Write a brightness fraction, clamped to `[0, 1]`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn fraction(&self, value: f64) {
        let duty = libm::round(value.clamp(0.0, 1.0) * f64::from(MAX_DUTY));
        self.duty(duty as u8);
    }

    pub(crate) fn write(&self, value: ChannelValue) -> Result<()> {
        match value {
            ChannelValue::Digital(level) => self.digital(level),
            ChannelValue::Pwm(duty) => self.duty(checked_duty(duty)?),
        }
        Ok(())
    }
}

/// LED attached to a single output pin
pub struct Led<D: OutputDriver + 'static, S: Scheduler = TimerQueue> {
    writer: PinWriter<D>,
    animation: Option<Animation<S>>,
}

impl<D: OutputDriver + 'static, S: Scheduler> Led<D, S> {
    /// Create a LED on `pin`.
    ///
    /// With `invert` set, digital levels are flipped and PWM duty cycles
    /// are mirrored (`255 - duty`) before reaching the driver.
    pub fn new(pin: i32, invert: bool, driver: SharedDriver<D>) -> Result<Self> {
        let pin = u32::try_from(pin).map_err(|_| {
            Error::InvalidArgument("GPIO pins must be greater than or equal to 0")
        })?;
        Ok(Self {
            writer: PinWriter {
                pin,
                invert,
                driver,
            },
            animation: None,
        })
    }

    /// Pin number of the LED
    pub fn pin(&self) -> u32 {
        self.writer.pin
    }

    /// Check if writes are inverted
    pub fn is_inverted(&self) -> bool {
        self.writer.invert
    }

    /// Write a digital level or a PWM duty cycle.
    ///
    /// Does not stop a running animation, whose next frame overwrites the
    /// value.
    pub fn write(&mut self, value: impl Into<ChannelValue>) -> Result<()> {
        self.writer.write(value.into())
    }

    /// Play a copy of `animation` on this LED.
    ///
    /// Replaces the current animation. The given animation itself is left
    /// untouched.
    pub fn animate(&mut self, animation: &Animation<S>, auto_start: bool) {
        self.stop_animation();

        let writer = self.writer.clone();
        let listener: Listener = Rc::new(move |value: f64| writer.fraction(value));

        let mut animation = animation.copy();
        animation.subscribe(listener);
        if auto_start {
            animation.start();
        }
        self.animation = Some(animation);
    }

    /// Start or resume the current animation
    pub fn start_animation(&mut self) -> Result<()> {
        let animation = self.animation.as_mut().ok_or(Error::NoAnimationBound)?;
        animation.start();
        Ok(())
    }

    /// Stop the current animation, if any
    pub fn stop_animation(&mut self) {
        if let Some(animation) = self.animation.as_mut() {
            animation.stop();
        }
    }

    /// Check if an animation is currently playing
    pub fn is_animating(&self) -> bool {
        self.animation.as_ref().is_some_and(Animation::is_running)
    }

    /// Stop the animation and switch the LED off
    pub fn off(&mut self) {
        self.stop_animation();
        self.writer.digital(false);
    }

    pub(crate) fn writer(&self) -> &PinWriter<D> {
        &self.writer
    }

    /// Drop the current animation
    pub(crate) fn clear_animation(&mut self) {
        self.animation = None;
    }
}

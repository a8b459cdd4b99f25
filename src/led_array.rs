//! Group of LEDs driven together
//!
//! A [`LedArray`] writes to all of its channels at once and binds
//! animations to them, either one animation per channel or a single shared
//! animation scaled per channel.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::animation::{Animation, Listener};
use crate::error::{Error, Result};
use crate::led::{ChannelValue, Led, PinWriter};
use crate::scheduler::{Scheduler, TimerQueue};
use crate::{OutputDriver, SharedDriver};

/// Polarity of the channels of a [`LedArray`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invert {
    /// Same polarity for every channel
    Uniform(bool),
    /// One flag per pin
    PerPin(Vec<bool>),
}

impl Default for Invert {
    fn default() -> Self {
        Self::Uniform(false)
    }
}

/// Animation source for a binding
pub enum ChannelInput<'a, S: Scheduler = TimerQueue> {
    /// One optional animation per channel; `None` channels are left alone
    PerChannel(&'a [Option<&'a Animation<S>>]),
    /// One animation scaled per channel by `values`
    ///
    /// PWM values scale by `value / 255`, digital values switch a channel
    /// fully on or off.
    Shared {
        animation: &'a Animation<S>,
        values: Option<&'a [ChannelValue]>,
    },
}

impl<S: Scheduler> Clone for ChannelInput<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Scheduler> Copy for ChannelInput<'_, S> {}

/// Configuration of an animation binding
pub struct AnimationConfig<'a, S: Scheduler = TimerQueue> {
    /// Animations to bind
    pub input: ChannelInput<'a, S>,
    /// Start playback as soon as the binding is installed
    pub auto_start: bool,
}

impl<S: Scheduler> Clone for AnimationConfig<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Scheduler> Copy for AnimationConfig<'_, S> {}

impl<'a, S: Scheduler> AnimationConfig<'a, S> {
    /// Bind one animation per channel
    pub const fn per_channel(animations: &'a [Option<&'a Animation<S>>]) -> Self {
        Self {
            input: ChannelInput::PerChannel(animations),
            auto_start: true,
        }
    }

    /// Bind a single animation scaled by per-channel values
    pub const fn shared(animation: &'a Animation<S>, values: Option<&'a [ChannelValue]>) -> Self {
        Self {
            input: ChannelInput::Shared { animation, values },
            auto_start: true,
        }
    }

    /// Set whether the binding starts playing once installed
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }
}

/// Installed binding
enum Binding<S: Scheduler> {
    /// Animations live in the LEDs; flags mark the animated channels
    PerChannel(Vec<bool>),
    /// Private copy of the shared animation
    Shared(Animation<S>),
}

/// Multiple LEDs controlled as a unit
pub struct LedArray<D: OutputDriver + 'static, S: Scheduler = TimerQueue> {
    leds: Vec<Led<D, S>>,
    binding: Option<Binding<S>>,
}

impl<D: OutputDriver + 'static, S: Scheduler> LedArray<D, S> {
    /// Create an array with one channel per pin
    pub fn new(pins: &[i32], invert: Invert, driver: SharedDriver<D>) -> Result<Self> {
        if let Invert::PerPin(flags) = &invert
            && flags.len() != pins.len()
        {
            return Err(Error::ArityMismatch {
                expected: pins.len(),
                actual: flags.len(),
            });
        }

        let leds = pins
            .iter()
            .enumerate()
            .map(|(index, &pin)| {
                let pin_invert = match &invert {
                    Invert::Uniform(flag) => *flag,
                    Invert::PerPin(flags) => flags[index],
                };
                Led::new(pin, pin_invert, Rc::clone(&driver))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            leds,
            binding: None,
        })
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.leds.len()
    }

    /// Check if the array has no channels
    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }

    /// Check if any bound animation is playing
    pub fn is_animating(&self) -> bool {
        match &self.binding {
            None => false,
            Some(Binding::Shared(animation)) => animation.is_running(),
            Some(Binding::PerChannel(_)) => self.leds.iter().any(Led::is_animating),
        }
    }

    /// Install a new animation binding.
    ///
    /// The current binding is stopped first and replaced once `config`
    /// validates. Animations in `config` are copied, never started
    /// themselves.
    pub fn animate(&mut self, config: AnimationConfig<'_, S>) -> Result<()> {
        self.stop_animation();

        let binding = match config.input {
            ChannelInput::PerChannel(animations) => {
                self.check_arity(animations.len())?;
                self.clear_binding();
                for (led, animation) in self.leds.iter_mut().zip(animations) {
                    if let Some(animation) = animation {
                        led.animate(animation, config.auto_start);
                    }
                }
                Binding::PerChannel(animations.iter().map(Option::is_some).collect())
            }
            ChannelInput::Shared { animation, values } => {
                let values = values.ok_or(Error::MissingValues)?;
                self.check_arity(values.len())?;
                check_homogeneous(values)?;
                for value in values {
                    value.check_range()?;
                }
                self.clear_binding();

                let mut animation = animation.copy();
                animation.subscribe(self.fan_out(values));
                if config.auto_start {
                    animation.start();
                }
                Binding::Shared(animation)
            }
        };

        #[cfg(feature = "log")]
        log::debug!(
            "led_array: installed {} binding on {} channels",
            match binding {
                Binding::PerChannel(_) => "per-channel",
                Binding::Shared(_) => "shared",
            },
            self.leds.len()
        );

        self.binding = Some(binding);
        Ok(())
    }

    /// Start or resume the bound animation
    pub fn start_animation(&mut self) -> Result<()> {
        match &mut self.binding {
            None => Err(Error::NoAnimationBound),
            Some(Binding::Shared(animation)) => {
                animation.start();
                Ok(())
            }
            Some(Binding::PerChannel(flags)) => {
                for (led, &animated) in self.leds.iter_mut().zip(flags.iter()) {
                    if animated {
                        led.start_animation()?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Stop the bound animation, if any
    pub fn stop_animation(&mut self) {
        match &mut self.binding {
            None => {}
            Some(Binding::Shared(animation)) => {
                animation.stop();
            }
            Some(Binding::PerChannel(flags)) => {
                for (led, &animated) in self.leds.iter_mut().zip(flags.iter()) {
                    if animated {
                        led.stop_animation();
                    }
                }
            }
        }
    }

    /// Write one value per channel.
    ///
    /// All values must be of the same kind as the first one. Channels are
    /// written in order, so those before an invalid value keep their new
    /// value. A running animation is not stopped.
    pub fn write(&mut self, values: &[ChannelValue]) -> Result<()> {
        self.check_arity(values.len())?;
        let Some(&first) = values.first() else {
            return Ok(());
        };

        for (index, (led, &value)) in self.leds.iter_mut().zip(values).enumerate() {
            if !value.same_kind(first) {
                return Err(Error::TypeMismatch { index });
            }
            led.write(value)?;
        }
        Ok(())
    }

    /// Stop the animation and switch every channel off
    pub fn off(&mut self) {
        self.stop_animation();
        for led in &self.leds {
            led.writer().digital(false);
        }
    }

    fn check_arity(&self, actual: usize) -> Result<()> {
        if actual == self.leds.len() {
            Ok(())
        } else {
            Err(Error::ArityMismatch {
                expected: self.leds.len(),
                actual,
            })
        }
    }

    /// Discard the current binding and every per-channel animation
    fn clear_binding(&mut self) {
        self.binding = None;
        for led in &mut self.leds {
            led.clear_animation();
        }
    }

    /// Listener writing `value * ratio` to every channel, in channel order
    fn fan_out(&self, values: &[ChannelValue]) -> Listener {
        let channels: Vec<(PinWriter<D>, f64)> = self
            .leds
            .iter()
            .zip(values)
            .map(|(led, value)| (led.writer().clone(), value.ratio()))
            .collect();

        Rc::new(move |value: f64| {
            for (writer, ratio) in &channels {
                writer.fraction(value * ratio);
            }
        })
    }
}

fn check_homogeneous(values: &[ChannelValue]) -> Result<()> {
    let Some(&first) = values.first() else {
        return Ok(());
    };
    match values.iter().position(|value| !value.same_kind(first)) {
        Some(index) => Err(Error::TypeMismatch { index }),
        None => Ok(()),
    }
}

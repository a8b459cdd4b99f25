#![no_std]

extern crate alloc;

use alloc::rc::Rc;
use core::cell::RefCell;

pub mod animation;
pub mod curves;
pub mod error;
pub mod led;
pub mod led_array;
pub mod scheduler;

pub use animation::{Animation, Curve, DEFAULT_FRAME_RATE_MS, Listener};
pub use error::{Error, Result};
pub use led::{ChannelValue, Led};
pub use led_array::{AnimationConfig, ChannelInput, Invert, LedArray};
pub use scheduler::{FrameResult, Scheduler, TimerId, TimerQueue};
pub use embassy_time::{Duration, Instant};

/// Abstract GPIO output driver trait
///
/// Implement this trait to support different hardware platforms.
/// LEDs are generic over this trait and address it by pin number.
pub trait OutputDriver {
    /// Set a pin high or low
    fn write_digital(&mut self, pin: u32, level: bool);

    /// Set the PWM duty cycle of a pin
    fn write_pwm(&mut self, pin: u32, duty: u8);
}

/// Output driver shared by every channel of a program
pub type SharedDriver<D> = Rc<RefCell<D>>;

//! Ready-made periodic curves
//!
//! Each constructor takes a frequency in radians (or cycles, for the
//! sawtooth) per millisecond and returns a curve usable with
//! [`Animation::new`](crate::Animation::new).

/// Square wave alternating between 0 and 1
pub fn square(frequency: f64) -> impl Fn(f64) -> f64 + Clone + 'static {
    move |time| libm::ceil(libm::sin(time * frequency))
}

/// Sawtooth wave rising from 0 to 1 once per `1 / frequency` milliseconds
///
/// The remainder keeps the sign of the time, so negative times produce
/// negative values.
pub fn sawtooth(frequency: f64) -> impl Fn(f64) -> f64 + Clone + 'static {
    move |time| libm::fmod(time * frequency, 1.0)
}

/// Sine wave shifted into `[0, 1]`
pub fn sine(frequency: f64) -> impl Fn(f64) -> f64 + Clone + 'static {
    move |time| (libm::sin(time * frequency) + 1.0) / 2.0
}

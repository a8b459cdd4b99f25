//! Terminal preview for myrtio-led-animation
//!
//! Simulates a bank of PWM LEDs as bars in the terminal and plays a few
//! animations on them in real time.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::rc::Rc;
use std::thread;

use embassy_time::{Duration, Instant};
use myrtio_led_animation::{
    Animation, AnimationConfig, ChannelValue, Invert, LedArray, OutputDriver, TimerQueue,
    curves,
};

/// Pins of the simulated LEDs
const PINS: [i32; 4] = [2, 3, 4, 5];

/// Width of a full-brightness bar, in characters
const BAR_WIDTH: usize = 16;

/// Refresh interval of the animations
const FRAME_RATE_MS: f64 = 20.0;

/// Sleep used when no timer is armed
const IDLE: Duration = Duration::from_millis(50);

/// Output driver drawing every pin as a horizontal bar
#[derive(Default)]
struct TerminalDriver {
    duties: BTreeMap<u32, u8>,
}

impl TerminalDriver {
    fn render(&self) -> String {
        self.duties
            .iter()
            .map(|(pin, duty)| {
                let filled = usize::from(*duty) * BAR_WIDTH / 255;
                format!(
                    "{pin:>2} [{}{}]",
                    "#".repeat(filled),
                    " ".repeat(BAR_WIDTH - filled)
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl OutputDriver for TerminalDriver {
    fn write_digital(&mut self, pin: u32, level: bool) {
        self.duties.insert(pin, if level { 255 } else { 0 });
    }

    fn write_pwm(&mut self, pin: u32, duty: u8) {
        self.duties.insert(pin, duty);
    }
}

/// Drive the timers in real time for `duration`, redrawing after every tick
fn run_for(timers: &TimerQueue, driver: &Rc<RefCell<TerminalDriver>>, duration: Duration) {
    let deadline = Instant::now() + duration;
    let mut stdout = std::io::stdout();
    while Instant::now() < deadline {
        let result = timers.tick(Instant::now());
        if result.fired > 0 {
            let _ = write!(stdout, "\r{}", driver.borrow().render());
            let _ = stdout.flush();
        }
        let sleep = result.sleep_duration.unwrap_or(IDLE).min(IDLE);
        thread::sleep(std::time::Duration::from_micros(sleep.as_micros()));
    }
}

fn main() {
    let driver = Rc::new(RefCell::new(TerminalDriver::default()));
    let timers = TimerQueue::with_clock(Instant::now);
    let mut leds: LedArray<TerminalDriver> =
        match LedArray::new(&PINS, Invert::default(), Rc::clone(&driver)) {
            Ok(leds) => leds,
            Err(err) => {
                eprintln!("failed to set up LEDs: {err}");
                return;
            }
        };

    let breathe = match Animation::with_frame_rate(
        curves::sine(std::f64::consts::TAU / 2000.0),
        timers.clone(),
        FRAME_RATE_MS,
    ) {
        Ok(animation) => animation,
        Err(err) => {
            eprintln!("failed to create animation: {err}");
            return;
        }
    };
    let ramp = Animation::new(curves::sawtooth(1.0 / 1500.0), timers.clone());

    println!("shared breathing, scaled per channel");
    let values: Vec<ChannelValue> = [255u8, 170, 85, 30].into_iter().map(Into::into).collect();
    if let Err(err) = leds.animate(AnimationConfig::shared(&breathe, Some(&values[..]))) {
        eprintln!("failed to bind animation: {err}");
        return;
    }
    run_for(&timers, &driver, Duration::from_secs(4));

    println!("\npaused");
    leds.stop_animation();
    run_for(&timers, &driver, Duration::from_secs(1));

    println!("\nresumed where it stopped");
    if let Err(err) = leds.start_animation() {
        eprintln!("failed to resume: {err}");
        return;
    }
    run_for(&timers, &driver, Duration::from_secs(2));

    println!("\nper-channel animations");
    let per_channel = [Some(&breathe), None, Some(&ramp), Some(&ramp)];
    if let Err(err) = leds.animate(AnimationConfig::per_channel(&per_channel)) {
        eprintln!("failed to bind animations: {err}");
        return;
    }
    run_for(&timers, &driver, Duration::from_secs(4));

    println!("\noff");
    leds.off();
    println!("{}", driver.borrow().render());
}

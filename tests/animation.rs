mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::{Rc, Weak};

    use myrtio_led_animation::{
        Animation, DEFAULT_FRAME_RATE_MS, Duration, Error, Listener, TimerQueue,
    };

    const FRAME: Duration = Duration::from_millis(10);

    fn linear(timers: &TimerQueue) -> Animation {
        Animation::with_frame_rate(|t| t / 1000.0, timers.clone(), 10.0).unwrap()
    }

    fn counter() -> (Listener, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        let listener_count = Rc::clone(&count);
        let listener: Listener =
            Rc::new(move |_: f64| listener_count.set(listener_count.get() + 1));
        (listener, count)
    }

    fn recorder() -> (Listener, Rc<RefCell<Vec<f64>>>) {
        let samples = Rc::new(RefCell::new(Vec::new()));
        let listener_samples = Rc::clone(&samples);
        let listener: Listener =
            Rc::new(move |value: f64| listener_samples.borrow_mut().push(value));
        (listener, samples)
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_calculate_follows_curve_and_clamps() {
        let animation = Animation::with_frame_rate(|t| t / 500.0, TimerQueue::new(), 1.0).unwrap();
        assert!(approx_eq(animation.calculate_at(0.0), 0.0));
        assert!(approx_eq(animation.calculate_at(250.0), 0.5));
        assert!(approx_eq(animation.calculate_at(500.0), 1.0));
        assert_eq!(animation.calculate_at(750.0), 1.0);
        assert_eq!(animation.calculate_at(-100.0), 0.0);
    }

    #[test]
    fn test_calculate_clamps_out_of_range_curves() {
        let above = Animation::new(|_| 1.5, TimerQueue::new());
        let below = Animation::new(|_| -1.5, TimerQueue::new());
        let nan = Animation::new(|_| f64::NAN, TimerQueue::new());
        assert_eq!(above.calculate_at(10.0), 1.0);
        assert_eq!(below.calculate_at(10.0), 0.0);
        assert_eq!(nan.calculate_at(10.0), 0.0);
    }

    #[test]
    fn test_calculate_without_start_uses_time_zero() {
        let timers = TimerQueue::new();
        let animation = Animation::new(|t| 0.25 + t, timers.clone());
        timers.advance(Duration::from_millis(500));
        assert_eq!(animation.calculate(), 0.25);
    }

    #[test]
    fn test_calculate_uses_elapsed_time() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        animation.start();
        timers.advance(Duration::from_millis(300));
        assert!(approx_eq(animation.calculate(), 0.3));
    }

    #[test]
    fn test_frame_rate() {
        let timers = TimerQueue::new();
        let animation = Animation::new(|t| t, timers.clone());
        assert_eq!(
            animation.frame_rate(),
            Duration::from_millis(DEFAULT_FRAME_RATE_MS)
        );

        let animation = Animation::with_frame_rate(|t| t, timers.clone(), 2.7).unwrap();
        assert_eq!(animation.frame_rate(), Duration::from_millis(2));

        for rate in [0.5, 0.0, -1.0, f64::NAN] {
            assert!(matches!(
                Animation::with_frame_rate(|t| t, timers.clone(), rate),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_frame_rate_too_long_is_rejected() {
        let timers = TimerQueue::new();
        for rate in [f64::INFINITY, 1e300, 1e14] {
            assert!(matches!(
                Animation::with_frame_rate(|t| t, timers.clone(), rate),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_long_frame_rate_schedules_without_overflow() {
        let timers = TimerQueue::new();
        let (listener, count) = counter();
        let mut animation = Animation::with_frame_rate(|t| t, timers.clone(), 1e12).unwrap();
        assert_eq!(animation.frame_rate(), Duration::from_millis(1_000_000_000_000));

        animation.subscribe(listener).start();
        timers.advance(Duration::from_secs(3600));
        assert_eq!(count.get(), 0);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn test_start_calls_subscribers_every_frame() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let (listener, count) = counter();
        animation.subscribe(listener).start();

        assert!(animation.is_running());
        timers.advance(Duration::from_millis(100));
        assert_eq!(count.get(), 10);
    }

    #[test]
    fn test_start_is_idempotent() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let (listener, count) = counter();
        animation.subscribe(listener);
        animation.start().start();

        assert_eq!(timers.pending(), 1);
        timers.advance(Duration::from_millis(100));
        assert_eq!(count.get(), 10);
    }

    #[test]
    fn test_stop_cancels_immediately() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let (listener, count) = counter();
        animation.subscribe(listener).start();

        timers.advance(Duration::from_millis(55));
        animation.stop().stop();
        assert!(!animation.is_running());
        assert_eq!(timers.pending(), 0);

        timers.advance(Duration::from_millis(100));
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        animation.stop();
        assert!(!animation.is_running());
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_pause_resume_continues_progress() {
        let timers = TimerQueue::new();
        let mut paused = linear(&timers);
        let (listener, paused_samples) = recorder();
        paused.subscribe(listener).start();
        timers.advance(Duration::from_millis(50));
        paused.stop();
        timers.advance(Duration::from_millis(1_234));
        paused.start();
        timers.advance(Duration::from_millis(50));

        let timers = TimerQueue::new();
        let mut continuous = linear(&timers);
        let (listener, continuous_samples) = recorder();
        continuous.subscribe(listener).start();
        timers.advance(Duration::from_millis(100));

        assert_eq!(paused_samples.borrow().len(), 10);
        assert_eq!(*paused_samples.borrow(), *continuous_samples.borrow());
    }

    #[test]
    fn test_reset_while_stopped_discards_progress() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let (listener, samples) = recorder();
        animation.subscribe(Rc::clone(&listener)).start();
        timers.advance(Duration::from_millis(200));
        animation.stop().reset();
        assert!(!animation.is_running());
        timers.advance(Duration::from_millis(70));

        samples.borrow_mut().clear();
        animation.start();
        timers.advance(FRAME);

        let fresh_timers = TimerQueue::new();
        let mut fresh = linear(&fresh_timers);
        let (fresh_listener, fresh_samples) = recorder();
        fresh.subscribe(fresh_listener).start();
        fresh_timers.advance(FRAME);

        assert_eq!(samples.borrow().first(), fresh_samples.borrow().first());
        assert!(approx_eq(samples.borrow()[0], 0.01));
    }

    #[test]
    fn test_reset_while_running_rebases() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let (listener, samples) = recorder();
        animation.subscribe(listener).start();
        timers.advance(Duration::from_millis(500));
        assert!(approx_eq(*samples.borrow().last().unwrap(), 0.5));

        animation.reset();
        assert!(animation.is_running());
        timers.advance(FRAME);
        assert!(approx_eq(*samples.borrow().last().unwrap(), 0.01));
    }

    #[test]
    fn test_subscribe_same_listener_once() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let (listener, count) = counter();
        animation
            .subscribe(Rc::clone(&listener))
            .subscribe(Rc::clone(&listener));
        assert_eq!(animation.subscriber_count(), 1);

        animation.start();
        timers.advance(FRAME);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let (listener, count) = counter();
        animation.subscribe(Rc::clone(&listener)).start();
        timers.advance(Duration::from_millis(30));

        animation.unsubscribe(&listener);
        // Unknown listeners are ignored
        animation.unsubscribe(&listener);
        timers.advance(Duration::from_millis(30));

        assert!(animation.is_running());
        assert_eq!(animation.subscriber_count(), 0);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_subscribers_called_in_order() {
        let timers = TimerQueue::new();
        let mut animation = linear(&timers);
        let log = Rc::new(RefCell::new(Vec::new()));
        for id in 0..3 {
            let log = Rc::clone(&log);
            animation.subscribe(Rc::new(move |_: f64| log.borrow_mut().push(id)));
        }
        animation.start();
        timers.advance(Duration::from_millis(20));
        assert_eq!(*log.borrow(), vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_copy_is_detached() {
        let timers = TimerQueue::new();
        let mut original = linear(&timers);
        let (listener, count) = counter();
        original.subscribe(listener).start();
        timers.advance(Duration::from_millis(100));

        let mut copy = original.copy();
        assert!(!copy.is_running());
        assert_eq!(copy.subscriber_count(), 0);
        assert_eq!(copy.frame_rate(), original.frame_rate());
        assert_eq!(copy.calculate(), 0.0);
        assert_eq!(copy.calculate_at(400.0), original.calculate_at(400.0));

        copy.start();
        original.stop();
        timers.advance(Duration::from_millis(100));
        assert!(copy.is_running());
        assert_eq!(count.get(), 10);
    }

    #[test]
    fn test_drop_cancels_timer() {
        let timers = TimerQueue::new();
        let (listener, count) = counter();
        {
            let mut animation = linear(&timers);
            animation.subscribe(listener).start();
            timers.advance(FRAME);
        }
        assert_eq!(timers.pending(), 0);
        timers.advance(Duration::from_millis(100));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_listener_can_stop_animation() {
        let timers = TimerQueue::new();
        let animation = Rc::new(RefCell::new(linear(&timers)));
        let count = Rc::new(Cell::new(0));

        let handle: Weak<RefCell<Animation>> = Rc::downgrade(&animation);
        let listener_count = Rc::clone(&count);
        let listener: Listener = Rc::new(move |_: f64| {
            listener_count.set(listener_count.get() + 1);
            if let Some(animation) = handle.upgrade() {
                animation.borrow_mut().stop();
            }
        });
        animation.borrow_mut().subscribe(listener).start();

        timers.advance(Duration::from_millis(100));
        assert_eq!(count.get(), 1);
        assert!(!animation.borrow().is_running());
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let timers = TimerQueue::new();
        let animation = Rc::new(RefCell::new(linear(&timers)));
        let count = Rc::new(Cell::new(0));
        let own: Rc<RefCell<Option<Listener>>> = Rc::new(RefCell::new(None));

        let handle: Weak<RefCell<Animation>> = Rc::downgrade(&animation);
        let listener_count = Rc::clone(&count);
        let listener_own = Rc::clone(&own);
        let listener: Listener = Rc::new(move |_: f64| {
            listener_count.set(listener_count.get() + 1);
            let me = listener_own.borrow_mut().take();
            if let (Some(animation), Some(me)) = (handle.upgrade(), me) {
                animation.borrow_mut().unsubscribe(&me);
            }
        });
        *own.borrow_mut() = Some(Rc::clone(&listener));
        animation.borrow_mut().subscribe(listener).start();

        timers.advance(Duration::from_millis(100));
        assert_eq!(count.get(), 1);
        assert_eq!(animation.borrow().subscriber_count(), 0);
        assert!(animation.borrow().is_running());

        animation.borrow_mut().stop();
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_unsubscribe_during_frame_applies_next_frame() {
        let timers = TimerQueue::new();
        let animation = Rc::new(RefCell::new(linear(&timers)));
        let (second, second_count) = counter();

        let handle: Weak<RefCell<Animation>> = Rc::downgrade(&animation);
        let target = Rc::clone(&second);
        let first: Listener = Rc::new(move |_: f64| {
            if let Some(animation) = handle.upgrade() {
                animation.borrow_mut().unsubscribe(&target);
            }
        });
        animation
            .borrow_mut()
            .subscribe(first)
            .subscribe(second)
            .start();

        timers.advance(FRAME);
        assert_eq!(second_count.get(), 1);
        timers.advance(Duration::from_millis(50));
        assert_eq!(second_count.get(), 1);
        assert_eq!(animation.borrow().subscriber_count(), 1);
    }

    #[test]
    #[should_panic(expected = "curve failure")]
    fn test_curve_panic_propagates() {
        let timers = TimerQueue::new();
        let mut animation =
            Animation::with_frame_rate(|_| panic!("curve failure"), timers.clone(), 10.0).unwrap();
        animation.start();
        timers.advance(FRAME);
    }
}

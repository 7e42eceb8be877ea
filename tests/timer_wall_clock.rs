//! Property: a cyclic timer started at interval `I` fires at least
//! `floor(T/I) - 1` times in wall time `T` (scenario S2: three successive
//! 1s-bounded waits on a 100ms cyclic timer complete in ~300ms total).

use std::time::{Duration, Instant};

use aio_core::controller::Controller;
use aio_core::timer::Timer;

#[test]
fn three_waits_on_a_100ms_cyclic_timer_complete_in_about_300ms() {
    let ctl = Controller::new().unwrap();
    let timer = Timer::new();
    timer.start(Duration::from_millis(100), true);

    let start = Instant::now();
    for _ in 0..3 {
        assert!(timer.wait(&ctl, Some(Duration::from_secs(1))));
    }
    let elapsed = start.elapsed();
    timer.stop();

    assert!(
        elapsed >= Duration::from_millis(200),
        "fired too fast: {elapsed:?}"
    );
    assert!(
        elapsed <= Duration::from_millis(700),
        "fired too slow: {elapsed:?}"
    );
}

#[test]
fn cyclic_timer_fires_at_least_floor_t_over_i_minus_one_times() {
    let ctl = Controller::new().unwrap();
    let timer = Timer::new();
    let interval = Duration::from_millis(25);
    timer.start(interval, true);

    let budget = Duration::from_millis(400);
    let deadline = Instant::now() + budget;
    let mut fires = 0u32;
    while Instant::now() < deadline {
        if timer.wait(&ctl, Some(Duration::from_millis(50))) {
            fires += 1;
        }
    }
    timer.stop();

    let expected_min = (budget.as_millis() / interval.as_millis()) as u32;
    assert!(
        fires + 1 >= expected_min,
        "expected >= {} - 1 fires, got {fires}",
        expected_min
    );
}

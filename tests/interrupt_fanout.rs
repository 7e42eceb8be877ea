//! Scenario S6: two waiters with different requested kinds both see their
//! own kind and only their own kind, regardless of delivery order, and a
//! kind raised between two waits is never lost.

#![cfg(all(unix, feature = "os-ext"))]

use std::time::Duration;

use aio_core::controller::Controller;
use aio_core::interrupt::Interrupt;
use aio_core::operation::InterruptKinds;

#[test]
fn two_waiters_with_different_kinds_each_see_only_their_own() {
    let ctl = Controller::new().unwrap();
    let interrupt = Interrupt::new();

    let w1 = aio_core::operation::InterruptOperation::new(
        InterruptKinds::BREAK | InterruptKinds::HANGUP,
    );
    let w2 = aio_core::operation::InterruptOperation::new(InterruptKinds::TERMINATE);
    interrupt.wait_async(&ctl, &w1);
    interrupt.wait_async(&ctl, &w2);

    unsafe {
        libc::raise(libc::SIGINT);
    }
    assert!(ctl.wait_for(&w1.base(), Some(Duration::from_secs(2))));
    assert_eq!(w1.received(), InterruptKinds::BREAK);
    assert!(!ctl.wait_for(&w2.base(), Some(Duration::from_millis(100))));

    unsafe {
        libc::raise(libc::SIGTERM);
    }
    assert!(ctl.wait_for(&w2.base(), Some(Duration::from_secs(2))));
    assert_eq!(w2.received(), InterruptKinds::TERMINATE);
}

#[test]
fn a_kind_raised_between_two_waits_is_never_lost() {
    let ctl = Controller::new().unwrap();
    let interrupt = Interrupt::new();

    // Arm SIGHUP (and subscribe this controller) up front via a
    // throwaway wait, then cancel it, so the raise below never risks
    // hitting the OS default disposition for a not-yet-armed signal.
    let warm = aio_core::operation::InterruptOperation::new(InterruptKinds::HANGUP);
    interrupt.wait_async(&ctl, &warm);
    interrupt.cancel(&ctl, &warm);

    unsafe {
        libc::raise(libc::SIGHUP);
    }
    let kinds = interrupt.wait(&ctl, InterruptKinds::HANGUP, Some(Duration::from_secs(2)));
    assert!(kinds.contains(InterruptKinds::HANGUP));
}

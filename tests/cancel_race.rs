//! Scenario S3 / property 3: cancelling a send after it has made partial
//! progress leaves the operation off every subsequent `wait` result, and its
//! `bytes_sent()` reflects exactly the progress made before the cancel.

use std::os::unix::io::RawFd;
use std::time::Duration;

use aio_core::comm::CommunicationObject;
use aio_core::controller::Controller;
use aio_core::fd_transport::FdTransport;
use aio_core::operation::SendOperation;

fn pipe_pair() -> (RawFd, RawFd) {
    let mut fds = [0i32; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    (fds[0], fds[1])
}

#[test]
fn cancel_after_partial_progress_leaves_no_trace_and_freezes_bytes_sent() {
    let (read_fd, write_fd) = pipe_pair();
    let ctl = Controller::new().unwrap();
    // Never drained: once the pipe's kernel buffer fills, further writes
    // block (EAGAIN), guaranteeing the send makes partial but not full
    // progress before we cancel it.
    let reader = FdTransport::new(read_fd, "cancel-race-reader").unwrap();
    let writer = FdTransport::new(write_fd, "cancel-race-writer").unwrap();

    let payload = vec![0x5Au8; 8 * 1024 * 1024];
    let op = SendOperation::new(payload);
    writer.send_async(&ctl, &op);

    // Give the backend a few dispatch passes to drain the pipe buffer.
    let mut last_progress = 0;
    for _ in 0..20 {
        ctl.wait_for(&op.base(), Some(Duration::from_millis(50)));
        let now = op.bytes_sent();
        if now == last_progress && now > 0 {
            break;
        }
        last_progress = now;
        if op.is_completed() {
            break;
        }
    }
    assert!(
        op.bytes_sent() > 0,
        "expected at least one byte written before the pipe filled up"
    );
    assert!(!op.is_completed(), "payload unexpectedly fit in one go");

    let progress_at_cancel = op.bytes_sent();
    writer.cancel(&ctl, &op.base());

    // The op must never again appear on a wait result...
    assert!(!ctl.wait_for(&op.base(), Some(Duration::from_millis(200))));
    // ...and its progress counter must be frozen at the cancel point.
    assert_eq!(op.bytes_sent(), progress_at_cancel);

    drop(reader);
}

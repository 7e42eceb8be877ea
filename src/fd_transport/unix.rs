//! Non-blocking file-descriptor transport: sockets and pipes.
//!
//! Grounded on the POSIX `FileDescriptor`/`ControllerImpl` pairing: a single
//! descriptor with two independent pending queues (send, receive), each
//! registering write/read readiness with the owning [`Controller`]'s
//! backend only while non-empty.

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, Weak};

use crate::backend::{Direction, RawTarget, ReadinessHandler};
use crate::comm::CommunicationObject;
use crate::controller::Controller;
use crate::operation::{Operation, OperationId, ReceiveOperation, SendOperation, SubscriptionId};

struct FdState {
    self_weak: Weak<FdTransport>,
    send_queue: VecDeque<SendOperation>,
    receive_queue: VecDeque<ReceiveOperation>,
    write_sub: Option<(Controller, SubscriptionId)>,
    read_sub: Option<(Controller, SubscriptionId)>,
}

/// A non-blocking socket or pipe, usable as a [`CommunicationObject`].
pub struct FdTransport {
    fd: RawFd,
    name: String,
    state: Mutex<FdState>,
}

struct ReadHandler(Arc<FdTransport>);
impl ReadinessHandler for ReadHandler {
    fn handle_read_ready(&self) -> bool {
        self.0.on_read_ready()
    }
}

struct WriteHandler(Arc<FdTransport>);
impl ReadinessHandler for WriteHandler {
    fn handle_write_ready(&self) -> bool {
        self.0.on_write_ready()
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

impl FdTransport {
    /// Takes ownership of `fd`, arranging for it to be closed on drop.
    /// `fd` is put into non-blocking mode.
    pub fn new(fd: RawFd, name: impl Into<String>) -> io::Result<Arc<Self>> {
        set_nonblocking(fd)?;
        let name = name.into();
        Ok(Arc::new_cyclic(|weak| FdTransport {
            fd,
            name,
            state: Mutex::new(FdState {
                self_weak: weak.clone(),
                send_queue: VecDeque::new(),
                receive_queue: VecDeque::new(),
                write_sub: None,
                read_sub: None,
            }),
        }))
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd
    }

    /// Half-closes the write side (`shutdown(fd, SHUT_WR)`), leaving the
    /// read side open.
    pub fn close_send(&self) -> io::Result<()> {
        if unsafe { libc::shutdown(self.fd, libc::SHUT_WR) } != 0 {
            let err = io::Error::last_os_error();
            log::warn!("{}: close_send failed: {}", self.name, err);
            return Err(err);
        }
        Ok(())
    }

    fn on_write_ready(self: &Arc<Self>) -> bool {
        let completed = {
            let mut state = self.state.lock().unwrap();
            let op = match state.send_queue.front() {
                Some(op) => op.clone(),
                None => return true,
            };
            let unsent = op.unsent_bytes();
            let result = unsafe {
                libc::write(self.fd, unsent.as_ptr() as *const _, unsent.len())
            };
            if result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    return false;
                }
                log::warn!("{}: write error: {}", self.name, err);
                state.send_queue.pop_front();
                Some(op)
            } else {
                let n = result as usize;
                op.add_sent_bytes(n);
                state.send_queue.pop_front();
                Some(op)
            }
        };
        if let Some(op) = completed {
            op.notifier().notify(&op.base());
        }
        let mut state = self.state.lock().unwrap();
        if state.send_queue.is_empty() {
            if let Some((ctl, id)) = state.write_sub.take() {
                drop(state);
                ctl.remove_subscriber(id);
            }
            true
        } else {
            false
        }
    }

    fn on_read_ready(self: &Arc<Self>) -> bool {
        let completed = {
            let mut state = self.state.lock().unwrap();
            let op = match state.receive_queue.front() {
                Some(op) => op.clone(),
                None => return true,
            };
            let mut buf = vec![0u8; op.unreceived_len()];
            let result = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut _, buf.len()) };
            if result < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    return false;
                }
                log::warn!("{}: read error: {}", self.name, err);
                state.receive_queue.pop_front();
                Some(op)
            } else if result == 0 {
                // Connection lost: surface zero bytes so `full_receive`
                // distinguishes this from a NetworkError timeout.
                state.receive_queue.pop_front();
                Some(op)
            } else {
                let n = result as usize;
                op.fill_from(&buf[..n]);
                state.receive_queue.pop_front();
                Some(op)
            }
        };
        if let Some(op) = completed {
            op.notifier().notify(&op.base());
        }
        let mut state = self.state.lock().unwrap();
        if state.receive_queue.is_empty() {
            if let Some((ctl, id)) = state.read_sub.take() {
                drop(state);
                ctl.remove_subscriber(id);
            }
            true
        } else {
            false
        }
    }

    fn remove_by_identity(&self, id: OperationId) -> bool {
        let mut state = self.state.lock().unwrap();
        let before_send = state.send_queue.len();
        state.send_queue.retain(|op| op.identity() != id);
        let removed_send = state.send_queue.len() != before_send;
        if state.send_queue.is_empty() {
            if let Some((ctl, sub_id)) = state.write_sub.take() {
                drop(state);
                ctl.remove_subscriber(sub_id);
                state = self.state.lock().unwrap();
            }
        }

        let before_recv = state.receive_queue.len();
        state.receive_queue.retain(|op| op.identity() != id);
        let removed_recv = state.receive_queue.len() != before_recv;
        if state.receive_queue.is_empty() {
            if let Some((ctl, sub_id)) = state.read_sub.take() {
                drop(state);
                ctl.remove_subscriber(sub_id);
            }
        }
        removed_send || removed_recv
    }
}

impl Drop for FdTransport {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl CommunicationObject for FdTransport {
    fn send_async(&self, ctl: &Controller, op: &SendOperation) {
        op.set_controller(ctl.clone());
        let mut state = self.state.lock().unwrap();
        let was_empty = state.send_queue.is_empty();
        state.send_queue.push_back(op.clone());
        if was_empty {
            let self_arc = state
                .self_weak
                .upgrade()
                .expect("transport dropped while a send is still pending on it");
            let id = ctl.add_subscriber(
                RawTarget::Fd(self.fd),
                Direction::Write,
                Arc::new(WriteHandler(self_arc)),
            );
            state.write_sub = Some((ctl.clone(), id));
        }
    }

    fn receive_async(&self, ctl: &Controller, op: &ReceiveOperation) {
        op.set_controller(ctl.clone());
        let mut state = self.state.lock().unwrap();
        let was_empty = state.receive_queue.is_empty();
        state.receive_queue.push_back(op.clone());
        if was_empty {
            let self_arc = state
                .self_weak
                .upgrade()
                .expect("transport dropped while a receive is still pending on it");
            let id = ctl.add_subscriber(
                RawTarget::Fd(self.fd),
                Direction::Read,
                Arc::new(ReadHandler(self_arc)),
            );
            state.read_sub = Some((ctl.clone(), id));
        }
    }

    fn cancel(&self, ctl: &Controller, op: &Operation) {
        self.remove_by_identity(op.identity());
        ctl.revert_post(op);
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pipe_pair() -> (RawFd, RawFd) {
        let mut fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    #[test]
    fn send_then_receive_round_trips_through_a_pipe() {
        let (read_fd, write_fd) = pipe_pair();
        let ctl = Controller::new().unwrap();
        let reader = FdTransport::new(read_fd, "pipe-reader").unwrap();
        let writer = FdTransport::new(write_fd, "pipe-writer").unwrap();

        let send_op = SendOperation::new(vec![9, 8, 7]);
        assert!(writer.send(&ctl, &send_op, Some(Duration::from_secs(2))));

        let recv_op = ReceiveOperation::new(3);
        assert!(reader.receive(&ctl, &recv_op, Some(Duration::from_secs(2))));
        assert_eq!(recv_op.into_data(), vec![9, 8, 7]);
    }

    #[test]
    fn receive_times_out_when_nothing_is_written() {
        let (read_fd, write_fd) = pipe_pair();
        let ctl = Controller::new().unwrap();
        let reader = FdTransport::new(read_fd, "pipe-reader").unwrap();
        // Keep the write end alive so the read doesn't observe EOF.
        let _writer = FdTransport::new(write_fd, "pipe-writer").unwrap();

        let recv_op = ReceiveOperation::new(3);
        assert!(!reader.receive(&ctl, &recv_op, Some(Duration::from_millis(50))));
    }
}

//! Zero-copy in-process rendezvous between one send and one receive.
//!
//! Grounded on the pairing logic of the source `MessageExchange`: a send
//! and a receive posted on the same object are matched FIFO-per-side, with
//! no intermediate buffering — bytes move directly from the sender's
//! buffer into the receiver's.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::comm::CommunicationObject;
use crate::controller::Controller;
use crate::operation::{Operation, ReceiveOperation, SendOperation};

struct ExchangeState {
    pending_sends: VecDeque<SendOperation>,
    pending_receives: VecDeque<ReceiveOperation>,
}

/// An in-process rendezvous point. Typically shared (via `Arc`) between the
/// two sides of a producer/consumer pair.
pub struct MessageExchange {
    name: String,
    state: Mutex<ExchangeState>,
}

impl MessageExchange {
    pub fn new(name: impl Into<String>) -> Self {
        MessageExchange {
            name: name.into(),
            state: Mutex::new(ExchangeState {
                pending_sends: VecDeque::new(),
                pending_receives: VecDeque::new(),
            }),
        }
    }

    /// Copies bytes from `send` into `recv`. `local_is_send` says which side
    /// is the operation the *caller* just handed in on this thread — that
    /// side gets the fast `notify_direct` path, the other side (posted
    /// earlier, possibly by another thread, so its controller may belong to
    /// a different owner thread) must go through the cross-thread-safe
    /// `notify`.
    fn pair(send: &SendOperation, recv: &ReceiveOperation, local_is_send: bool) {
        let data = send.unsent_bytes();
        let copied = recv.fill_from(&data);
        send.add_sent_bytes(copied);
        if local_is_send {
            recv.notifier().notify(&recv.base());
            send.notifier().notify_direct(&send.base());
        } else {
            send.notifier().notify(&send.base());
            recv.notifier().notify_direct(&recv.base());
        }
    }
}

impl CommunicationObject for MessageExchange {
    fn send_async(&self, ctl: &Controller, op: &SendOperation) {
        op.set_controller(ctl.clone());
        let mut state = self.state.lock().unwrap();
        if let Some(recv) = state.pending_receives.pop_front() {
            drop(state);
            Self::pair(op, &recv, true);
        } else {
            state.pending_sends.push_back(op.clone());
        }
    }

    fn receive_async(&self, ctl: &Controller, op: &ReceiveOperation) {
        op.set_controller(ctl.clone());
        let mut state = self.state.lock().unwrap();
        if let Some(send) = state.pending_sends.pop_front() {
            drop(state);
            Self::pair(&send, op, false);
        } else {
            state.pending_receives.push_back(op.clone());
        }
    }

    fn cancel(&self, ctl: &Controller, op: &Operation) {
        let mut state = self.state.lock().unwrap();
        let id = op.identity();
        state.pending_sends.retain(|o| o.identity() != id);
        state.pending_receives.retain(|o| o.identity() != id);
        drop(state);
        ctl.revert_post(op);
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn receive_posted_first_is_satisfied_by_a_later_send() {
        let exchange = MessageExchange::new("test-exchange");
        let ctl_a = Controller::new().unwrap();
        let ctl_b = Controller::new().unwrap();

        let recv_op = ReceiveOperation::new(3);
        exchange.receive_async(&ctl_b, &recv_op);

        let send_op = SendOperation::new(vec![0x41, 0x42, 0x43]);
        assert!(exchange.send(&ctl_a, &send_op, Some(Duration::from_secs(1))));

        assert!(ctl_b.wait_for(&recv_op.base(), Some(Duration::from_secs(1))));
        assert_eq!(recv_op.into_data(), vec![0x41, 0x42, 0x43]);
    }

    #[test]
    fn fifo_ordering_is_preserved_per_side() {
        let exchange = Arc::new(MessageExchange::new("fifo-exchange"));
        let ctl = Controller::new().unwrap();

        let send_a = SendOperation::new(vec![1]);
        let send_b = SendOperation::new(vec![2]);
        exchange.send_async(&ctl, &send_a);
        exchange.send_async(&ctl, &send_b);

        let recv_1 = ReceiveOperation::new(1);
        let recv_2 = ReceiveOperation::new(1);
        assert!(exchange.receive(&ctl, &recv_1, Some(Duration::from_secs(1))));
        assert!(exchange.receive(&ctl, &recv_2, Some(Duration::from_secs(1))));

        assert_eq!(recv_1.into_data(), vec![1]);
        assert_eq!(recv_2.into_data(), vec![2]);
    }

    #[test]
    fn cancel_removes_a_pending_receive() {
        let exchange = MessageExchange::new("cancel-exchange");
        let ctl = Controller::new().unwrap();
        let recv_op = ReceiveOperation::new(3);
        exchange.receive_async(&ctl, &recv_op);
        exchange.cancel(&ctl, &recv_op.base());

        let send_op = SendOperation::new(vec![1, 2, 3]);
        exchange.send_async(&ctl, &send_op);
        // The cancelled receive must not have been paired with this send.
        assert_eq!(send_op.bytes_sent(), 0);
    }
}

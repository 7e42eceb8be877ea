//! Property: for any interleaving of N sends and N receives on one
//! `MessageExchange`, each send pairs with exactly one receive, bytes are
//! delivered verbatim, and FIFO order is preserved per side.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aio_core::comm::CommunicationObject;
use aio_core::controller::Controller;
use aio_core::message_exchange::MessageExchange;
use aio_core::operation::{ReceiveOperation, SendOperation};
use rand::Rng;

#[test]
fn sends_and_receives_pair_fifo_per_side_under_random_interleaving() {
    let exchange = Arc::new(MessageExchange::new("rendezvous-test"));
    const N: usize = 64;

    let sender_exchange = exchange.clone();
    let sender = thread::spawn(move || {
        let ctl = Controller::new().unwrap();
        let mut rng = rand::rng();
        for i in 0..N {
            if rng.random_bool(0.3) {
                thread::sleep(Duration::from_micros(rng.random_range(0..500)));
            }
            let op = SendOperation::new(vec![i as u8; 4]);
            assert!(sender_exchange.send(&ctl, &op, Some(Duration::from_secs(5))));
        }
    });

    let receiver_exchange = exchange.clone();
    let receiver = thread::spawn(move || {
        let ctl = Controller::new().unwrap();
        let mut rng = rand::rng();
        let mut received = Vec::with_capacity(N);
        for _ in 0..N {
            if rng.random_bool(0.3) {
                thread::sleep(Duration::from_micros(rng.random_range(0..500)));
            }
            let op = ReceiveOperation::new(4);
            assert!(receiver_exchange.receive(&ctl, &op, Some(Duration::from_secs(5))));
            received.push(op.into_data());
        }
        received
    });

    sender.join().unwrap();
    let received = receiver.join().unwrap();

    for (i, bytes) in received.into_iter().enumerate() {
        assert_eq!(bytes, vec![i as u8; 4], "pair {i} out of FIFO order or corrupted");
    }
}

//! Completion delivery indirection.

use crate::operation::Operation;

/// Delivers an operation's completion to its controller.
///
/// `notify` may be called from any thread; it must end up calling
/// [`crate::controller::Controller::post`] (or an equivalent thread-safe
/// path) on the operation's controller. `notify_direct` is only ever called
/// from the controller's owner thread — by a caller that has just
/// discovered the completion synchronously (e.g. a rendezvous that found a
/// peer already waiting) — and may use a faster, unlocked path.
pub trait Notifier: Send + Sync {
    fn notify(&self, op: &Operation);
    fn notify_direct(&self, op: &Operation);
}

/// The notifier every [`Operation`] starts with: routes both entry points
/// to the operation's own controller.
#[derive(Debug, Default)]
pub struct DefaultNotifier;

impl Notifier for DefaultNotifier {
    fn notify(&self, op: &Operation) {
        if let Some(ctl) = op.controller() {
            ctl.post(op);
        } else {
            log::warn!("notify() on an operation with no controller set");
        }
    }

    fn notify_direct(&self, op: &Operation) {
        if let Some(ctl) = op.controller() {
            ctl.post_direct(op);
        } else {
            log::warn!("notify_direct() on an operation with no controller set");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use std::time::Duration;

    #[test]
    fn default_notifier_posts_to_controller() {
        let ctl = Controller::new().unwrap();
        let op = Operation::new();
        op.set_controller(ctl.clone());
        DefaultNotifier.notify(&op);
        let completed = ctl.wait(Some(Duration::from_millis(100)));
        assert_eq!(completed, Some(op));
    }
}

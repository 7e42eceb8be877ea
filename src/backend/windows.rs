//! `WaitForMultipleObjects`-based backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::os::windows::io::RawHandle;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Threading::{
    CreateEventW, ResetEvent, SetEvent, WaitForMultipleObjects, INFINITE,
};

use super::{Backend, Direction, RawTarget, ReadinessHandler};
use crate::operation::SubscriptionId;

struct Subscriber {
    id: SubscriptionId,
    handle: HANDLE,
    direction: Direction,
    handler: Arc<dyn ReadinessHandler>,
    cancelled: AtomicBool,
}

// SAFETY: HANDLE is an opaque kernel handle; Windows guarantees
// cross-thread use of distinct handles to the same object is safe.
unsafe impl Send for Subscriber {}
unsafe impl Sync for Subscriber {}

pub(crate) struct WindowsBackend {
    mode: Mutex<super::Mode>,
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    wake_event: HANDLE,
}

unsafe impl Send for WindowsBackend {}
unsafe impl Sync for WindowsBackend {}

impl WindowsBackend {
    pub(crate) fn new() -> std::io::Result<Self> {
        let wake_event = unsafe { CreateEventW(std::ptr::null(), 0, 0, std::ptr::null()) };
        if wake_event == 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(WindowsBackend {
            mode: Mutex::new(super::Mode::NotWaiting),
            subscribers: Mutex::new(Vec::new()),
            wake_event,
        })
    }
}

impl Drop for WindowsBackend {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.wake_event);
        }
    }
}

impl Backend for WindowsBackend {
    fn prepare(&self) {
        let has_subscribers = !self.subscribers.lock().unwrap().is_empty();
        *self.mode.lock().unwrap() = if has_subscribers {
            super::Mode::WaitingForDescriptor
        } else {
            super::Mode::WaitingForSemaphore
        };
    }

    fn finish(&self) {
        *self.mode.lock().unwrap() = super::Mode::NotWaiting;
    }

    fn wake(&self) {
        let mode = *self.mode.lock().unwrap();
        if mode != super::Mode::NotWaiting {
            unsafe {
                SetEvent(self.wake_event);
            }
        }
    }

    fn wait(&self, timeout: Option<Duration>) {
        let millis = match timeout {
            None => INFINITE,
            Some(d) => d.as_millis().min(u32::MAX as u128 - 1) as u32,
        };

        // The snapshot carries each subscriber's own `Arc`, not just its
        // handle, so `index` below always names the exact subscription
        // `WaitForMultipleObjects` was given — even if another thread adds
        // or removes subscriptions while this call blocks, which would
        // otherwise desync a re-locked, freshly-enumerated subscriber list
        // from the handle order the OS call actually waited on.
        let snapshot: Vec<Arc<Subscriber>> = {
            let subs = self.subscribers.lock().unwrap();
            subs.iter()
                .filter(|s| !s.cancelled.load(Ordering::Acquire))
                .cloned()
                .collect()
        };

        let mut handles = Vec::with_capacity(snapshot.len() + 1);
        handles.push(self.wake_event);
        handles.extend(snapshot.iter().map(|s| s.handle));

        let result = unsafe {
            WaitForMultipleObjects(handles.len() as u32, handles.as_ptr(), 0, millis)
        };

        if result == WAIT_TIMEOUT {
            return;
        }
        let index = (result.wrapping_sub(WAIT_OBJECT_0)) as usize;
        if index == 0 {
            unsafe {
                ResetEvent(self.wake_event);
            }
            return;
        }

        // `index - 1` names the handle that fired within `snapshot`; a
        // conservative implementation also re-checks every other subscriber
        // since `WaitForMultipleObjects` only reports one signalled object
        // per call and auto-reset events could otherwise starve siblings.
        let mut done_ids = Vec::new();
        for (i, sub) in snapshot.iter().enumerate() {
            if sub.cancelled.load(Ordering::Acquire) {
                continue;
            }
            if i + 1 != index {
                continue;
            }
            let done = match sub.direction {
                Direction::Read => sub.handler.handle_read_ready(),
                Direction::Write => sub.handler.handle_write_ready(),
            };
            if done {
                done_ids.push(sub.id);
            }
        }
        if !done_ids.is_empty() {
            let mut subs = self.subscribers.lock().unwrap();
            subs.retain(|s| !done_ids.contains(&s.id));
        }
        self.sweep_cancelled();
    }

    fn add_subscriber(
        &self,
        raw: RawTarget,
        direction: Direction,
        handler: Arc<dyn ReadinessHandler>,
    ) -> SubscriptionId {
        let RawTarget::Handle(handle) = raw;
        let id = SubscriptionId::next();
        self.subscribers.lock().unwrap().push(Arc::new(Subscriber {
            id,
            handle: handle as HANDLE,
            direction,
            handler,
            cancelled: AtomicBool::new(false),
        }));
        id
    }

    fn remove_subscriber(&self, id: SubscriptionId) {
        let subs = self.subscribers.lock().unwrap();
        if let Some(s) = subs.iter().find(|s| s.id == id) {
            s.cancelled.store(true, Ordering::Release);
        }
        drop(subs);
        self.sweep_cancelled();
    }
}

impl WindowsBackend {
    fn sweep_cancelled(&self) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|s| !s.cancelled.load(Ordering::Acquire));
    }
}

#[allow(dead_code)]
type _RawHandleAlias = RawHandle;

//! Delay capability
//!
//! Reveal pacing and retry backoff both wait through a `Sleeper`, so the
//! same code runs on tokio, in the browser, or under a test clock.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

/// Something that can wait
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Tokio timer (native)
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[cfg(not(target_arch = "wasm32"))]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// `setTimeout` wrapped in a promise (browser)
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSleeper;

#[cfg(target_arch = "wasm32")]
impl Sleeper for BrowserSleeper {
    async fn sleep(&self, duration: Duration) {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window()
                .map(|w| w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms))
                .is_some_and(|r| r.is_ok());
            if !scheduled {
                // No window (worker or test harness): don't hang
                let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
            }
        });
        let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
    }
}

/// Completes every delay immediately, keeping a record of what was asked
#[derive(Debug, Clone, Default)]
pub struct InstantSleeper {
    requested: Rc<RefCell<Vec<Duration>>>,
}

impl InstantSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.borrow().clone()
    }

    /// Sum of all requested delays
    pub fn total(&self) -> Duration {
        self.requested.borrow().iter().sum()
    }
}

impl Sleeper for InstantSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        self.requested.borrow_mut().push(duration);
        std::future::ready(())
    }
}

/// Test clock: each sleep stays pending until the test fires it
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct ManualClock {
    inner: Rc<RefCell<ManualInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct ManualInner {
    pending: std::collections::VecDeque<futures::channel::oneshot::Sender<()>>,
    requested: Vec<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn requested(&self) -> Vec<Duration> {
        self.inner.borrow().requested.clone()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Wake the oldest pending sleep. False if nothing was waiting.
    pub fn fire_next(&self) -> bool {
        let sender = self.inner.borrow_mut().pending.pop_front();
        match sender {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
impl Sleeper for ManualClock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        let (tx, rx) = futures::channel::oneshot::channel();
        {
            let mut inner = self.inner.borrow_mut();
            inner.requested.push(duration);
            inner.pending.push_back(tx);
        }
        async move {
            let _ = rx.await;
        }
    }
}

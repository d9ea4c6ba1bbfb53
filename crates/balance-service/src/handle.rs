//! Subscription handles
//!
//! Every adapter returns a `SubscriptionHandle`. Handles nest: the session handle
//! owns one handle per chain, which owns one per sub-adapter, which owns the
//! spawned tasks. Cancelling a handle cancels everything below it exactly once.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

/// Shared cancellation flag checked before every emission
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag; returns `true` if it was already set
    fn set(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }
}

type CancelFn = Box<dyn FnOnce() -> Result<(), String> + Send>;

enum Child {
    Task(JoinHandle<()>),
    Handle(SubscriptionHandle),
    Callback(CancelFn),
}

struct HandleInner {
    label: String,
    flag: CancelFlag,
    children: Mutex<Vec<Child>>,
}

/// Cancellation capability for a running subscription
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("label", &self.inner.label)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl SubscriptionHandle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                label: label.into(),
                flag: CancelFlag::new(),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Flag that flips when this handle is cancelled
    pub fn flag(&self) -> CancelFlag {
        self.inner.flag.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.is_cancelled()
    }

    /// Own a spawned task; aborted on cancel
    pub fn add_task(&self, task: JoinHandle<()>) {
        self.push(Child::Task(task));
    }

    /// Own a child handle; cancelled together with this one
    pub fn attach(&self, child: SubscriptionHandle) {
        self.push(Child::Handle(child));
    }

    /// Run `f` on cancel. Errors are logged, never propagated.
    pub fn on_cancel(&self, f: impl FnOnce() -> Result<(), String> + Send + 'static) {
        self.push(Child::Callback(Box::new(f)));
    }

    fn push(&self, child: Child) {
        {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            // Checked under the lock so a concurrent cancel cannot miss the child
            if !self.inner.flag.is_cancelled() {
                children.push(child);
                return;
            }
        }
        cancel_child(&self.inner.label, child);
    }

    /// Cancel this handle and everything it owns.
    ///
    /// Idempotent. Individual child failures are logged and do not stop the
    /// remaining children from being cancelled.
    pub fn cancel(&self) {
        let children = {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if self.inner.flag.set() {
                return;
            }
            std::mem::take(&mut *children)
        };

        tracing::debug!(
            label = %self.inner.label,
            children = children.len(),
            "Cancelling subscription"
        );

        for child in children {
            cancel_child(&self.inner.label, child);
        }
    }
}

fn cancel_child(label: &str, child: Child) {
    match child {
        Child::Task(task) => task.abort(),
        Child::Handle(handle) => handle.cancel(),
        Child::Callback(f) => match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(label = %label, "Unsubscribe failed: {}", e);
            }
            Err(_) => {
                tracing::warn!(label = %label, "Unsubscribe panicked");
            }
        },
    }
}

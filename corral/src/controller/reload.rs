use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

/// What became of one reload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Data was applied to the view.
    Applied,
    /// The fetch failed and the error was applied to the view.
    Failed,
    /// A newer request superseded this one; its result was dropped.
    Discarded,
    /// The action did not change the query; nothing was requested.
    Unchanged,
    /// The controller went away before the result arrived.
    Aborted,
}

/// Completion of a controller action.
///
/// Awaiting it is optional: the view is updated whether or not anybody
/// polls it, and dropping it does not cancel the load.
#[derive(Debug)]
#[must_use = "await the reload to observe its outcome, or drop it explicitly"]
pub struct Reload {
    inner: ReloadInner,
}

#[derive(Debug)]
enum ReloadInner {
    Ready(Option<LoadOutcome>),
    Pending(JoinHandle<LoadOutcome>),
}

impl Reload {
    pub(crate) fn ready(outcome: LoadOutcome) -> Self {
        Self {
            inner: ReloadInner::Ready(Some(outcome)),
        }
    }

    pub(crate) fn unchanged() -> Self {
        Self::ready(LoadOutcome::Unchanged)
    }

    pub(crate) fn pending(handle: JoinHandle<LoadOutcome>) -> Self {
        Self {
            inner: ReloadInner::Pending(handle),
        }
    }

    /// Whether the outcome is already known.
    pub fn is_ready(&self) -> bool {
        match &self.inner {
            ReloadInner::Ready(_) => true,
            ReloadInner::Pending(handle) => handle.is_finished(),
        }
    }
}

impl Future for Reload {
    type Output = LoadOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            ReloadInner::Ready(outcome) => Poll::Ready(outcome.take().unwrap_or(LoadOutcome::Unchanged)),
            ReloadInner::Pending(handle) => Pin::new(handle)
                .poll(cx)
                .map(|joined| joined.unwrap_or(LoadOutcome::Aborted)),
        }
    }
}

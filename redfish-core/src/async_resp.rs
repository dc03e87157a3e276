//! The reference-counted response owner: `AsyncResp` (C4).
//!
//! `async_resp.hpp` in the original source collapses to one line —
//! `using AsyncResp = crow::Response` — because in C++ the response's
//! `shared_ptr` refcount and its destructor do all the work. Rust has no
//! destructor-triggers-async-code primitive, so this module rebuilds that
//! behavior explicitly: `AsyncResp` wraps an `Arc<Shared>`, and its `Drop`
//! impl notices when it was the last clone and spawns the completion chain.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex as AsyncMutex};

use crate::request::Request;
use crate::response::{CompletionLayer, NoopCompletion, ResponseState};

struct Shared {
    state: AsyncMutex<ResponseState>,
    completion: std::sync::Mutex<Option<Box<dyn CompletionLayer>>>,
    request: Request,
    result_tx: std::sync::Mutex<Option<oneshot::Sender<ResponseState>>>,
    completed: AtomicBool,
    /// Live `AsyncResp` count, maintained independently of `Arc::strong_count`.
    /// `Clone`/`Drop` use `fetch_add`/`fetch_sub` directly, so exactly one
    /// `drop` ever observes the transition to zero — `Arc::strong_count`
    /// can't be used for this because the compiler-generated field-drop
    /// glue that actually decrements it runs *after* `Drop::drop`'s body,
    /// so two concurrent drops of the last two clones can both read a
    /// stale count of 2 and both skip spawning the completion task.
    live: AtomicUsize,
}

/// A cloneable handle to one request's in-progress [`ResponseState`].
///
/// Every clone increments `Shared::live`; every drop decrements it. The
/// drop whose `fetch_sub` observes the previous value was `1` is the last
/// live handle: it takes the installed completion stack and runs it on a
/// spawned task, then resolves the `oneshot::Receiver` the dispatcher is
/// awaiting.
pub struct AsyncResp {
    shared: Arc<Shared>,
}

impl AsyncResp {
    /// Create a fresh `AsyncResp` for `request`, returning it alongside the
    /// receiver that resolves to the finished [`ResponseState`] once every
    /// clone has dropped and the completion stack has run.
    pub fn new(request: Request) -> (AsyncResp, oneshot::Receiver<ResponseState>) {
        let (tx, rx) = oneshot::channel();
        let shared = Arc::new(Shared {
            state: AsyncMutex::new(ResponseState::new()),
            completion: std::sync::Mutex::new(Some(Box::new(NoopCompletion))),
            request,
            result_tx: std::sync::Mutex::new(Some(tx)),
            completed: AtomicBool::new(false),
            live: AtomicUsize::new(1),
        });
        (AsyncResp { shared }, rx)
    }

    pub fn request(&self) -> &Request {
        &self.shared.request
    }

    pub async fn with_state<R>(&self, f: impl FnOnce(&mut ResponseState) -> R) -> R {
        let mut state = self.shared.state.lock().await;
        f(&mut state)
    }

    /// Install `layer`, wiring it to delegate to whatever completion layer
    /// was previously installed. Mirrors
    /// `Response::setCompleteRequestHandler(new)` returning the old handler.
    pub fn push_completion(&self, make_layer: impl FnOnce(Box<dyn CompletionLayer>) -> Box<dyn CompletionLayer>) {
        let mut completion = self.shared.completion.lock().unwrap();
        let previous = completion.take().unwrap_or_else(|| Box::new(NoopCompletion));
        *completion = Some(make_layer(previous));
    }

    pub fn outstanding_refs(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }
}

impl Clone for AsyncResp {
    fn clone(&self) -> Self {
        self.shared.live.fetch_add(1, Ordering::AcqRel);
        AsyncResp {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for AsyncResp {
    fn drop(&mut self) {
        // `fetch_sub` is the single atomic decrement-and-observe: exactly
        // one concurrent drop can see the previous value as `1`, so exactly
        // one drop spawns the completion task no matter how many clones
        // release on different tasks/threads at once.
        if self.shared.live.fetch_sub(1, Ordering::AcqRel) == 1 {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                if shared.completed.swap(true, Ordering::SeqCst) {
                    return;
                }
                let layer = shared
                    .completion
                    .lock()
                    .unwrap()
                    .take()
                    .unwrap_or_else(|| Box::new(NoopCompletion));
                let mut state = shared.state.lock().await;
                layer.run(&mut state, &shared.request).await;
                let final_state = state.clone();
                drop(state);
                if let Some(tx) = shared.result_tx.lock().unwrap().take() {
                    let _ = tx.send(final_state);
                }
            });
        }
    }
}

mod key_lock;
mod retry;

pub use key_lock::{KeyGuard, KeyedLocks};
pub use retry::{with_backoff, RetryPolicy};

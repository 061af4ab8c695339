//! A deferred value that deliberately breaks one rule of conventional
//! promises: a listener attached after the value has settled is invoked
//! synchronously, immediately, on the caller's stack, never deferred to a
//! later tick. Chaining (`then`/`catch`), thenable interop and the `all`/
//! `race` combinators are all built on that shortcut.
//!
//! Everything is single-threaded and synchronous. The only way a promise
//! settles "later" is that a caller holds on to its [`Producer`] (see
//! [`Promise::deferred`]) and settles it from a timer or event of its own.
//!
//! ```
//! use shortcut_promise::{handler, Eventual, Promise};
//!
//! let chained = Promise::<i32, String>::resolved(123)
//!     .then(handler(|value| Ok(Eventual::Value(value + 1))), None);
//!
//! // The callback already ran, on this stack.
//! assert_eq!(chained.try_value(), Ok(124));
//! ```

mod combinators;
mod consumer;
mod listener;
mod promise;
mod thenable;

pub use consumer::Consumer;
pub use listener::{handler, Callback};
pub use promise::{Producer, Promise};
pub use thenable::{Eventual, Thenable};

use thiserror::Error;

/// Why a settled-value accessor could not answer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("promise is still pending")]
    Pending,
    #[error("promise was rejected")]
    Rejected,
    #[error("promise was resolved")]
    Resolved,
}

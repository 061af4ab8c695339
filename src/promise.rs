use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::StateError;

/// A single deferred value. Cloning the handle shares the same settlement
/// state; the state itself transitions exactly once, from pending to either
/// resolved or rejected, and every later transition attempt is a no-op.
///
/// Unlike a conventional promise, a listener attached after settlement runs
/// synchronously inside the registering call, on the caller's stack.
///
/// # Examples
///
/// ```
/// use shortcut_promise::Promise;
///
/// let promise = Promise::<i32, String>::new(|producer| {
///     producer.resolve(7);
///     Ok(())
/// });
/// assert_eq!(promise.try_value(), Ok(7));
/// ```
pub struct Promise<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

/// The resolve/reject half of a promise. Handed to the resolver closure and
/// returned by [`Promise::deferred`]. May be cloned and settled from anywhere
/// later; only the first settlement counts.
pub struct Producer<T, E> {
    promise: Promise<T, E>,
}

enum State<T, E> {
    Initial,
    Resolved(T),
    Rejected(E),
}

struct Inner<T, E> {
    state: State<T, E>,
    resolved_listeners: Vec<Box<dyn FnOnce(T)>>,
    rejected_listeners: Vec<Box<dyn FnOnce(E)>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> Clone for Producer<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E> Promise<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, State::Initial)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.borrow().state, State::Resolved(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.borrow().state, State::Rejected(_))
    }

    pub(crate) fn pending() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Initial,
                resolved_listeners: Vec::new(),
                rejected_listeners: Vec::new(),
            })),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Constructs a promise and invokes `resolver` synchronously with its
    /// [`Producer`]. A resolver that returns `Err` rejects the promise with
    /// that reason, unless it already settled the promise itself.
    pub fn new<F>(resolver: F) -> Self
    where
        F: FnOnce(Producer<T, E>) -> Result<(), E>,
    {
        let promise = Self::pending();
        let producer = Producer {
            promise: promise.clone(),
        };
        if let Err(reason) = resolver(producer) {
            promise.settle_reject(reason);
        }
        promise
    }

    /// Creates a pending promise together with its producer, for callers that
    /// settle later, e.g. from a timer they own.
    ///
    /// # Examples
    ///
    /// ```
    /// use shortcut_promise::Promise;
    ///
    /// let (promise, producer) = Promise::<&str, ()>::deferred();
    /// assert!(promise.is_pending());
    /// producer.resolve("done");
    /// assert_eq!(promise.try_value(), Ok("done"));
    /// ```
    pub fn deferred() -> (Self, Producer<T, E>) {
        let promise = Self::pending();
        let producer = Producer {
            promise: promise.clone(),
        };
        (promise, producer)
    }

    /// An already-resolved promise. Note that `value` is stored verbatim even
    /// when it is itself a promise; settlement at this layer never adopts an
    /// inner promise's state.
    pub fn resolved(value: T) -> Self {
        Self::new(|producer| {
            producer.resolve(value);
            Ok(())
        })
    }

    /// An already-rejected promise.
    pub fn rejected(reason: E) -> Self {
        Self::new(|producer| {
            producer.reject(reason);
            Ok(())
        })
    }

    /// The resolved value, or a [`StateError`] naming the state that got in
    /// the way.
    pub fn try_value(&self) -> Result<T, StateError> {
        match &self.inner.borrow().state {
            State::Initial => Err(StateError::Pending),
            State::Resolved(value) => Ok(value.clone()),
            State::Rejected(_) => Err(StateError::Rejected),
        }
    }

    /// The rejection reason, or a [`StateError`].
    pub fn try_reason(&self) -> Result<E, StateError> {
        match &self.inner.borrow().state {
            State::Initial => Err(StateError::Pending),
            State::Resolved(_) => Err(StateError::Resolved),
            State::Rejected(reason) => Ok(reason.clone()),
        }
    }

    pub(crate) fn settled_result(&self) -> Option<Result<T, E>> {
        match &self.inner.borrow().state {
            State::Initial => None,
            State::Resolved(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    pub(crate) fn settle_resolve(&self, value: T) {
        let (listeners, discarded) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, State::Initial) {
                return;
            }
            inner.state = State::Resolved(value.clone());
            (
                std::mem::take(&mut inner.resolved_listeners),
                // The rejected side can never fire now; its continuations
                // stay pending forever.
                std::mem::take(&mut inner.rejected_listeners),
            )
        };
        drop(discarded);
        for listener in listeners {
            listener(value.clone());
        }
    }

    pub(crate) fn settle_reject(&self, reason: E) {
        let (listeners, discarded) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, State::Initial) {
                return;
            }
            inner.state = State::Rejected(reason.clone());
            (
                std::mem::take(&mut inner.rejected_listeners),
                std::mem::take(&mut inner.resolved_listeners),
            )
        };
        drop(discarded);
        for listener in listeners {
            listener(reason.clone());
        }
    }

    // The raw listener primitive: no continuation promise, just a thunk that
    // fires once with a clone of the settled value. Registration against an
    // already-resolved promise dispatches before returning.
    pub(crate) fn add_resolved_raw(&self, listener: Box<dyn FnOnce(T)>) {
        let fire = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &inner.state {
                State::Initial => {
                    inner.resolved_listeners.push(listener);
                    return;
                }
                State::Resolved(value) => Some(value.clone()),
                State::Rejected(_) => None,
            }
        };
        if let Some(value) = fire {
            listener(value);
        }
    }

    pub(crate) fn add_rejected_raw(&self, listener: Box<dyn FnOnce(E)>) {
        let fire = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &inner.state {
                State::Initial => {
                    inner.rejected_listeners.push(listener);
                    return;
                }
                State::Rejected(reason) => Some(reason.clone()),
                State::Resolved(_) => None,
            }
        };
        if let Some(reason) = fire {
            listener(reason);
        }
    }

    pub(crate) fn watch(
        &self,
        on_resolved: Box<dyn FnOnce(T)>,
        on_rejected: Box<dyn FnOnce(E)>,
    ) {
        self.add_resolved_raw(on_resolved);
        self.add_rejected_raw(on_rejected);
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Producer<T, E> {
    /// Settles the promise with `value`. A no-op once the promise has settled
    /// either way. Every resolved listener registered so far is notified
    /// synchronously, in registration order, before this call returns.
    pub fn resolve(&self, value: T) {
        self.promise.settle_resolve(value);
    }

    /// Settles the promise with `reason`; the rejected counterpart of
    /// [`Producer::resolve`].
    pub fn reject(&self, reason: E) {
        self.promise.settle_reject(reason);
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.inner.borrow().state {
            State::Initial => "pending",
            State::Resolved(_) => "resolved",
            State::Rejected(_) => "rejected",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T, E> fmt::Debug for Producer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("promise", &self.promise)
            .finish()
    }
}

use crate::promise::Promise;
use crate::thenable::Eventual;

/// A registered callback. It receives the settled value (or reason) and
/// produces the input for its continuation promise: a plain value, a
/// promise-like value to adopt, or an `Err` reason (the crate's rendering of
/// a callback that throws).
pub type Callback<A, T, E> = Box<dyn FnOnce(A) -> Result<Eventual<T, E>, E>>;

/// Wraps a closure into the `Option<Callback>` shape `then`/`catch` take.
pub fn handler<A, T, E, F>(f: F) -> Option<Callback<A, T, E>>
where
    F: FnOnce(A) -> Result<Eventual<T, E>, E> + 'static,
{
    Some(Box::new(f))
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Registers up to two listeners, one per outcome, each with its own
    /// continuation promise.
    ///
    /// The returned promise is: an already-resolved `U::default()` when
    /// neither callback is supplied; the single listener's continuation when
    /// exactly one is; the race of both continuations when both are. Only one
    /// of the two listeners ever fires for a given settlement, so the race
    /// adopts the triggered continuation and the other stays pending forever.
    ///
    /// If this promise has already settled, the matching listener runs
    /// synchronously before `then` returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use shortcut_promise::{handler, Eventual, Promise};
    ///
    /// let doubled = Promise::<i32, String>::resolved(21)
    ///     .then(handler(|value| Ok(Eventual::Value(value * 2))), None);
    /// assert_eq!(doubled.try_value(), Ok(42));
    /// ```
    pub fn then<U: Clone + Default + 'static>(
        &self,
        on_fulfilled: Option<Callback<T, U, E>>,
        on_rejected: Option<Callback<E, U, E>>,
    ) -> Promise<U, E> {
        let resolved = self.add_resolved_listener(on_fulfilled);
        let rejected = self.add_rejected_listener(on_rejected);
        match (resolved, rejected) {
            (None, None) => Promise::resolved(U::default()),
            (Some(continuation), None) | (None, Some(continuation)) => continuation,
            (Some(a), Some(b)) => Promise::race([Eventual::Promise(a), Eventual::Promise(b)]),
        }
    }

    /// Registers a rejected listener only.
    pub fn catch<U: Clone + Default + 'static>(
        &self,
        on_rejected: Option<Callback<E, U, E>>,
    ) -> Promise<U, E> {
        match self.add_rejected_listener(on_rejected) {
            Some(continuation) => continuation,
            None => Promise::resolved(U::default()),
        }
    }

    /// Creates a listener for the resolved outcome and returns its
    /// continuation promise, or `None` when no callback was supplied. Against
    /// an already-resolved promise the listener is notified immediately,
    /// before this returns.
    pub(crate) fn add_resolved_listener<U: Clone + 'static>(
        &self,
        callback: Option<Callback<T, U, E>>,
    ) -> Option<Promise<U, E>> {
        let callback = callback?;
        let continuation = Promise::pending();
        let target = continuation.clone();
        self.add_resolved_raw(Box::new(move |value| notify(callback, &target, value)));
        Some(continuation)
    }

    pub(crate) fn add_rejected_listener<U: Clone + 'static>(
        &self,
        callback: Option<Callback<E, U, E>>,
    ) -> Option<Promise<U, E>> {
        let callback = callback?;
        let continuation = Promise::pending();
        let target = continuation.clone();
        self.add_rejected_raw(Box::new(move |reason| notify(callback, &target, reason)));
        Some(continuation)
    }
}

/// Runs one listener's callback against the settled value and routes the
/// result into the listener's continuation: a plain value resolves it, a
/// promise-like result is adopted, an `Err` rejects it.
fn notify<A, T, E>(callback: Callback<A, T, E>, continuation: &Promise<T, E>, value: A)
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    match callback(value) {
        Ok(eventual) => eventual.settle_into(continuation),
        Err(reason) => continuation.settle_reject(reason),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::handler;
    use crate::promise::Promise;
    use crate::thenable::{Eventual, Thenable};

    #[test]
    fn then_on_settled_promise_runs_synchronously() {
        let got = Rc::new(Cell::new(0));
        let seen = got.clone();
        Promise::<i32, i32>::resolved(123).then::<i32>(
            handler(move |value| {
                assert_eq!(123, value);
                seen.set(seen.get() + 1);
                Ok(Eventual::Value(value))
            }),
            None,
        );
        assert_eq!(1, got.get());
    }

    #[test]
    fn then_before_settlement_fires_at_transition() {
        let (promise, producer) = Promise::<i32, i32>::deferred();
        let got = Rc::new(Cell::new(0));
        let seen = got.clone();
        promise.then::<i32>(
            handler(move |value| {
                seen.set(value);
                Ok(Eventual::Value(value))
            }),
            None,
        );
        assert_eq!(0, got.get());
        producer.resolve(55);
        assert_eq!(55, got.get());
    }

    #[test]
    fn callback_error_rejects_the_continuation() {
        let continuation = Promise::<i32, i32>::resolved(1)
            .then::<i32>(handler(|_| Err(77)), None);
        assert_eq!(continuation.try_reason(), Ok(77));
    }

    #[test]
    fn callback_promise_result_is_adopted() {
        let (inner, producer) = Promise::<i32, i32>::deferred();
        let continuation = Promise::<i32, i32>::resolved(1)
            .then::<i32>(handler(move |_| Ok(Eventual::Promise(inner))), None);
        assert!(continuation.is_pending());
        producer.resolve(5);
        assert_eq!(continuation.try_value(), Ok(5));
    }

    #[test]
    fn adopted_promise_rejection_rejects_the_continuation() {
        let inner = Promise::<i32, i32>::rejected(3);
        let continuation = Promise::<i32, i32>::resolved(1)
            .then::<i32>(handler(move |_| Ok(Eventual::Promise(inner))), None);
        assert_eq!(continuation.try_reason(), Ok(3));
    }

    struct Eager(i32);

    impl Thenable<i32, i32> for Eager {
        fn then(self: Box<Self>, resolve: Box<dyn FnOnce(i32)>, _reject: Box<dyn FnOnce(i32)>) {
            resolve(self.0);
        }
    }

    type Thunks = Rc<RefCell<Option<(Box<dyn FnOnce(i32)>, Box<dyn FnOnce(i32)>)>>>;

    struct Lazy(Thunks);

    impl Thenable<i32, i32> for Lazy {
        fn then(self: Box<Self>, resolve: Box<dyn FnOnce(i32)>, reject: Box<dyn FnOnce(i32)>) {
            *self.0.borrow_mut() = Some((resolve, reject));
        }
    }

    #[test]
    fn foreign_thenable_settling_during_then_is_adopted() {
        let continuation = Promise::<i32, i32>::resolved(1)
            .then::<i32>(handler(|_| Ok(Eventual::Thenable(Box::new(Eager(5))))), None);
        assert_eq!(continuation.try_value(), Ok(5));
    }

    #[test]
    fn foreign_thenable_settling_later_is_adopted() {
        let thunks: Thunks = Rc::new(RefCell::new(None));
        let parked = thunks.clone();
        let continuation = Promise::<i32, i32>::resolved(1).then::<i32>(
            handler(move |_| Ok(Eventual::Thenable(Box::new(Lazy(parked))))),
            None,
        );
        assert!(continuation.is_pending());

        let (resolve, _reject) = thunks.borrow_mut().take().unwrap();
        resolve(9);
        assert_eq!(continuation.try_value(), Ok(9));
    }

    #[test]
    fn then_with_no_callbacks_resolves_with_default() {
        let done = Promise::<i32, i32>::rejected(1).then::<i32>(None, None);
        assert_eq!(done.try_value(), Ok(0));
    }

    #[test]
    fn untriggered_continuation_stays_pending() {
        let continuation = Promise::<i32, i32>::resolved(1)
            .then::<i32>(None, handler(|reason| Ok(Eventual::Value(reason))));
        assert!(continuation.is_pending());
    }

    #[test]
    fn catch_returns_the_rejected_continuation() {
        let recovered = Promise::<i32, i32>::rejected(4)
            .catch::<i32>(handler(|reason| Ok(Eventual::Value(reason + 1))));
        assert_eq!(recovered.try_value(), Ok(5));
    }

    #[test]
    fn catch_without_callback_resolves_with_default() {
        let done = Promise::<i32, i32>::rejected(4).catch::<i32>(None);
        assert_eq!(done.try_value(), Ok(0));
    }

    #[test]
    fn catch_on_resolved_promise_stays_pending() {
        let continuation = Promise::<i32, i32>::resolved(1)
            .catch::<i32>(handler(|reason| Ok(Eventual::Value(reason))));
        assert!(continuation.is_pending());
    }
}

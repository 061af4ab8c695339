use crate::promise::Promise;

/// A foreign promise-like value: anything that can accept a resolve and a
/// reject thunk and call one of them, now or later. This is the explicit
/// capability that replaces duck-typed `then` detection.
///
/// Either thunk may be called at most once; a late call after the adopting
/// promise has settled collapses into the once-only transition guard and is
/// silently ignored.
pub trait Thenable<T, E> {
    fn then(self: Box<Self>, resolve: Box<dyn FnOnce(T)>, reject: Box<dyn FnOnce(E)>);
}

/// A value that may or may not be promise-like. Callbacks return one of
/// these, and the combinators consume collections of them.
pub enum Eventual<T, E> {
    /// A plain value, treated as already settled.
    Value(T),
    /// A native promise whose eventual settlement is adopted.
    Promise(Promise<T, E>),
    /// A foreign thenable, adopted through [`Thenable::then`].
    Thenable(Box<dyn Thenable<T, E>>),
}

impl<T, E> From<Promise<T, E>> for Eventual<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Eventual::Promise(promise)
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Eventual<T, E> {
    /// Routes this value's eventual settlement into the given promise.
    /// A plain value settles it immediately.
    pub(crate) fn settle_into(self, target: &Promise<T, E>) {
        match self {
            Eventual::Value(value) => target.settle_resolve(value),
            Eventual::Promise(promise) => {
                let resolve_to = target.clone();
                let reject_to = target.clone();
                promise.watch(
                    Box::new(move |value| resolve_to.settle_resolve(value)),
                    Box::new(move |reason| reject_to.settle_reject(reason)),
                );
            }
            Eventual::Thenable(thenable) => {
                let resolve_to = target.clone();
                let reject_to = target.clone();
                thenable.then(
                    Box::new(move |value| resolve_to.settle_resolve(value)),
                    Box::new(move |reason| reject_to.settle_reject(reason)),
                );
            }
        }
    }
}

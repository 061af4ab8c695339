use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::promise::Promise;

/// Awaits a promise's settlement as a `Future`, yielding `Ok(value)` or
/// `Err(reason)`.
///
/// The promise shares no state across threads, so this only suits
/// single-threaded executors.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use shortcut_promise::Promise;
///
/// let (promise, producer) = Promise::<i32, ()>::deferred();
/// let consumer = promise.consumer();
/// producer.resolve(5);
/// assert_eq!(block_on(consumer), Ok(5));
/// ```
pub struct Consumer<T, E> {
    promise: Promise<T, E>,
    waker: Rc<RefCell<Option<Waker>>>,
    registered: bool,
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// A promise settles only through its producer; there is no
    /// broken-pipe signal. Dropping every [`crate::Producer`] leaves the
    /// promise pending and a parked consumer unwoken, so callers that can
    /// lose their producer should not block on the consumer alone.
    pub fn consumer(&self) -> Consumer<T, E> {
        Consumer {
            promise: self.clone(),
            waker: Rc::new(RefCell::new(None)),
            registered: false,
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Future for Consumer<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(settled) = this.promise.settled_result() {
            return Poll::Ready(settled);
        }

        *this.waker.borrow_mut() = Some(cx.waker().clone());
        if !this.registered {
            this.registered = true;
            let on_resolved = wake_thunk(&this.waker);
            let on_rejected = wake_thunk(&this.waker);
            this.promise.watch(on_resolved, on_rejected);
        }
        Poll::Pending
    }
}

fn wake_thunk<A>(slot: &Rc<RefCell<Option<Waker>>>) -> Box<dyn FnOnce(A)> {
    let slot = slot.clone();
    Box::new(move |_| {
        if let Some(waker) = slot.borrow_mut().take() {
            waker.wake();
        }
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    use crate::promise::Promise;

    #[test]
    fn ready_when_already_resolved() {
        let consumer = Promise::<i32, i32>::resolved(42).consumer();
        assert_eq!(block_on(consumer), Ok(42));
    }

    #[test]
    fn ready_when_already_rejected() {
        let consumer = Promise::<i32, i32>::rejected(13).consumer();
        assert_eq!(block_on(consumer), Err(13));
    }

    #[test]
    fn woken_by_a_later_settlement() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        let (promise, producer) = Promise::<i32, i32>::deferred();
        let consumer = promise.consumer();
        let got = Rc::new(Cell::new(None));
        let sink = got.clone();
        spawner
            .spawn_local(async move {
                sink.set(Some(consumer.await));
            })
            .unwrap();

        pool.run_until_stalled();
        assert_eq!(got.get(), None);

        producer.resolve(11);
        pool.run();
        assert_eq!(got.get(), Some(Ok(11)));
    }

    #[test]
    fn dropped_producer_leaves_the_consumer_parked() {
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        let (promise, producer) = Promise::<i32, i32>::deferred();
        let consumer = promise.consumer();
        let got = Rc::new(Cell::new(None));
        let sink = got.clone();
        spawner
            .spawn_local(async move {
                sink.set(Some(consumer.await));
            })
            .unwrap();

        pool.run_until_stalled();
        drop(producer);
        pool.run_until_stalled();

        assert_eq!(got.get(), None);
        assert!(promise.is_pending());
    }
}

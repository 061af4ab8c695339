use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::promise::{Producer, Promise};
use crate::thenable::Eventual;

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// Resolves once every input has resolved, with the values in input
    /// order, not completion order. Plain values count as already resolved.
    /// The first rejection rejects the aggregate and suppresses everything
    /// after it.
    ///
    /// When every input has already settled the aggregate settles
    /// synchronously, inside this call.
    ///
    /// # Examples
    ///
    /// ```
    /// use shortcut_promise::{Eventual, Promise};
    ///
    /// let all = Promise::<i32, ()>::all([
    ///     Eventual::Value(1),
    ///     Eventual::Promise(Promise::resolved(123)),
    /// ]);
    /// assert_eq!(all.try_value(), Ok(vec![1, 123]));
    /// ```
    pub fn all(inputs: impl IntoIterator<Item = Eventual<T, E>>) -> Promise<Vec<T>, E> {
        settle_all(inputs.into_iter().collect(), |values| values)
    }

    /// The keyed-shape counterpart of [`Promise::all`]: entries go in as
    /// `(key, value)` pairs and come out as a map preserving the input key
    /// order.
    pub fn all_keyed<K>(
        entries: impl IntoIterator<Item = (K, Eventual<T, E>)>,
    ) -> Promise<IndexMap<K, T>, E>
    where
        K: Clone + Hash + Eq + 'static,
    {
        let (keys, inputs): (Vec<K>, Vec<Eventual<T, E>>) = entries.into_iter().unzip();
        settle_all(inputs, move |values| keys.into_iter().zip(values).collect())
    }

    /// Settles with the first input to settle, value or reason alike; every
    /// later settlement is absorbed by the once-only transition guard.
    ///
    /// Quirk kept from the original behavior: the first element that is a
    /// plain value resolves the race immediately and stops the scan; later
    /// elements are never inspected at all.
    ///
    /// # Examples
    ///
    /// ```
    /// use shortcut_promise::{Eventual, Promise};
    ///
    /// let winner = Promise::<i32, ()>::race([
    ///     Eventual::Promise(Promise::resolved(111)),
    ///     Eventual::Promise(Promise::resolved(222)),
    /// ]);
    /// assert_eq!(winner.try_value(), Ok(111));
    /// ```
    pub fn race(inputs: impl IntoIterator<Item = Eventual<T, E>>) -> Promise<T, E> {
        Promise::new(move |producer| {
            for input in inputs {
                match input {
                    Eventual::Value(value) => {
                        producer.resolve(value);
                        break;
                    }
                    Eventual::Promise(promise) => {
                        let win = producer.clone();
                        let lose = producer.clone();
                        promise.watch(
                            Box::new(move |value| win.resolve(value)),
                            Box::new(move |reason| lose.reject(reason)),
                        );
                    }
                    Eventual::Thenable(thenable) => {
                        let win = producer.clone();
                        let lose = producer.clone();
                        thenable.then(
                            Box::new(move |value| win.resolve(value)),
                            Box::new(move |reason| lose.reject(reason)),
                        );
                    }
                }
            }
            Ok(())
        })
    }
}

/// Shared `all` bookkeeping, mutated from the per-entry listeners.
struct AllState<T, E, Out> {
    rejected: bool,
    scanning: bool,
    resolved_count: usize,
    total: usize,
    slots: Vec<Option<T>>,
    finish: Option<Box<dyn FnOnce(Vec<T>) -> Out>>,
    producer: Producer<Out, E>,
}

type Completion<T, E, Out> = (Box<dyn FnOnce(Vec<T>) -> Out>, Vec<T>, Producer<Out, E>);

impl<T, E, Out> AllState<T, E, Out> {
    /// Ready only once the registration scan is over and every entry has
    /// resolved; this covers both the fully-synchronous path and completions
    /// arriving after the scan.
    fn take_completion(&mut self) -> Option<Completion<T, E, Out>> {
        if self.scanning || self.resolved_count < self.total {
            return None;
        }
        let finish = self.finish.take()?;
        // resolved_count reached total, so every slot is filled
        let values = self.slots.iter_mut().map(|slot| slot.take().unwrap()).collect();
        Some((finish, values, self.producer.clone()))
    }
}

fn settle_all<T, E, Out, F>(inputs: Vec<Eventual<T, E>>, finish: F) -> Promise<Out, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    Out: Clone + 'static,
    F: FnOnce(Vec<T>) -> Out + 'static,
{
    Promise::new(move |producer| {
        let total = inputs.len();
        let state = Rc::new(RefCell::new(AllState {
            rejected: false,
            scanning: true,
            resolved_count: 0,
            total,
            slots: (0..total).map(|_| None).collect(),
            finish: Some(Box::new(finish)),
            producer,
        }));

        for (index, input) in inputs.into_iter().enumerate() {
            if state.borrow().rejected {
                break;
            }
            let on_resolved = {
                let state = state.clone();
                Box::new(move |value| resolve_entry(&state, index, value))
            };
            let on_rejected = {
                let state = state.clone();
                Box::new(move |reason| reject_all(&state, reason))
            };
            match input {
                Eventual::Value(value) => {
                    Promise::resolved(value).watch(on_resolved, on_rejected)
                }
                Eventual::Promise(promise) => promise.watch(on_resolved, on_rejected),
                Eventual::Thenable(thenable) => thenable.then(on_resolved, on_rejected),
            }
        }

        let completed = {
            let mut state = state.borrow_mut();
            state.scanning = false;
            if state.rejected {
                None
            } else {
                state.take_completion()
            }
        };
        if let Some((finish, values, producer)) = completed {
            producer.resolve(finish(values));
        }
        Ok(())
    })
}

fn resolve_entry<T, E, Out>(state: &Rc<RefCell<AllState<T, E, Out>>>, index: usize, value: T)
where
    E: Clone + 'static,
    Out: Clone + 'static,
{
    let completed = {
        let mut state = state.borrow_mut();
        if state.rejected {
            return;
        }
        state.resolved_count += 1;
        state.slots[index] = Some(value);
        state.take_completion()
    };
    if let Some((finish, values, producer)) = completed {
        producer.resolve(finish(values));
    }
}

fn reject_all<T, E, Out>(state: &Rc<RefCell<AllState<T, E, Out>>>, reason: E)
where
    E: Clone + 'static,
    Out: Clone + 'static,
{
    let producer = {
        let mut state = state.borrow_mut();
        state.rejected = true;
        state.producer.clone()
    };
    producer.reject(reason);
}

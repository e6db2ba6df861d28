/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Hot push stream with single-slot memory.
//!
//! Every observer attached to a [`ReplayLast`] first receives the most recently pushed value,
//! if there is one, and then everything pushed after it attached. Terminal signals are
//! remembered too: an observer attaching after termination gets the last value followed by
//! the terminal signal.

use crate::error::SourceError;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub(crate) enum Notification<T> {
    Next(T),
    Error(SourceError),
}

#[derive(Debug, Clone)]
enum Termination {
    Completed,
    Failed(SourceError),
}

struct State<T> {
    last: Option<T>,
    observers: Vec<UnboundedSender<Notification<T>>>,
    terminated: Option<Termination>,
}

pub(crate) struct ReplayLast<T> {
    state: Mutex<State<T>>,
}

impl<T: Clone> ReplayLast<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                last: None,
                observers: Vec::new(),
                terminated: None,
            }),
        }
    }

    // Never held across an await, so a poisoned lock still holds consistent state.
    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches a new observer. The receiver ends once the subject terminates.
    pub(crate) fn subscribe(&self) -> UnboundedReceiver<Notification<T>> {
        let (sender, receiver) = mpsc::unbounded();
        let mut state = self.state();

        if let Some(last) = state.last.as_ref() {
            let _ = sender.unbounded_send(Notification::Next(last.clone()));
        }

        match state.terminated.clone() {
            None => state.observers.push(sender),
            Some(Termination::Failed(err)) => {
                let _ = sender.unbounded_send(Notification::Error(err));
            }
            Some(Termination::Completed) => {}
        }

        receiver
    }

    /// Pushes `value` to every live observer and remembers it. Ignored after termination.
    pub(crate) fn next(&self, value: T) {
        let mut state = self.state();
        if state.terminated.is_some() {
            return;
        }

        // Observers whose receiver was dropped are pruned here.
        state
            .observers
            .retain(|observer| observer.unbounded_send(Notification::Next(value.clone())).is_ok());
        state.last = Some(value);
    }

    pub(crate) fn error(&self, err: SourceError) {
        let mut state = self.state();
        if state.terminated.is_some() {
            return;
        }

        for observer in state.observers.drain(..) {
            let _ = observer.unbounded_send(Notification::Error(err.clone()));
        }
        state.terminated = Some(Termination::Failed(err));
    }

    pub(crate) fn complete(&self) {
        let mut state = self.state();
        if state.terminated.is_some() {
            return;
        }

        state.observers.clear();
        state.terminated = Some(Termination::Completed);
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.state().observers.len()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.state().terminated.is_some()
    }
}

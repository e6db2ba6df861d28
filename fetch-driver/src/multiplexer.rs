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


//! Request stream to response-stream multiplexing.

use crate::error::SourceError;
use crate::fetch::Fetch;
use crate::replay_subject::{Notification, ReplayLast};
use crate::request::{normalize, RequestInput};
use crate::response_stream::{ResponseStream, ResponseStreamFactory};
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use log::*;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::Context;
use tokio::task::JoinHandle;

const MULTIPLEXER_TAG: &str = "Multiplexer:";
const MULTIPLEXER_FN_PUMP_TAG: &str = "pump():";
const MULTIPLEXER_FN_SUBSCRIBE_TAG: &str = "subscribe():";
const MULTIPLEXER_FN_SHUTDOWN_TAG: &str = "shutdown():";

pub(crate) type RequestSource = BoxStream<'static, Result<RequestInput, SourceError>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Pump {
    /// Built but not subscribed to the request source yet.
    Pending(BoxFuture<'static, ()>),
    /// Running as a task on the Tokio runtime.
    Spawned(JoinHandle<()>),
    /// No runtime at first subscribe; polled by the subscriptions themselves.
    Inline(BoxFuture<'static, ()>),
    Finished,
}

struct Lifecycle {
    pump: Pump,
    subscribers: usize,
}

/// Consumes the request source and emits one [`ResponseStream`] per request, in arrival order,
/// on a replay-last output.
///
/// The request source is subscribed to when the first observer attaches and unsubscribed from
/// when the last one detaches or on [`stop`](Self::stop). Either way the output is then
/// terminal: later observers get the replayed last value and the end of stream. Fetches that
/// were already dispatched keep running.
pub(crate) struct Multiplexer<R> {
    name: String,
    output: Arc<ReplayLast<ResponseStream<R>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<R: Clone + Send + Sync + 'static> Multiplexer<R> {
    pub(crate) fn new<F>(name: &str, factory: ResponseStreamFactory<F>, requests: RequestSource) -> Self
    where
        F: Fetch<Response = R>,
    {
        let output = Arc::new(ReplayLast::new());
        let pending = Self::pump(name.to_string(), factory, requests, output.clone()).boxed();

        Self {
            name: name.to_string(),
            output,
            lifecycle: Mutex::new(Lifecycle {
                pump: Pump::Pending(pending),
                subscribers: 0,
            }),
        }
    }

    async fn pump<F>(
        name: String,
        factory: ResponseStreamFactory<F>,
        mut requests: RequestSource,
        output: Arc<ReplayLast<ResponseStream<R>>>,
    ) where
        F: Fetch<Response = R>,
    {
        debug!("{MULTIPLEXER_TAG}{name}:{MULTIPLEXER_FN_PUMP_TAG} subscribed to request source");

        let mut emitted = 0usize;
        while let Some(item) = requests.next().await {
            match item {
                Ok(input) => {
                    let response = factory.make_response_stream(normalize(input));
                    output.next(response);
                    emitted += 1;
                }
                Err(err) => {
                    warn!(
                        "{MULTIPLEXER_TAG}{name}:{MULTIPLEXER_FN_PUMP_TAG} request source failed after {emitted} requests: {err}"
                    );
                    output.error(err);
                    return;
                }
            }
        }

        debug!(
            "{MULTIPLEXER_TAG}{name}:{MULTIPLEXER_FN_PUMP_TAG} request source completed after {emitted} requests"
        );
        output.complete();
    }

    /// Attaches an observer to the output and starts the pump on the first call.
    ///
    /// Every call must be paired with [`unsubscribe`](Self::unsubscribe) once the observer is
    /// gone.
    pub(crate) fn subscribe(&self) -> UnboundedReceiver<Notification<ResponseStream<R>>> {
        let mut lifecycle = lock(&self.lifecycle);
        let receiver = self.output.subscribe();
        lifecycle.subscribers += 1;
        trace!(
            "{MULTIPLEXER_TAG}{}:{MULTIPLEXER_FN_SUBSCRIBE_TAG} subscribers: {}, observers: {}",
            self.name,
            lifecycle.subscribers,
            self.output.observer_count()
        );

        lifecycle.pump = match mem::replace(&mut lifecycle.pump, Pump::Finished) {
            Pump::Pending(pending) if !self.output.is_terminated() => self.start(pending),
            Pump::Pending(_) => Pump::Finished,
            running => running,
        };

        receiver
    }

    fn start(&self, pending: BoxFuture<'static, ()>) -> Pump {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                trace!("{MULTIPLEXER_TAG}{} spawning pump", self.name);
                Pump::Spawned(handle.spawn(pending))
            }
            Err(_) => {
                debug!(
                    "{MULTIPLEXER_TAG}{}:{MULTIPLEXER_FN_SUBSCRIBE_TAG} no Tokio runtime, pump runs inside subscriptions",
                    self.name
                );
                Pump::Inline(pending)
            }
        }
    }

}

impl<R> Multiplexer<R> {
    /// Makes progress on an inline pump. A no-op when the pump runs as a task.
    pub(crate) fn poll_pump(&self, cx: &mut Context<'_>) {
        let mut lifecycle = lock(&self.lifecycle);
        let finished = match &mut lifecycle.pump {
            Pump::Inline(pump) => pump.poll_unpin(cx).is_ready(),
            _ => false,
        };
        if finished {
            lifecycle.pump = Pump::Finished;
        }
    }

    /// Detaches one observer. The last one leaving unsubscribes from the request source.
    pub(crate) fn unsubscribe(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        lifecycle.subscribers = lifecycle.subscribers.saturating_sub(1);
        if lifecycle.subscribers == 0 {
            self.shutdown(&mut lifecycle, "last subscription dropped");
        }
    }

    /// Unsubscribes from the request source and completes the output.
    pub(crate) fn stop(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        self.shutdown(&mut lifecycle, "stopped");
    }

    fn shutdown(&self, lifecycle: &mut Lifecycle, reason: &str) {
        match mem::replace(&mut lifecycle.pump, Pump::Finished) {
            Pump::Spawned(pump) => pump.abort(),
            Pump::Pending(_) | Pump::Inline(_) | Pump::Finished => {}
        }

        if !self.output.is_terminated() {
            debug!(
                "{MULTIPLEXER_TAG}{}:{MULTIPLEXER_FN_SHUTDOWN_TAG} {reason}, unsubscribed from request source",
                self.name
            );
            self.output.complete();
        }
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.output.is_terminated()
    }
}

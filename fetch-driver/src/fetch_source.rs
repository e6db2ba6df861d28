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

//! The driver output: a view over the multiplexed response streams.

use crate::error::{ResponseError, SourceError};
use crate::filter::RequestFilter;
use crate::multiplexer::Multiplexer;
use crate::replay_subject::Notification;
use crate::response_stream::ResponseStream;
use futures::channel::mpsc::UnboundedReceiver;
use futures::stream::{self, BoxStream, FusedStream};
use futures::{future, Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

/// Output of [`FetchDriver::drive`][crate::FetchDriver::drive].
///
/// A `FetchSource` is a cheap, cloneable view. [`by_key`](Self::by_key) and
/// [`by_url`](Self::by_url) narrow it without buffering anything; every view shares the same
/// replay-last output, so a late [`subscribe`](Self::subscribe) starts with the most recently
/// emitted response stream when that stream passes the view's filter.
pub struct FetchSource<R> {
    multiplexer: Arc<Multiplexer<R>>,
    filter: RequestFilter,
}

impl<R> Clone for FetchSource<R> {
    fn clone(&self) -> Self {
        Self {
            multiplexer: self.multiplexer.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<R> fmt::Debug for FetchSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSource")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<R: Clone + Send + Sync + 'static> FetchSource<R> {
    pub(crate) fn new(multiplexer: Multiplexer<R>) -> Self {
        Self {
            multiplexer: Arc::new(multiplexer),
            filter: RequestFilter::default(),
        }
    }

    /// Attaches a new subscriber.
    ///
    /// The first subscription across all views subscribes the driver to its request source.
    /// Inside a Tokio runtime the request source is consumed by a spawned task; elsewhere it is
    /// driven by polling the subscriptions. Dropping the last live subscription unsubscribes
    /// from the request source and completes the output, like [`stop`](Self::stop).
    pub fn subscribe(&self) -> Subscription<R> {
        Subscription {
            receiver: self.multiplexer.subscribe(),
            filter: self.filter.clone(),
            multiplexer: self.multiplexer.clone(),
        }
    }

    /// View of the response streams whose request key equals `key`.
    pub fn by_key(&self, key: impl Into<String>) -> Self {
        Self {
            multiplexer: self.multiplexer.clone(),
            filter: self.filter.and_key(key),
        }
    }

    /// View of the response streams whose request resolves to `url`.
    pub fn by_url(&self, url: impl Into<String>) -> Self {
        Self {
            multiplexer: self.multiplexer.clone(),
            filter: self.filter.and_url(url),
        }
    }

    /// Subscribes and flattens every response stream of this view concurrently.
    ///
    /// Results arrive in settlement order, not request order. A request source failure is
    /// yielded once as [`ResponseError::Source`].
    pub fn responses(&self) -> BoxStream<'static, Result<R, ResponseError>> {
        self.subscribe()
            .map(|item| match item {
                Ok(response) => response.map_err(ResponseError::from).boxed(),
                Err(err) => stream::once(future::ready(Err(ResponseError::from(err)))).boxed(),
            })
            .flatten_unordered(None)
            .boxed()
    }

    /// Unsubscribes from the request source and completes every subscription.
    ///
    /// Fetches already dispatched are not cancelled; see [`ResponseStream::abort`].
    pub fn stop(&self) {
        self.multiplexer.stop();
    }

    /// Whether the output has completed, failed or been stopped.
    pub fn is_terminated(&self) -> bool {
        self.multiplexer.is_terminated()
    }
}

/// Live subscription to a [`FetchSource`] view.
///
/// Yields `Ok` for every matching response stream, then ends when the request source
/// completes. If the request source fails, the failure is yielded once and the stream ends.
pub struct Subscription<R> {
    receiver: UnboundedReceiver<Notification<ResponseStream<R>>>,
    filter: RequestFilter,
    multiplexer: Arc<Multiplexer<R>>,
}

impl<R> Drop for Subscription<R> {
    fn drop(&mut self) {
        self.multiplexer.unsubscribe();
    }
}

impl<R> fmt::Debug for Subscription<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<R: Clone> Stream for Subscription<R> {
    type Item = Result<ResponseStream<R>, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.multiplexer.poll_pump(cx);
        loop {
            match ready!(self.receiver.poll_next_unpin(cx)) {
                Some(Notification::Next(response)) => {
                    if self.filter.matches(response.request()) {
                        return Poll::Ready(Some(Ok(response)));
                    }
                }
                Some(Notification::Error(err)) => return Poll::Ready(Some(Err(err))),
                None => return Poll::Ready(None),
            }
        }
    }
}

impl<R: Clone> FusedStream for Subscription<R> {
    fn is_terminated(&self) -> bool {
        self.receiver.is_terminated()
    }
}

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

//! One-shot response streams and the factory that dispatches fetches for them.

use crate::config::DriverConfig;
use crate::error::FetchError;
use crate::fetch::Fetch;
use crate::options::{FetchOptions, Headers};
use crate::request::Request;
use futures::future::{abortable, AbortHandle, BoxFuture, Shared};
use futures::stream::FusedStream;
use futures::{FutureExt, Stream};
use log::*;
use serde_json::{Map, Value};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

const RESPONSE_STREAM_FACTORY_TAG: &str = "ResponseStreamFactory:";
const RESPONSE_STREAM_FACTORY_FN_MAKE_TAG: &str = "make_response_stream():";

/// Eventual result of one fetch, shareable between any number of observers.
pub type SharedResponse<R> = Shared<BoxFuture<'static, Result<R, FetchError>>>;

/// Single-value stream over the eventual result of one fetch, tagged with its [`Request`].
///
/// Yields exactly one item (`Ok` on success, `Err` on failure) and then ends. Clones observe
/// the same fetch; each clone yields the settled result once.
pub struct ResponseStream<R> {
    request: Arc<Request>,
    response: SharedResponse<R>,
    abort_handle: AbortHandle,
    settled: bool,
}

impl<R> ResponseStream<R> {
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn key(&self) -> Option<&str> {
        self.request.key()
    }

    pub fn resolved_url(&self) -> Option<&str> {
        self.request.resolved_url()
    }

    /// Aborts the in-flight fetch. Every view of this stream then yields [`FetchError::Aborted`]
    /// unless the fetch had already settled.
    pub fn abort(&self) {
        self.abort_handle.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_handle.is_aborted()
    }
}

impl<R: Clone> ResponseStream<R> {
    /// The eventual result as a future, independent of this stream's own position.
    pub fn result(&self) -> SharedResponse<R> {
        self.response.clone()
    }
}

impl<R> Clone for ResponseStream<R> {
    fn clone(&self) -> Self {
        Self {
            request: self.request.clone(),
            response: self.response.clone(),
            abort_handle: self.abort_handle.clone(),
            settled: false,
        }
    }
}

impl<R> fmt::Debug for ResponseStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream")
            .field("request", &self.request)
            .field("settled", &self.settled)
            .finish()
    }
}

impl<R: Clone> Stream for ResponseStream<R> {
    type Item = Result<R, FetchError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.settled {
            return Poll::Ready(None);
        }

        let result = ready!(self.response.poll_unpin(cx));
        self.settled = true;
        Poll::Ready(Some(result))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.settled {
            (0, Some(0))
        } else {
            (1, Some(1))
        }
    }
}

impl<R: Clone> FusedStream for ResponseStream<R> {
    fn is_terminated(&self) -> bool {
        self.settled
    }
}

/// Turns normalized requests into [`ResponseStream`]s by invoking the fetch capability.
///
/// Every request is dispatched on its own; requests sharing a key are not coalesced.
pub struct ResponseStreamFactory<F> {
    fetch: Arc<F>,
    defaults: Map<String, Value>,
    headers: Headers,
}

impl<F: Fetch> ResponseStreamFactory<F> {
    pub fn new(fetch: Arc<F>, config: &DriverConfig) -> Self {
        Self {
            fetch,
            defaults: config.defaults.clone(),
            headers: config.headers.clone(),
        }
    }

    /// Dispatches `request` and returns the stream tagged with it.
    ///
    /// Inside a Tokio runtime the fetch is spawned immediately as a detached task and runs to
    /// completion whether or not anyone polls the stream. Outside a runtime it is dispatched on
    /// the first poll of any view of the stream.
    pub fn make_response_stream(&self, request: Request) -> ResponseStream<F::Response> {
        let request = Arc::new(request);
        let options =
            FetchOptions::layered(&self.defaults, &self.headers, request.options());
        let target = request.target();
        let fetch = self.fetch.clone();

        debug!(
            "{RESPONSE_STREAM_FACTORY_TAG}:{RESPONSE_STREAM_FACTORY_FN_MAKE_TAG} dispatching key: {:?}, target: {:?}",
            request.key(),
            target
        );

        let dispatch = async move {
            match target {
                Some(target) => fetch.fetch(target, options).await,
                None => Err(FetchError::UnresolvedTarget),
            }
        };
        let (dispatch, abort_handle) = abortable(dispatch);
        let response = dispatch
            .map(|outcome| outcome.unwrap_or(Err(FetchError::Aborted)))
            .boxed()
            .shared();

        Self::spawn_detached(&request, response.clone());

        ResponseStream {
            request,
            response,
            abort_handle,
            settled: false,
        }
    }

    fn spawn_detached(request: &Arc<Request>, response: SharedResponse<F::Response>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let request = request.clone();
                // The join handle is dropped on purpose: unsubscribing must not abort the fetch.
                handle.spawn(async move {
                    if let Err(err) = response.await {
                        debug!(
                            "{RESPONSE_STREAM_FACTORY_TAG} key: {:?} settled with error: {err}",
                            request.key()
                        );
                    } else {
                        trace!(
                            "{RESPONSE_STREAM_FACTORY_TAG} key: {:?} settled",
                            request.key()
                        );
                    }
                });
            }
            Err(_) => {
                warn!(
                    "{RESPONSE_STREAM_FACTORY_TAG}:{RESPONSE_STREAM_FACTORY_FN_MAKE_TAG} no Tokio runtime, key: {:?} dispatches on first poll",
                    request.key()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResponseStreamFactory;
    use crate::config::DriverConfig;
    use crate::error::FetchError;
    use crate::fetch::fetch_fn;
    use crate::options::FetchOptions;
    use crate::request::{normalize, FetchTarget, RequestLike};
    use futures::StreamExt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn echo_options() -> impl crate::fetch::Fetch<Response = Value> {
        fetch_fn(|target: FetchTarget, options: FetchOptions| async move {
            Ok::<_, FetchError>(json!({ "url": target.url(), "options": options }))
        })
    }

    #[tokio::test]
    async fn yields_once_then_ends() {
        let factory = ResponseStreamFactory::new(Arc::new(echo_options()), &DriverConfig::default());
        let mut response = factory.make_response_stream(normalize("http://api.test/a"));

        let first = response.next().await;
        let second = response.next().await;

        assert_eq!(
            first.unwrap().unwrap(),
            json!({ "url": "http://api.test/a", "options": {} })
        );
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn applies_layered_options() {
        let config = DriverConfig::default()
            .with_default("a", 1)
            .with_header("H", "1");
        let factory = ResponseStreamFactory::new(Arc::new(echo_options()), &config);
        let request = normalize(
            RequestLike::url("http://api.test/a").with_options(
                FetchOptions::new()
                    .with_field("a", 2)
                    .with_field("b", 3)
                    .with_header("H", "2"),
            ),
        );

        let response = factory.make_response_stream(request).result().await;

        assert_eq!(
            response.unwrap()["options"],
            json!({ "a": 2, "b": 3, "headers": { "H": "2" } })
        );
    }

    #[tokio::test]
    async fn dispatches_without_being_polled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let capability = fetch_fn(move |_target: FetchTarget, _options: FetchOptions| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, FetchError>(()) }
        });
        let factory = ResponseStreamFactory::new(Arc::new(capability), &DriverConfig::default());

        let _unpolled = factory.make_response_stream(normalize("http://api.test/a"));
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clones_share_one_fetch() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = calls.clone();
        let capability = fetch_fn(move |target: FetchTarget, _options: FetchOptions| {
            recorder.lock().unwrap().push(target.url().to_string());
            async { Ok::<_, FetchError>(7) }
        });
        let factory = ResponseStreamFactory::new(Arc::new(capability), &DriverConfig::default());

        let response = factory.make_response_stream(normalize("http://api.test/a"));
        let replayed = response.clone();

        let a: Vec<_> = response.collect().await;
        let b: Vec<_> = replayed.collect().await;

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(*a[0].as_ref().unwrap(), 7);
        assert_eq!(*b[0].as_ref().unwrap(), 7);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_request_never_reaches_the_capability() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let capability = fetch_fn(move |_target: FetchTarget, _options: FetchOptions| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, FetchError>(()) }
        });
        let factory = ResponseStreamFactory::new(Arc::new(capability), &DriverConfig::default());

        let response = factory
            .make_response_stream(normalize(RequestLike::default()))
            .result()
            .await;

        assert!(matches!(response, Err(FetchError::UnresolvedTarget)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abort_settles_pending_fetch() {
        let capability = fetch_fn(|_target: FetchTarget, _options: FetchOptions| {
            futures::future::pending::<Result<(), FetchError>>()
        });
        let factory = ResponseStreamFactory::new(Arc::new(capability), &DriverConfig::default());
        let response = factory.make_response_stream(normalize("http://api.test/slow"));

        response.abort();

        assert!(response.is_aborted());
        assert!(matches!(
            response.result().await,
            Err(FetchError::Aborted)
        ));
    }

    #[test]
    fn dispatches_on_first_poll_without_runtime() {
        let factory = ResponseStreamFactory::new(Arc::new(echo_options()), &DriverConfig::default());
        let response = factory.make_response_stream(normalize("http://api.test/a"));

        let result = futures::executor::block_on(response.result());

        assert_eq!(result.unwrap()["url"], "http://api.test/a");
    }
}

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

//! The fetch capability the driver dispatches requests to.

use crate::error::FetchError;
use crate::options::FetchOptions;
use crate::request::FetchTarget;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Asynchronous fetch capability: `(target, options) -> eventual result`.
///
/// The driver never looks inside `Response`; status codes, bodies and the like are the
/// caller's concern. `Response` must be `Clone` because one settled result can be observed by
/// every subscriber that received the same [`ResponseStream`][crate::ResponseStream].
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    type Response: Clone + Send + Sync + 'static;

    async fn fetch(
        &self,
        target: FetchTarget,
        options: FetchOptions,
    ) -> Result<Self::Response, FetchError>;
}

/// [`Fetch`] implementation backed by a closure. Built with [`fetch_fn`].
pub struct FetchFn<Fun, Fut, R> {
    fun: Fun,
    _marker: PhantomData<fn() -> (Fut, R)>,
}

/// Adapts a closure returning a future into a fetch capability.
///
/// ```
/// use fetch_driver::{fetch_fn, FetchError, FetchOptions, FetchTarget};
///
/// let echo = fetch_fn(|target: FetchTarget, _options: FetchOptions| async move {
///     Ok::<_, FetchError>(target.url().to_string())
/// });
/// # let _ = echo;
/// ```
pub fn fetch_fn<Fun, Fut, R>(fun: Fun) -> FetchFn<Fun, Fut, R>
where
    Fun: Fn(FetchTarget, FetchOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, FetchError>> + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    FetchFn {
        fun,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<Fun, Fut, R> Fetch for FetchFn<Fun, Fut, R>
where
    Fun: Fn(FetchTarget, FetchOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, FetchError>> + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    type Response = R;

    async fn fetch(&self, target: FetchTarget, options: FetchOptions) -> Result<R, FetchError> {
        (self.fun)(target, options).await
    }
}

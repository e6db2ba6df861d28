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

//! # fetch-driver
//!
//! `fetch-driver` turns a stream of outgoing requests into a stream of per-request response
//! streams. Consumers subscribe to everything, or narrow the output down by logical request
//! key or by resolved URL.
//!
//! Typical usage is centered on [`FetchDriver`] and the [`FetchSource`] it returns.
//!
//! ```
//! use fetch_driver::{
//!     fetch_fn, DriverConfig, FetchDriver, FetchError, FetchOptions, FetchTarget, RequestInput,
//!     RequestLike,
//! };
//! use futures::{stream, StreamExt};
//! use std::convert::Infallible;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let fetch = fetch_fn(|target: FetchTarget, _options: FetchOptions| async move {
//!     Ok::<_, FetchError>(format!("body of {}", target.url()))
//! });
//! let driver = FetchDriver::new("quick-start", fetch, DriverConfig::default());
//!
//! let requests = stream::iter(vec![
//!     Ok::<RequestInput, Infallible>(RequestLike::url("http://api.test/a").into()),
//!     Ok(RequestLike::url("http://api.test/b").with_key("b").into()),
//!     Ok("http://api.test/a".into()),
//! ]);
//! let source = driver.drive(requests);
//!
//! let only_a: Vec<_> = source.by_url("http://api.test/a").subscribe().collect().await;
//! assert_eq!(only_a.len(), 2);
//! # });
//! ```
//!
//! ## Output contract
//!
//! - One [`ResponseStream`] per request, emitted in request arrival order.
//! - Replay-last memory: a late subscriber first receives the most recent response stream.
//! - A failing fetch only errors its own response stream. An `Err` on the request stream
//!   terminates the output for every current and future subscriber.
//! - Requests sharing a key are dispatched independently; keys only label responses.
//! - The request source is pulled from the first subscription until the last one is dropped or
//!   [`FetchSource::stop`] is called. After that the output is terminal.
//! - Outside a Tokio runtime, polling the subscriptions drives the request source.
//!
//! ## Logging
//!
//! The crate logs through the `log` facade and never installs a logger itself. Binaries and
//! tests initialize `env_logger` at process boundaries.

mod config;
mod driver;
mod error;
mod fetch;
mod fetch_source;
mod filter;
#[cfg(feature = "http")]
mod http;
mod multiplexer;
mod options;
mod replay_subject;
mod request;
mod response_stream;

pub use config::{ConfigError, DriverConfig};
pub use driver::FetchDriver;
pub use error::{FetchError, ResponseError, SharedError, SourceError};
pub use fetch::{fetch_fn, Fetch, FetchFn};
pub use fetch_source::{FetchSource, Subscription};
pub use filter::{by_key, by_url};
#[cfg(feature = "http")]
pub use http::{HttpFetch, HttpResponse};
pub use options::{FetchOptions, Headers};
pub use request::{normalize, FetchTarget, Request, RequestInput, RequestLike, Resource};
pub use response_stream::{ResponseStream, ResponseStreamFactory, SharedResponse};

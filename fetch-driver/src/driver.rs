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

use crate::config::DriverConfig;
use crate::error::SourceError;
use crate::fetch::Fetch;
use crate::fetch_source::FetchSource;
use crate::multiplexer::{Multiplexer, RequestSource};
use crate::request::RequestInput;
use crate::response_stream::ResponseStreamFactory;
use futures::{Stream, StreamExt};
use log::*;
use std::error::Error;
use std::sync::Arc;

const FETCH_DRIVER_TAG: &str = "FetchDriver:";
const FETCH_DRIVER_FN_DRIVE_TAG: &str = "drive():";

/// Turns a stream of request inputs into a [`FetchSource`] of per-request response streams.
///
/// The fetch capability is injected here and shared by every source the driver produces;
/// nothing is reached for implicitly.
pub struct FetchDriver<F> {
    name: String,
    fetch: Arc<F>,
    config: DriverConfig,
}

impl<F: Fetch> FetchDriver<F> {
    pub fn new(name: &str, fetch: F, config: DriverConfig) -> Self {
        let name = format!("{FETCH_DRIVER_TAG}{name}:");
        debug!("{}: FetchDriver created with config: {:?}", &name, &config);

        Self {
            name,
            fetch: Arc::new(fetch),
            config,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Wires `requests` to the fetch capability.
    ///
    /// Nothing is pulled from `requests` until the returned source, or a view of it, is first
    /// subscribed to. An `Err` item on `requests` terminates the source; failures of single
    /// fetches only surface on their own [`ResponseStream`][crate::ResponseStream].
    pub fn drive<S, I, E>(&self, requests: S) -> FetchSource<F::Response>
    where
        S: Stream<Item = Result<I, E>> + Send + 'static,
        I: Into<RequestInput>,
        E: Error + Send + Sync + 'static,
    {
        debug!("{}:{FETCH_DRIVER_FN_DRIVE_TAG} new request source", &self.name);

        let requests: RequestSource = requests
            .map(|item| item.map(Into::into).map_err(SourceError::new))
            .boxed();
        let factory = ResponseStreamFactory::new(self.fetch.clone(), &self.config);

        FetchSource::new(Multiplexer::new(&self.name, factory, requests))
    }
}

#[cfg(feature = "http")]
impl FetchDriver<crate::http::HttpFetch> {
    /// Driver backed by the `reqwest` HTTP capability.
    pub fn http(name: &str, config: DriverConfig) -> Self {
        Self::new(name, crate::http::HttpFetch::new(), config)
    }
}

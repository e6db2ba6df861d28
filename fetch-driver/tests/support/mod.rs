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


#![allow(dead_code)]

use async_trait::async_trait;
use fetch_driver::{
    DriverConfig, Fetch, FetchDriver, FetchError, FetchOptions, FetchTarget, ResponseStream,
};
use std::sync::{Arc, Mutex};

pub(crate) const RESOURCE_1: &str = "http://api.test/resource1";
pub(crate) const RESOURCE_2: &str = "http://api.test/resource2";

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Response handed out by [`MockFetch`]: the URL that was fetched and the last path segment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockResponse {
    pub url: String,
    pub data: String,
}

/// Records every call and answers with the path of the fetched URL.
/// URLs containing `fail` are rejected.
#[derive(Clone, Default)]
pub(crate) struct MockFetch {
    calls: Arc<Mutex<Vec<(FetchTarget, FetchOptions)>>>,
}

impl MockFetch {
    pub(crate) fn calls(&self) -> Vec<(FetchTarget, FetchOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(target, _)| target.url() == url)
            .count()
    }
}

#[async_trait]
impl Fetch for MockFetch {
    type Response = MockResponse;

    async fn fetch(
        &self,
        target: FetchTarget,
        options: FetchOptions,
    ) -> Result<MockResponse, FetchError> {
        let url = target.url().to_string();
        self.calls.lock().unwrap().push((target, options));

        if url.contains("fail") {
            return Err(FetchError::transport(
                url,
                std::io::Error::other("connection refused"),
            ));
        }

        let data = url.rsplit('/').next().unwrap_or_default().to_string();
        Ok(MockResponse { url, data })
    }
}

pub(crate) fn make_driver(name: &str) -> (FetchDriver<MockFetch>, MockFetch) {
    init_logging();

    let fetch = MockFetch::default();
    let driver = FetchDriver::new(name, fetch.clone(), DriverConfig::default());
    (driver, fetch)
}

/// Waits for every response stream to settle and returns the successful payloads in order.
pub(crate) async fn settled_data(responses: &[ResponseStream<MockResponse>]) -> Vec<String> {
    let mut data = Vec::with_capacity(responses.len());
    for response in responses {
        if let Ok(response) = response.result().await {
            data.push(response.data);
        }
    }
    data
}

/// Lets spawned tasks run on the current-thread test runtime.
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

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


mod support;

use fetch_driver::{
    DriverConfig, FetchDriver, FetchOptions, RequestInput, RequestLike,
};
use futures::{stream, StreamExt};
use std::convert::Infallible;
use support::{init_logging, MockFetch, RESOURCE_1, RESOURCE_2};

const CONFIG: &str = r#"{
    // sent with every request unless the request overrides it
    headers: { accept: "application/json", "x-client": "fetch-driver-tests" },
    method: "GET",
    credentials: "include",
}"#;

#[tokio::test]
async fn config_defaults_reach_every_fetch_and_requests_override_them() {
    init_logging();

    let config = DriverConfig::from_json5(CONFIG).unwrap();
    let fetch = MockFetch::default();
    let driver = FetchDriver::new("configured", fetch.clone(), config);

    let requests = vec![
        Ok::<RequestInput, Infallible>(RESOURCE_1.into()),
        Ok(RequestLike::url(RESOURCE_2)
            .with_options(
                FetchOptions::new()
                    .with_header("accept", "text/plain")
                    .with_field("method", "POST"),
            )
            .into()),
    ];
    let results: Vec<_> = driver
        .drive(stream::iter(requests))
        .responses()
        .collect()
        .await;
    assert!(results.iter().all(Result::is_ok));

    let calls = fetch.calls();
    let options_for = |url: &str| {
        calls
            .iter()
            .find(|(target, _)| target.url() == url)
            .map(|(_, options)| options.clone())
            .unwrap()
    };

    let plain = options_for(RESOURCE_1);
    assert_eq!(plain.method(), Some("GET"));
    assert_eq!(plain.headers["accept"], "application/json");
    assert_eq!(plain.field("credentials").unwrap(), "include");

    let overridden = options_for(RESOURCE_2);
    assert_eq!(overridden.method(), Some("POST"));
    assert_eq!(overridden.headers["accept"], "text/plain");
    assert_eq!(overridden.headers["x-client"], "fetch-driver-tests");
    assert_eq!(overridden.field("credentials").unwrap(), "include");
}

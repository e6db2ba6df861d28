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

//! HTTP fetch capability on top of `reqwest`.

use crate::error::FetchError;
use crate::fetch::Fetch;
use crate::options::{FetchOptions, Headers};
use crate::request::FetchTarget;
use async_trait::async_trait;
use bytes::Bytes;
use log::*;
use reqwest::{Client, Method};
use serde_json::Value;

const HTTP_FETCH_TAG: &str = "HttpFetch:";
const HTTP_FETCH_FN_FETCH_TAG: &str = "fetch():";

/// Settled HTTP exchange. The status is reported as-is; a 4xx/5xx is still a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Production fetch capability using a shared `reqwest` client.
///
/// Honours the `method` option field (falling back to a `method` attribute on the resource,
/// then `GET`), the `body` field (strings are sent verbatim, other JSON values serialized) and
/// the merged headers.
#[derive(Debug, Clone, Default)]
pub struct HttpFetch {
    client: Client,
}

impl HttpFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(target: &FetchTarget, options: &FetchOptions) -> Result<Method, FetchError> {
        let resource_method = match target {
            FetchTarget::Resource(resource) => {
                resource.attributes.get("method").and_then(Value::as_str)
            }
            FetchTarget::Url(_) => None,
        };

        match options.method().or(resource_method) {
            Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| FetchError::transport(target.url(), e)),
            None => Ok(Method::GET),
        }
    }
}

#[async_trait]
impl Fetch for HttpFetch {
    type Response = HttpResponse;

    async fn fetch(
        &self,
        target: FetchTarget,
        options: FetchOptions,
    ) -> Result<HttpResponse, FetchError> {
        let url = target.url().to_string();
        let method = Self::method(&target, &options)?;
        debug!("{HTTP_FETCH_TAG}:{HTTP_FETCH_FN_FETCH_TAG} {method} {url}");

        let mut request = self.client.request(method, &url);
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        match options.body() {
            Some(Value::String(body)) => request = request.body(body.clone()),
            Some(body) => request = request.body(body.to_string()),
            None => {}
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transport(&url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(&url, e))?;

        trace!(
            "{HTTP_FETCH_TAG}:{HTTP_FETCH_FN_FETCH_TAG} {url} settled with status {status}, {} bytes",
            body.len()
        );

        Ok(HttpResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }
}

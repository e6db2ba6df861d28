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

//! Normalization of heterogeneous request inputs into [`Request`] records.

use crate::options::FetchOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque resource descriptor handed to the fetch capability in place of a bare URL.
///
/// Only `url` is interpreted by the driver; every other attribute is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Resource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Loosely shaped request as produced by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestLike {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FetchOptions>,
}

impl RequestLike {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn resource(input: Resource) -> Self {
        Self {
            input: Some(input),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_input(mut self, input: Resource) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Anything the driver accepts on its request stream: a bare URL or a [`RequestLike`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestInput {
    Url(String),
    Request(RequestLike),
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        RequestInput::Url(url.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        RequestInput::Url(url)
    }
}

impl From<RequestLike> for RequestInput {
    fn from(request: RequestLike) -> Self {
        RequestInput::Request(request)
    }
}

/// What the fetch capability is asked to fetch: the resource descriptor when there is one,
/// the plain URL otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    Resource(Resource),
    Url(String),
}

impl FetchTarget {
    pub fn url(&self) -> &str {
        match self {
            FetchTarget::Resource(resource) => &resource.url,
            FetchTarget::Url(url) => url,
        }
    }
}

/// Normalized, immutable request.
///
/// `key` defaults to the resolved URL when the input did not carry one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<Resource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<FetchOptions>,
}

impl Request {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn input(&self) -> Option<&Resource> {
        self.input.as_ref()
    }

    /// Grouping label used by [`by_key`][crate::by_key]. `None` only for malformed input.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn options(&self) -> Option<&FetchOptions> {
        self.options.as_ref()
    }

    /// `input.url` when present and non-empty, otherwise `url`.
    pub fn resolved_url(&self) -> Option<&str> {
        resolve_url(self.input.as_ref(), self.url.as_deref())
    }

    /// `input` when present, otherwise `url`; `None` for malformed input.
    pub fn target(&self) -> Option<FetchTarget> {
        match (&self.input, &self.url) {
            (Some(resource), _) => Some(FetchTarget::Resource(resource.clone())),
            (None, Some(url)) => Some(FetchTarget::Url(url.clone())),
            (None, None) => None,
        }
    }
}

impl From<RequestInput> for Request {
    fn from(input: RequestInput) -> Self {
        normalize(input)
    }
}

fn resolve_url<'a>(input: Option<&'a Resource>, url: Option<&'a str>) -> Option<&'a str> {
    input
        .map(|resource| resource.url.as_str())
        .filter(|url| !url.is_empty())
        .or(url)
}

/// Canonicalizes a request input.
///
/// A bare string becomes `{ url }`; a [`RequestLike`] is copied field by field. A missing or
/// empty key is replaced by the resolved URL. Pure: equal inputs give equal requests.
pub fn normalize(input: impl Into<RequestInput>) -> Request {
    let RequestLike {
        url,
        input,
        key,
        options,
    } = match input.into() {
        RequestInput::Url(url) => RequestLike::url(url),
        RequestInput::Request(request) => request,
    };

    let key = key
        .filter(|key| !key.is_empty())
        .or_else(|| resolve_url(input.as_ref(), url.as_deref()).map(str::to_string));

    Request {
        url,
        input,
        key,
        options,
    }
}

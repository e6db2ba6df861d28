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

//! Key and URL projections over a stream of response streams.

use crate::error::SourceError;
use crate::request::Request;
use crate::response_stream::ResponseStream;
use futures::{future, Stream, StreamExt};

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Key(String),
    Url(String),
}

impl Predicate {
    fn matches(&self, request: &Request) -> bool {
        match self {
            Predicate::Key(key) => request.key() == Some(key.as_str()),
            Predicate::Url(url) => request.resolved_url() == Some(url.as_str()),
        }
    }
}

/// Conjunction of key/URL predicates; the empty filter passes everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RequestFilter {
    predicates: Vec<Predicate>,
}

impl RequestFilter {
    pub(crate) fn and_key(&self, key: impl Into<String>) -> Self {
        self.and(Predicate::Key(key.into()))
    }

    pub(crate) fn and_url(&self, url: impl Into<String>) -> Self {
        self.and(Predicate::Url(url.into()))
    }

    fn and(&self, predicate: Predicate) -> Self {
        let mut predicates = self.predicates.clone();
        predicates.push(predicate);
        Self { predicates }
    }

    pub(crate) fn matches(&self, request: &Request) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(request))
    }

    /// Errors always pass; only response streams are filtered.
    fn passes<R>(&self, item: &Result<ResponseStream<R>, SourceError>) -> bool {
        match item {
            Ok(response) => self.matches(response.request()),
            Err(_) => true,
        }
    }
}

/// Passes only the response streams whose request key equals `key`, preserving order.
pub fn by_key<S, R>(
    responses: S,
    key: impl Into<String>,
) -> impl Stream<Item = Result<ResponseStream<R>, SourceError>>
where
    S: Stream<Item = Result<ResponseStream<R>, SourceError>>,
{
    filtered(responses, RequestFilter::default().and_key(key))
}

/// Passes only the response streams whose request resolves to `url`, preserving order.
pub fn by_url<S, R>(
    responses: S,
    url: impl Into<String>,
) -> impl Stream<Item = Result<ResponseStream<R>, SourceError>>
where
    S: Stream<Item = Result<ResponseStream<R>, SourceError>>,
{
    filtered(responses, RequestFilter::default().and_url(url))
}

fn filtered<S, R>(
    responses: S,
    filter: RequestFilter,
) -> impl Stream<Item = Result<ResponseStream<R>, SourceError>>
where
    S: Stream<Item = Result<ResponseStream<R>, SourceError>>,
{
    responses.filter(move |item| future::ready(filter.passes(item)))
}

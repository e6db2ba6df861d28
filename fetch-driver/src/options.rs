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

//! Per-request fetch options and their layering against driver defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type Headers = BTreeMap<String, String>;

const METHOD_FIELD: &str = "method";
const BODY_FIELD: &str = "body";
pub(crate) const HEADERS_FIELD: &str = "headers";

/// Options handed to the fetch capability alongside the target.
///
/// `headers` is the only field with merge semantics of its own; every other field is carried
/// through as opaque JSON. Serializes flat, e.g. `{"method": "POST", "headers": {"accept": "*/*"}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchOptions {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets an opaque option field. `headers` is reserved for [`with_header`](Self::with_header)
    /// and ignored here.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if name != HEADERS_FIELD {
            self.fields.insert(name, value.into());
        }
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The `method` field, when it is a string.
    pub fn method(&self) -> Option<&str> {
        self.field(METHOD_FIELD).and_then(Value::as_str)
    }

    pub fn body(&self) -> Option<&Value> {
        self.field(BODY_FIELD)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.fields.is_empty()
    }

    /// Builds the effective options for one request.
    ///
    /// Precedence, lowest first: driver `defaults`, then the request's own fields. Headers are
    /// merged separately: `default_headers` first, request headers overriding key by key.
    pub(crate) fn layered(
        defaults: &Map<String, Value>,
        default_headers: &Headers,
        request: Option<&FetchOptions>,
    ) -> FetchOptions {
        let mut effective = FetchOptions {
            headers: default_headers.clone(),
            fields: Map::new(),
        };
        effective.fields.extend(fields_without_headers(defaults));

        if let Some(request) = request {
            effective.fields.extend(fields_without_headers(&request.fields));
            effective.headers.extend(
                request
                    .headers
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }

        effective
    }
}

// `fields` is public, so a `headers` entry can still be inserted directly.
fn fields_without_headers(fields: &Map<String, Value>) -> impl Iterator<Item = (String, Value)> + '_ {
    fields
        .iter()
        .filter(|(name, _)| name.as_str() != HEADERS_FIELD)
        .map(|(name, value)| (name.clone(), value.clone()))
}

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

//! Constructor-time driver configuration.

use crate::options::{Headers, HEADERS_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse config file: {0}")]
    Parse(#[from] json5::Error),
}

/// Driver defaults applied to every request.
///
/// `headers` are merged under each request's own headers; every other key becomes a default
/// option field. The fetch capability itself is passed to [`FetchDriver::new`][crate::FetchDriver::new].
///
/// ```text
/// {
///     // sent with every request unless the request overrides it
///     headers: { accept: "application/json" },
///     method: "GET",
/// }
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct DriverConfig {
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    #[serde(flatten)]
    pub defaults: Map<String, Value>,
}

impl DriverConfig {
    pub fn from_json5(contents: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json5(&contents)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets a default option field. `headers` is reserved for [`with_header`](Self::with_header)
    /// and ignored here.
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if name != HEADERS_FIELD {
            self.defaults.insert(name, value.into());
        }
        self
    }
}

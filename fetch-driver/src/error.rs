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

//! Error types surfaced by the driver.

use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Shared, cloneable error source so one failure can be delivered to several subscribers.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Failure of a single fetch.
///
/// A `FetchError` only ever appears on the [`ResponseStream`][crate::ResponseStream] of the
/// request it belongs to; sibling streams and the driver output are unaffected.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request carried neither `input` nor `url`, so there was nothing to fetch.
    #[error("request has no resolvable url")]
    UnresolvedTarget,

    /// The fetch was aborted through [`ResponseStream::abort`][crate::ResponseStream::abort].
    #[error("fetch aborted before it settled")]
    Aborted,

    /// The fetch capability rejected the request.
    #[error("fetch of {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: SharedError,
    },
}

impl FetchError {
    pub fn transport(url: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        FetchError::Transport {
            url: url.into(),
            source: Arc::new(source),
        }
    }
}

/// The request source itself failed. Fatal to the driver output.
#[derive(Debug, Clone, Error)]
#[error("request source failed: {0}")]
pub struct SourceError(#[source] SharedError);

impl SourceError {
    pub fn new(source: impl Error + Send + Sync + 'static) -> Self {
        SourceError(Arc::new(source))
    }

    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

/// Item error of a flattened response view.
#[derive(Debug, Clone, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

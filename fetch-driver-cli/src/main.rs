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


use clap::Parser;
use fetch_driver::{DriverConfig, FetchDriver, RequestInput, RequestLike};
use futures::{stream, StreamExt};
use log::{debug, warn};
use std::convert::Infallible;
use std::error::Error;
use std::path::PathBuf;

const CLI_TAG: &str = "fetch-driver-cli:";

#[derive(Parser)]
#[command(about = "Fetches every request concurrently and prints the results in request order")]
struct CliArgs {
    /// json5 file with default headers and options
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only print responses whose request key matches
    #[arg(short, long)]
    key: Option<String>,

    /// Only print responses whose request resolves to this URL
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Print response bodies
    #[arg(short, long)]
    body: bool,

    /// Requests, either `URL` or `KEY=URL`
    #[arg(required = true, value_name = "REQUEST")]
    requests: Vec<String>,
}

// A key never contains URL punctuation, so `=` inside a path or query stays part of the URL.
fn parse_request(arg: &str) -> RequestInput {
    match arg.split_once('=') {
        Some((key, url)) if !key.is_empty() && !key.contains(['/', '?', ':']) => {
            RequestLike::url(url).with_key(key).into()
        }
        _ => arg.into(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => DriverConfig::load(path)?,
        None => DriverConfig::default(),
    };
    debug!("{CLI_TAG} config: {config:?}");

    let driver = FetchDriver::http("cli", config);
    let requests: Vec<_> = args
        .requests
        .iter()
        .map(|arg| Ok::<_, Infallible>(parse_request(arg)))
        .collect();

    let mut source = driver.drive(stream::iter(requests));
    if let Some(key) = &args.key {
        source = source.by_key(key.as_str());
    }
    if let Some(url) = &args.url {
        source = source.by_url(url.as_str());
    }

    let mut failures = 0usize;
    let mut subscription = source.subscribe();
    while let Some(response_stream) = subscription.next().await {
        let response_stream = response_stream?;
        let request = serde_json::to_string(response_stream.request())?;

        match response_stream.result().await {
            Ok(response) => {
                println!("{} {} {request}", response.status, response.url);
                if args.body {
                    println!("{}", response.text());
                }
                if !response.is_success() {
                    failures += 1;
                }
            }
            Err(err) => {
                warn!("{CLI_TAG} {request} failed: {err}");
                println!("ERR {err} {request}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} request(s) failed").into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_request;
    use fetch_driver::{normalize, RequestInput};

    #[test]
    fn plain_url_is_its_own_key() {
        let request = normalize(parse_request("http://api.test/a?b=c"));
        assert_eq!(request.key(), Some("http://api.test/a?b=c"));
    }

    #[test]
    fn key_prefix_is_split_off() {
        let request = normalize(parse_request("users=http://api.test/users"));
        assert_eq!(request.key(), Some("users"));
        assert_eq!(request.resolved_url(), Some("http://api.test/users"));
    }

    #[test]
    fn equals_sign_in_a_schemeless_query_stays_in_the_url() {
        for arg in ["localhost/x?a=b", "localhost:8080?a=b", "?a=b", "=http://api.test/a"] {
            assert_eq!(parse_request(arg), RequestInput::Url(arg.to_string()));
        }
    }

    #[test]
    fn bare_word_is_treated_as_url() {
        assert_eq!(
            parse_request("localhost"),
            RequestInput::Url("localhost".to_string())
        );
    }
}

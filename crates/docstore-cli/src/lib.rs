// Copyright 2025 Docstore Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Docstore CLI
//!
//! Command-line access to a docstore cluster through the request executor.
//!
//! The binary parses its arguments with `argh` and dispatches to the helpers
//! in this crate, which build a [`RequestExecutor`] from the seed urls and
//! run one command against the cluster.
//!
//! ## Key Commands
//!
//! - `docstore topology`: Print the database topology
//! - `docstore cluster-topology`: Print the cluster membership
//! - `docstore databases`: List database names (server-wide, no database needed)
//! - `docstore next-operation-id`: Allocate an operation id
//! - `docstore wait-operation`: Wait for a long-running operation
//!
//! Every command prints raw JSON on stdout; logs go to stderr.

use std::time::Duration;

use anyhow::{Context, Result};
use docstore_client::commands::{
    GetClusterTopologyCommand, GetDatabaseNamesCommand, GetDatabaseTopologyCommand,
    GetNextOperationIdCommand,
};
use docstore_client::{ExecutorConfig, ReadBalanceBehavior, RequestExecutor};
use docstore_common::OperationId;
use serde_json::Value;

/// Validates that a URL string starts with http:// or https://
pub fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

/// Builds the executor configuration from command-line values.
pub fn executor_config(read_balance: &str, timeout_ms: u64) -> Result<ExecutorConfig> {
    let read_balance: ReadBalanceBehavior = read_balance.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    if timeout_ms == 0 {
        anyhow::bail!("Invalid timeout: must be at least 1ms");
    }

    Ok(ExecutorConfig {
        read_balance,
        request_timeout: Duration::from_millis(timeout_ms),
        ..Default::default()
    })
}

fn validate_seed_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        anyhow::bail!("No server url given, use --url <url>");
    }
    for url in urls {
        validate_http_url(url, "server url")?;
    }
    Ok(())
}

/// Validates the seed urls and creates an executor for `database`.
pub fn connect(urls: Vec<String>, database: &str, config: ExecutorConfig) -> Result<RequestExecutor> {
    validate_seed_urls(&urls)?;
    tracing::debug!(urls = ?urls, database, read_balance = %config.read_balance, "Creating request executor");
    RequestExecutor::new(urls, database, config).context("Failed to create request executor")
}

/// Validates the seed urls and creates a cluster executor.
pub fn connect_cluster(urls: Vec<String>, config: ExecutorConfig) -> Result<RequestExecutor> {
    validate_seed_urls(&urls)?;
    tracing::debug!(urls = ?urls, read_balance = %config.read_balance, "Creating cluster request executor");
    RequestExecutor::for_cluster(urls, config).context("Failed to create cluster request executor")
}

pub async fn topology(executor: &RequestExecutor) -> Result<Value> {
    let topology = executor.execute(&GetDatabaseTopologyCommand::new()).await?;
    Ok(serde_json::to_value(topology)?)
}

pub async fn cluster_topology(executor: &RequestExecutor) -> Result<Value> {
    let response = executor.execute(&GetClusterTopologyCommand::new()).await?;
    Ok(serde_json::to_value(response)?)
}

pub async fn databases(executor: &RequestExecutor, start: usize, page_size: usize) -> Result<Value> {
    let names = executor
        .execute(&GetDatabaseNamesCommand::new(start, page_size))
        .await?;
    Ok(serde_json::json!({ "Databases": names }))
}

pub async fn next_operation_id(executor: &RequestExecutor) -> Result<Value> {
    let id = executor.execute(&GetNextOperationIdCommand::new()).await?;
    Ok(serde_json::json!({ "Id": id }))
}

/// Waits for operation `id`; a `wait_timeout_ms` of 0 waits forever.
pub async fn wait_operation(
    executor: &RequestExecutor,
    id: OperationId,
    wait_timeout_ms: u64,
    poll_interval_ms: u64,
) -> Result<Value> {
    let timeout = (wait_timeout_ms > 0).then(|| Duration::from_millis(wait_timeout_ms));
    let result = executor
        .operation(id)
        .with_poll_interval(Duration::from_millis(poll_interval_ms))
        .wait_for_completion(timeout)
        .await?;
    Ok(result)
}

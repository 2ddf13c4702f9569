// Copyright (c) 2025 Rajan Panneer Selvam
//
// Licensed under the Business Source License 1.1 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.mariadb.com/bsl11
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Drives the batch iterator, assigns per-batch query IDs, invokes the
//! CloudWatch client under a concurrency limit, maps results back onto
//! their requests, and compacts unresolved entries (spec §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::batch::{self, WindowKey};
use crate::clients::cloudwatch::{CloudWatchClient, CloudWatchError, MetricDataQueryInput};
use crate::model::CloudwatchData;

/// One input carried through batching with its position in the original
/// request list, so compaction can restore input order across groups.
struct Indexed {
    index: usize,
    data: CloudwatchData,
}

/// Runs `GetMetricData` to completion for one namespace's worth of
/// per-metric requests, bounding concurrent batches with a semaphore
/// sized to `concurrency`.
pub struct GetMetricDataProcessor<C> {
    client: Arc<C>,
    metrics_per_query: usize,
    concurrency: usize,
}

impl<C: CloudWatchClient + 'static> GetMetricDataProcessor<C> {
    pub fn new(client: Arc<C>, metrics_per_query: usize, concurrency: usize) -> Self {
        Self { client, metrics_per_query, concurrency: concurrency.max(1) }
    }

    /// `Run(namespace, requests) -> (requests-with-results, err)`. Errors
    /// only if a batch task itself panics or is cancelled; per-batch
    /// CloudWatch errors are logged and that batch's requests stay
    /// `Pending`, which compacts them away below.
    pub async fn run(&self, namespace: &str, requests: Vec<CloudwatchData>) -> Result<Vec<CloudwatchData>, CloudWatchError> {
        let groups = group_by_window(requests, self.metrics_per_query);

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for (window, members) in groups {
            let client = self.client.clone();
            let namespace = namespace.to_string();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed while tasks are outstanding");
                run_batch(client.as_ref(), &namespace, window, members).await
            });
        }

        let mut completed: Vec<Indexed> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(members) => completed.extend(members),
                Err(join_err) => {
                    return Err(CloudWatchError::Other(format!("batch task failed: {join_err}")));
                }
            }
        }

        completed.sort_by_key(|i| i.index);
        Ok(completed.into_iter().filter(|i| i.data.is_done()).map(|i| i.data).collect())
    }
}

fn group_by_window(requests: Vec<CloudwatchData>, metrics_per_query: usize) -> Vec<(WindowKey, Vec<Indexed>)> {
    let metrics_per_query = metrics_per_query.max(1);
    let mut groups: HashMap<WindowKey, Vec<Indexed>> = HashMap::new();
    let mut order: Vec<WindowKey> = Vec::new();

    for (index, data) in requests.into_iter().enumerate() {
        let Some(params) = data.processing_params() else {
            continue;
        };
        let key = WindowKey::from(params);
        if !groups.contains_key(&key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(Indexed { index, data });
    }

    let mut batches = Vec::new();
    for key in order {
        let mut members = groups.remove(&key).unwrap_or_default();
        while !members.is_empty() {
            let split_at = metrics_per_query.min(members.len());
            let rest = members.split_off(split_at);
            batches.push((key, members));
            members = rest;
        }
    }
    batches
}

async fn run_batch<C: CloudWatchClient>(
    client: &C,
    namespace: &str,
    window: WindowKey,
    mut members: Vec<Indexed>,
) -> Vec<Indexed> {
    let queries: Vec<MetricDataQueryInput> = members
        .iter_mut()
        .enumerate()
        .map(|(idx, member)| {
            let query_id = format!("id_{idx}");
            member.data.query_id = Some(query_id.clone());
            let statistic = member
                .data
                .processing_params()
                .map(|p| p.statistic.clone())
                .unwrap_or_default();
            MetricDataQueryInput {
                id: query_id,
                namespace: namespace.to_string(),
                metric_name: member.data.metric_name.clone(),
                dimensions: member.data.dimensions.clone(),
                period: window.period,
                statistic,
            }
        })
        .collect();

    let (start, end) = batch::compute_window(window, Utc::now());

    match client.get_metric_data(&queries, start, end).await {
        Ok(results) => {
            for result in results {
                let Some(idx) = result.id.strip_prefix("id_").and_then(|s| s.parse::<usize>().ok()) else {
                    warn!(id = %result.id, "unrecognised query id, ignoring");
                    continue;
                };
                match members.get_mut(idx) {
                    Some(member) if !member.data.is_done() => {
                        member.data.complete(result.datapoint, result.timestamp);
                    }
                    Some(_) => {
                        // duplicate ID in the response; first write wins.
                    }
                    None => warn!(id = %result.id, idx, "query id out of range for batch, ignoring"),
                }
            }
        }
        Err(err) => {
            error!(namespace, error = %err, "GetMetricData batch failed, dropping batch");
        }
    }

    members
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clients::cloudwatch::MetricDataResult;
    use crate::model::{Dimension, Metric, ProcessingParams};

    fn request(metric_name: &str, period: i64) -> CloudwatchData {
        CloudwatchData::new_pending(
            metric_name,
            "i-abc",
            "AWS/EC2",
            vec![Dimension::new("InstanceId", "i-abc")],
            vec![],
            ProcessingParams { period, length: period, delay: 0, statistic: "Average".to_string() },
            false,
            false,
        )
    }

    struct StubClient {
        results: Vec<MetricDataResult>,
        fail: bool,
    }

    #[async_trait]
    impl CloudWatchClient for StubClient {
        async fn list_metrics(&self, _: &str, _: &str, _: bool) -> Result<Vec<Metric>, CloudWatchError> {
            Ok(Vec::new())
        }

        async fn get_metric_data(
            &self,
            queries: &[MetricDataQueryInput],
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<MetricDataResult>, CloudWatchError> {
            if self.fail {
                return Err(CloudWatchError::Other("boom".to_string()));
            }
            let ids: std::collections::HashSet<_> = queries.iter().map(|q| q.id.clone()).collect();
            Ok(self.results.iter().filter(|r| ids.contains(&r.id)).cloned().collect())
        }
    }

    #[tokio::test]
    async fn maps_results_back_by_query_id_and_compacts() {
        let client = Arc::new(StubClient {
            results: vec![
                MetricDataResult { id: "id_0".to_string(), datapoint: Some(42.0), timestamp: Some(Utc::now()) },
            ],
            fail: false,
        });
        let processor = GetMetricDataProcessor::new(client, 10, 4);

        let requests = vec![request("CPUUtilization", 300), request("NetworkIn", 300)];
        let out = processor.run("AWS/EC2", requests).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].metric_name, "CPUUtilization");
        assert!(out[0].is_done());
    }

    #[tokio::test]
    async fn preserves_input_order_across_window_groups() {
        // "id_0" resolves in every batch (each batch numbers its own
        // members from 0), so the first member of each of the two window
        // groups below (A, period 60; B, period 300) resolves, while C
        // (the second member of the period-60 group, "id_1") does not.
        let client = Arc::new(StubClient {
            results: vec![
                MetricDataResult { id: "id_0".to_string(), datapoint: Some(1.0), timestamp: None },
            ],
            fail: false,
        });
        let processor = GetMetricDataProcessor::new(client, 10, 4);

        let requests = vec![request("A", 60), request("B", 300), request("C", 60)];
        let out = processor.run("AWS/EC2", requests).await.unwrap();

        // Despite A and B landing in different window groups run as
        // separate concurrent tasks, the compacted output restores their
        // original relative order.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].metric_name, "A");
        assert_eq!(out[1].metric_name, "B");
    }

    #[tokio::test]
    async fn batch_error_drops_batch_without_failing_run() {
        let client = Arc::new(StubClient { results: Vec::new(), fail: true });
        let processor = GetMetricDataProcessor::new(client, 10, 4);

        let requests = vec![request("CPUUtilization", 300)];
        let out = processor.run("AWS/EC2", requests).await.unwrap();
        assert!(out.is_empty());
    }
}

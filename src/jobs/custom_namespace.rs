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

//! Custom-namespace job runner (spec §4.6): like the discovery runner but
//! without tagging and without an associator — every surviving ListMetrics
//! result becomes a request against the job name.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::error;

use crate::clients::cloudwatch::CloudWatchClient;
use crate::config::CustomNamespaceJob;
use crate::model::{CloudwatchData, ProcessingParams};
use crate::processor::GetMetricDataProcessor;

pub async fn run_custom_namespace_job<C>(
    job: &CustomNamespaceJob,
    region: &str,
    cloudwatch: Arc<C>,
    processor: &GetMetricDataProcessor<C>,
) -> Vec<CloudwatchData>
where
    C: CloudWatchClient + 'static,
{
    let mut list_metrics_tasks = JoinSet::new();
    for metric_cfg in job.metrics.clone() {
        let cloudwatch = cloudwatch.clone();
        let namespace = job.namespace.clone();
        list_metrics_tasks.spawn(async move {
            let metrics = cloudwatch.list_metrics(&namespace, &metric_cfg.name, false).await;
            (metric_cfg, metrics)
        });
    }

    let required_dimension_names: Option<HashSet<&str>> =
        job.dimension_name_requirements.as_ref().map(|names| names.iter().map(String::as_str).collect());

    let mut requests = Vec::new();
    while let Some(joined) = list_metrics_tasks.join_next().await {
        let (metric_cfg, metrics) = match joined {
            Ok(pair) => pair,
            Err(join_err) => {
                error!(job = %job.name, region, error = %join_err, "ListMetrics task panicked");
                continue;
            }
        };
        let metrics = match metrics {
            Ok(metrics) => metrics,
            Err(err) => {
                error!(job = %job.name, region, metric = %metric_cfg.name, error = %err, "ListMetrics failed");
                continue;
            }
        };

        for metric in metrics {
            if let Some(required) = &required_dimension_names {
                if &metric.dimension_names() != required {
                    continue;
                }
            }

            for statistic in &metric_cfg.statistics {
                requests.push(CloudwatchData::new_pending(
                    metric.metric_name.clone(),
                    job.name.clone(),
                    job.namespace.clone(),
                    metric.dimensions.clone(),
                    Vec::new(),
                    ProcessingParams {
                        period: metric_cfg.period,
                        length: metric_cfg.length,
                        delay: metric_cfg.delay,
                        statistic: statistic.clone(),
                    },
                    metric_cfg.nil_to_zero,
                    metric_cfg.add_cloudwatch_timestamp,
                ));
            }
        }
    }

    if requests.is_empty() {
        return Vec::new();
    }

    match processor.run(&job.namespace, requests).await {
        Ok(completed) => completed,
        Err(err) => {
            error!(job = %job.name, namespace = %job.namespace, error = %err, "GetMetricData processor failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clients::cloudwatch::{CloudWatchError, MetricDataQueryInput, MetricDataResult};
    use crate::config::MetricConfig;
    use crate::model::{Dimension, Metric};

    struct StubCloudWatch {
        metrics: Vec<Metric>,
    }

    #[async_trait]
    impl CloudWatchClient for StubCloudWatch {
        async fn list_metrics(&self, _: &str, _: &str, _: bool) -> Result<Vec<Metric>, CloudWatchError> {
            Ok(self.metrics.clone())
        }

        async fn get_metric_data(
            &self,
            queries: &[MetricDataQueryInput],
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<MetricDataResult>, CloudWatchError> {
            Ok(queries
                .iter()
                .map(|q| MetricDataResult { id: q.id.clone(), datapoint: Some(3.0), timestamp: Some(Utc::now()) })
                .collect())
        }
    }

    fn job() -> CustomNamespaceJob {
        CustomNamespaceJob {
            name: "my-custom-job".to_string(),
            namespace: "Custom/Queue".to_string(),
            regions: vec!["us-east-1".to_string()],
            roles: vec![Default::default()],
            metrics: vec![MetricConfig {
                name: "BacklogSize".to_string(),
                statistics: vec!["Average".to_string()],
                period: 300,
                length: 300,
                delay: 0,
                nil_to_zero: false,
                add_cloudwatch_timestamp: false,
                export_all_data_points: false,
            }],
            dimension_name_requirements: None,
        }
    }

    #[tokio::test]
    async fn every_surviving_metric_becomes_a_request_against_the_job_name() {
        let cloudwatch = Arc::new(StubCloudWatch {
            metrics: vec![Metric {
                namespace: "Custom/Queue".to_string(),
                metric_name: "BacklogSize".to_string(),
                dimensions: vec![Dimension::new("QueueName", "orders")],
            }],
        });
        let processor = GetMetricDataProcessor::new(cloudwatch.clone(), 500, 4);

        let requests = run_custom_namespace_job(&job(), "us-east-1", cloudwatch, &processor).await;

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].resource_name, "my-custom-job");
        assert!(requests[0].tags.is_empty());
    }

    #[tokio::test]
    async fn dimension_name_requirement_filters_non_matching_metrics() {
        let mut j = job();
        j.dimension_name_requirements = Some(vec!["QueueName".to_string(), "Shard".to_string()]);
        let cloudwatch = Arc::new(StubCloudWatch {
            metrics: vec![Metric {
                namespace: "Custom/Queue".to_string(),
                metric_name: "BacklogSize".to_string(),
                dimensions: vec![Dimension::new("QueueName", "orders")],
            }],
        });
        let processor = GetMetricDataProcessor::new(cloudwatch.clone(), 500, 4);

        let requests = run_custom_namespace_job(&j, "us-east-1", cloudwatch, &processor).await;
        assert!(requests.is_empty());
    }
}

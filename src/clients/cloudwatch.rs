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

use async_trait::async_trait;
use aws_sdk_cloudwatch::types::{Dimension as SdkDimension, MetricDataQuery, MetricStat, ScanBy};
use aws_sdk_cloudwatch::Client as CloudWatchSdkClient;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::model::{Dimension, Metric};
use crate::utils::time_conversion::{from_aws_datetime, to_aws_datetime};

#[derive(Debug, Error)]
pub enum CloudWatchError {
    #[error("cloudwatch client error: {0}")]
    Other(String),
}

/// One request in a GetMetricData batch: the query ID the processor
/// assigned, the metric/statistic/period to query.
#[derive(Debug, Clone)]
pub struct MetricDataQueryInput {
    pub id: String,
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub period: i64,
    pub statistic: String,
}

/// A single `(ID, Datapoint, Timestamp)` tuple from GetMetricData, per
/// spec §6. `datapoint`/`timestamp` are absent when CloudWatch has no
/// data for that window.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDataResult {
    pub id: String,
    pub datapoint: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait CloudWatchClient: Send + Sync {
    async fn list_metrics(
        &self,
        namespace: &str,
        metric_name: &str,
        recently_active_only: bool,
    ) -> Result<Vec<Metric>, CloudWatchError>;

    async fn get_metric_data(
        &self,
        queries: &[MetricDataQueryInput],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricDataResult>, CloudWatchError>;
}

pub struct AwsCloudWatchClient {
    client: CloudWatchSdkClient,
}

impl AwsCloudWatchClient {
    pub fn new(client: CloudWatchSdkClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CloudWatchClient for AwsCloudWatchClient {
    async fn list_metrics(
        &self,
        namespace: &str,
        metric_name: &str,
        recently_active_only: bool,
    ) -> Result<Vec<Metric>, CloudWatchError> {
        let mut metrics = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_metrics()
                .namespace(namespace)
                .metric_name(metric_name);
            if recently_active_only {
                request = request.recently_active(aws_sdk_cloudwatch::types::RecentlyActive::Pt3H);
            }
            if let Some(token) = next_token.as_ref() {
                request = request.next_token(token);
            }

            let response = request.send().await.map_err(|e| CloudWatchError::Other(e.to_string()))?;

            for metric in response.metrics() {
                let dimensions = metric
                    .dimensions()
                    .iter()
                    .filter_map(|d| Some(Dimension::new(d.name()?.to_string(), d.value()?.to_string())))
                    .collect();
                metrics.push(Metric {
                    namespace: metric.namespace().unwrap_or(namespace).to_string(),
                    metric_name: metric.metric_name().unwrap_or(metric_name).to_string(),
                    dimensions,
                });
            }

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        debug!(namespace, metric_name, count = metrics.len(), "ListMetrics page complete");
        Ok(metrics)
    }

    async fn get_metric_data(
        &self,
        queries: &[MetricDataQueryInput],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricDataResult>, CloudWatchError> {
        let metric_data_queries: Vec<MetricDataQuery> = queries
            .iter()
            .map(|q| {
                let dims: Vec<SdkDimension> = q
                    .dimensions
                    .iter()
                    .map(|d| SdkDimension::builder().name(&d.name).value(&d.value).build())
                    .collect();
                MetricDataQuery::builder()
                    .id(&q.id)
                    .metric_stat(
                        MetricStat::builder()
                            .metric(
                                aws_sdk_cloudwatch::types::Metric::builder()
                                    .namespace(&q.namespace)
                                    .metric_name(&q.metric_name)
                                    .set_dimensions(Some(dims))
                                    .build(),
                            )
                            .period(q.period as i32)
                            .stat(&q.statistic)
                            .build(),
                    )
                    .return_data(true)
                    .build()
            })
            .collect();

        let response = self
            .client
            .get_metric_data()
            .set_metric_data_queries(Some(metric_data_queries))
            .start_time(to_aws_datetime(&start))
            .end_time(to_aws_datetime(&end))
            .scan_by(ScanBy::TimestampAscending)
            .send()
            .await
            .map_err(|e| CloudWatchError::Other(e.to_string()))?;

        let mut results = Vec::new();
        for result in response.metric_data_results() {
            let Some(id) = result.id() else { continue };
            let value = result.values().first().copied();
            let timestamp = result.timestamps().first().map(from_aws_datetime);
            results.push(MetricDataResult { id: id.to_string(), datapoint: value, timestamp });
        }
        Ok(results)
    }
}

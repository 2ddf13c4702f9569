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

//! Static job runner (spec §4.5): no ListMetrics, no association — one
//! `CloudwatchData` per statistic against the job's fixed dimension tuple.

use tracing::error;

use crate::clients::cloudwatch::CloudWatchClient;
use crate::config::StaticJob;
use crate::model::{CloudwatchData, Dimension, ProcessingParams};
use crate::processor::GetMetricDataProcessor;

pub async fn run_static_job<C>(job: &StaticJob, processor: &GetMetricDataProcessor<C>) -> Vec<CloudwatchData>
where
    C: CloudWatchClient + 'static,
{
    let dimensions: Vec<Dimension> =
        job.dimensions.iter().map(|d| Dimension::new(d.name.clone(), d.value.clone())).collect();

    let mut requests = Vec::new();
    for metric_cfg in &job.metrics {
        for statistic in &metric_cfg.statistics {
            requests.push(CloudwatchData::new_pending(
                metric_cfg.name.clone(),
                job.name.clone(),
                job.namespace.clone(),
                dimensions.clone(),
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

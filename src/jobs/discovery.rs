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

//! `runDiscoveryJob`: per (job, region), discover tagged resources, list
//! metrics per `MetricConfig` concurrently, associate each metric to a
//! resource, and feed the surviving requests through the GetMetricData
//! processor (spec §4.2).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::error;

use crate::associator::{Association, Associator};
use crate::catalog::ServiceCatalog;
use crate::clients::cloudwatch::CloudWatchClient;
use crate::clients::tagging::{ResourceDiscoveryRequest, TaggingClient, TaggingError};
use crate::config::DiscoveryJob;
use crate::model::{CloudwatchData, ProcessingParams, TaggedResource};
use crate::processor::GetMetricDataProcessor;

/// Resource tags to copy onto every request bound to that resource, taken
/// from `discovery.exportedTagsOnMetrics[job.namespace]`. A namespace with
/// no entry in that map exports no tags.
fn filter_tags(resource: &TaggedResource, keys: &[String]) -> Vec<(String, String)> {
    keys.iter()
        .filter_map(|key| resource.tag_value(key).map(|value| (key.clone(), value.to_string())))
        .collect()
}

pub async fn run_discovery_job<T, C>(
    job: &DiscoveryJob,
    region: &str,
    exported_tag_keys: &[String],
    tagging: Arc<T>,
    cloudwatch: Arc<C>,
    processor: &GetMetricDataProcessor<C>,
    catalog: &ServiceCatalog,
) -> (Vec<TaggedResource>, Vec<CloudwatchData>)
where
    T: TaggingClient + 'static,
    C: CloudWatchClient + 'static,
{
    let discovery_request = ResourceDiscoveryRequest { namespace: job.namespace.clone(), region: region.to_string() };
    let resources = match tagging.get_resources(&discovery_request).await {
        Ok(resources) => resources,
        Err(TaggingError::ExpectedToFindResources) => {
            error!(namespace = %job.namespace, region, "expected to find resources but tagging API returned none");
            return (Vec::new(), Vec::new());
        }
        Err(other) => {
            error!(namespace = %job.namespace, region, error = %other, "tagging API call failed");
            return (Vec::new(), Vec::new());
        }
    };

    let associator = match catalog.get_service(&job.namespace) {
        Some(entry) if !entry.dimension_regexps.is_empty() && !resources.is_empty() => {
            Associator::build(&entry.dimension_regexps, &resources)
        }
        _ => Associator::noop(),
    };

    let mut list_metrics_tasks = JoinSet::new();
    for metric_cfg in job.metrics.clone() {
        let cloudwatch = cloudwatch.clone();
        let namespace = job.namespace.clone();
        let recently_active_only = job.recently_active_only;
        list_metrics_tasks.spawn(async move {
            let metrics = cloudwatch.list_metrics(&namespace, &metric_cfg.name, recently_active_only).await;
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
                error!(namespace = %job.namespace, region, error = %join_err, "ListMetrics task panicked");
                continue;
            }
        };
        let metrics = match metrics {
            Ok(metrics) => metrics,
            Err(err) => {
                error!(namespace = %job.namespace, region, metric = %metric_cfg.name, error = %err, "ListMetrics failed");
                continue;
            }
        };

        for metric in metrics {
            if let Some(required) = &required_dimension_names {
                if &metric.dimension_names() != required {
                    continue;
                }
            }

            let (resource_name, tags) = match associator.associate(&metric) {
                Association::Bound(resource) => (resource.arn.clone(), filter_tags(resource, exported_tag_keys)),
                Association::Skip => continue,
                Association::Keep => (TaggedResource::global(job.namespace.clone()).arn, Vec::new()),
            };

            for statistic in &metric_cfg.statistics {
                requests.push(CloudwatchData::new_pending(
                    metric.metric_name.clone(),
                    resource_name.clone(),
                    job.namespace.clone(),
                    metric.dimensions.clone(),
                    tags.clone(),
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
        return (resources, Vec::new());
    }

    match processor.run(&job.namespace, requests).await {
        Ok(completed) => (resources, completed),
        Err(err) => {
            error!(namespace = %job.namespace, region, error = %err, "GetMetricData processor failed");
            (resources, Vec::new())
        }
    }
}

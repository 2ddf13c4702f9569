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

//! ElastiCache enhanced metric: `NodeCount`, valued at the cluster's node
//! group member count, dimensioned by `CacheClusterId`/`CacheNodeType`/
//! `Engine`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use super::{group_by_region, EnhancedError, RegionCache, Service};
use crate::clients::enhanced::{ElastiCacheClient, ElastiCacheCluster};
use crate::model::{CloudwatchData, Dimension, MetricResult, RequestState, TaggedResource};

const NAMESPACE: &str = "AWS/ElastiCache";
const SUPPORTED_METRICS: &[&str] = &["NodeCount"];

pub struct ElastiCacheService<C> {
    client: Arc<C>,
    cache: Arc<RegionCache<ElastiCacheCluster>>,
}

impl<C: ElastiCacheClient> ElastiCacheService<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client, cache: Arc::new(RegionCache::new()) }
    }
}

#[async_trait]
impl<C: ElastiCacheClient + Send + Sync + 'static> Service for ElastiCacheService<C> {
    fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    fn supported_metrics(&self) -> &'static [&'static str] {
        SUPPORTED_METRICS
    }

    async fn describe(
        &self,
        resources: &[TaggedResource],
        requested_metrics: &[String],
        exported_tags: &[String],
    ) -> Result<Vec<CloudwatchData>, EnhancedError> {
        let mut tasks = JoinSet::new();
        for (region, members) in group_by_region(resources) {
            let client = self.client.clone();
            let cache = self.cache.clone();
            let members: Vec<TaggedResource> = members.into_iter().cloned().collect();
            let requested_metrics = requested_metrics.to_vec();
            let exported_tags = exported_tags.to_vec();
            tasks.spawn(async move {
                describe_region(client, cache, region, members, requested_metrics, exported_tags).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(region_result) => results.extend(region_result?),
                Err(join_err) => return Err(EnhancedError::Client(format!("region task failed: {join_err}"))),
            }
        }
        Ok(results)
    }
}

async fn describe_region<C: ElastiCacheClient>(
    client: Arc<C>,
    cache: Arc<RegionCache<ElastiCacheCluster>>,
    region: String,
    members: Vec<TaggedResource>,
    requested_metrics: Vec<String>,
    exported_tags: Vec<String>,
) -> Result<Vec<CloudwatchData>, EnhancedError> {
    let region_for_load = region.clone();
    let by_arn = cache
        .get_or_load(&region, || async move {
            let clusters = client.describe_clusters(&region_for_load).await?;
            Ok(clusters.into_iter().map(|c| (c.arn.clone(), c)).collect())
        })
        .await?;

    let mut results = Vec::new();
    for resource in &members {
        let Some(cluster) = by_arn.get(&resource.arn) else { continue };
        let tags: Vec<(String, String)> = exported_tags
            .iter()
            .filter_map(|k| resource.tag_value(k).map(|v| (k.clone(), v.to_string())))
            .collect();

        for metric_name in &requested_metrics {
            results.push(CloudwatchData {
                metric_name: metric_name.clone(),
                resource_name: resource.arn.clone(),
                namespace: NAMESPACE.to_string(),
                dimensions: vec![
                    Dimension::new("CacheClusterId", cluster.cache_cluster_id.clone()),
                    Dimension::new("CacheNodeType", cluster.cache_node_type.clone()),
                    Dimension::new("Engine", cluster.engine.clone()),
                ],
                tags: tags.clone(),
                nil_to_zero: false,
                add_cloudwatch_timestamp: false,
                query_id: None,
                state: RequestState::Done(MetricResult {
                    statistic: "Average".to_string(),
                    datapoint: Some(cluster.node_count),
                    timestamp: None,
                }),
            });
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::clients::enhanced::EnhancedClientError;

    struct StubElastiCache {
        clusters: Vec<ElastiCacheCluster>,
    }

    #[async_trait]
    impl ElastiCacheClient for StubElastiCache {
        async fn describe_clusters(&self, _region: &str) -> Result<Vec<ElastiCacheCluster>, EnhancedClientError> {
            Ok(self.clusters.clone())
        }
    }

    #[tokio::test]
    async fn builds_node_count_datapoint() {
        let resource = TaggedResource::new(
            "arn:aws:elasticache:us-east-1:123456789012:cluster:mycluster",
            "AWS/ElastiCache",
            "us-east-1",
        );
        let client = Arc::new(StubElastiCache {
            clusters: vec![ElastiCacheCluster {
                arn: resource.arn.clone(),
                cache_cluster_id: "mycluster".to_string(),
                cache_node_type: "cache.r5.large".to_string(),
                engine: "redis".to_string(),
                node_count: 3.0,
            }],
        });
        let service = ElastiCacheService::new(client);

        let out = service.describe(&[resource], &["NodeCount".to_string()], &[]).await.unwrap();

        assert_eq!(out.len(), 1);
        match &out[0].state {
            RequestState::Done(result) => assert_eq!(result.datapoint, Some(3.0)),
            RequestState::Pending(_) => panic!("expected a populated result"),
        }
    }
}

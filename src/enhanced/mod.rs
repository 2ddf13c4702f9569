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

//! Parallel pipeline for metrics sourced from service `Describe*` APIs
//! rather than CloudWatch (spec §4.7): RDS storage, ElastiCache node
//! counts, Lambda memory allocation, DynamoDB provisioned throughput.

pub mod dynamodb;
pub mod elasticache;
pub mod lambda;
pub mod rds;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::{CloudwatchData, TaggedResource};

pub use dynamodb::DynamoDbService;
pub use elasticache::ElastiCacheService;
pub use lambda::LambdaService;
pub use rds::RdsService;

#[derive(Debug, Error)]
pub enum EnhancedError {
    #[error("enhanced-metrics client error: {0}")]
    Client(String),
}

impl From<crate::clients::enhanced::EnhancedClientError> for EnhancedError {
    fn from(e: crate::clients::enhanced::EnhancedClientError) -> Self {
        EnhancedError::Client(e.to_string())
    }
}

/// One `Describe*`-backed metric source, dispatched to by namespace.
#[async_trait]
pub trait Service: Send + Sync {
    fn namespace(&self) -> &'static str;
    fn supported_metrics(&self) -> &'static [&'static str];

    /// `resources` is already filtered to this service's namespace;
    /// `requested_metrics` is already intersected with
    /// `supported_metrics()`. Implementations group by region internally.
    async fn describe(
        &self,
        resources: &[TaggedResource],
        requested_metrics: &[String],
        exported_tags: &[String],
    ) -> Result<Vec<CloudwatchData>, EnhancedError>;
}

/// Dispatches to a registered `Service` keyed by namespace (spec §4.7).
pub struct Processor {
    services: HashMap<&'static str, Arc<dyn Service>>,
}

impl Processor {
    pub fn new() -> Self {
        Self { services: HashMap::new() }
    }

    pub fn register(&mut self, service: Arc<dyn Service>) {
        self.services.insert(service.namespace(), service);
    }

    /// Returns empty if no `Service` is registered for `namespace`.
    pub async fn process(
        &self,
        namespace: &str,
        resources: &[TaggedResource],
        requested_metrics: &[String],
        exported_tags: &[String],
    ) -> Result<Vec<CloudwatchData>, EnhancedError> {
        let Some(service) = self.services.get(namespace) else {
            return Ok(Vec::new());
        };

        let scoped: Vec<TaggedResource> = resources.iter().filter(|r| r.namespace == namespace).cloned().collect();
        let metrics: Vec<String> = requested_metrics
            .iter()
            .filter(|m| service.supported_metrics().contains(&m.as_str()))
            .cloned()
            .collect();

        if scoped.is_empty() || metrics.is_empty() {
            return Ok(Vec::new());
        }

        service.describe(&scoped, &metrics, exported_tags).await
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-region describe-result cache with read-check-then-upgrade locking
/// (spec §5 "Enhanced-metrics per-region cache").
pub struct RegionCache<T> {
    inner: RwLock<HashMap<String, Arc<HashMap<String, T>>>>,
}

impl<T> RegionCache<T> {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    /// Returns the cached ARN-keyed map for `region`, loading it via
    /// `loader` on a cache miss. Re-checks under the write lock in case
    /// another task populated the entry while this one waited.
    pub async fn get_or_load<F, Fut>(&self, region: &str, loader: F) -> Result<Arc<HashMap<String, T>>, EnhancedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashMap<String, T>, EnhancedError>>,
    {
        if let Some(hit) = self.inner.read().await.get(region) {
            return Ok(hit.clone());
        }

        let mut write = self.inner.write().await;
        if let Some(hit) = write.get(region) {
            return Ok(hit.clone());
        }

        let loaded = Arc::new(loader().await?);
        write.insert(region.to_string(), loaded.clone());
        Ok(loaded)
    }
}

impl<T> Default for RegionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Groups resources by region, preserving first-seen region order.
pub(crate) fn group_by_region<'a>(resources: &'a [TaggedResource]) -> Vec<(String, Vec<&'a TaggedResource>)> {
    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<&TaggedResource>> = HashMap::new();
    for resource in resources {
        if !groups.contains_key(&resource.region) {
            order.push(resource.region.clone());
        }
        groups.entry(resource.region.clone()).or_default().push(resource);
    }
    order.into_iter().map(|region| { let members = groups.remove(&region).unwrap_or_default(); (region, members) }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn region_cache_loads_once_per_region() {
        let cache: RegionCache<f64> = RegionCache::new();
        let mut loads = 0;
        let first = cache
            .get_or_load("us-east-1", || async {
                loads += 1;
                Ok(HashMap::from([("arn:1".to_string(), 1.0)]))
            })
            .await
            .unwrap();
        assert_eq!(first.get("arn:1"), Some(&1.0));

        let second = cache.get_or_load("us-east-1", || async { unreachable!("should hit cache") }).await.unwrap();
        assert_eq!(second.get("arn:1"), Some(&1.0));
        assert_eq!(loads, 1);
    }

    #[test]
    fn groups_preserve_first_seen_region_order() {
        let resources = vec![
            TaggedResource::new("arn:1", "AWS/RDS", "us-west-2"),
            TaggedResource::new("arn:2", "AWS/RDS", "us-east-1"),
            TaggedResource::new("arn:3", "AWS/RDS", "us-west-2"),
        ];
        let groups = group_by_region(&resources);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "us-west-2");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "us-east-1");
    }
}

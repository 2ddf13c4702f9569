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

//! Lambda enhanced metric: `AllocatedMemory`, valued at `MemorySize`,
//! dimensioned by `FunctionName`/`Runtime`. `ListFunctions` doubles as the
//! describe-all call since Lambda has no singular per-ARN describe.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use super::{group_by_region, EnhancedError, RegionCache, Service};
use crate::clients::enhanced::{LambdaClient, LambdaFunction};
use crate::model::{CloudwatchData, Dimension, MetricResult, RequestState, TaggedResource};

const NAMESPACE: &str = "AWS/Lambda";
const SUPPORTED_METRICS: &[&str] = &["AllocatedMemory"];

pub struct LambdaService<C> {
    client: Arc<C>,
    cache: Arc<RegionCache<LambdaFunction>>,
}

impl<C: LambdaClient> LambdaService<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client, cache: Arc::new(RegionCache::new()) }
    }
}

#[async_trait]
impl<C: LambdaClient + Send + Sync + 'static> Service for LambdaService<C> {
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

async fn describe_region<C: LambdaClient>(
    client: Arc<C>,
    cache: Arc<RegionCache<LambdaFunction>>,
    region: String,
    members: Vec<TaggedResource>,
    requested_metrics: Vec<String>,
    exported_tags: Vec<String>,
) -> Result<Vec<CloudwatchData>, EnhancedError> {
    let region_for_load = region.clone();
    let by_arn = cache
        .get_or_load(&region, || async move {
            let functions = client.list_functions(&region_for_load).await?;
            Ok(functions.into_iter().map(|f| (f.arn.clone(), f)).collect())
        })
        .await?;

    let mut results = Vec::new();
    for resource in &members {
        let Some(function) = by_arn.get(&resource.arn) else { continue };
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
                    Dimension::new("FunctionName", function.function_name.clone()),
                    Dimension::new("Runtime", function.runtime.clone()),
                ],
                tags: tags.clone(),
                nil_to_zero: false,
                add_cloudwatch_timestamp: false,
                query_id: None,
                state: RequestState::Done(MetricResult {
                    statistic: "Average".to_string(),
                    datapoint: Some(function.memory_size_mb),
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

    struct StubLambda {
        functions: Vec<LambdaFunction>,
    }

    #[async_trait]
    impl LambdaClient for StubLambda {
        async fn list_functions(&self, _region: &str) -> Result<Vec<LambdaFunction>, EnhancedClientError> {
            Ok(self.functions.clone())
        }
    }

    #[tokio::test]
    async fn builds_allocated_memory_datapoint() {
        let resource = TaggedResource::new(
            "arn:aws:lambda:us-east-1:123456789012:function:my-fn",
            "AWS/Lambda",
            "us-east-1",
        );
        let client = Arc::new(StubLambda {
            functions: vec![LambdaFunction {
                arn: resource.arn.clone(),
                function_name: "my-fn".to_string(),
                runtime: "nodejs20.x".to_string(),
                memory_size_mb: 512.0,
            }],
        });
        let service = LambdaService::new(client);

        let out = service.describe(&[resource], &["AllocatedMemory".to_string()], &[]).await.unwrap();

        assert_eq!(out.len(), 1);
        match &out[0].state {
            RequestState::Done(result) => assert_eq!(result.datapoint, Some(512.0)),
            RequestState::Pending(_) => panic!("expected a populated result"),
        }
    }
}

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

//! DynamoDB enhanced metrics: `ProvisionedReadCapacity` /
//! `ProvisionedWriteCapacity`, valued at the table's provisioned
//! throughput, dimensioned by `TableName`/`BillingMode`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use super::{group_by_region, EnhancedError, RegionCache, Service};
use crate::clients::enhanced::{DynamoDbClient, DynamoDbTable};
use crate::model::{CloudwatchData, Dimension, MetricResult, RequestState, TaggedResource};

const NAMESPACE: &str = "AWS/DynamoDB";
const SUPPORTED_METRICS: &[&str] = &["ProvisionedReadCapacity", "ProvisionedWriteCapacity"];

pub struct DynamoDbService<C> {
    client: Arc<C>,
    cache: Arc<RegionCache<DynamoDbTable>>,
}

impl<C: DynamoDbClient> DynamoDbService<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client, cache: Arc::new(RegionCache::new()) }
    }
}

#[async_trait]
impl<C: DynamoDbClient + Send + Sync + 'static> Service for DynamoDbService<C> {
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

async fn describe_region<C: DynamoDbClient>(
    client: Arc<C>,
    cache: Arc<RegionCache<DynamoDbTable>>,
    region: String,
    members: Vec<TaggedResource>,
    requested_metrics: Vec<String>,
    exported_tags: Vec<String>,
) -> Result<Vec<CloudwatchData>, EnhancedError> {
    let region_for_load = region.clone();
    let by_arn = cache
        .get_or_load(&region, || async move {
            let mut by_arn = std::collections::HashMap::new();
            for name in client.list_table_names(&region_for_load).await? {
                let table = client.describe_table(&region_for_load, &name).await?;
                by_arn.insert(table.arn.clone(), table);
            }
            Ok(by_arn)
        })
        .await?;

    let mut results = Vec::new();
    for resource in &members {
        let Some(table) = by_arn.get(&resource.arn) else { continue };
        let tags: Vec<(String, String)> = exported_tags
            .iter()
            .filter_map(|k| resource.tag_value(k).map(|v| (k.clone(), v.to_string())))
            .collect();
        let dimensions = vec![
            Dimension::new("TableName", table.table_name.clone()),
            Dimension::new("BillingMode", table.billing_mode.clone()),
        ];

        for metric_name in &requested_metrics {
            let datapoint = match metric_name.as_str() {
                "ProvisionedReadCapacity" => table.read_capacity,
                "ProvisionedWriteCapacity" => table.write_capacity,
                _ => continue,
            };
            results.push(CloudwatchData {
                metric_name: metric_name.clone(),
                resource_name: resource.arn.clone(),
                namespace: NAMESPACE.to_string(),
                dimensions: dimensions.clone(),
                tags: tags.clone(),
                nil_to_zero: false,
                add_cloudwatch_timestamp: false,
                query_id: None,
                state: RequestState::Done(MetricResult {
                    statistic: "Average".to_string(),
                    datapoint: Some(datapoint),
                    timestamp: None,
                }),
            });
        }
    }
    Ok(results)
}

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

//! Per-service `Describe*` client contracts the enhanced-metrics subsystem
//! (spec §4.7) loads its per-region caches from. Each `AwsXxxClient` wraps
//! the client factory rather than one SDK client, since a region is only
//! known at call time (one cache entry, and so one describe call, per
//! region the enhanced-metrics `RegionCache` groups resources into).

use async_trait::async_trait;
use thiserror::Error;

use crate::clients::factory::ClientFactory;
use crate::config::Role;

#[derive(Debug, Error)]
pub enum EnhancedClientError {
    #[error("describe call failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RdsInstance {
    pub arn: String,
    pub db_instance_identifier: String,
    pub database_class: String,
    pub engine_name: String,
    pub allocated_storage_gb: f64,
}

#[async_trait]
pub trait RdsClient: Send + Sync {
    async fn describe_instances(&self, region: &str) -> Result<Vec<RdsInstance>, EnhancedClientError>;
}

pub struct AwsRdsClient {
    factory: std::sync::Arc<ClientFactory>,
    role: Role,
}

impl AwsRdsClient {
    pub fn new(factory: std::sync::Arc<ClientFactory>, role: Role) -> Self {
        Self { factory, role }
    }
}

#[async_trait]
impl RdsClient for AwsRdsClient {
    async fn describe_instances(&self, region: &str) -> Result<Vec<RdsInstance>, EnhancedClientError> {
        let client = self.factory.rds_client(region, &self.role).await;
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut request = client.describe_db_instances();
            if let Some(m) = marker.as_ref() {
                request = request.marker(m);
            }
            let response = request.send().await.map_err(|e| EnhancedClientError::Other(e.to_string()))?;
            for db in response.db_instances() {
                let (Some(id), Some(arn)) = (db.db_instance_identifier(), db.db_instance_arn()) else { continue };
                instances.push(RdsInstance {
                    arn: arn.to_string(),
                    db_instance_identifier: id.to_string(),
                    database_class: db.db_instance_class().unwrap_or_default().to_string(),
                    engine_name: db.engine().unwrap_or_default().to_string(),
                    allocated_storage_gb: db.allocated_storage().unwrap_or_default() as f64,
                });
            }
            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(instances)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElastiCacheCluster {
    pub arn: String,
    pub cache_cluster_id: String,
    pub cache_node_type: String,
    pub engine: String,
    pub node_count: f64,
}

#[async_trait]
pub trait ElastiCacheClient: Send + Sync {
    async fn describe_clusters(&self, region: &str) -> Result<Vec<ElastiCacheCluster>, EnhancedClientError>;
}

pub struct AwsElastiCacheClient {
    factory: std::sync::Arc<ClientFactory>,
    role: Role,
}

impl AwsElastiCacheClient {
    pub fn new(factory: std::sync::Arc<ClientFactory>, role: Role) -> Self {
        Self { factory, role }
    }
}

#[async_trait]
impl ElastiCacheClient for AwsElastiCacheClient {
    async fn describe_clusters(&self, region: &str) -> Result<Vec<ElastiCacheCluster>, EnhancedClientError> {
        let client = self.factory.elasticache_client(region, &self.role).await;
        let mut clusters = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut request = client.describe_cache_clusters().show_cache_node_info(true);
            if let Some(m) = marker.as_ref() {
                request = request.marker(m);
            }
            let response = request.send().await.map_err(|e| EnhancedClientError::Other(e.to_string()))?;
            for cluster in response.cache_clusters() {
                let Some(id) = cluster.cache_cluster_id() else { continue };
                let arn = cluster.arn().unwrap_or(id).to_string();
                clusters.push(ElastiCacheCluster {
                    arn,
                    cache_cluster_id: id.to_string(),
                    cache_node_type: cluster.cache_node_type().unwrap_or_default().to_string(),
                    engine: cluster.engine().unwrap_or_default().to_string(),
                    node_count: cluster.cache_nodes().len() as f64,
                });
            }
            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(clusters)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaFunction {
    pub arn: String,
    pub function_name: String,
    pub runtime: String,
    pub memory_size_mb: f64,
}

#[async_trait]
pub trait LambdaClient: Send + Sync {
    async fn list_functions(&self, region: &str) -> Result<Vec<LambdaFunction>, EnhancedClientError>;
}

pub struct AwsLambdaClient {
    factory: std::sync::Arc<ClientFactory>,
    role: Role,
}

impl AwsLambdaClient {
    pub fn new(factory: std::sync::Arc<ClientFactory>, role: Role) -> Self {
        Self { factory, role }
    }
}

#[async_trait]
impl LambdaClient for AwsLambdaClient {
    async fn list_functions(&self, region: &str) -> Result<Vec<LambdaFunction>, EnhancedClientError> {
        let client = self.factory.lambda_client(region, &self.role).await;
        let mut functions = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut request = client.list_functions();
            if let Some(m) = marker.as_ref() {
                request = request.marker(m);
            }
            let response = request.send().await.map_err(|e| EnhancedClientError::Other(e.to_string()))?;
            for f in response.functions() {
                let (Some(name), Some(arn)) = (f.function_name(), f.function_arn()) else { continue };
                functions.push(LambdaFunction {
                    arn: arn.to_string(),
                    function_name: name.to_string(),
                    runtime: f.runtime().map(|r| r.as_str().to_string()).unwrap_or_default(),
                    memory_size_mb: f.memory_size().unwrap_or_default() as f64,
                });
            }
            marker = response.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(functions)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamoDbTable {
    pub arn: String,
    pub table_name: String,
    pub billing_mode: String,
    pub read_capacity: f64,
    pub write_capacity: f64,
}

#[async_trait]
pub trait DynamoDbClient: Send + Sync {
    async fn list_table_names(&self, region: &str) -> Result<Vec<String>, EnhancedClientError>;
    async fn describe_table(&self, region: &str, table_name: &str) -> Result<DynamoDbTable, EnhancedClientError>;
}

pub struct AwsDynamoDbClient {
    factory: std::sync::Arc<ClientFactory>,
    role: Role,
}

impl AwsDynamoDbClient {
    pub fn new(factory: std::sync::Arc<ClientFactory>, role: Role) -> Self {
        Self { factory, role }
    }
}

#[async_trait]
impl DynamoDbClient for AwsDynamoDbClient {
    async fn list_table_names(&self, region: &str) -> Result<Vec<String>, EnhancedClientError> {
        let client = self.factory.dynamodb_client(region, &self.role).await;
        let mut names = Vec::new();
        let mut exclusive_start: Option<String> = None;
        loop {
            let mut request = client.list_tables();
            if let Some(start) = exclusive_start.as_ref() {
                request = request.exclusive_start_table_name(start);
            }
            let response = request.send().await.map_err(|e| EnhancedClientError::Other(e.to_string()))?;
            names.extend(response.table_names().iter().cloned());
            exclusive_start = response.last_evaluated_table_name().map(str::to_string);
            if exclusive_start.is_none() {
                break;
            }
        }
        Ok(names)
    }

    async fn describe_table(&self, region: &str, table_name: &str) -> Result<DynamoDbTable, EnhancedClientError> {
        let client = self.factory.dynamodb_client(region, &self.role).await;
        let response = client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| EnhancedClientError::Other(e.to_string()))?;
        let table = response.table().ok_or_else(|| EnhancedClientError::Other("no table in response".to_string()))?;
        let arn = table.table_arn().unwrap_or(table_name).to_string();
        let billing_mode = table
            .billing_mode_summary()
            .and_then(|s| s.billing_mode())
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "PROVISIONED".to_string());
        let (read_capacity, write_capacity) = table
            .provisioned_throughput()
            .map(|p| (p.read_capacity_units().unwrap_or_default() as f64, p.write_capacity_units().unwrap_or_default() as f64))
            .unwrap_or((0.0, 0.0));
        Ok(DynamoDbTable {
            arn,
            table_name: table_name.to_string(),
            billing_mode,
            read_capacity,
            write_capacity,
        })
    }
}

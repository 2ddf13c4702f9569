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

//! Per-(region, role) SDK config pool, keyed by `region \0 roleArn \0
//! externalId` per spec §5. Grounded on the teacher's process-global
//! `CLIENT_CACHE: Lazy<DashMap<u64, Arc<Client>>>` fingerprint-cache
//! pattern in `services/kubernetes/client.rs`, generalized from a global
//! `DashMap` to an owned pool so it can be exercised in tests without
//! process-global state, and from a single client type to a full
//! `aws_config::SdkConfig` every per-service client is built from.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::Client as CloudWatchSdkClient;
use aws_sdk_dynamodb::Client as DynamoDbSdkClient;
use aws_sdk_elasticache::Client as ElastiCacheSdkClient;
use aws_sdk_iam::Client as IamSdkClient;
use aws_sdk_lambda::Client as LambdaSdkClient;
use aws_sdk_rds::Client as RdsSdkClient;
use aws_sdk_resourcegroupstaggingapi::Client as TaggingSdkClient;
use aws_sdk_sts::Client as StsSdkClient;
use dashmap::DashMap;

use crate::config::Role;

fn pool_key(region: &str, role: &Role) -> String {
    format!("{region}\0{}\0{}", role.role_arn, role.external_id)
}

/// Builds and caches `aws_config::SdkConfig`s for (region, role) pairs.
/// Reads are lock-free via `DashMap`'s sharded locking; building a new
/// config is the only path that writes.
pub struct ClientFactory {
    sts_region: Option<String>,
    configs: DashMap<String, Arc<aws_config::SdkConfig>>,
}

impl ClientFactory {
    pub fn new(sts_region: Option<String>) -> Self {
        Self { sts_region, configs: DashMap::new() }
    }

    pub async fn sdk_config(&self, region: &str, role: &Role) -> Arc<aws_config::SdkConfig> {
        let key = pool_key(region, role);
        if let Some(existing) = self.configs.get(&key) {
            return existing.clone();
        }

        let built = Arc::new(self.build_sdk_config(region, role).await);
        self.configs.insert(key, built.clone());
        built
    }

    async fn build_sdk_config(&self, region: &str, role: &Role) -> aws_config::SdkConfig {
        let region_provider = Region::new(region.to_string());
        let mut builder = aws_config::defaults(BehaviorVersion::latest()).region(region_provider.clone());

        if !role.role_arn.is_empty() {
            let sts_region = self
                .sts_region
                .as_ref()
                .map(|r| Region::new(r.clone()))
                .unwrap_or_else(|| region_provider.clone());

            let mut assume = aws_config::sts::AssumeRoleProvider::builder(role.role_arn.clone())
                .session_name("cw-scrape")
                .region(sts_region);
            if !role.external_id.is_empty() {
                assume = assume.external_id(role.external_id.clone());
            }
            builder = builder.credentials_provider(assume.build().await);
        }

        builder.load().await
    }

    pub async fn cloudwatch_client(&self, region: &str, role: &Role) -> CloudWatchSdkClient {
        CloudWatchSdkClient::new(&self.sdk_config(region, role).await)
    }

    pub async fn tagging_client(&self, region: &str, role: &Role) -> TaggingSdkClient {
        TaggingSdkClient::new(&self.sdk_config(region, role).await)
    }

    pub async fn sts_client(&self, region: &str, role: &Role) -> StsSdkClient {
        StsSdkClient::new(&self.sdk_config(region, role).await)
    }

    pub async fn iam_client(&self, region: &str, role: &Role) -> IamSdkClient {
        IamSdkClient::new(&self.sdk_config(region, role).await)
    }

    pub async fn rds_client(&self, region: &str, role: &Role) -> RdsSdkClient {
        RdsSdkClient::new(&self.sdk_config(region, role).await)
    }

    pub async fn elasticache_client(&self, region: &str, role: &Role) -> ElastiCacheSdkClient {
        ElastiCacheSdkClient::new(&self.sdk_config(region, role).await)
    }

    pub async fn lambda_client(&self, region: &str, role: &Role) -> LambdaSdkClient {
        LambdaSdkClient::new(&self.sdk_config(region, role).await)
    }

    pub async fn dynamodb_client(&self, region: &str, role: &Role) -> DynamoDbSdkClient {
        DynamoDbSdkClient::new(&self.sdk_config(region, role).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_key_distinguishes_role_and_region() {
        let role_a = Role { role_arn: "arn:aws:iam::1:role/a".to_string(), external_id: String::new() };
        let role_b = Role { role_arn: "arn:aws:iam::1:role/b".to_string(), external_id: String::new() };
        assert_ne!(pool_key("us-east-1", &role_a), pool_key("us-east-1", &role_b));
        assert_ne!(pool_key("us-east-1", &role_a), pool_key("us-west-2", &role_a));
    }
}

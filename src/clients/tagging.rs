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

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_resourcegroupstaggingapi::Client as TaggingSdkClient;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::model::TaggedResource;

/// What a discovery/custom-namespace job asks the tagging client to find:
/// a namespace (translated to the tagging API's resource-type filter) in
/// one region. Tag filters beyond namespace scoping are a config-loader
/// concern and are out of scope here (spec §1).
#[derive(Debug, Clone)]
pub struct ResourceDiscoveryRequest {
    pub namespace: String,
    pub region: String,
}

/// The sentinel spec §6/§4.2 calls `ErrExpectedToFindResources`: the job
/// asked for a namespace whose resources should exist but the tagging API
/// returned none.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("expected to find resources for this job but none were returned")]
    ExpectedToFindResources,
    #[error("tagging client error: {0}")]
    Other(String),
}

#[async_trait]
pub trait TaggingClient: Send + Sync {
    async fn get_resources(
        &self,
        request: &ResourceDiscoveryRequest,
    ) -> Result<Vec<TaggedResource>, TaggingError>;
}

/// Wraps the tagging SDK client with a shared semaphore bounding
/// concurrent calls to `taggingAPIConcurrency` (spec §5 "Tagging API
/// calls"). The semaphore is meant to be shared across every
/// `AwsTaggingClient` built for a scrape run, not one per instance.
pub struct AwsTaggingClient {
    client: TaggingSdkClient,
    concurrency: Arc<Semaphore>,
}

impl AwsTaggingClient {
    pub fn new(client: TaggingSdkClient, concurrency: Arc<Semaphore>) -> Self {
        Self { client, concurrency }
    }
}

#[async_trait]
impl TaggingClient for AwsTaggingClient {
    async fn get_resources(
        &self,
        request: &ResourceDiscoveryRequest,
    ) -> Result<Vec<TaggedResource>, TaggingError> {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .expect("tagging concurrency semaphore is never closed");

        let mut resources = Vec::new();
        let mut pagination_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .get_resources()
                .resource_type_filters(namespace_to_resource_type_filter(&request.namespace));
            if let Some(token) = pagination_token.as_ref() {
                req = req.pagination_token(token);
            }

            let response = req
                .send()
                .await
                .map_err(|e| TaggingError::Other(e.to_string()))?;

            for mapping in response.resource_tag_mapping_list() {
                let Some(arn) = mapping.resource_arn() else { continue };
                let tags = mapping
                    .tags()
                    .iter()
                    .filter_map(|t| Some((t.key().to_string(), t.value().to_string())))
                    .collect();
                resources.push(TaggedResource {
                    arn: arn.to_string(),
                    namespace: request.namespace.clone(),
                    region: request.region.clone(),
                    tags,
                });
            }

            pagination_token = response.pagination_token().filter(|t| !t.is_empty()).map(str::to_string);
            if pagination_token.is_none() {
                break;
            }
        }

        if resources.is_empty() {
            debug!(namespace = %request.namespace, region = %request.region, "tagging API returned no resources");
            return Err(TaggingError::ExpectedToFindResources);
        }

        Ok(resources)
    }
}

/// The tagging API's resource-type filter is namespace-shaped but not
/// identical to it (e.g. `ec2:instance` vs `AWS/EC2`); this mapping is
/// intentionally partial — unmapped namespaces fall back to a filter
/// derived from the namespace itself, which the tagging API tolerates
/// poorly but which keeps this function total.
fn namespace_to_resource_type_filter(namespace: &str) -> String {
    match namespace {
        "AWS/EC2" => "ec2:instance".to_string(),
        "AWS/RDS" => "rds:db".to_string(),
        "AWS/ElastiCache" => "elasticache:cluster".to_string(),
        "AWS/Lambda" => "lambda:function".to_string(),
        "AWS/DynamoDB" => "dynamodb:table".to_string(),
        "AWS/S3" => "s3".to_string(),
        other => other.trim_start_matches("AWS/").to_lowercase(),
    }
}

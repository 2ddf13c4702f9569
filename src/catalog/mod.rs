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

//! Read-only registry mapping a CloudWatch namespace to its display alias
//! and the ARN regex patterns used to bind metrics to resources (spec §2
//! component 1, §6 "Service catalog"). Only the handful of namespaces this
//! core's scenarios and tests exercise are registered here; the exhaustive
//! per-service table a production deployment would ship is outside this
//! core's scope — the contract (`GetService`, alias rejection) is what
//! matters.

use std::collections::HashMap;

use regex::Regex;

/// A compiled ARN pattern plus the ordered dimension names its capture
/// groups bind to. `dimension_names.len()` must equal the regex's capture
/// group count.
#[derive(Debug, Clone)]
pub struct DimensionsRegexp {
    pub namespace: String,
    pub regex: Regex,
    pub dimension_names: Vec<String>,
}

impl DimensionsRegexp {
    fn new(namespace: &str, pattern: &str, dimension_names: &[&str]) -> Self {
        let regex = Regex::new(pattern).expect("built-in catalog regex must compile");
        Self {
            namespace: namespace.to_string(),
            regex,
            dimension_names: dimension_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub namespace: String,
    pub alias: String,
    pub dimension_regexps: Vec<DimensionsRegexp>,
}

#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    by_namespace: HashMap<String, ServiceEntry>,
    alias_to_namespace: HashMap<String, String>,
}

impl ServiceCatalog {
    /// The registry built in to this crate: one entry per namespace named
    /// anywhere in the spec (EC2, AmazonMQ, SageMaker, RDS, ElastiCache,
    /// Lambda, DynamoDB, S3).
    pub fn builtin() -> Self {
        let entries = vec![
            ServiceEntry {
                namespace: "AWS/EC2".to_string(),
                alias: "ec2".to_string(),
                dimension_regexps: vec![DimensionsRegexp::new(
                    "AWS/EC2",
                    r"^arn:aws:ec2:[^:]*:[^:]*:instance/(?P<g1>[^/]+)$",
                    &["InstanceId"],
                )],
            },
            ServiceEntry {
                namespace: "AWS/AmazonMQ".to_string(),
                alias: "amq".to_string(),
                dimension_regexps: vec![DimensionsRegexp::new(
                    "AWS/AmazonMQ",
                    r"^arn:aws:mq:[^:]*:[^:]*:broker:([^:]+):.*$",
                    &["Broker"],
                )],
            },
            ServiceEntry {
                namespace: "AWS/SageMaker".to_string(),
                alias: "sagemaker".to_string(),
                dimension_regexps: vec![
                    // Most specific first isn't required here (the
                    // associator re-sorts at build time), but it reads
                    // naturally in declaration order too.
                    DimensionsRegexp::new(
                        "AWS/SageMaker",
                        r"^arn:aws:sagemaker:[^:]*:[^:]*:endpoint/([^/]+)/inference-component/([^/]+)$",
                        &["EndpointName", "InferenceComponentName"],
                    ),
                    DimensionsRegexp::new(
                        "AWS/SageMaker",
                        r"^arn:aws:sagemaker:[^:]*:[^:]*:endpoint/([^/]+)$",
                        &["EndpointName"],
                    ),
                ],
            },
            ServiceEntry {
                namespace: "AWS/RDS".to_string(),
                alias: "rds".to_string(),
                dimension_regexps: vec![DimensionsRegexp::new(
                    "AWS/RDS",
                    r"^arn:aws:rds:[^:]*:[^:]*:db:([^:]+)$",
                    &["DBInstanceIdentifier"],
                )],
            },
            ServiceEntry {
                namespace: "AWS/ElastiCache".to_string(),
                alias: "elasticache".to_string(),
                dimension_regexps: vec![DimensionsRegexp::new(
                    "AWS/ElastiCache",
                    r"^arn:aws:elasticache:[^:]*:[^:]*:cluster:([^:]+)$",
                    &["CacheClusterId"],
                )],
            },
            ServiceEntry {
                namespace: "AWS/Lambda".to_string(),
                alias: "lambda".to_string(),
                dimension_regexps: vec![DimensionsRegexp::new(
                    "AWS/Lambda",
                    r"^arn:aws:lambda:[^:]*:[^:]*:function:([^:]+)$",
                    &["FunctionName"],
                )],
            },
            ServiceEntry {
                namespace: "AWS/DynamoDB".to_string(),
                alias: "dynamodb".to_string(),
                dimension_regexps: vec![DimensionsRegexp::new(
                    "AWS/DynamoDB",
                    r"^arn:aws:dynamodb:[^:]*:[^:]*:table/([^/]+)$",
                    &["TableName"],
                )],
            },
            ServiceEntry {
                namespace: "AWS/S3".to_string(),
                alias: "s3".to_string(),
                dimension_regexps: vec![DimensionsRegexp::new(
                    "AWS/S3",
                    r"^arn:aws:s3:::([^:/]+)$",
                    &["BucketName"],
                )],
            },
        ];

        let mut by_namespace = HashMap::new();
        let mut alias_to_namespace = HashMap::new();
        for entry in entries {
            alias_to_namespace.insert(entry.alias.clone(), entry.namespace.clone());
            by_namespace.insert(entry.namespace.clone(), entry);
        }

        Self { by_namespace, alias_to_namespace }
    }

    pub fn get_service(&self, namespace: &str) -> Option<&ServiceEntry> {
        self.by_namespace.get(namespace)
    }

    /// If `name` is a known alias (not itself a canonical namespace),
    /// returns the canonical namespace it stands for.
    pub fn alias_canonical_name(&self, name: &str) -> Option<&str> {
        self.alias_to_namespace.get(name).map(|s| s.as_str())
    }
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_namespace() {
        let catalog = ServiceCatalog::builtin();
        assert!(catalog.get_service("AWS/EC2").is_some());
    }

    #[test]
    fn unknown_namespace_absent() {
        let catalog = ServiceCatalog::builtin();
        assert!(catalog.get_service("AWS/Bogus").is_none());
    }

    #[test]
    fn alias_maps_to_canonical() {
        let catalog = ServiceCatalog::builtin();
        assert_eq!(catalog.alias_canonical_name("s3"), Some("AWS/S3"));
        assert_eq!(catalog.alias_canonical_name("AWS/S3"), None);
    }
}

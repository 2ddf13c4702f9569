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

//! Binds a CloudWatch metric to a tagged resource by matching the
//! metric's dimension values against patterns extracted from resource
//! ARNs (spec §4.1). The mapping table is a flat hashmap keyed by a hash
//! over (namespace, sorted dimension names, dimension values) — no
//! inheritance or dynamic dispatch, per spec §9.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::catalog::DimensionsRegexp;
use crate::model::{Metric, TaggedResource};

/// The sorted dimension-name tuple a namespace's regex binds, used both
/// to build the hash template and to check a candidate metric carries
/// all the names it needs before hashing.
#[derive(Debug, Clone)]
struct HashKeyTemplate {
    namespace: String,
    sorted_names: Vec<String>,
}

impl HashKeyTemplate {
    fn from_regexp(regexp: &DimensionsRegexp) -> Self {
        let mut sorted_names = regexp.dimension_names.clone();
        sorted_names.sort();
        Self { namespace: regexp.namespace.clone(), sorted_names }
    }

    fn hash_for(&self, values: &HashMap<&str, &str>) -> Option<u64> {
        let mut hasher = DefaultHasher::new();
        self.namespace.hash(&mut hasher);
        for name in &self.sorted_names {
            let value = values.get(name.as_str())?;
            name.hash(&mut hasher);
            value.hash(&mut hasher);
        }
        Some(hasher.finish())
    }
}

/// Outcome of `associate`: `Bound` carries the resource; `Skip` means the
/// dimension names matched a rule but the values didn't (discard);
/// `Keep` means no rule fit these dimensions at all (treat as global).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Association<'a> {
    Bound(&'a TaggedResource),
    Skip,
    Keep,
}

pub struct Associator {
    mappings: HashMap<u64, TaggedResource>,
    /// Per-namespace templates, sorted most-specific (most dimension
    /// names) first, ties broken by insertion order.
    templates: HashMap<String, Vec<HashKeyTemplate>>,
}

/// Per-namespace dimension fixups applied before hashing during lookup
/// (spec §4.1 "Dimension fixups"). Data, not code, per spec §9.
fn apply_fixups(namespace: &str, dims: &HashMap<&str, &str>) -> (HashMap<String, String>, bool) {
    let mut out: HashMap<String, String> = dims.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let mut fixed = false;

    if namespace == "AWS/AmazonMQ" {
        if let Some(value) = out.get("Broker").cloned() {
            if let Some(stripped) = strip_trailing_broker_suffix(&value) {
                out.insert("Broker".to_string(), stripped);
                fixed = true;
            }
        }
    }

    if namespace == "AWS/SageMaker" {
        for key in ["EndpointName", "InferenceComponentName"] {
            if let Some(value) = out.get(key).cloned() {
                let lowered = value.to_lowercase();
                if lowered != value {
                    out.insert(key.to_string(), lowered);
                    fixed = true;
                }
            }
        }
    }

    (out, fixed)
}

fn strip_trailing_broker_suffix(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut i = bytes.len();
    while i > 0 && bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i < bytes.len() && i > 0 && bytes[i - 1] == b'-' {
        Some(value[..i - 1].to_string())
    } else {
        None
    }
}

impl Associator {
    /// Build phase: for each regex, try every not-yet-bound resource;
    /// first match wins, and a resource is matched against at most one
    /// regex (spec §4.1 "Build phase").
    pub fn build(regexps: &[DimensionsRegexp], resources: &[TaggedResource]) -> Self {
        let mut mappings = HashMap::new();
        let mut bound = vec![false; resources.len()];
        let mut templates: HashMap<String, Vec<HashKeyTemplate>> = HashMap::new();

        for regexp in regexps {
            let template = HashKeyTemplate::from_regexp(regexp);
            for (idx, resource) in resources.iter().enumerate() {
                if bound[idx] {
                    continue;
                }
                let Some(captures) = regexp.regex.captures(&resource.arn) else {
                    continue;
                };
                let mut values: HashMap<&str, &str> = HashMap::new();
                let mut ok = true;
                for (i, name) in regexp.dimension_names.iter().enumerate() {
                    match captures.get(i + 1) {
                        Some(m) => {
                            values.insert(name.as_str(), m.as_str());
                        }
                        None => {
                            ok = false;
                            break;
                        }
                    }
                }
                if !ok {
                    continue;
                }

                if let Some(hash) = template.hash_for(&values) {
                    mappings.insert(hash, resource.clone());
                    bound[idx] = true;
                }
            }
            templates.entry(regexp.namespace.clone()).or_default().push(template);
        }

        for list in templates.values_mut() {
            list.sort_by(|a, b| b.sorted_names.len().cmp(&a.sorted_names.len()));
        }

        Self { mappings, templates }
    }

    /// A no-op associator used when a job's namespace has no registered
    /// regexps, or no resources were discovered (spec §4.2 step 3).
    pub fn noop() -> Self {
        Self { mappings: HashMap::new(), templates: HashMap::new() }
    }

    /// Lookup phase (spec §4.1 "Lookup phase").
    pub fn associate<'a>(&'a self, metric: &Metric) -> Association<'a> {
        if metric.dimensions.is_empty() {
            return Association::Keep;
        }

        let Some(templates) = self.templates.get(&metric.namespace) else {
            return Association::Keep;
        };

        let dim_values = metric.dimension_map();
        let mut any_complete = false;

        for template in templates {
            let names_present = template.sorted_names.iter().all(|n| dim_values.contains_key(n.as_str()));
            if !names_present {
                continue;
            }

            let (fixed_values, was_fixed) = apply_fixups(&metric.namespace, &dim_values);
            let fixed_refs: HashMap<&str, &str> =
                fixed_values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

            let Some(h1) = template.hash_for(&fixed_refs) else {
                continue;
            };
            any_complete = true;

            if let Some(resource) = self.mappings.get(&h1) {
                return Association::Bound(resource);
            }

            if was_fixed {
                if let Some(h2) = template.hash_for(&dim_values) {
                    if let Some(resource) = self.mappings.get(&h2) {
                        return Association::Bound(resource);
                    }
                }
            }
        }

        if any_complete {
            Association::Skip
        } else {
            Association::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceCatalog;
    use crate::model::Dimension;

    fn ec2_regexps(catalog: &ServiceCatalog) -> Vec<DimensionsRegexp> {
        catalog.get_service("AWS/EC2").unwrap().dimension_regexps.clone()
    }

    #[test]
    fn ec2_match() {
        let catalog = ServiceCatalog::builtin();
        let resources = vec![TaggedResource::new(
            "arn:aws:ec2:us-east-1:123456789012:instance/i-abc123",
            "AWS/EC2",
            "us-east-1",
        )];
        let associator = Associator::build(&ec2_regexps(&catalog), &resources);

        let metric = Metric {
            namespace: "AWS/EC2".to_string(),
            metric_name: "CPUUtilization".to_string(),
            dimensions: vec![Dimension::new("InstanceId", "i-abc123")],
        };
        assert_eq!(associator.associate(&metric), Association::Bound(&resources[0]));

        let mismatched = Metric {
            dimensions: vec![Dimension::new("InstanceId", "i-xyz")],
            ..metric
        };
        assert_eq!(associator.associate(&mismatched), Association::Skip);
    }

    #[test]
    fn amazonmq_fixup_strips_trailing_index() {
        let catalog = ServiceCatalog::builtin();
        let regexps = catalog.get_service("AWS/AmazonMQ").unwrap().dimension_regexps.clone();
        let resources = vec![TaggedResource::new(
            "arn:aws:mq:us-east-1:123456789012:broker:activemq-broker:b-0000",
            "AWS/AmazonMQ",
            "us-east-1",
        )];
        let associator = Associator::build(&regexps, &resources);

        let metric = Metric {
            namespace: "AWS/AmazonMQ".to_string(),
            metric_name: "CpuUtilization".to_string(),
            dimensions: vec![Dimension::new("Broker", "activemq-broker-1")],
        };
        assert_eq!(associator.associate(&metric), Association::Bound(&resources[0]));
    }

    #[test]
    fn sagemaker_case_fixup() {
        let catalog = ServiceCatalog::builtin();
        let regexps = catalog.get_service("AWS/SageMaker").unwrap().dimension_regexps.clone();
        let resources = vec![TaggedResource::new(
            "arn:aws:sagemaker:us-east-1:123456789012:endpoint/my-endpoint",
            "AWS/SageMaker",
            "us-east-1",
        )];
        let associator = Associator::build(&regexps, &resources);

        let metric = Metric {
            namespace: "AWS/SageMaker".to_string(),
            metric_name: "Invocations".to_string(),
            dimensions: vec![Dimension::new("EndpointName", "My-Endpoint")],
        };
        assert_eq!(associator.associate(&metric), Association::Bound(&resources[0]));
    }

    #[test]
    fn global_fallback_on_empty_dimensions() {
        let catalog = ServiceCatalog::builtin();
        let resources = vec![TaggedResource::new(
            "arn:aws:ec2:us-east-1:123456789012:instance/i-abc123",
            "AWS/EC2",
            "us-east-1",
        )];
        let associator = Associator::build(&ec2_regexps(&catalog), &resources);
        let metric = Metric { namespace: "AWS/EC2".to_string(), metric_name: "StatusCheckFailed".to_string(), dimensions: vec![] };
        assert_eq!(associator.associate(&metric), Association::Keep);
    }

    #[test]
    fn does_not_skip_on_non_arn_dimension() {
        // A metric carrying a dimension this namespace's regexps don't
        // model at all keeps (not skips) — spec §9 open question.
        let catalog = ServiceCatalog::builtin();
        let resources = vec![TaggedResource::new(
            "arn:aws:ec2:us-east-1:123456789012:instance/i-abc123",
            "AWS/EC2",
            "us-east-1",
        )];
        let associator = Associator::build(&ec2_regexps(&catalog), &resources);
        let metric = Metric {
            namespace: "AWS/EC2".to_string(),
            metric_name: "SomeMetric".to_string(),
            dimensions: vec![Dimension::new("ImageId", "ami-1234")],
        };
        assert_eq!(associator.associate(&metric), Association::Keep);
    }

    #[test]
    fn most_specific_template_wins() {
        let catalog = ServiceCatalog::builtin();
        let regexps = catalog.get_service("AWS/SageMaker").unwrap().dimension_regexps.clone();
        let resources = vec![
            TaggedResource::new(
                "arn:aws:sagemaker:us-east-1:123456789012:endpoint/ep1",
                "AWS/SageMaker",
                "us-east-1",
            ),
            TaggedResource::new(
                "arn:aws:sagemaker:us-east-1:123456789012:endpoint/ep1/inference-component/ic1",
                "AWS/SageMaker",
                "us-east-1",
            ),
        ];
        let associator = Associator::build(&regexps, &resources);

        let metric = Metric {
            namespace: "AWS/SageMaker".to_string(),
            metric_name: "Invocations".to_string(),
            dimensions: vec![Dimension::new("EndpointName", "ep1"), Dimension::new("InferenceComponentName", "ic1")],
        };
        assert_eq!(associator.associate(&metric), Association::Bound(&resources[1]));
    }

    #[test]
    fn noop_associator_always_keeps() {
        let associator = Associator::noop();
        let metric = Metric {
            namespace: "AWS/EC2".to_string(),
            metric_name: "CPUUtilization".to_string(),
            dimensions: vec![Dimension::new("InstanceId", "i-abc123")],
        };
        assert_eq!(associator.associate(&metric), Association::Keep);
    }
}

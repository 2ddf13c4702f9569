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

//! Dependency-injected cloud client contracts (spec §6 "Cloud client
//! contracts") plus the AWS SDK-backed implementations and the
//! per-(region, role) client pool that builds them.

pub mod account;
pub mod cloudwatch;
pub mod enhanced;
pub mod factory;
pub mod tagging;

pub use account::{AccountClient, AwsAccountClient};
pub use cloudwatch::{AwsCloudWatchClient, CloudWatchClient, MetricDataResult};
pub use factory::ClientFactory;
pub use tagging::{AwsTaggingClient, ResourceDiscoveryRequest, TaggingClient, TaggingError};

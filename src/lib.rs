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

//! Declarative CloudWatch metric discovery and scrape engine: given a
//! `JobsConfig` of discovery/static/custom-namespace jobs, fans out across
//! regions and IAM roles, resolves which AWS resources each metric belongs
//! to, and drives CloudWatch's GetMetricData in windowed batches.

pub mod aggregator;
pub mod associator;
pub mod batch;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod enhanced;
pub mod errors;
pub mod jobs;
pub mod model;
pub mod processor;
pub mod utils;

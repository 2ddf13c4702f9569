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

use clap::Parser;
use cw_scrape::aggregator::run_scrape;
use cw_scrape::catalog::ServiceCatalog;
use cw_scrape::clients::ClientFactory;
use cw_scrape::config;
use cw_scrape::enhanced::{self, DynamoDbService, ElastiCacheService, LambdaService, RdsService};
use cw_scrape::utils;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "cw-scrape")]
#[command(about = "Declarative CloudWatch metric discovery and scrape", long_about = None)]
struct Cli {
    /// Run one scrape pass and print a summary, then exit, instead of
    /// scraping on a loop until interrupted.
    #[arg(long, default_value_t = true)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::logging::init_logger();

    let catalog = Arc::new(ServiceCatalog::builtin());
    let cfg = config::load_and_validate(&catalog)?;

    let cli = Cli::parse();

    let cancellation = CancellationToken::new();
    tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancellation.cancel();
            }
        }
    });

    let factory = Arc::new(ClientFactory::new(cfg.sts_region.clone()));

    // Enhanced-metrics services resolve a client for whatever region their
    // `RegionCache` is populating, so they hold the factory, not a client
    // bound to one region. The default (keyless) role is used for describe
    // calls; per-job role assumption for enhanced metrics is future work.
    let enhanced_role = cw_scrape::config::Role::default();
    let mut enhanced_processor = enhanced::Processor::new();
    enhanced_processor.register(Arc::new(RdsService::new(Arc::new(
        cw_scrape::clients::enhanced::AwsRdsClient::new(factory.clone(), enhanced_role.clone()),
    ))));
    enhanced_processor.register(Arc::new(ElastiCacheService::new(Arc::new(
        cw_scrape::clients::enhanced::AwsElastiCacheClient::new(factory.clone(), enhanced_role.clone()),
    ))));
    enhanced_processor.register(Arc::new(LambdaService::new(Arc::new(
        cw_scrape::clients::enhanced::AwsLambdaClient::new(factory.clone(), enhanced_role.clone()),
    ))));
    enhanced_processor.register(Arc::new(DynamoDbService::new(Arc::new(
        cw_scrape::clients::enhanced::AwsDynamoDbClient::new(factory.clone(), enhanced_role.clone()),
    ))));

    let enhanced_processor = Arc::new(enhanced_processor);

    loop {
        let output =
            run_scrape(&cfg, catalog.clone(), factory.clone(), enhanced_processor.clone(), cancellation.clone())
                .await;

        info!(
            resources = output.resources.len(),
            metrics = output.metrics.len(),
            "scrape complete"
        );
        println!(
            "discovered {} resources, completed {} metric datapoints",
            output.resources.len(),
            output.metrics.len()
        );

        if cli.once || cancellation.is_cancelled() {
            break;
        }
    }

    Ok(())
}

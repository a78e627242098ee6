//! Deployment waiter semantics — terminal passthrough and bounded give-up.

mod common;

use common::MockAi;
use std::sync::Arc;

use genbid::ai::status::DeployStatus;
use genbid::ai::types::DeployStatusResult;
use genbid::ai::AiApi;
use genbid::deploy::{DeployConfig, DeployService};

fn indexing() -> DeployStatusResult {
    DeployStatusResult {
        status: DeployStatus::Indexing,
        error: None,
    }
}

#[tokio::test]
async fn wait_returns_once_terminal() {
    let ai = MockAi::new();
    {
        let mut q = ai.deploy_results.lock().unwrap();
        q.push_back(Ok(indexing()));
        q.push_back(Ok(DeployStatusResult {
            status: DeployStatus::Finished,
            error: None,
        }));
    }
    let service = DeployService::with_config(
        Arc::clone(&ai) as Arc<dyn AiApi>,
        DeployConfig::instant(),
    );
    let result = service.wait_for_deployment("deploy-1").await;
    assert_eq!(result.status, DeployStatus::Finished);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn wait_gives_up_with_failed_instead_of_raising() {
    let ai = MockAi::new();
    {
        let mut q = ai.deploy_results.lock().unwrap();
        for _ in 0..3 {
            q.push_back(Ok(indexing()));
        }
    }
    let service = DeployService::with_config(
        Arc::clone(&ai) as Arc<dyn AiApi>,
        DeployConfig::instant(),
    );
    let result = service.wait_for_deployment("deploy-2").await;
    assert_eq!(result.status, DeployStatus::Failed);
    let err = result.error.expect("exhaustion carries an error payload");
    assert_eq!(err.code, "DEPLOY_TIMEOUT");
}

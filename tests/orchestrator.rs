//! Retry orchestration against real child processes.
#![cfg(unix)]

use std::path::PathBuf;

use provider_failover::config::{Credentials, CredentialsConfig, OrchestratorConfig};
use provider_failover::orchestrator::{
    ClientCommand, OrchestratorError, PatternDetector, ProcessLauncher, ProviderPreference, RetryOrchestrator,
};

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pf-orchestrator-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A client script that counts its own launches in `counter`.
fn counting_client(counter: &PathBuf, body: &str) -> ProcessLauncher<PatternDetector> {
    let script = format!(
        "n=$(cat '{path}' 2>/dev/null || echo 0); n=$((n+1)); echo $n > '{path}'; {body}",
        path = counter.display(),
        body = body
    );
    let command = ClientCommand {
        program: "sh".into(),
        args: vec!["-c".into(), script],
        prompt_file: None,
        output_file: None,
    };
    ProcessLauncher::new(
        command,
        PatternDetector::default(),
        &OrchestratorConfig::default(),
        &CredentialsConfig::default(),
    )
    .quiet()
}

fn launches(counter: &PathBuf) -> u32 {
    std::fs::read_to_string(counter).unwrap().trim().parse().unwrap()
}

fn primary_only() -> Credentials {
    Credentials {
        bedrock_token: Some("token".into()),
        anthropic_key: None,
    }
}

#[tokio::test]
async fn test_succeeds_on_second_attempt_without_third_spawn() {
    let dir = scratch_dir();
    let counter = dir.join("count");
    let launcher = counting_client(
        &counter,
        "if [ $n -lt 2 ]; then echo 'API Error: 429 Too Many Requests' >&2; exit 1; fi; echo done",
    );

    let orchestrator = RetryOrchestrator::new(launcher, 5, &primary_only()).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.spawns(), 2);
    assert_eq!(launches(&counter), 2);
    let last = report.last().unwrap();
    assert_eq!(last.exit_code, Some(0));
    assert_eq!(last.output, "done");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_unclassified_failure_spawns_once() {
    let dir = scratch_dir();
    let counter = dir.join("count");
    let launcher = counting_client(&counter, "echo 'compilation failed' >&2; exit 7");

    let orchestrator = RetryOrchestrator::new(launcher, 5, &primary_only()).unwrap();
    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::ClientFailed { attempt: 1, exit_code: Some(7) }));
    assert_eq!(err.exit_code(), 7);
    assert_eq!(launches(&counter), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_rate_limited_primary_switches_to_secondary() {
    let dir = scratch_dir();
    let counter = dir.join("count");
    let launcher = counting_client(
        &counter,
        "if [ \"$FAILOVER_PROVIDER_PREFERENCE\" = primary ]; then echo 'ThrottlingException' >&2; exit 1; fi; echo served",
    );

    let credentials = Credentials {
        bedrock_token: Some("token".into()),
        anthropic_key: Some("key".into()),
    };
    let orchestrator = RetryOrchestrator::new(launcher, 5, &credentials).unwrap();
    let report = orchestrator.run().await.unwrap();

    let preferences: Vec<_> = report.launches.iter().map(|l| l.preference).collect();
    assert_eq!(preferences, vec![ProviderPreference::Primary, ProviderPreference::Secondary]);
    assert!(report.launches[0].rate_limited);
    assert_eq!(launches(&counter), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

//! Subprocess backend against small shell scripts standing in for the SDK.

#![cfg(target_os = "linux")]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use zatca_pipeline::{
    BackendConfig, Pipeline, PipelineStageError, PipelineState, Stage,
};

const UNSIGNED: &str = "<Invoice><ds:DigestValue>[PLACEHOLDER_DIGEST_VALUE]</ds:DigestValue></Invoice>\n";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn pipeline_for(script: PathBuf, work: &Path, timeout: Duration) -> Pipeline {
    Pipeline::from_config(
        BackendConfig::new(script)
            .with_work_dir(work)
            .with_timeout(timeout),
    )
}

fn invoice_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("zatca-invoice-"))
        })
        .collect()
}

const HEALTHY_SDK: &str = r#"
mode="$1"
file="$3"
case "$mode" in
  -validate) echo "*** GLOBAL VALIDATION RESULT = PASSED" ;;
  -hash) echo "*** INVOICE HASH = $(sha256sum "$file" | cut -c1-16)QUJD" ;;
  -sign) sed -i 's/\[PLACEHOLDER_[A-Z_]*\]/c2lnbmVk/g' "$file"; echo "Signature Value = c2lnbmVk" ;;
  -qr) echo "*** QR code = AQVTaG9w" ;;
  *) echo "unknown mode $mode" >&2; exit 2 ;;
esac
"#;

#[tokio::test]
async fn healthy_sdk_runs_all_stages() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    let script = write_script(bin.path(), "fatoora", HEALTHY_SDK);

    let run = pipeline_for(script, work.path(), Duration::from_secs(10))
        .run(UNSIGNED)
        .await;

    assert_eq!(run.state, PipelineState::Complete, "{}", run.transcript());
    assert!(run.artifact(Stage::Hash).is_some_and(|h| h.ends_with("QUJD")));
    assert_eq!(run.artifact(Stage::Qr), Some("AQVTaG9w"));
    let signed = run.signed_xml.as_deref().unwrap();
    assert!(signed.contains("<ds:DigestValue>c2lnbmVk</ds:DigestValue>"));
    assert!(invoice_files(work.path()).is_empty());
}

#[tokio::test]
async fn zero_exit_without_marker_fails_validation() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    let log = work.path().join("calls.log");
    let script = write_script(
        bin.path(),
        "fatoora",
        &format!("echo \"$1\" >> '{}'\necho 'validation complete'\nexit 0", log.display()),
    );

    let run = pipeline_for(script, work.path(), Duration::from_secs(10))
        .run(UNSIGNED)
        .await;

    assert_eq!(run.state, PipelineState::ValidationFailed);
    assert_eq!(run.failure, Some(PipelineStageError::ValidationFailed));
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "-validate\n");
}

#[tokio::test]
async fn stderr_is_captured() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    let script = write_script(
        bin.path(),
        "fatoora",
        "echo 'BR-KSA-EN16931-11 invalid tax' >&2\necho 'GLOBAL VALIDATION RESULT = FAILED'\nexit 1",
    );

    let run = pipeline_for(script, work.path(), Duration::from_secs(10))
        .validate(UNSIGNED)
        .await;

    let result = run.result(Stage::Validate).unwrap();
    assert!(!result.success);
    assert_eq!(result.exit_code, Some(1));
    assert!(result.raw_output.contains("BR-KSA-EN16931-11"));
    assert!(result.raw_output.contains("GLOBAL VALIDATION RESULT = FAILED"));
}

#[tokio::test]
async fn config_file_is_exported_to_the_child() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    let config = work.path().join("config.json");
    std::fs::write(&config, "{}").unwrap();
    let script = write_script(
        bin.path(),
        "fatoora",
        "echo \"config=$SDK_CONFIG\"\necho 'GLOBAL VALIDATION RESULT = PASSED'",
    );

    let pipeline = Pipeline::from_config(
        BackendConfig::new(script)
            .with_config_file(&config)
            .with_work_dir(work.path()),
    );
    let run = pipeline.validate(UNSIGNED).await;
    assert!(run.validation_passed());
    assert!(run.results[0]
        .raw_output
        .contains(&format!("config={}", config.display())));
}

#[tokio::test]
async fn hung_backend_is_killed_and_file_removed() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    // The pid file sits next to the invoice file but is not a temp file.
    let script = write_script(bin.path(), "fatoora", "echo $$ > \"$3.pid\"\nexec sleep 30");

    let started = Instant::now();
    let run = pipeline_for(script, work.path(), Duration::from_millis(500))
        .run(UNSIGNED)
        .await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(run.state, PipelineState::Failed);
    let failure = run.failure.expect("failure");
    assert!(failure.is_timeout());
    assert_eq!(failure.stage(), Stage::Validate);

    let pid_files: Vec<PathBuf> = std::fs::read_dir(work.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "pid"))
        .collect();
    assert_eq!(pid_files.len(), 1);
    let pid = std::fs::read_to_string(&pid_files[0]).unwrap();
    assert!(
        !Path::new(&format!("/proc/{}", pid.trim())).exists(),
        "backend process {} still alive",
        pid.trim()
    );

    assert!(invoice_files(work.path())
        .iter()
        .all(|p| p.extension().is_some_and(|e| e == "pid")));
    assert!(!invoice_files(work.path())
        .iter()
        .any(|p| p.extension().is_some_and(|e| e == "xml")));
}

#[tokio::test]
async fn detached_descendant_holding_pipes_does_not_outlive_deadline() {
    let work = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    // The backgrounded sleep inherits stdout after the script itself exits.
    let script = write_script(
        bin.path(),
        "fatoora",
        "sleep 5 &\necho '*** GLOBAL VALIDATION RESULT = PASSED'\nexit 0",
    );

    let started = Instant::now();
    let run = pipeline_for(script, work.path(), Duration::from_secs(1))
        .validate(UNSIGNED)
        .await;

    assert!(
        started.elapsed() < Duration::from_secs(4),
        "stage took {:?}",
        started.elapsed()
    );
    assert_eq!(run.state, PipelineState::Failed);
    let failure = run.failure.expect("failure");
    assert!(failure.is_timeout());
    assert_eq!(failure.stage(), Stage::Validate);
    assert!(invoice_files(work.path()).is_empty());
}

#[tokio::test]
async fn missing_binary_reports_unavailable() {
    let work = tempfile::tempdir().unwrap();
    let run = pipeline_for(
        PathBuf::from("/nonexistent/zatca/fatoora"),
        work.path(),
        Duration::from_secs(1),
    )
    .run(UNSIGNED)
    .await;
    assert!(run.failure.as_ref().is_some_and(PipelineStageError::is_unavailable));
    assert!(invoice_files(work.path()).is_empty());
}

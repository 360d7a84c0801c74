use std::fs;
use std::sync::Arc;

use anyhow::Result;
use cassvault_ops::{
    BackupPipeline, NodeLease, OpsError, RestorePipeline, ServiceAction,
    ServiceController, SnapshotManager,
};
use cassvault_telemetry::Metrics;
use cassvault_test_support::fixtures::{NodeLayout, snapshot_listing, tree_listing, write_file};
use cassvault_test_support::mocks::{Call, CallLog, FakeAdminTool, FakeSupervisor};

const SERVICE: &str = "cassandra-9999";

fn backup(node: &NodeLayout, lease: &NodeLease) -> Result<()> {
    let tool = FakeAdminTool::new(CallLog::new(), node.data_dir())
        .with_snapshot_file("keyspace1/table-a/snapshots/snap1/a-Data.db", b"alpha rows")
        .with_snapshot_file("keyspace1/table-a/snapshots/snap1/a-Index.db", b"alpha index")
        .with_snapshot_file("keyspace2/table-b/snapshots/snap1/b-Data.db", b"bravo rows");
    BackupPipeline::new(
        SnapshotManager::new(Arc::new(tool)),
        node.data_dir(),
        node.archive_path(),
        Metrics::new()?,
    )
    .run(lease)?;
    Ok(())
}

fn restore(node: &NodeLayout, supervisor: FakeSupervisor, metrics: Metrics) -> RestorePipeline {
    RestorePipeline::new(
        ServiceController::new(Arc::new(supervisor)),
        SERVICE,
        node.data_dir(),
        node.archive_path(),
        metrics,
    )
}

#[test]
fn restore_reproduces_the_archived_snapshot_tree() -> Result<()> {
    let node = NodeLayout::new()?;
    let lease = NodeLease::acquire(node.lock_path())?;
    write_file(&node.data_dir(), "keyspace1/table-a/live-Data.db", b"live")?;
    backup(&node, &lease)?;
    let archived = snapshot_listing(&node.data_dir())?;

    write_file(&node.data_dir(), "keyspace1/table-a/written-after-backup.db", b"new")?;
    let log = CallLog::new();
    let summary = restore(&node, FakeSupervisor::new(log.clone()), Metrics::new()?).run(&lease)?;

    assert_eq!(summary.files, 3);
    assert_eq!(snapshot_listing(&node.data_dir())?, archived);
    let restored = tree_listing(&node.data_dir())?;
    assert!(!restored.contains_key(std::path::Path::new(
        "keyspace1/table-a/written-after-backup.db"
    )));
    assert!(!restored.contains_key(std::path::Path::new("keyspace1/table-a/live-Data.db")));
    assert_eq!(
        log.calls(),
        vec![Call::Stop(SERVICE.to_string()), Call::Start(SERVICE.to_string())]
    );
    Ok(())
}

#[test]
fn stop_failure_leaves_data_and_never_starts() -> Result<()> {
    let node = NodeLayout::new()?;
    let lease = NodeLease::acquire(node.lock_path())?;
    backup(&node, &lease)?;
    let before = tree_listing(&node.data_dir())?;
    let log = CallLog::new();
    let supervisor = FakeSupervisor::new(log.clone()).failing_on(ServiceAction::Stop);

    let result = restore(&node, supervisor, Metrics::new()?).run(&lease);

    assert!(matches!(
        result,
        Err(OpsError::ServiceControl { action: "stop", .. })
    ));
    assert_eq!(tree_listing(&node.data_dir())?, before);
    assert!(!log.started());
    Ok(())
}

#[test]
fn wipe_failure_never_starts() -> Result<()> {
    let node = NodeLayout::new()?;
    let lease = NodeLease::acquire(node.lock_path())?;
    backup(&node, &lease)?;
    fs::remove_dir_all(node.data_dir())?;
    fs::write(node.data_dir(), b"a file where the data directory should be")?;
    let log = CallLog::new();

    let result = restore(&node, FakeSupervisor::new(log.clone()), Metrics::new()?).run(&lease);

    assert!(matches!(
        result,
        Err(OpsError::WipeRefused {
            reason: "not_a_directory",
            ..
        })
    ));
    assert_eq!(log.calls(), vec![Call::Stop(SERVICE.to_string())]);
    Ok(())
}

#[test]
fn unpack_failure_never_starts() -> Result<()> {
    let node = NodeLayout::new()?;
    let lease = NodeLease::acquire(node.lock_path())?;
    backup(&node, &lease)?;
    let log = CallLog::new();
    let supervisor = FakeSupervisor::new(log.clone()).on_stop(node.archive_path(), |archive| {
        // Corrupt the archive after verification has passed.
        let _ = fs::write(archive, b"truncated");
    });
    let metrics = Metrics::new()?;

    let result = restore(&node, supervisor, metrics.clone()).run(&lease);

    assert!(matches!(result, Err(OpsError::Restore { .. })));
    assert!(!log.started());
    let rendered = metrics.render()?;
    assert!(rendered.contains(
        "cassvault_pipeline_steps_total{pipeline=\"restore\",status=\"failed\",step=\"restore_archive\"} 1"
    ));
    assert!(!rendered.contains("step=\"start_service\""));
    Ok(())
}

#[test]
fn corrupt_archive_is_rejected_before_the_service_is_touched() -> Result<()> {
    let node = NodeLayout::new()?;
    let lease = NodeLease::acquire(node.lock_path())?;
    write_file(&node.data_dir(), "ks/live.db", b"live")?;
    fs::write(node.archive_path(), b"not an archive")?;
    let log = CallLog::new();

    let result = restore(&node, FakeSupervisor::new(log.clone()), Metrics::new()?).run(&lease);

    assert!(matches!(result, Err(OpsError::Restore { .. })));
    assert!(log.calls().is_empty());
    assert!(node.data_dir().join("ks/live.db").is_file());
    Ok(())
}

#[test]
fn start_failure_is_reported_after_data_is_restored() -> Result<()> {
    let node = NodeLayout::new()?;
    let lease = NodeLease::acquire(node.lock_path())?;
    backup(&node, &lease)?;
    let archived = snapshot_listing(&node.data_dir())?;
    let log = CallLog::new();
    let supervisor = FakeSupervisor::new(log.clone()).failing_on(ServiceAction::Start);

    let result = restore(&node, supervisor, Metrics::new()?).run(&lease);

    assert!(matches!(
        result,
        Err(OpsError::ServiceControl { action: "start", .. })
    ));
    assert_eq!(snapshot_listing(&node.data_dir())?, archived);
    assert!(log.started());
    Ok(())
}

#[test]
fn archive_inside_the_data_directory_is_refused_before_stop() -> Result<()> {
    let node = NodeLayout::new()?;
    let lease = NodeLease::acquire(node.lock_path())?;
    backup(&node, &lease)?;
    let inside = node.data_dir().join("restore-me.tar.gz");
    fs::copy(node.archive_path(), &inside)?;
    let before = tree_listing(&node.data_dir())?;
    let log = CallLog::new();

    let result = RestorePipeline::new(
        ServiceController::new(Arc::new(FakeSupervisor::new(log.clone()))),
        SERVICE,
        node.data_dir(),
        &inside,
        Metrics::new()?,
    )
    .run(&lease);

    assert!(matches!(
        result,
        Err(OpsError::RestoreRejected {
            reason: "archive_inside_data_directory",
            ..
        })
    ));
    assert!(log.calls().is_empty());
    assert!(inside.is_file());
    assert_eq!(tree_listing(&node.data_dir())?, before);
    Ok(())
}

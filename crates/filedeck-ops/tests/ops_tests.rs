use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use filedeck_core::{EngineConfig, ErrorCategory, OpError};
use filedeck_ops::{
    Engine, Filesystem, OperationEvent, OperationExecutor, OperationKind, OperationRequest,
    ShutdownMode, StdFilesystem,
};
use tempfile::TempDir;

/// Builds `<root>/src` with `a.txt` ("abc") and `sub/b.txt` ("x").
fn sample_src(root: &Path) -> PathBuf {
    let src = root.join("src");
    fs::create_dir_all(src.join("sub")).unwrap();
    fs::write(src.join("a.txt"), b"abc").unwrap();
    fs::write(src.join("sub/b.txt"), b"x").unwrap();
    src
}

/// Every rename fails as if source and target were on different devices.
#[derive(Debug)]
struct CrossDevice;

impl Filesystem for CrossDevice {
    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::other("Invalid cross-device link"))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        StdFilesystem.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        StdFilesystem.remove_dir(path)
    }
}

/// Cross-device, and every file under one directory is undeletable.
#[derive(Debug)]
struct ReadOnlyUnder(PathBuf);

impl Filesystem for ReadOnlyUnder {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        CrossDevice.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if path.starts_with(&self.0) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        StdFilesystem.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        StdFilesystem.remove_dir(path)
    }
}

/// Renames block until the test lets them through.
#[derive(Debug)]
struct Gate(Mutex<mpsc::Receiver<()>>);

impl Filesystem for Gate {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let _ = self.0.lock().unwrap().recv();
        StdFilesystem.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        StdFilesystem.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        StdFilesystem.remove_dir(path)
    }
}

fn gated_engine() -> (Engine, mpsc::Sender<()>) {
    let (open, gate) = mpsc::channel();
    let engine = Engine::default().with_filesystem(Arc::new(Gate(Mutex::new(gate))));
    (engine, open)
}

#[test]
fn test_compress_then_extract_src_tree() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let archive = temp.path().join("out.zip");
    let engine = Engine::default();

    engine.compress(&[src.clone()], &archive).unwrap();
    let root = engine.extract(&archive, None).unwrap();

    assert_eq!(root, temp.path().join("out_extracted"));
    assert_eq!(fs::read(root.join("src/a.txt")).unwrap(), b"abc");
    assert_eq!(fs::read(root.join("src/sub/b.txt")).unwrap(), b"x");
    assert!(src.join("a.txt").exists());
}

#[test]
fn test_compress_round_trip_of_mixed_sources() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let notes = temp.path().join("notes.md");
    fs::write(&notes, b"# notes").unwrap();
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();
    let engine = Engine::default();

    let outcome = engine.execute(
        &OperationRequest::compress(vec![notes, src], &out),
        |_| {},
    );
    assert!(outcome.is_success(), "{}", outcome.summary());
    assert_eq!(outcome.success_count, 1);

    let archive = out.join("notes.md_and_1_more.zip");
    let root = engine.extract(&archive, None).unwrap();

    assert_eq!(root, out.join("notes.md_and_1_more_extracted"));
    assert_eq!(fs::read(root.join("notes.md")).unwrap(), b"# notes");
    assert_eq!(fs::read(root.join("src/a.txt")).unwrap(), b"abc");
    assert_eq!(fs::read(root.join("src/sub/b.txt")).unwrap(), b"x");
}

#[test]
fn test_compress_batch_never_overwrites_archive() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    fs::write(temp.path().join("src.zip"), b"older archive").unwrap();

    let outcome = Engine::default().execute(
        &OperationRequest::compress(vec![src], temp.path()),
        |_| {},
    );

    assert!(outcome.is_success());
    assert_eq!(fs::read(temp.path().join("src.zip")).unwrap(), b"older archive");
    assert!(temp.path().join("src (1).zip").is_file());
}

#[test]
fn test_extract_rejects_zip_slip() {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("a/b");
    fs::create_dir_all(&work).unwrap();
    let archive = work.join("evil.zip");

    let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("../../evil.txt", options).unwrap();
    writer.write_all(b"pwned").unwrap();
    writer.finish().unwrap();

    let result = Engine::default().extract(&archive, None);

    match result {
        Err(err @ OpError::PathTraversal { .. }) => {
            assert_eq!(err.category(), ErrorCategory::Security);
        }
        other => panic!("expected traversal rejection, got {other:?}"),
    }
    assert!(!temp.path().join("a/evil.txt").exists());
    assert!(!temp.path().join("evil.txt").exists());
    assert!(!work.join("evil_extracted").exists());
}

#[test]
fn test_move_falls_back_across_devices() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let dest = temp.path().join("dest");
    fs::create_dir(&dest).unwrap();
    let engine = Engine::default().with_filesystem(Arc::new(CrossDevice));

    let outcome = engine.execute(&OperationRequest::move_to(vec![src.clone()], &dest), |_| {});

    assert!(outcome.is_success(), "{}", outcome.summary());
    assert!(!src.exists());
    assert_eq!(fs::read(dest.join("src/a.txt")).unwrap(), b"abc");
    assert_eq!(fs::read(dest.join("src/sub/b.txt")).unwrap(), b"x");
}

#[test]
fn test_critical_move_is_reported_and_compensated() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let dest = temp.path().join("dest");
    fs::create_dir(&dest).unwrap();
    let engine = Engine::default().with_filesystem(Arc::new(ReadOnlyUnder(src.clone())));

    let outcome = engine.execute(&OperationRequest::move_to(vec![src.clone()], &dest), |_| {});

    assert_eq!(outcome.failure_count, 1);
    let error = outcome.first_error().unwrap();
    assert_eq!(error.category, ErrorCategory::Critical);
    assert!(error.message.contains("copy removed"), "{}", error.message);
    // Nothing left the source, so the whole copy was removed again.
    assert!(src.join("a.txt").exists());
    assert!(src.join("sub/b.txt").exists());
    assert!(!dest.join("src").exists());
}

#[test]
fn test_self_nesting_rejected_for_copy_and_move() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let inner = src.join("sub");
    let engine = Engine::default();

    for request in [
        OperationRequest::copy(vec![src.clone()], &inner),
        OperationRequest::move_to(vec![src.clone()], &inner),
    ] {
        let outcome = engine.execute(&request, |_| {});
        assert_eq!(outcome.failure_count, 1);
        assert_eq!(
            outcome.first_error().unwrap().category,
            ErrorCategory::Validation
        );
    }

    assert!(!inner.join("src").exists());
    assert_eq!(fs::read(src.join("a.txt")).unwrap(), b"abc");
}

#[test]
fn test_identical_paths_are_noops() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let engine = Engine::default();

    assert_eq!(engine.copy(&src, &src.join("../src")).unwrap(), 0);
    assert_eq!(engine.move_into(&src, temp.path()).unwrap(), src);
    assert_eq!(fs::read(src.join("a.txt")).unwrap(), b"abc");
}

#[test]
fn test_copy_batch_renames_on_conflict() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("test.txt");
    fs::write(&file, b"one").unwrap();
    let engine = Engine::default();

    for _ in 0..2 {
        let outcome = engine.execute(&OperationRequest::copy(vec![file.clone()], temp.path()), |_| {});
        assert!(outcome.is_success());
    }

    assert_eq!(fs::read(temp.path().join("test (1).txt")).unwrap(), b"one");
    assert_eq!(fs::read(temp.path().join("test (2).txt")).unwrap(), b"one");
}

#[test]
fn test_delete_batch_counts_every_source() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let loose = temp.path().join("loose.txt");
    fs::write(&loose, b"").unwrap();
    let engine = Engine::default().with_filesystem(Arc::new(ReadOnlyUnder(src.join("sub"))));

    let mut seen = Vec::new();
    let outcome = engine.execute(
        &OperationRequest::delete(vec![src.clone(), loose.clone()]),
        |progress| seen.push((progress.current_item, progress.index, progress.total)),
    );

    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.failure_count, 1);
    assert_eq!(seen, [("src".to_string(), 0, 2), ("loose.txt".to_string(), 1, 2)]);
    assert!(!loose.exists());
    assert!(!src.join("a.txt").exists());
    assert!(src.join("sub/b.txt").exists());
}

#[tokio::test]
async fn test_executor_runs_in_submission_order() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_path_buf();
    let changed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changed);
    let executor = OperationExecutor::new(Default::default())
        .with_directory_listener(move |path| sink.lock().unwrap().push(path.to_path_buf()));

    // Each request only validates if the previous one already ran.
    let create = executor
        .submit(OperationRequest::create_folder(&dir, "a"))
        .await
        .unwrap();
    let rename = executor
        .submit(OperationRequest::rename(dir.join("a"), "b"))
        .await
        .unwrap();
    let delete = executor
        .submit(OperationRequest::delete(vec![dir.join("b")]))
        .await
        .unwrap();
    assert!(create.id() < rename.id() && rename.id() < delete.id());

    for handle in [create, rename, delete] {
        let kind = handle.kind();
        let outcome = handle.wait(|_| {}).await;
        assert!(outcome.is_success(), "{kind}: {}", outcome.summary());
    }

    assert!(!dir.join("a").exists());
    assert!(!dir.join("b").exists());
    assert_eq!(*changed.lock().unwrap(), vec![dir.clone(), dir.clone(), dir]);

    executor.shutdown(ShutdownMode::Drain).await;
}

#[tokio::test]
async fn test_executor_streams_progress_then_outcome() {
    let temp = TempDir::new().unwrap();
    let names = ["x", "y", "z"];
    let sources: Vec<PathBuf> = names.iter().map(|n| temp.path().join(n)).collect();
    for source in &sources {
        fs::write(source, b"").unwrap();
    }
    let executor = OperationExecutor::new(Default::default());

    let mut handle = executor
        .submit(OperationRequest::delete(sources))
        .await
        .unwrap();

    let mut progress = Vec::new();
    let outcome = loop {
        match handle.recv().await.unwrap() {
            OperationEvent::Progress(update) => progress.push(update.current_item),
            OperationEvent::Complete(outcome) => break outcome,
        }
    };

    assert_eq!(progress, names);
    assert_eq!(outcome.kind, OperationKind::Delete);
    assert_eq!(outcome.success_count, 3);
    assert!(handle.recv().await.is_none());
}

#[tokio::test]
async fn test_unread_handle_does_not_stall_later_operations() {
    let temp = TempDir::new().unwrap();
    let sources: Vec<PathBuf> = (0..5).map(|i| temp.path().join(format!("f{i}"))).collect();
    for source in &sources {
        fs::write(source, b"").unwrap();
    }
    let config = EngineConfig::builder()
        .event_channel_size(2usize)
        .build()
        .unwrap();
    let executor = OperationExecutor::new(config);

    // More progress than the channel holds, and nobody reading it yet.
    let first = executor
        .submit(OperationRequest::delete(sources.clone()))
        .await
        .unwrap();
    let second = executor
        .submit(OperationRequest::create_folder(temp.path(), "later"))
        .await
        .unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), second.wait(|_| {}))
        .await
        .expect("second operation stalled behind the first");
    assert!(outcome.is_success(), "{}", outcome.summary());
    assert!(temp.path().join("later").is_dir());

    let mut progress = 0;
    let outcome = first.wait(|_| progress += 1).await;
    assert_eq!(outcome.success_count, 5);
    assert!(progress <= 2);
    assert!(sources.iter().all(|source| !source.exists()));

    executor.shutdown(ShutdownMode::Drain).await;
}

#[tokio::test]
async fn test_cancelled_operation_leaves_tree_alone() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let blocker = temp.path().join("blocker.txt");
    fs::write(&blocker, b"").unwrap();
    let (engine, open) = gated_engine();
    let executor = OperationExecutor::with_engine(engine);

    let first = executor
        .submit(OperationRequest::rename(&blocker, "moved.txt"))
        .await
        .unwrap();
    let second = executor
        .submit(OperationRequest::delete(vec![src.clone()]))
        .await
        .unwrap();
    second.cancel();
    open.send(()).unwrap();

    assert!(first.wait(|_| {}).await.is_success());
    let outcome = second.wait(|_| {}).await;
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.success_count, 0);
    assert!(src.join("sub/b.txt").exists());

    executor.shutdown(ShutdownMode::Drain).await;
}

#[tokio::test]
async fn test_shutdown_cancel_completes_queued_work_as_cancelled() {
    let temp = TempDir::new().unwrap();
    let src = sample_src(temp.path());
    let blocker = temp.path().join("blocker.txt");
    fs::write(&blocker, b"").unwrap();
    let (engine, open) = gated_engine();
    let executor = OperationExecutor::with_engine(engine);

    let first = executor
        .submit(OperationRequest::rename(&blocker, "moved.txt"))
        .await
        .unwrap();
    let queued = executor
        .submit(OperationRequest::delete(vec![src.clone()]))
        .await
        .unwrap();

    // Let the gated rename through only once shutdown has cancelled.
    let token = queued.cancellation_token();
    let releaser = std::thread::spawn(move || {
        while !token.is_cancelled() {
            std::thread::sleep(Duration::from_millis(5));
        }
        let _ = open.send(());
    });

    executor.shutdown(ShutdownMode::Cancel).await;
    releaser.join().unwrap();

    let _ = first.wait(|_| {}).await;
    let outcome = queued.wait(|_| {}).await;
    assert!(outcome.is_cancelled());
    assert!(src.join("a.txt").exists());
}

#[tokio::test]
async fn test_shutdown_drain_finishes_queued_work() {
    let temp = TempDir::new().unwrap();
    let executor = OperationExecutor::new(Default::default());

    let handles = vec![
        executor
            .submit(OperationRequest::create_folder(temp.path(), "one"))
            .await
            .unwrap(),
        executor
            .submit(OperationRequest::create_folder(temp.path(), "two"))
            .await
            .unwrap(),
    ];
    executor.shutdown(ShutdownMode::Drain).await;

    for handle in handles {
        assert!(handle.wait(|_| {}).await.is_success());
    }
    assert!(temp.path().join("one").is_dir());
    assert!(temp.path().join("two").is_dir());
}

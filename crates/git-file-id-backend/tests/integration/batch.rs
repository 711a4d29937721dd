// Copyright 2026 Oxide Computer Company

use anyhow::Result;
use async_trait::async_trait;
use git_file_id::{
    BatchInput, BatchInputError, BatchStatus, IdentifyError, RawMetadata,
    build_manifest, diff,
};
use git_file_id_backend::{
    BatchError, BatchOptions, BatchProcessor, MetadataBackend, ProgressCallback,
    run_batch,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// A backend that fabricates metadata, optionally sleeping or failing per
/// path, and records how many fetches ran at once.
#[derive(Default)]
struct FakeBackend {
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    panics: HashSet<String>,
    revision: u8,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBackend {
    fn with_delay(mut self, path: &str, millis: u64) -> Self {
        self.delays.insert(path.to_owned(), Duration::from_millis(millis));
        self
    }

    fn failing(mut self, path: &str) -> Self {
        self.failures.insert(path.to_owned());
        self
    }

    fn panicking(mut self, path: &str) -> Self {
        self.panics.insert(path.to_owned());
        self
    }

    fn revision(mut self, revision: u8) -> Self {
        self.revision = revision;
        self
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// A 40-character hash derived from `path` and `revision`.
fn fake_hash(path: &str, revision: u8) -> String {
    let seed = path
        .bytes()
        .fold(u128::from(revision), |acc, b| acc.wrapping_mul(31).wrapping_add(u128::from(b)));
    format!("{seed:040x}")
}

#[async_trait]
impl MetadataBackend for FakeBackend {
    async fn fetch(&self, input: &BatchInput) -> Result<RawMetadata, IdentifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let path = input.file_path();
        let delay = self.delays.get(path).copied().unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panics.contains(path) {
            panic!("fake backend panicked on {path}");
        }
        if self.failures.contains(path) {
            return Err(IdentifyError::FileNotFound {
                file_path: path.to_owned(),
                reason: "fake failure".to_owned(),
            });
        }
        Ok(RawMetadata {
            source: Some("local-git".to_owned()),
            owner: Some("octo".to_owned()),
            repo: Some("widgets".to_owned()),
            branch: Some("main".to_owned()),
            commit_hash: Some(fake_hash("commit", self.revision)),
            file_hash: Some(fake_hash(path, self.revision)),
            file_path: Some(path.to_owned()),
            last_modified: Some("2024-01-15T10:30:00Z".to_owned()),
            ..Default::default()
        })
    }
}

fn inputs(paths: &[&str]) -> Vec<BatchInput> {
    paths.iter().map(|p| BatchInput::local("/repo", *p)).collect()
}

fn paths(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("file{i}.rs")).collect()
}

#[tokio::test]
async fn test_results_keep_input_order() -> Result<()> {
    let names = paths(10);
    let mut backend = FakeBackend::default();
    // Earlier items take longer, so completion order is reversed.
    for (i, name) in names.iter().enumerate() {
        backend = backend.with_delay(name, 10 * (10 - i as u64));
    }
    let backend = Arc::new(backend);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let options = BatchOptions { concurrency: 3, ..Default::default() };
    let results = run_batch(backend.clone(), inputs(&refs), &options, None).await?;

    let result_paths: Vec<&str> = results.iter().map(|r| r.file_path.as_str()).collect();
    assert_eq!(result_paths, refs);
    assert!(results.iter().all(|r| r.status() == BatchStatus::Success));
    assert!(
        backend.max_in_flight() <= 3,
        "at most 3 fetches in flight, saw {}",
        backend.max_in_flight()
    );
    Ok(())
}

#[tokio::test]
async fn test_progress_strictly_increasing() -> Result<()> {
    let names = paths(10);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let progress: ProgressCallback = {
        let seen = seen.clone();
        Arc::new(move |done: usize, total: usize| seen.lock().unwrap().push((done, total)))
    };

    let backend = Arc::new(FakeBackend::default().failing("file3.rs"));
    let options = BatchOptions { concurrency: 4, ..Default::default() };
    run_batch(backend, inputs(&refs), &options, Some(progress)).await?;

    let expected: Vec<(usize, usize)> = (1..=10).map(|i| (i, 10)).collect();
    assert_eq!(*seen.lock().unwrap(), expected, "failures count as progress");
    Ok(())
}

#[tokio::test]
async fn test_failures_are_isolated() -> Result<()> {
    let backend = Arc::new(FakeBackend::default().failing("b.rs"));
    let results =
        run_batch(backend, inputs(&["a.rs", "b.rs", "c.rs"]), &BatchOptions::default(), None)
            .await?;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status(), BatchStatus::Success);
    assert_eq!(results[2].status(), BatchStatus::Success);

    let failed = &results[1];
    assert_eq!(failed.status(), BatchStatus::Error);
    assert_eq!(failed.identifier(), None);
    let message = failed.error_message().expect("failed items carry a message");
    assert!(message.contains("b.rs") && message.contains("fake failure"), "message: {message}");
    Ok(())
}

#[tokio::test]
async fn test_fail_fast() -> Result<()> {
    let backend = Arc::new(
        FakeBackend::default().failing("b.rs").with_delay("c.rs", 5_000),
    );
    let options = BatchOptions { continue_on_error: false, ..Default::default() };

    let err = run_batch(backend, inputs(&["a.rs", "b.rs", "c.rs"]), &options, None)
        .await
        .expect_err("the first failure aborts the batch");
    match err {
        BatchError::ItemFailed { index, file_path, error } => {
            assert_eq!(index, 1);
            assert_eq!(file_path, "b.rs");
            assert!(matches!(error, IdentifyError::FileNotFound { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_empty_batch() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let progress: ProgressCallback = {
        let calls = calls.clone();
        Arc::new(move |_: usize, _: usize| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    let results = run_batch(
        Arc::new(FakeBackend::default()),
        Vec::new(),
        &BatchOptions::default(),
        Some(progress),
    )
    .await?;
    assert!(results.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_input_rejected_before_work() -> Result<()> {
    let backend = Arc::new(FakeBackend::default());
    let batch = vec![
        BatchInput::local("/repo", "a.rs"),
        BatchInput::github("", "widgets", "b.rs"),
    ];

    let err = run_batch(backend.clone(), batch, &BatchOptions::default(), None)
        .await
        .expect_err("an empty owner is invalid");
    assert!(
        matches!(
            err,
            BatchError::InvalidInput(BatchInputError::MissingField { index: 1, .. })
        ),
        "unexpected error: {err}"
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0, "no fetch was started");
    Ok(())
}

#[tokio::test]
async fn test_zero_concurrency_runs_serially() -> Result<()> {
    let backend = Arc::new(FakeBackend::default());
    let options = BatchOptions { concurrency: 0, ..Default::default() };
    let results =
        run_batch(backend.clone(), inputs(&["a", "b", "c", "d"]), &options, None).await?;
    assert_eq!(results.len(), 4);
    assert_eq!(backend.max_in_flight(), 1);
    Ok(())
}

#[tokio::test]
async fn test_worker_panic() -> Result<()> {
    let backend = Arc::new(FakeBackend::default().panicking("boom.rs"));
    let err = run_batch(backend, inputs(&["ok.rs", "boom.rs"]), &BatchOptions::default(), None)
        .await
        .expect_err("a panicking worker fails the batch");
    assert!(matches!(err, BatchError::TaskFailed(_)), "unexpected error: {err}");
    Ok(())
}

#[tokio::test]
async fn test_processor_notifies_every_listener() -> Result<()> {
    let first = Arc::new(AtomicUsize::new(0));
    let last_seen = Arc::new(Mutex::new(None));

    let processor = BatchProcessor::new(BatchOptions { concurrency: 2, ..Default::default() })
        .on_progress({
            let first = first.clone();
            move |_, _| {
                first.fetch_add(1, Ordering::SeqCst);
            }
        })
        .on_progress({
            let last_seen = last_seen.clone();
            move |done, total| *last_seen.lock().unwrap() = Some((done, total))
        });

    let backend: Arc<dyn MetadataBackend> = Arc::new(FakeBackend::default());
    let results = processor.process(backend, inputs(&["a", "b", "c", "d", "e"])).await?;

    assert_eq!(results.len(), 5);
    assert_eq!(first.load(Ordering::SeqCst), 5);
    assert_eq!(*last_seen.lock().unwrap(), Some((5, 5)));
    Ok(())
}

#[tokio::test]
async fn test_batch_feeds_change_detection() -> Result<()> {
    let batch = inputs(&["keep.rs", "edit.rs", "gone.rs"]);
    let before = run_batch(
        Arc::new(FakeBackend::default()),
        batch,
        &BatchOptions::default(),
        None,
    )
    .await?;
    let manifest = build_manifest(&before);
    assert_eq!(manifest.len(), 3);

    // A new revision changes every file hash; identify only a subset, with
    // one of them failing.
    let after = run_batch(
        Arc::new(FakeBackend::default().revision(1).failing("keep.rs")),
        inputs(&["keep.rs", "edit.rs", "new.rs"]),
        &BatchOptions::default(),
        None,
    )
    .await?;
    let report = diff(&after, &manifest);

    assert_eq!(report.added, vec!["new.rs".to_owned()]);
    assert_eq!(report.modified, vec!["edit.rs".to_owned()]);
    assert!(report.unchanged.is_empty());
    assert_eq!(report.removed, vec!["gone.rs".to_owned()]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].file_path, "keep.rs");
    assert!(report.has_changes());
    Ok(())
}

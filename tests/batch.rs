//! Integration tests for the queue → convert → export flow.
//!
//! Converters are closures, so nothing here needs the external converter
//! program. Set `RUST_LOG=debug` to see the library's tracing output:
//!   RUST_LOG=debug cargo test --test batch -- --nocapture

use mdbatch::{
    BatchConfig, BatchError, BatchObserver, BatchQueue, CollisionPolicy, ConversionSummary,
    ConvertError, Converter, Exporter, ItemStatus, NoopObserver, QueueItem,
};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_file(dir: &TempDir, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

fn converter(
    f: impl Fn(&Path) -> Result<String, ConvertError> + Send + Sync + 'static,
) -> Arc<dyn Converter> {
    Arc::new(f)
}

/// Returns `# <file name>`; fails for any file whose name contains "broken".
fn heading_converter(calls: Arc<AtomicUsize>) -> Arc<dyn Converter> {
    converter(move |path| {
        calls.fetch_add(1, Ordering::SeqCst);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if name.contains("broken") {
            Err(ConvertError::failed("corrupt stream"))
        } else {
            Ok(format!("# {name}\n"))
        }
    })
}

fn assert_invariant(items: &[QueueItem]) {
    for item in items {
        assert_eq!(
            item.status() == ItemStatus::Completed,
            !item.content().is_empty(),
            "content invariant broken for {}",
            item.display_name()
        );
        assert_eq!(
            item.status() == ItemStatus::Error,
            item.error().is_some_and(|e| !e.is_empty()),
            "error invariant broken for {}",
            item.display_name()
        );
    }
}

fn zip_entries(bytes: Vec<u8>) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Any `.mdbatch-*.zip.tmp` left anywhere under `root`.
fn leftover_temp_archives(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.into_path())
        .filter(|p| {
            let name = p.file_name().unwrap_or_default().to_string_lossy();
            name.starts_with(".mdbatch-") && name.ends_with(".zip.tmp")
        })
        .collect()
}

async fn converted_queue(dir: &TempDir) -> BatchQueue {
    let queue = BatchQueue::default();
    queue
        .add([
            write_file(dir, "in/a.docx", b"a"),
            write_file(dir, "in/broken.pdf", b"b"),
        ])
        .unwrap();
    queue
        .process_all(heading_converter(Arc::default()), Arc::new(NoopObserver))
        .await
        .unwrap();
    queue
}

// ── Queue properties ─────────────────────────────────────────────────────────

#[test]
fn test_adding_the_same_path_twice_adds_once() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(&dir, "a.pdf", b"%PDF");
    let queue = BatchQueue::default();

    queue.add([&file]).unwrap();
    queue.add([&file]).unwrap();
    assert_eq!(queue.len(), 1);
}

#[cfg(target_os = "linux")]
#[test]
fn test_scan_keeps_case_variant_names() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir, "a.pdf", b"lower");
    write_file(&dir, "a.PDF", b"upper");

    let queue = BatchQueue::default();
    assert_eq!(queue.add_directory(dir.path()).unwrap(), 2);
}

#[tokio::test]
async fn test_status_and_content_stay_consistent() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue
        .add([
            write_file(&dir, "good.docx", b"doc"),
            write_file(&dir, "broken.pdf", b"pdf"),
            write_file(&dir, "empty.txt", b""),
            write_file(&dir, "spaces.txt", b"   "),
        ])
        .unwrap();
    assert_invariant(&queue.snapshot());

    let conv = converter(|path| {
        if path.ends_with("broken.pdf") {
            Err(ConvertError::failed(""))
        } else if path.ends_with("empty.txt") {
            Ok(String::new())
        } else if path.ends_with("spaces.txt") {
            Ok("   \n".to_string())
        } else {
            Ok("# Good\n".to_string())
        }
    });
    queue.process_all(conv, Arc::new(NoopObserver)).await.unwrap();

    let items = queue.snapshot();
    assert_invariant(&items);
    assert_eq!(items[1].error(), Some("Unknown conversion error"));
    assert_eq!(items[2].error(), Some("No content extracted"));
    assert_eq!(items[3].status(), ItemStatus::Completed);
    assert_eq!(items[3].content(), "   \n");
}

#[tokio::test]
async fn test_default_config_stores_converter_text_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue
        .add([
            write_file(&dir, "hello.docx", b"h"),
            write_file(&dir, "emoji.html", b"e"),
            write_file(&dir, "crlf.csv", b"c"),
        ])
        .unwrap();

    let emoji = "dev \u{1F468}\u{200D}\u{1F4BB} co\u{00AD}operate";
    let conv = converter(move |path| {
        Ok(match path.extension().and_then(|e| e.to_str()) {
            Some("docx") => "Hello".to_string(),
            Some("html") => emoji.to_string(),
            _ => "a,b  \r\n\r\n\r\n\r\n\r\n".to_string(),
        })
    });
    queue.process_all(conv, Arc::new(NoopObserver)).await.unwrap();

    assert_eq!(queue.get(0).unwrap().content().as_bytes(), b"Hello");
    assert_eq!(queue.get(1).unwrap().content(), emoji);
    assert_eq!(queue.get(2).unwrap().content(), "a,b  \r\n\r\n\r\n\r\n\r\n");

    let entries = Exporter::default().export_zip_bytes(&queue.snapshot()).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(entries)).unwrap();
    let mut stored = Vec::new();
    archive.by_name("hello.md").unwrap().read_to_end(&mut stored).unwrap();
    assert_eq!(stored, b"Hello");
}

#[tokio::test]
async fn test_cleanup_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let config = BatchConfig::builder().clean_output(true).build().unwrap();
    let queue = BatchQueue::new(config);
    queue.add([write_file(&dir, "a.docx", b"a")]).unwrap();

    let conv = converter(|_| Ok("\u{FEFF}# A  \r\n".to_string()));
    queue.process_all(conv, Arc::new(NoopObserver)).await.unwrap();
    assert_eq!(queue.get(0).unwrap().content(), "# A\n");
}

#[tokio::test]
async fn test_second_pass_does_not_reconvert_completed_items() {
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue
        .add([write_file(&dir, "a.docx", b"a"), write_file(&dir, "b.docx", b"b")])
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    queue
        .process_all(heading_converter(calls.clone()), Arc::new(NoopObserver))
        .await
        .unwrap();
    let before = queue.snapshot();

    let report = queue
        .process_all(heading_converter(calls.clone()), Arc::new(NoopObserver))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.attempted, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(queue.snapshot(), before);
}

#[tokio::test]
async fn test_broken_file_is_recorded_and_the_batch_continues() {
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue
        .add([
            write_file(&dir, "broken.pdf", b"%PDF-garbage"),
            write_file(&dir, "next.docx", b"doc"),
        ])
        .unwrap();

    let report = queue
        .process_all(heading_converter(Arc::default()), Arc::new(NoopObserver))
        .await
        .unwrap();

    let broken = queue.get(0).unwrap();
    assert_eq!(broken.status(), ItemStatus::Error);
    assert_eq!(broken.error(), Some("corrupt stream"));
    assert_eq!(queue.get(1).unwrap().status(), ItemStatus::Completed);
    assert_eq!((report.completed, report.failed), (1, 1));
}

#[tokio::test]
async fn test_cancel_before_processing_leaves_items_pending() {
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue.add([write_file(&dir, "a.pdf", b"a")]).unwrap();

    /// Cancels from inside the batch-start event, before any item.
    struct CancelAtStart(BatchQueue);
    impl BatchObserver for CancelAtStart {
        fn on_batch_start(&self, _to_process: usize) {
            self.0.cancel();
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let report = queue
        .process_all(
            heading_converter(calls.clone()),
            Arc::new(CancelAtStart(queue.clone())),
        )
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(queue.stats().pending, 1);
    assert!(!queue.is_processing());
}

#[tokio::test]
async fn test_observer_sees_every_item_in_order() {
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);
    impl BatchObserver for Recorder {
        fn on_item_complete(&self, index: usize, name: &str, _len: usize) {
            self.0.lock().unwrap().push(format!("ok {index} {name}"));
        }
        fn on_item_error(&self, index: usize, name: &str, error: &str) {
            self.0.lock().unwrap().push(format!("err {index} {name}: {error}"));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue
        .add([
            write_file(&dir, "one.docx", b"1"),
            write_file(&dir, "broken.pdf", b"2"),
            write_file(&dir, "three.pptx", b"3"),
        ])
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    queue
        .process_all(heading_converter(Arc::default()), recorder.clone())
        .await
        .unwrap();

    assert_eq!(
        *recorder.0.lock().unwrap(),
        vec![
            "ok 0 one.docx",
            "err 1 broken.pdf: corrupt stream",
            "ok 2 three.pptx",
        ]
    );
}

// ── Export scenarios ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_report_docx_exports_to_timestamped_folder() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_file(&dir, "in/report.docx", &vec![0u8; 500_000]);
    let queue = BatchQueue::default();
    queue.add([&source]).unwrap();

    let text = "# Quarterly Report\n\nRevenue grew.\n";
    queue
        .process_all(converter(move |_| Ok(text.to_string())), Arc::new(NoopObserver))
        .await
        .unwrap();
    assert_eq!(queue.get(0).unwrap().status(), ItemStatus::Completed);

    let out = dir.path().join("out");
    let report = queue.export_folder(&out).unwrap();
    let root = report.location;
    assert!(root
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("markitdown_export_"));
    assert_eq!(std::fs::read_to_string(root.join("report.md")).unwrap(), text);

    let summary: ConversionSummary =
        serde_json::from_str(&std::fs::read_to_string(root.join("conversion_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary.conversion_info.completed_files, 1);
    assert_eq!(summary.conversion_info.error_files, 0);
    assert_eq!(summary.files[0].original_size, 500_000);
    assert_eq!(summary.files[0].markdown_size, text.chars().count());

    let index = std::fs::read_to_string(root.join("README.md")).unwrap();
    assert!(index.contains("- [report.docx](report.md) (488.3 KB)"), "index:\n{index}");
}

#[tokio::test]
async fn test_archive_holds_only_completed_items() {
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue
        .add([
            write_file(&dir, "done.docx", b"1"),
            write_file(&dir, "broken.pdf", b"2"),
        ])
        .unwrap();
    queue
        .process_all(heading_converter(Arc::default()), Arc::new(NoopObserver))
        .await
        .unwrap();
    // Added after the pass, so it stays Pending.
    queue.add([write_file(&dir, "later.xlsx", b"3")]).unwrap();

    let exporter = Exporter::new(queue.config().export.clone()).unwrap();
    let entries = zip_entries(exporter.export_zip_bytes(&queue.snapshot()).unwrap());
    assert_eq!(entries, vec!["README.md", "conversion_summary.json", "done.md"]);
}

#[tokio::test]
async fn test_preserved_structure_nests_under_common_ancestor() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir, "proj/specs/a.docx", b"a");
    write_file(&dir, "proj/notes/deep/b.pdf", b"b");
    let queue = BatchQueue::default();
    queue.add_directory(dir.path().join("proj")).unwrap();

    queue
        .process_all(heading_converter(Arc::default()), Arc::new(NoopObserver))
        .await
        .unwrap();

    let zip_path = dir.path().join("export.zip");
    let report = queue.export_zip(&zip_path).unwrap();
    assert_eq!(report.location, zip_path);
    assert_eq!(report.files_written, 2);

    let entries = zip_entries(std::fs::read(&zip_path).unwrap());
    assert!(entries.contains(&"specs/a.md".to_string()), "{entries:?}");
    assert!(entries.contains(&"notes/deep/b.md".to_string()), "{entries:?}");
}

#[tokio::test]
async fn test_flattened_collision_policies() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(&dir, "x/a.pdf", b"first");
    let second = write_file(&dir, "y/a.pdf", b"second");

    let flat = BatchConfig::builder().preserve_structure(false).build().unwrap();
    let queue = BatchQueue::new(flat);
    queue.add([&first, &second]).unwrap();
    queue
        .process_all(
            converter(|p| Ok(std::fs::read_to_string(p).unwrap())),
            Arc::new(NoopObserver),
        )
        .await
        .unwrap();

    let report = queue.export_folder(dir.path().join("out")).unwrap();
    assert_eq!(report.collisions, 1);
    assert_eq!(
        std::fs::read_to_string(report.location.join("a.md")).unwrap(),
        "second"
    );

    let strict = Exporter::new(mdbatch::ExportOptions {
        preserve_structure: false,
        collision_policy: CollisionPolicy::Error,
        ..Default::default()
    })
    .unwrap();
    let err = strict.export_zip_bytes(&queue.snapshot()).unwrap_err();
    assert!(matches!(err, BatchError::OutputCollision { .. }), "got: {err}");
}

#[tokio::test]
async fn test_zip_entry_text_matches_item_content() {
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue.add([write_file(&dir, "slides.pptx", b"ppt")]).unwrap();
    queue
        .process_all(heading_converter(Arc::default()), Arc::new(NoopObserver))
        .await
        .unwrap();

    let out = dir.path().join("zips");
    std::fs::create_dir(&out).unwrap();
    let report = queue.export_zip(&out).unwrap();
    assert_eq!(report.location.parent(), Some(out.as_path()));

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&report.location).unwrap()).unwrap();
    let mut text = String::new();
    archive
        .by_name("slides.md")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, queue.get(0).unwrap().content());
}

#[test]
fn test_export_with_nothing_completed_fails() {
    let dir = tempfile::tempdir().unwrap();
    let queue = BatchQueue::default();
    queue.add([write_file(&dir, "a.pdf", b"a")]).unwrap();
    assert!(matches!(
        queue.export_zip(dir.path()),
        Err(BatchError::NothingToExport)
    ));
}

// ── Export failures ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_folder_export_under_a_regular_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let queue = converted_queue(&dir).await;
    let blocker = write_file(&dir, "file.txt", b"not a directory");
    let before = queue.snapshot();

    let err = queue.export_folder(blocker.join("out")).unwrap_err();
    assert!(
        matches!(err, BatchError::OutputWriteFailed { .. }),
        "got: {err:?}"
    );
    assert_eq!(queue.snapshot(), before);
    assert_eq!(std::fs::read(&blocker).unwrap(), b"not a directory");
}

#[tokio::test]
async fn test_zip_export_under_a_regular_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let queue = converted_queue(&dir).await;
    let blocker = write_file(&dir, "file.txt", b"not a directory");
    let before = queue.snapshot();

    let err = queue.export_zip(blocker.join("out.zip")).unwrap_err();
    match &err {
        BatchError::OutputWriteFailed { path, .. } => assert_eq!(path, &blocker),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(queue.snapshot(), before);
    assert!(!blocker.join("out.zip").exists());
    assert!(leftover_temp_archives(dir.path()).is_empty());
}

#[tokio::test]
async fn test_successful_zip_export_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let queue = converted_queue(&dir).await;
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let report = queue.export_zip(&out).unwrap();
    assert_eq!(report.location.parent(), Some(out.as_path()));
    assert!(report.location.is_file());
    assert!(leftover_temp_archives(dir.path()).is_empty());
}

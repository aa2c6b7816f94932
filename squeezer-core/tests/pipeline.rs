mod support;

use std::sync::Arc;
use std::time::Duration;

use squeezer_core::{FileTask, PipelineOutcome, ProcessingPipeline};
use support::{CopyTranscoder, FailingTranscoder, layout_in, write_source};
use tempfile::tempdir;

#[tokio::test]
async fn existing_output_skips_transcode_and_move() {
    let tmp = tempdir().unwrap();
    let layout = layout_in(&tmp);
    let source = write_source(&layout, "a.mp4", b"original");
    std::fs::write(layout.output.join("a.mp4"), b"compressed earlier").unwrap();

    let transcoder = Arc::new(CopyTranscoder::default());
    let pipeline = ProcessingPipeline::new(layout.clone(), transcoder.clone());

    let outcome = pipeline.process(FileTask::new(&source)).await;

    assert_eq!(
        outcome,
        PipelineOutcome::AlreadyCompressed {
            output: layout.output.join("a.mp4")
        }
    );
    assert_eq!(transcoder.call_count(), 0);
    assert!(source.exists());
    assert!(!layout.archive.join("a.mp4").exists());
    assert_eq!(
        std::fs::read(layout.output.join("a.mp4")).unwrap(),
        b"compressed earlier"
    );
}

#[tokio::test]
async fn successful_run_publishes_output_and_archives_source() {
    let tmp = tempdir().unwrap();
    let layout = layout_in(&tmp);
    let source = write_source(&layout, "b.mp4", b"video bytes");

    let transcoder = Arc::new(CopyTranscoder::default());
    let pipeline = ProcessingPipeline::new(layout.clone(), transcoder.clone());

    let outcome = pipeline.process(FileTask::new(&source)).await;

    assert_eq!(
        outcome,
        PipelineOutcome::Compressed {
            output: layout.output.join("b.mp4"),
            archived: layout.archive.join("b.mp4"),
        }
    );
    assert!(layout.output.join("b.mp4").exists());
    assert!(layout.archive.join("b.mp4").exists());
    assert!(!source.exists());
    assert!(!layout.output.join(".b.mp4.partial").exists());

    let calls = transcoder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, source);
    assert_eq!(calls[0].1, layout.output.join(".b.mp4.partial"));
}

#[tokio::test]
async fn failed_transcode_leaves_source_untouched() {
    let tmp = tempdir().unwrap();
    let layout = layout_in(&tmp);
    let source = write_source(&layout, "c.mp4", b"video bytes");

    let transcoder = Arc::new(FailingTranscoder::default());
    let pipeline = ProcessingPipeline::new(layout.clone(), transcoder.clone());

    let outcome = pipeline.process(FileTask::new(&source)).await;

    assert!(matches!(outcome, PipelineOutcome::TranscodeFailed { .. }));
    assert_eq!(transcoder.call_count(), 1);
    assert!(!layout.output.join("c.mp4").exists());
    assert!(!layout.output.join(".c.mp4.partial").exists());
    assert_eq!(std::fs::read(&source).unwrap(), b"video bytes");
    assert!(!layout.archive.join("c.mp4").exists());
}

#[tokio::test]
async fn failed_relocation_keeps_output_and_source() {
    let tmp = tempdir().unwrap();
    let layout = layout_in(&tmp);
    let source = write_source(&layout, "d.mp4", b"video bytes");
    std::fs::remove_dir(&layout.archive).unwrap();

    let pipeline = ProcessingPipeline::new(layout.clone(), Arc::new(CopyTranscoder::default()));

    let outcome = pipeline.process(FileTask::new(&source)).await;

    assert!(matches!(
        outcome,
        PipelineOutcome::ArchiveFailed { ref output, .. } if *output == layout.output.join("d.mp4")
    ));
    assert!(layout.output.join("d.mp4").exists());
    assert!(source.exists());
}

#[tokio::test]
async fn output_blocks_reprocessing_after_success() {
    let tmp = tempdir().unwrap();
    let layout = layout_in(&tmp);
    let transcoder = Arc::new(CopyTranscoder::default());
    let pipeline = ProcessingPipeline::new(layout.clone(), transcoder.clone());

    let source = write_source(&layout, "e.mp4", b"first");
    assert!(pipeline.process(FileTask::new(&source)).await.is_success());

    // Same name dropped into the folder again
    let again = write_source(&layout, "e.mp4", b"second");
    let outcome = pipeline.process(FileTask::new(&again)).await;

    assert!(matches!(outcome, PipelineOutcome::AlreadyCompressed { .. }));
    assert_eq!(transcoder.call_count(), 1);
    assert!(again.exists());
}

#[tokio::test]
async fn concurrent_runs_for_one_name_transcode_once() {
    let tmp = tempdir().unwrap();
    let layout = layout_in(&tmp);
    let source = write_source(&layout, "f.mp4", b"video bytes");

    let transcoder = Arc::new(CopyTranscoder::with_delay(Duration::from_millis(100)));
    let pipeline = Arc::new(ProcessingPipeline::new(layout.clone(), transcoder.clone()));

    let first = {
        let pipeline = Arc::clone(&pipeline);
        let source = source.clone();
        tokio::spawn(async move { pipeline.process(FileTask::new(source)).await })
    };
    let second = {
        let pipeline = Arc::clone(&pipeline);
        let source = source.clone();
        tokio::spawn(async move { pipeline.process(FileTask::new(source)).await })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(transcoder.call_count(), 1);
    assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
    assert!(outcomes.iter().any(|o| matches!(
        o,
        PipelineOutcome::InFlight | PipelineOutcome::AlreadyCompressed { .. }
    )));
    assert!(layout.archive.join("f.mp4").exists());
}

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use squeezer_core::{DirectoryLayout, Result, SizeProbe, SqueezeError, Transcoder};
use tempfile::TempDir;

pub fn layout_in(tmp: &TempDir) -> DirectoryLayout {
    let layout = DirectoryLayout::new(
        tmp.path().join("videos"),
        tmp.path().join("compressed"),
        tmp.path().join("done"),
    );
    layout.ensure().unwrap();
    layout
}

pub fn write_source(layout: &DirectoryLayout, name: &str, body: &[u8]) -> PathBuf {
    let path = layout.incoming.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Copies the source to the target, optionally after a delay, and records
/// every call.
#[derive(Default)]
pub struct CopyTranscoder {
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    delay: Option<Duration>,
}

impl CopyTranscoder {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, source: &Path, target: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((source.to_path_buf(), target.to_path_buf()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        tokio::fs::copy(source, target).await?;
        Ok(())
    }
}

/// Writes half a file then fails, like an encoder crashing mid-way.
#[derive(Default)]
pub struct FailingTranscoder {
    calls: AtomicUsize,
}

impl FailingTranscoder {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn transcode(&self, _source: &Path, target: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(target, b"trunc").await?;
        Err(SqueezeError::Transcode("ffmpeg exited with exit status: 1".into()))
    }
}

/// Always reports the same size and counts how often it was asked.
#[derive(Default)]
pub struct CountingProbe {
    calls: AtomicUsize,
}

impl CountingProbe {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SizeProbe for CountingProbe {
    async fn size(&self, _path: &Path) -> io::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(42)
    }
}

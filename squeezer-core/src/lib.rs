//! # Squeezer Core
//!
//! Watch-folder compression for MP4 files.
//!
//! ## Overview
//!
//! Files created in an *incoming* directory are picked up, given time to
//! finish being written, compressed into an *output* directory by an external
//! transcoder, and finally moved to an *archive* directory:
//!
//! - [`stability`]: decides when a file has stopped growing
//! - [`pipeline`]: skip-if-done, transcode, relocate for one file
//! - [`dispatcher`]: fire-and-forget launch of pipeline runs
//! - [`event_loop`]: consumes filesystem notifications and drives the above
//! - [`fs_watch`]: `notify`-backed notifier feeding the loop
//! - [`service`]: startup glue used by the daemon
//!
//! Per-file failures never surface beyond the log stream; only setup errors
//! (directories, watch registration) are returned to the caller.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod claims;
pub mod dispatcher;
/// Error types and error handling utilities
pub mod error;
pub mod event_loop;
pub mod fs_watch;
pub mod layout;
pub mod pipeline;
pub mod service;
pub mod stability;
/// External transcoder seam and the ffmpeg implementation
pub mod transcoder;

pub use claims::{Claim, ClaimRegistry, FailureLedger};
pub use dispatcher::{TaskDispatcher, TaskReport};
pub use error::{Result, SqueezeError};
pub use event_loop::{DetectionMode, EventLoop, RescanConfig, is_candidate, rescan_incoming};
pub use fs_watch::{FsNotifier, WatchEvent, WatchEventKind, WatchMessage};
pub use layout::{DirectoryLayout, VIDEO_SUFFIX};
pub use pipeline::{FileTask, PipelineOutcome, ProcessingPipeline};
pub use service::{RunningService, ServiceSettings, SqueezeService};
pub use stability::{FsSizeProbe, SizeProbe, StabilityConfig, StabilityDetector};
pub use transcoder::{FfmpegConfig, FfmpegTranscoder, Transcoder};

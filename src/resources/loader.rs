//! Asynchronous model loading.
//!
//! A [`LoadRequest`] moves through `Idle -> Loading -> Succeeded | Failed`
//! exactly once. [`load`] drives that state machine, fetching the entry file
//! and its dependencies through an [`AssetSource`] and reporting what happens
//! to a [`LoadSink`] as [`LoadEvent`]s: any number of progress events followed
//! by exactly one terminal event.

use std::fmt;

use thiserror::Error;

use crate::resources::{
    gltf::{self, LoadedAsset},
    source::{resolve, AssetSource},
};

#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("asset not found: {path}")]
    NotFound { path: String },
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid glTF: {0}")]
    Parse(#[from] ::gltf::Error),
    #[error("failed to decode image {path}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported uri {uri}")]
    UnsupportedUri { uri: String },
    #[error("buffer {index} is missing or too short")]
    MissingBuffer { index: usize },
    #[error("load request cannot go from {from} to {to}")]
    InvalidTransition { from: LoadState, to: LoadState },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl LoadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Succeeded | LoadState::Failed)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Succeeded => "succeeded",
            LoadState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Bytes received of the entry file. A missing or zero total means the size
/// is unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self {
            loaded,
            total: total.filter(|t| *t > 0),
        }
    }

    /// Fraction in `[0, 1]`, or `None` while indeterminate.
    pub fn fraction(&self) -> Option<f32> {
        self.total
            .map(|total| (self.loaded as f64 / total as f64).min(1.0) as f32)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fraction() {
            Some(fraction) => write!(f, "{:.0}%", fraction * 100.0),
            None => write!(f, "{} bytes", self.loaded),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub base_path: String,
    pub entry: String,
    state: LoadState,
    progress: Option<Progress>,
}

impl LoadRequest {
    pub fn new(base_path: &str, entry: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            entry: entry.to_string(),
            state: LoadState::Idle,
            progress: None,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    pub fn begin(&mut self) -> Result<(), AssetLoadError> {
        self.transition(LoadState::Idle, LoadState::Loading)
    }

    pub fn succeed(&mut self) -> Result<(), AssetLoadError> {
        self.transition(LoadState::Loading, LoadState::Succeeded)
    }

    pub fn fail(&mut self) -> Result<(), AssetLoadError> {
        self.transition(LoadState::Loading, LoadState::Failed)
    }

    /// Record progress. Returns `false` (and records nothing) outside of
    /// `Loading` or when fewer bytes are reported than before.
    pub fn report(&mut self, progress: Progress) -> bool {
        if self.state != LoadState::Loading {
            return false;
        }
        if let Some(last) = self.progress {
            if progress.loaded < last.loaded {
                return false;
            }
        }
        self.progress = Some(progress);
        true
    }

    fn transition(&mut self, from: LoadState, to: LoadState) -> Result<(), AssetLoadError> {
        if self.state != from {
            return Err(AssetLoadError::InvalidTransition { from: self.state, to });
        }
        self.state = to;
        Ok(())
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress(Progress),
    Succeeded(LoadedAsset),
    Failed(AssetLoadError),
}

/// Receives the events of one load.
pub trait LoadSink {
    fn emit(&mut self, event: LoadEvent);
}

/// Run `request` to completion and return its terminal state.
///
/// A request that was already started is refused with a single
/// [`LoadEvent::Failed`] and left as it was.
pub async fn load(source: &dyn AssetSource, request: &mut LoadRequest, sink: &mut dyn LoadSink) -> LoadState {
    if let Err(e) = request.begin() {
        sink.emit(LoadEvent::Failed(e));
        return request.state();
    }
    let base_path = request.base_path.clone();
    let entry = request.entry.clone();
    log::info!("Loading {entry} from {base_path}");

    match fetch_entry(source, &base_path, &entry, request, sink).await {
        Ok(asset) => match request.succeed() {
            Ok(()) => {
                log::info!(
                    "Loaded {entry}: {} nodes, {} materials",
                    asset.node_count(),
                    asset.materials.len()
                );
                sink.emit(LoadEvent::Succeeded(asset));
            }
            Err(e) => {
                log::error!("Dropping {entry}: {e}");
                sink.emit(LoadEvent::Failed(e));
            }
        },
        Err(e) => {
            if let Err(transition) = request.fail() {
                log::error!("Load of {entry} failed in an unexpected state: {transition}");
            }
            sink.emit(LoadEvent::Failed(e));
        }
    }
    request.state()
}

async fn fetch_entry(
    source: &dyn AssetSource,
    base_path: &str,
    entry: &str,
    request: &mut LoadRequest,
    sink: &mut dyn LoadSink,
) -> Result<LoadedAsset, AssetLoadError> {
    let entry_path = resolve(base_path, entry)?;
    let bytes = {
        let mut on_progress = |progress: Progress| {
            if request.report(progress) {
                log::debug!("{entry}: {progress}");
                sink.emit(LoadEvent::Progress(progress));
            }
        };
        source.fetch(&entry_path, &mut on_progress).await?
    };
    gltf::parse(source, base_path, &bytes).await
}

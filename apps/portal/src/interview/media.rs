use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub kind: TrackKind,
    pub label: String,
    pub enabled: bool,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission to use camera or microphone was denied")]
    PermissionDenied,
    #[error("no matching capture device: {0}")]
    NotFound(String),
    #[error("device error: {0}")]
    Device(String),
}

type Releaser = Box<dyn FnOnce() + Send>;

/// Camera and microphone handles held for the length of a call.
///
/// The devices stay in use until `release()` is called or the stream is
/// dropped. Dropping an unreleased stream still frees the devices.
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
    releaser: Option<Releaser>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>, on_release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            tracks,
            releaser: Some(Box::new(on_release)),
        }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// Sets `enabled` on every track of `kind`. Returns how many changed.
    pub fn set_enabled(&mut self, kind: TrackKind, enabled: bool) -> usize {
        let mut changed = 0;
        for track in self.tracks.iter_mut().filter(|t| t.kind == kind) {
            if track.enabled != enabled {
                track.enabled = enabled;
                changed += 1;
            }
        }
        changed
    }

    pub fn is_released(&self) -> bool {
        self.releaser.is_none()
    }

    /// Stops every track. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(release) = self.releaser.take() {
            debug!("Releasing {} media track(s)", self.tracks.len());
            for track in &mut self.tracks {
                track.enabled = false;
            }
            release();
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        if !self.is_released() {
            warn!("Media stream dropped without release; stopping tracks");
            self.release();
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("tracks", &self.tracks)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Source of local capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError>;
}

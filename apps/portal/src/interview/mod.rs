//! Voice interview screen: drives the third-party voice assistant and owns
//! the local camera/microphone stream for the length of a call.
//!
//! The stream is acquired before the call starts and released on every way
//! out: `stop()`, the assistant's `call-end` event, `teardown()`, a call
//! that fails to start, and a start that is stopped or dropped half way.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::models::CandidateProfile;

pub mod media;
pub mod overrides;

pub use media::{MediaConstraints, MediaDevices, MediaError, MediaStream, MediaTrack, TrackKind};
pub use overrides::AssistantOverrides;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Inactive,
    Loading,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallEvent {
    CallStart,
    CallEnd,
}

impl CallEvent {
    pub fn name(self) -> &'static str {
        match self {
            CallEvent::CallStart => "call-start",
            CallEvent::CallEnd => "call-end",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("voice assistant failed to start the call: {0}")]
    Start(String),
}

pub type EventHandler = Box<dyn Fn() + Send + Sync>;

/// The hosted voice assistant SDK.
#[async_trait]
pub trait VoiceAssistant: Send + Sync {
    async fn start(
        &self,
        assistant_id: &str,
        overrides: &AssistantOverrides,
    ) -> Result<(), AssistantError>;
    async fn stop(&self);
    fn on(&self, event: CallEvent, handler: EventHandler);
    fn remove_all_listeners(&self);
}

/// Short-lived message for the user, shown once and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

struct CallState {
    status: CallStatus,
    stream: Option<MediaStream>,
    muted: bool,
    video_enabled: bool,
    /// Bumped by every `start()` and `stop()`. A start that finds it moved
    /// on after an await has been overtaken and must not go `Active`.
    generation: u64,
}

pub struct InterviewController {
    assistant: Arc<dyn VoiceAssistant>,
    devices: Arc<dyn MediaDevices>,
    assistant_id: String,
    overrides: AssistantOverrides,
    state: Mutex<CallState>,
    notifications: Mutex<Vec<Notification>>,
}

impl InterviewController {
    pub fn new(
        assistant: Arc<dyn VoiceAssistant>,
        devices: Arc<dyn MediaDevices>,
        assistant_id: impl Into<String>,
        candidate: &CandidateProfile,
    ) -> Self {
        Self {
            assistant,
            devices,
            assistant_id: assistant_id.into(),
            overrides: AssistantOverrides::for_candidate(candidate),
            state: Mutex::new(CallState {
                status: CallStatus::Inactive,
                stream: None,
                muted: false,
                video_enabled: true,
                generation: 0,
            }),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn overrides(&self) -> &AssistantOverrides {
        &self.overrides
    }

    pub fn status(&self) -> CallStatus {
        self.lock().status
    }

    pub fn has_stream(&self) -> bool {
        self.lock().stream.is_some()
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn is_video_enabled(&self) -> bool {
        self.lock().video_enabled
    }

    /// Subscribes to the assistant's call events. Feed the receiver to
    /// [`run_events`](Self::run_events) or [`handle_event`](Self::handle_event).
    pub fn listen(&self) -> mpsc::UnboundedReceiver<CallEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in [CallEvent::CallStart, CallEvent::CallEnd] {
            let tx = tx.clone();
            self.assistant.on(
                event,
                Box::new(move || {
                    let _ = tx.send(event);
                }),
            );
        }
        rx
    }

    pub async fn handle_event(&self, event: CallEvent) {
        info!("Voice assistant event: {}", event.name());
        match event {
            CallEvent::CallStart => self.lock().status = CallStatus::Active,
            CallEvent::CallEnd => self.stop().await,
        }
    }

    /// Handles events until every sender is gone.
    pub async fn run_events(&self, mut events: mpsc::UnboundedReceiver<CallEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
    }

    /// Starts the call. Missing camera or microphone does not block the
    /// call; it only queues a notification.
    ///
    /// A `stop()` or `teardown()` that lands while this is waiting wins: the
    /// devices are released and the status stays `Inactive`. Dropping the
    /// future before it finishes also returns the controller to `Inactive`.
    pub async fn start(&self) -> Result<(), AssistantError> {
        let generation = {
            let mut state = self.lock();
            if state.status != CallStatus::Inactive {
                warn!("Call already {:?}; start ignored", state.status);
                return Ok(());
            }
            state.status = CallStatus::Loading;
            state.generation += 1;
            state.generation
        };
        let mut guard = StartGuard {
            controller: self,
            generation,
            armed: true,
        };

        let mut stream = match self.devices.acquire(MediaConstraints::default()).await {
            Ok(stream) => Some(stream),
            Err(e) => {
                error!("Error accessing media devices: {e}");
                self.notify("Error", "Failed to access camera and microphone");
                None
            }
        };

        if self.lock().generation != generation {
            guard.armed = false;
            info!("Call stopped while acquiring devices");
            if let Some(stream) = stream.as_mut() {
                stream.release();
            }
            return Ok(());
        }

        if let Err(e) = self.assistant.start(&self.assistant_id, &self.overrides).await {
            guard.armed = false;
            error!("{e}");
            if let Some(stream) = stream.as_mut() {
                stream.release();
            }
            let mut state = self.lock();
            if state.generation == generation {
                state.status = CallStatus::Inactive;
            }
            return Err(e);
        }
        guard.armed = false;

        // `Some(idle)` when a stop overtook us; `idle` is false once a newer
        // start owns the assistant.
        let overtaken = {
            let mut state = self.lock();
            if state.generation == generation {
                state.stream = stream.take();
                state.muted = false;
                state.video_enabled = true;
                state.status = CallStatus::Active;
                None
            } else {
                Some(state.status == CallStatus::Inactive)
            }
        };

        match overtaken {
            None => {
                info!(
                    "Interview call started for candidate {}",
                    self.overrides.variable_values.candidate_id
                );
            }
            Some(idle) => {
                info!("Call stopped while starting; hanging up");
                if let Some(stream) = stream.as_mut() {
                    stream.release();
                }
                if idle {
                    self.assistant.stop().await;
                }
            }
        }
        Ok(())
    }

    /// Ends the call and frees the devices. Safe to call in any state.
    pub async fn stop(&self) {
        let stream = {
            let mut state = self.lock();
            state.status = CallStatus::Inactive;
            state.generation += 1;
            state.stream.take()
        };
        if let Some(mut stream) = stream {
            stream.release();
        }
        self.assistant.stop().await;
    }

    /// Leaving the screen: detach from the assistant, then stop.
    pub async fn teardown(&self) {
        self.assistant.remove_all_listeners();
        self.stop().await;
    }

    /// Flips the microphone. Returns the new muted state, or `None` without
    /// a stream.
    pub fn toggle_mute(&self) -> Option<bool> {
        let mut state = self.lock();
        let muted = !state.muted;
        state.stream.as_mut()?.set_enabled(TrackKind::Audio, !muted);
        state.muted = muted;
        Some(muted)
    }

    /// Flips the camera. Returns whether video is now enabled, or `None`
    /// without a stream.
    pub fn toggle_video(&self) -> Option<bool> {
        let mut state = self.lock();
        let enabled = !state.video_enabled;
        state.stream.as_mut()?.set_enabled(TrackKind::Video, enabled);
        state.video_enabled = enabled;
        Some(enabled)
    }

    /// Hands queued notifications to the caller.
    pub fn drain_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications_lock())
    }

    fn notify(&self, title: &str, description: &str) {
        self.notifications_lock().push(Notification {
            title: title.to_string(),
            description: description.to_string(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, CallState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn notifications_lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.notifications.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Puts a `Loading` controller back to `Inactive` when `start()` is dropped
/// mid-flight. A stream acquired by that start is a local of the dropped
/// future and releases itself.
struct StartGuard<'a> {
    controller: &'a InterviewController,
    generation: u64,
    armed: bool,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.controller.lock();
        if state.generation == self.generation && state.status == CallStatus::Loading {
            debug!("call start cancelled");
            state.status = CallStatus::Inactive;
        }
    }
}

impl Drop for InterviewController {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(mut stream) = state.stream.take() {
            stream.release();
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Camera Capture
//!
//! A [`CaptureSession`] owns an open camera stream. The stream is released
//! exactly once, on whichever comes first:
//!
//! - [`CaptureSession::stop`] or a [`CaptureHandle::stop`] from another task
//! - a capture error other than "no face detected"
//! - the session being dropped
//!
//! A `CaptureHandle` is a cheap clone that lets a timer or UI task cancel an
//! in-flight capture without owning the session.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{BiometricError, FaceEmbedding};

/// One frame's worth of extractor output.
#[derive(Debug, Clone, PartialEq)]
pub struct BiometricSample {
    pub embedding: FaceEmbedding,
    pub liveness_score: f64,
}

/// A camera that can be opened for capture.
pub trait CameraDevice: Send + Sync {
    type Stream: CameraStream + 'static;

    fn open(&self) -> impl Future<Output = Result<Self::Stream, BiometricError>> + Send;
}

/// An open camera stream feeding the feature extractor.
pub trait CameraStream: Send {
    /// Capture one frame. `Ok(None)` means no face was found.
    fn capture(&mut self)
        -> impl Future<Output = Result<Option<BiometricSample>, BiometricError>> + Send;

    /// Stop the stream and free the device.
    fn release(&mut self);
}

type SharedStream<S> = Arc<Mutex<Option<S>>>;

pub struct CaptureSession<S: CameraStream> {
    stream: SharedStream<S>,
    cancel: CancellationToken,
}

/// Remote control for a [`CaptureSession`].
pub struct CaptureHandle<S: CameraStream> {
    stream: SharedStream<S>,
    cancel: CancellationToken,
}

impl<S: CameraStream> Clone for CaptureHandle<S> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S: CameraStream> CaptureSession<S> {
    /// Open the camera.
    pub async fn start<D>(device: &D) -> Result<Self, BiometricError>
    where
        D: CameraDevice<Stream = S>,
    {
        let stream = device.open().await?;
        tracing::debug!("Camera stream opened");
        Ok(Self {
            stream: Arc::new(Mutex::new(Some(stream))),
            cancel: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> CaptureHandle<S> {
        CaptureHandle {
            stream: self.stream.clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Capture a sample.
    ///
    /// `NoFaceDetected` keeps the stream open so the user can try again.
    /// Any other failure, and cancellation, release it.
    pub async fn capture(&self) -> Result<BiometricSample, BiometricError> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(BiometricError::CaptureCancelled);
        };

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = stream.capture() => Some(result),
        };

        match outcome {
            None => {
                release(&mut guard);
                Err(BiometricError::CaptureCancelled)
            }
            Some(Ok(Some(sample))) => Ok(sample),
            Some(Ok(None)) => Err(BiometricError::NoFaceDetected),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Capture failed; releasing camera");
                self.cancel.cancel();
                release(&mut guard);
                Err(e)
            }
        }
    }

    /// Release the camera. Idempotent.
    pub fn stop(&self) {
        stop_shared(&self.stream, &self.cancel);
    }
}

impl<S: CameraStream> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: CameraStream> CaptureHandle<S> {
    pub fn stop(&self) {
        stop_shared(&self.stream, &self.cancel);
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

fn stop_shared<S: CameraStream>(stream: &SharedStream<S>, cancel: &CancellationToken) {
    cancel.cancel();
    // An in-flight capture holds the lock; it observes the cancellation and
    // releases the stream itself.
    if let Ok(mut guard) = stream.try_lock() {
        release(&mut guard);
    }
}

fn release<S: CameraStream>(slot: &mut Option<S>) {
    if let Some(mut stream) = slot.take() {
        stream.release();
        tracing::debug!("Camera stream released");
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gate Controller
//!
//! Client-side driver for the verification gate. It mirrors the server's
//! section, owns the camera while a face is being captured, and runs a local
//! countdown so an open window closes on screen at the same moment the
//! server would treat it as expired.
//!
//! ## Resource Rules
//!
//! - the camera is released as soon as a sample is captured, before it is submitted
//! - the camera is released when a verification attempt is abandoned mid-flight
//! - the camera is released when the window timer fires
//! - the timer is replaced whenever a new status arrives
//! - dropping the controller releases both

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use super::gate::GateAction;
use super::status::{GateSection, StatusView};
use super::timer::ExpiryTimer;
use super::{GateError, StatusSource, VerifyOutcome};
use crate::biometrics::{BiometricError, CameraDevice, CameraStream, CaptureHandle, CaptureSession};

struct SharedGate<St: CameraStream> {
    section: Mutex<GateSection>,
    capture: Mutex<Option<CaptureHandle<St>>>,
}

impl<St: CameraStream> SharedGate<St> {
    fn section(&self) -> GateSection {
        *self.section.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_section(&self, section: GateSection) {
        *self.section.lock().unwrap_or_else(PoisonError::into_inner) = section;
    }

    fn set_capture(&self, handle: Option<CaptureHandle<St>>) {
        *self.capture.lock().unwrap_or_else(PoisonError::into_inner) = handle;
    }

    /// Timer callback: close the window and release the camera.
    fn expire_window(&self) {
        let mut section = self.section.lock().unwrap_or_else(PoisonError::into_inner);
        let collapsed = section.collapsed();
        if collapsed != *section {
            tracing::info!(from = %*section, to = %collapsed, "Verification window closed");
            *section = collapsed;
        }
        drop(section);

        if let Some(handle) = self
            .capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.stop();
        }
    }
}

pub struct GateController<S, D: CameraDevice> {
    source: S,
    device: D,
    shared: Arc<SharedGate<D::Stream>>,
    capture: Option<CaptureSession<D::Stream>>,
    timer: Option<ExpiryTimer>,
}

impl<S: StatusSource, D: CameraDevice> GateController<S, D> {
    pub fn new(source: S, device: D) -> Self {
        Self {
            source,
            device,
            shared: Arc::new(SharedGate {
                section: Mutex::new(GateSection::NeedsInitialVerification),
                capture: Mutex::new(None),
            }),
            capture: None,
            timer: None,
        }
    }

    pub fn section(&self) -> GateSection {
        self.shared.section()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_active())
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(ExpiryTimer::is_armed)
    }

    /// Fetch the server's status and adopt it.
    pub async fn refresh(&mut self) -> Result<StatusView, GateError> {
        let view = self.source.fetch_status().await?;
        self.apply_view(&view);
        Ok(view)
    }

    /// Open the camera for the current face section.
    pub async fn start_capture(&mut self) -> Result<(), GateError> {
        let section = self.section();
        if !section.needs_face() {
            return Err(GateError::SectionLocked {
                action: face_action(section),
                section,
            });
        }
        if self.is_capturing() {
            return Ok(());
        }

        let session = CaptureSession::start(&self.device).await?;
        self.shared.set_capture(Some(session.handle()));
        self.capture = Some(session);
        tracing::debug!(%section, "Face capture started");
        Ok(())
    }

    pub fn stop_capture(&mut self) {
        self.shared.set_capture(None);
        if let Some(session) = self.capture.take() {
            session.stop();
        }
    }

    /// Capture a face and submit it for the current section.
    ///
    /// A frame without a face keeps the camera open for another try.
    pub async fn verify_face(&mut self) -> Result<VerifyOutcome, GateError> {
        let section = self.section();
        if !section.needs_face() {
            return Err(GateError::SectionLocked {
                action: face_action(section),
                section,
            });
        }

        // Dropping this future mid-capture drops the session and releases the camera.
        let session = self
            .capture
            .take()
            .ok_or(GateError::Biometric(BiometricError::CaptureCancelled))?;
        let sample = match session.capture().await {
            Ok(sample) => sample,
            Err(BiometricError::NoFaceDetected) => {
                self.capture = Some(session);
                return Err(BiometricError::NoFaceDetected.into());
            }
            Err(e) => {
                self.shared.set_capture(None);
                session.stop();
                return Err(e.into());
            }
        };
        self.shared.set_capture(None);
        session.stop();

        let result = match section {
            GateSection::NeedsInitialVerification => self.source.face_verify(&sample).await,
            _ => self.source.face_reverify(&sample).await,
        };

        let outcome = result?;
        self.apply_view(&outcome.status);
        Ok(outcome)
    }

    pub async fn set_password(&mut self, password: &str) -> Result<StatusView, GateError> {
        self.ensure_local_section(GateAction::SetPassword)?;
        let view = self.source.set_password(password).await?;
        self.apply_view(&view);
        Ok(view)
    }

    pub async fn reset_password(&mut self, password: &str) -> Result<StatusView, GateError> {
        self.ensure_local_section(GateAction::ResetPassword)?;
        let view = self.source.reset_password(password).await?;
        self.apply_view(&view);
        Ok(view)
    }

    /// Cancel the timer and release the camera.
    pub fn shutdown(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.stop_capture();
    }

    fn ensure_local_section(&self, action: GateAction) -> Result<(), GateError> {
        let section = self.section();
        if section != action.required_section() {
            return Err(GateError::SectionLocked { action, section });
        }
        Ok(())
    }

    fn apply_view(&mut self, view: &StatusView) {
        self.shared.set_section(view.section);
        if !view.section.needs_face() {
            self.stop_capture();
        }

        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        if let Some(expiry) = view.status.window_expiry() {
            let remaining = (expiry - Utc::now()).to_std().unwrap_or_default();
            let shared = self.shared.clone();
            self.timer = Some(ExpiryTimer::arm(remaining, move || shared.expire_window()));
            tracing::debug!(
                section = %view.section,
                remaining_secs = remaining.as_secs(),
                "Verification window timer armed"
            );
        }
    }
}

impl<S, D: CameraDevice> Drop for GateController<S, D> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.shared.set_capture(None);
        if let Some(session) = self.capture.take() {
            session.stop();
        }
    }
}

fn face_action(section: GateSection) -> GateAction {
    match section {
        GateSection::NeedsInitialVerification | GateSection::CanSetPassword => {
            GateAction::InitialVerification
        }
        GateSection::NeedsReVerification | GateSection::CanResetPassword => {
            GateAction::ReVerification
        }
    }
}

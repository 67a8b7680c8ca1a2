//! QR scanner over an external camera capability.
//!
//! One activation produces at most one outcome: an [`ApartmentId`] or a
//! [`ScanError`]. Frames arriving after the first valid code are ignored until
//! the session is reactivated.

use std::collections::VecDeque;
use std::future::Future;

use tracing::{debug, info, warn};

use crate::{ApartmentId, ScanError};

/// Identifiers shorter than this are treated as misreads.
pub const MIN_GUID_LEN: usize = 10;

// ---

/// Barcode symbology reported by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbology {
    Qr,
    Other(String),
}

/// One decoded barcode frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub symbology: Symbology,
    pub data: String,
}

impl Frame {
    // ---
    pub fn qr(data: impl Into<String>) -> Self {
        Self {
            symbology: Symbology::Qr,
            data: data.into(),
        }
    }
}

/// Camera with barcode decoding.
pub trait Camera: Send {
    /// Ask for camera access. `false` means denied.
    fn request_permission(&mut self) -> impl Future<Output = bool> + Send;

    /// Next decoded frame, or `None` once the user closes the camera.
    fn next_frame(&mut self) -> impl Future<Output = Option<Frame>> + Send;
}

/// Extracts an apartment identifier from a QR payload.
#[derive(Debug, Clone)]
pub struct PayloadMatcher {
    prefix: String,
}

impl PayloadMatcher {
    // ---
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn extract(&self, frame: &Frame) -> Option<ApartmentId> {
        // ---
        if frame.symbology != Symbology::Qr {
            debug!("Ignoring non-QR frame: {:?}", frame.symbology);
            return None;
        }

        let guid = frame.data.strip_prefix(self.prefix.as_str())?;
        if guid.chars().count() < MIN_GUID_LEN {
            debug!("Ignoring short identifier ({} chars)", guid.chars().count());
            return None;
        }

        Some(ApartmentId::new(guid))
    }
}

/// Callback-style scan state with a "done" latch.
#[derive(Debug, Clone)]
pub struct ScanSession {
    // ---
    matcher: PayloadMatcher,
    done: bool,
}

impl ScanSession {
    // ---
    pub fn new(matcher: PayloadMatcher) -> Self {
        Self {
            matcher,
            done: false,
        }
    }

    /// Feed one frame. Returns the identifier for the first valid frame only.
    pub fn on_frame(&mut self, frame: &Frame) -> Option<ApartmentId> {
        // ---
        if self.done {
            return None;
        }
        let guid = self.matcher.extract(frame)?;
        self.done = true;
        Some(guid)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn reactivate(&mut self) {
        self.done = false;
    }
}

/// Runs one scan activation against a [`Camera`].
#[derive(Debug, Clone)]
pub struct Scanner {
    matcher: PayloadMatcher,
}

impl Scanner {
    // ---
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            matcher: PayloadMatcher::new(prefix),
        }
    }

    pub async fn scan<C: Camera>(&self, camera: &mut C) -> Result<ApartmentId, ScanError> {
        // ---
        if !camera.request_permission().await {
            warn!("Camera permission denied");
            return Err(ScanError::PermissionDenied);
        }

        let mut session = ScanSession::new(self.matcher.clone());
        while let Some(frame) = camera.next_frame().await {
            if let Some(guid) = session.on_frame(&frame) {
                info!("Scanned apartment {}", guid);
                return Ok(guid);
            }
        }

        info!("Scanner closed without a valid code");
        Err(ScanError::Cancelled)
    }
}

/// Camera fed from a queue of pre-decoded frames.
#[derive(Debug, Clone)]
pub struct QueuedCamera {
    // ---
    permission: bool,
    frames: VecDeque<Frame>,
}

impl QueuedCamera {
    // ---
    pub fn granted() -> Self {
        Self {
            permission: true,
            frames: VecDeque::new(),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: false,
            frames: VecDeque::new(),
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    pub fn pending(&self) -> usize {
        self.frames.len()
    }
}

impl Camera for QueuedCamera {
    async fn request_permission(&mut self) -> bool {
        self.permission
    }

    async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    const PREFIX: &str = "http://install.egain.se?gid=";

    fn payload(guid: &str) -> String {
        format!("{PREFIX}{guid}")
    }

    #[test]
    fn test_extract_valid_payload() {
        // ---
        let matcher = PayloadMatcher::new(PREFIX);
        let guid = matcher.extract(&Frame::qr(payload("ABCDEFGHIJ")));
        assert_eq!(guid, Some(ApartmentId::new("ABCDEFGHIJ")));
    }

    #[test]
    fn test_extract_rejects_wrong_prefix() {
        // ---
        let matcher = PayloadMatcher::new(PREFIX);
        assert_eq!(
            matcher.extract(&Frame::qr("https://example.com/?gid=ABCDEFGHIJ")),
            None
        );
        assert_eq!(matcher.extract(&Frame::qr("ABCDEFGHIJKLMNOP")), None);
    }

    #[test]
    fn test_extract_rejects_short_identifier() {
        // ---
        let matcher = PayloadMatcher::new(PREFIX);
        assert_eq!(matcher.extract(&Frame::qr(payload("ABCDEFGHI"))), None);
        assert_eq!(matcher.extract(&Frame::qr(payload(""))), None);
    }

    #[test]
    fn test_extract_rejects_other_symbology() {
        // ---
        let matcher = PayloadMatcher::new(PREFIX);
        let frame = Frame {
            symbology: Symbology::Other("org.iso.Code128".to_string()),
            data: payload("ABCDEFGHIJ"),
        };
        assert_eq!(matcher.extract(&frame), None);
    }

    #[test]
    fn test_session_latches_after_first_result() {
        // ---
        let mut session = ScanSession::new(PayloadMatcher::new(PREFIX));

        assert_eq!(session.on_frame(&Frame::qr(payload("short"))), None);
        assert!(!session.is_done());

        let first = session.on_frame(&Frame::qr(payload("FIRST-GUID-0001")));
        assert_eq!(first, Some(ApartmentId::new("FIRST-GUID-0001")));
        assert!(session.is_done());

        assert_eq!(session.on_frame(&Frame::qr(payload("FIRST-GUID-0001"))), None);
        assert_eq!(session.on_frame(&Frame::qr(payload("SECOND-GUID-02"))), None);

        session.reactivate();
        assert_eq!(
            session.on_frame(&Frame::qr(payload("SECOND-GUID-02"))),
            Some(ApartmentId::new("SECOND-GUID-02"))
        );
    }

    #[tokio::test]
    async fn test_scan_skips_invalid_frames_and_stops_at_first_match() {
        // ---
        let scanner = Scanner::new(PREFIX);
        let mut camera = QueuedCamera::granted();
        camera.push(Frame::qr("garbage"));
        camera.push(Frame::qr(payload("tooshort")));
        camera.push(Frame::qr(payload("ABCDEFGHIJ")));
        camera.push(Frame::qr(payload("KLMNOPQRST")));

        assert_eq!(
            scanner.scan(&mut camera).await,
            Ok(ApartmentId::new("ABCDEFGHIJ"))
        );
        // The trailing match was never consumed
        assert_eq!(camera.pending(), 1);
    }

    #[tokio::test]
    async fn test_scan_permission_denied() {
        // ---
        let scanner = Scanner::new(PREFIX);
        let mut camera = QueuedCamera::denied();
        camera.push(Frame::qr(payload("ABCDEFGHIJ")));

        assert_eq!(
            scanner.scan(&mut camera).await,
            Err(ScanError::PermissionDenied)
        );
        assert_eq!(camera.pending(), 1);
    }

    #[tokio::test]
    async fn test_scan_cancelled_when_frames_run_out() {
        // ---
        let scanner = Scanner::new(PREFIX);
        let mut camera = QueuedCamera::granted();
        camera.push(Frame::qr(payload("short")));

        assert_eq!(scanner.scan(&mut camera).await, Err(ScanError::Cancelled));
    }
}

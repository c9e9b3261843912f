//! Duplex message bus between the control surface and the preview surface.

use tokio::sync::mpsc;
use tracing::debug;
use tvlink_protocol::WindowMessage;

/// One end of the channel. Messages are delivered in send order.
pub struct Endpoint {
    tx: mpsc::UnboundedSender<WindowMessage>,
    rx: mpsc::UnboundedReceiver<WindowMessage>,
}

/// Two connected endpoints: `(control, preview)`.
pub fn pair() -> (Endpoint, Endpoint) {
    let (to_preview, from_control) = mpsc::unbounded_channel();
    let (to_control, from_preview) = mpsc::unbounded_channel();
    (
        Endpoint {
            tx: to_preview,
            rx: from_preview,
        },
        Endpoint {
            tx: to_control,
            rx: from_control,
        },
    )
}

impl Endpoint {
    /// Returns false once the other end is gone.
    pub fn send(&self, msg: WindowMessage) -> bool {
        let kind = msg.kind();
        match self.tx.send(msg) {
            Ok(()) => true,
            Err(_) => {
                debug!(kind, "peer window closed; message dropped");
                false
            }
        }
    }

    pub async fn recv(&mut self) -> Option<WindowMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WindowMessage> {
        self.rx.try_recv().ok()
    }

    /// Forwards the JSON envelope form, ignoring anything that does not decode.
    pub fn send_raw(&self, raw: &str) -> bool {
        match decode(raw) {
            Some(msg) => self.send(msg),
            None => false,
        }
    }
}

/// Parses `{"type": ..., "payload": ...}`. Unknown kinds and malformed payloads yield `None`.
pub fn decode(raw: &str) -> Option<WindowMessage> {
    match serde_json::from_str(raw) {
        Ok(msg) => Some(msg),
        Err(e) => {
            debug!(error = %e, "ignoring unrecognized window message");
            None
        }
    }
}

pub fn encode(msg: &WindowMessage) -> String {
    // Every payload type serializes infallibly; non-finite floats become null.
    serde_json::to_string(msg).unwrap_or_default()
}

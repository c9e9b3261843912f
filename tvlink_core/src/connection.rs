use crate::transport::ShellTransport;
use std::sync::Arc;
use tracing::info;

/// A live adb session. Only one can exist at a time; it is owned by the
/// [`ConnectionManager`] and handed out by reference.
pub struct AdbSession {
    address: String,
    shell: Arc<dyn ShellTransport>,
}

impl AdbSession {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn input_keyevent(&self, code: u16) {
        let code = code.to_string();
        self.shell.exec(&["shell", "input", "keyevent", &code]);
    }
}

/// Owns the single adb session. The connected flag tracks what was requested,
/// not what adb confirmed: a failed `adb connect` still counts as connected
/// until the next disconnect.
pub struct ConnectionManager {
    shell: Arc<dyn ShellTransport>,
    session: Option<AdbSession>,
}

impl ConnectionManager {
    pub fn new(shell: Arc<dyn ShellTransport>) -> Self {
        Self {
            shell,
            session: None,
        }
    }

    pub fn connect(&mut self, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() {
            return self.is_connected();
        }
        if let Some(session) = &self.session {
            if session.address == address {
                return true;
            }
            self.disconnect();
        }

        info!(address, "adb connect");
        self.shell.exec(&["connect", address]);
        self.session = Some(AdbSession {
            address: address.to_string(),
            shell: Arc::clone(&self.shell),
        });
        true
    }

    pub fn disconnect(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        info!(address = %session.address, "adb disconnect");
        self.shell.exec(&["disconnect"]);
        false
    }

    /// Tears down and reopens the current session, for when the optimistic
    /// flag says connected but the device was not reachable at connect time.
    pub fn reconnect(&mut self) -> bool {
        let Some(address) = self.target().map(str::to_string) else {
            return false;
        };
        self.disconnect();
        self.connect(&address)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn target(&self) -> Option<&str> {
        self.session.as_ref().map(AdbSession::address)
    }

    pub fn session(&self) -> Option<&AdbSession> {
        self.session.as_ref()
    }
}

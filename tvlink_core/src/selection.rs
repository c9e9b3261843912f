use crate::connection::ConnectionManager;
use tracing::debug;
use tvlink_protocol::{DeviceFamily, DeviceId};

/// The one current device and the adb session that follows it.
pub struct DeviceSelection {
    current: Option<DeviceId>,
    connection: ConnectionManager,
}

impl DeviceSelection {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            current: None,
            connection,
        }
    }

    pub fn current(&self) -> Option<&DeviceId> {
        self.current.as_ref()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ConnectionManager {
        &mut self.connection
    }

    /// Makes `id` current, closing an adb session that no longer applies and
    /// opening one for a new adb device. Returns whether the selection changed.
    pub fn select(&mut self, id: DeviceId) -> bool {
        if let Some(prev) = &self.current {
            let leaving_adb = prev.family == DeviceFamily::AdbShell
                && (prev.address != id.address || id.family != DeviceFamily::AdbShell);
            if leaving_adb {
                self.connection.disconnect();
            }
        }

        if id.family == DeviceFamily::AdbShell && !self.connection.is_connected() {
            self.connection.connect(&id.address);
        }

        let changed = self.current.as_ref() != Some(&id);
        if changed {
            debug!(device = %id, "device selected");
        }
        self.current = Some(id);
        changed
    }

    pub fn clear(&mut self) {
        let Some(prev) = self.current.take() else {
            return;
        };
        if prev.family == DeviceFamily::AdbShell {
            self.connection.disconnect();
        }
        debug!(device = %prev, "selection cleared");
    }

    /// Called when a device record is deleted; clears the selection if it pointed there.
    pub fn forget(&mut self, id: &DeviceId) -> bool {
        if self.current.as_ref() != Some(id) {
            return false;
        }
        self.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Recorder;
    use std::sync::Arc;

    fn selection() -> (Arc<Recorder>, DeviceSelection) {
        let rec = Recorder::new();
        let sel = DeviceSelection::new(ConnectionManager::new(rec.clone()));
        (rec, sel)
    }

    fn id(s: &str) -> DeviceId {
        s.parse().unwrap()
    }

    #[test]
    fn reselecting_the_same_adb_device_connects_once() {
        let (rec, mut sel) = selection();
        assert!(sel.select(id("10.0.0.5|adb-shell")));
        assert!(!sel.select(id("10.0.0.5|adb-shell")));
        assert_eq!(rec.shell_commands(), vec!["connect 10.0.0.5"]);
    }

    #[test]
    fn switching_adb_devices_disconnects_then_connects() {
        let (rec, mut sel) = selection();
        sel.select(id("10.0.0.5|adb-shell"));
        sel.select(id("10.0.0.9|adb-shell"));
        assert_eq!(
            rec.shell_commands(),
            vec!["connect 10.0.0.5", "disconnect", "connect 10.0.0.9"]
        );
        assert_eq!(sel.connection().target(), Some("10.0.0.9"));
    }

    #[test]
    fn moving_to_ecp_closes_the_adb_session() {
        let (rec, mut sel) = selection();
        sel.select(id("10.0.0.5|adb-shell"));
        sel.select(id("10.0.0.5|ecp-http"));
        assert_eq!(rec.shell_commands(), vec!["connect 10.0.0.5", "disconnect"]);
        assert!(!sel.connection().is_connected());
    }

    #[test]
    fn ecp_selection_never_touches_adb() {
        let (rec, mut sel) = selection();
        sel.select(id("10.0.0.5|ecp-http"));
        sel.select(id("10.0.0.6|ecp-http"));
        sel.clear();
        assert!(rec.snapshot().is_empty());
    }

    #[test]
    fn forgetting_the_selected_adb_device_disconnects_once() {
        let (rec, mut sel) = selection();
        sel.select(id("10.0.0.5|adb-shell"));
        assert!(!sel.forget(&id("10.0.0.9|adb-shell")));
        assert!(sel.forget(&id("10.0.0.5|adb-shell")));
        assert!(sel.current().is_none());
        assert!(!sel.forget(&id("10.0.0.5|adb-shell")));
        assert_eq!(rec.shell_commands(), vec!["connect 10.0.0.5", "disconnect"]);
    }
}

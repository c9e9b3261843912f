use crate::adb;
use crate::connection::ConnectionManager;
use crate::ecp::EcpSender;
use crate::keymap::KeyPhase;
use crate::selection::DeviceSelection;
use crate::transport::{HttpTransport, ShellTransport};
use std::sync::Arc;
use tracing::trace;
use tvlink_protocol::{DeviceFamily, LogicalCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Nothing selected, or the selection has no address.
    NoSelection,
    InvalidAddress,
    /// adb device selected but no session is open.
    NotConnected,
    /// The protocol has no equivalent for the command.
    Unsupported,
    /// adb has no press/release model; releases are not forwarded.
    Release,
}

/// Best-effort outcome of a dispatch. `Sent` means handed to a transport,
/// not delivered; callers are free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Dropped(DropReason),
}

impl Delivery {
    pub fn is_sent(self) -> bool {
        matches!(self, Delivery::Sent)
    }
}

pub struct CommandRouter {
    selection: DeviceSelection,
    ecp: EcpSender,
}

impl CommandRouter {
    pub fn new(selection: DeviceSelection, ecp: EcpSender) -> Self {
        Self { selection, ecp }
    }

    pub fn with_transports(
        http: Arc<dyn HttpTransport>,
        shell: Arc<dyn ShellTransport>,
        ecp_port: u16,
    ) -> Self {
        Self::new(
            DeviceSelection::new(ConnectionManager::new(shell)),
            EcpSender::with_port(http, ecp_port),
        )
    }

    pub fn selection(&self) -> &DeviceSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut DeviceSelection {
        &mut self.selection
    }

    pub fn dispatch(&self, command: &LogicalCommand, phase: Option<KeyPhase>) -> Delivery {
        let Some(device) = self.selection.current() else {
            trace!(%command, "no device selected");
            return Delivery::Dropped(DropReason::NoSelection);
        };
        if device.address.is_empty() {
            return Delivery::Dropped(DropReason::NoSelection);
        }

        match device.family {
            DeviceFamily::EcpHttp => self.ecp.send(&device.address, command, phase),
            DeviceFamily::AdbShell => {
                if phase == Some(KeyPhase::Up) {
                    return Delivery::Dropped(DropReason::Release);
                }
                self.dispatch_adb(command)
            }
        }
    }

    /// Sends straight to the open adb session, whatever is selected.
    pub fn dispatch_adb(&self, command: &LogicalCommand) -> Delivery {
        match self.selection.connection().session() {
            Some(session) => adb::send(session, command),
            None => {
                trace!(%command, "no adb session; presumed offline");
                Delivery::Dropped(DropReason::NotConnected)
            }
        }
    }
}

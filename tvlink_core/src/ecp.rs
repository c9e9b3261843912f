use crate::keymap::KeyPhase;
use crate::router::{Delivery, DropReason};
use crate::transport::{HttpTransport, DEFAULT_ECP_PORT};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, trace};
use tvlink_protocol::{literal_token, LogicalCommand, NamedKey};

/// Strict dotted-quad check; hostnames and `a.b.c` shorthand are rejected.
pub fn is_valid_ip(address: &str) -> bool {
    address.parse::<Ipv4Addr>().is_ok()
}

pub fn subcommand(phase: Option<KeyPhase>) -> &'static str {
    match phase {
        None => "keypress",
        Some(KeyPhase::Down) => "keydown",
        Some(KeyPhase::Up) => "keyup",
    }
}

/// ECP key name for a command, lowercased.
pub fn wire_token(command: &LogicalCommand) -> String {
    let key = match command {
        LogicalCommand::Literal(text) => return literal_token(text),
        LogicalCommand::Key(key) => *key,
    };
    let name = match key {
        NamedKey::Up => "up",
        NamedKey::Down => "down",
        NamedKey::Left => "left",
        NamedKey::Right => "right",
        NamedKey::Select => "select",
        NamedKey::Back => "back",
        NamedKey::Home => "home",
        NamedKey::Info => "info",
        NamedKey::Rewind => "rev",
        NamedKey::Play => "play",
        NamedKey::Forward => "fwd",
        NamedKey::VolumeMute => "volumemute",
        NamedKey::VolumeUp => "volumeup",
        NamedKey::VolumeDown => "volumedown",
        NamedKey::Backspace => "backspace",
        NamedKey::Search => "search",
        NamedKey::Enter => "enter",
        NamedKey::InstantReplay => "instantreplay",
    };
    name.to_string()
}

pub struct EcpSender {
    http: Arc<dyn HttpTransport>,
    port: u16,
}

impl EcpSender {
    pub fn new(http: Arc<dyn HttpTransport>) -> Self {
        Self::with_port(http, DEFAULT_ECP_PORT)
    }

    pub fn with_port(http: Arc<dyn HttpTransport>, port: u16) -> Self {
        Self { http, port }
    }

    pub fn command_url(
        &self,
        address: &str,
        command: &LogicalCommand,
        phase: Option<KeyPhase>,
    ) -> String {
        format!(
            "http://{address}:{}/{}/{}",
            self.port,
            subcommand(phase),
            wire_token(command)
        )
    }

    pub fn send(
        &self,
        address: &str,
        command: &LogicalCommand,
        phase: Option<KeyPhase>,
    ) -> Delivery {
        if !is_valid_ip(address) {
            debug!(address, "not a dotted-quad address; ecp command dropped");
            return Delivery::Dropped(DropReason::InvalidAddress);
        }
        let url = self.command_url(address, command, phase);
        trace!(%url, "ecp post");
        self.http.post(&url);
        Delivery::Sent
    }
}

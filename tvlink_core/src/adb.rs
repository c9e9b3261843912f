use crate::connection::AdbSession;
use crate::router::{Delivery, DropReason};
use tracing::trace;
use tvlink_protocol::{LogicalCommand, NamedKey};

/// Android `KEYCODE_*` values for the keys adb remotes understand.
pub fn keycode(key: NamedKey) -> Option<u16> {
    let code = match key {
        NamedKey::Up => 19,
        NamedKey::Down => 20,
        NamedKey::Left => 21,
        NamedKey::Right => 22,
        NamedKey::Select => 66,
        NamedKey::Back => 4,
        NamedKey::Home => 3,
        NamedKey::Info => 1,
        NamedKey::Rewind => 89,
        NamedKey::Play => 85,
        NamedKey::Forward => 90,
        NamedKey::VolumeMute => 164,
        _ => return None,
    };
    Some(code)
}

pub fn send(session: &AdbSession, command: &LogicalCommand) -> Delivery {
    let Some(code) = command.named().and_then(keycode) else {
        trace!(%command, "no adb keycode; dropped");
        return Delivery::Dropped(DropReason::Unsupported);
    };
    trace!(address = session.address(), code, "adb keyevent");
    session.input_keyevent(code);
    Delivery::Sent
}

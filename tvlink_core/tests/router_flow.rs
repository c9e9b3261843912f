use std::sync::Arc;
use tvlink_core::router::{CommandRouter, Delivery, DropReason};
use tvlink_core::{
    DeviceId, KeyEvent, KeyPhase, Keymap, LogicalCommand, Modifiers, NamedKey, Platform, Recorder,
};

fn router() -> (Arc<Recorder>, CommandRouter) {
    let rec = Recorder::new();
    let router = CommandRouter::with_transports(rec.clone(), rec.clone(), 8060);
    (rec, router)
}

fn id(s: &str) -> DeviceId {
    s.parse().unwrap()
}

const UP: LogicalCommand = LogicalCommand::Key(NamedKey::Up);

#[test]
fn no_selection_is_a_silent_no_op() {
    let (rec, router) = router();
    for phase in [None, Some(KeyPhase::Down), Some(KeyPhase::Up)] {
        assert_eq!(
            router.dispatch(&UP, phase),
            Delivery::Dropped(DropReason::NoSelection)
        );
    }
    assert_eq!(
        router.dispatch_adb(&UP),
        Delivery::Dropped(DropReason::NotConnected)
    );
    assert!(rec.snapshot().is_empty());
}

#[test]
fn ecp_tap_posts_keypress() {
    let (rec, mut router) = router();
    router.selection_mut().select(id("10.0.0.5|ecp-http"));

    assert_eq!(router.dispatch(&UP, None), Delivery::Sent);
    assert_eq!(rec.http_urls(), vec!["http://10.0.0.5:8060/keypress/up"]);
}

#[test]
fn ecp_phases_map_to_keydown_and_keyup() {
    let (rec, mut router) = router();
    router.selection_mut().select(id("10.0.0.5|ecp-http"));

    let select = LogicalCommand::Key(NamedKey::Select);
    router.dispatch(&select, Some(KeyPhase::Down));
    router.dispatch(&select, Some(KeyPhase::Up));
    assert_eq!(
        rec.http_urls(),
        vec![
            "http://10.0.0.5:8060/keydown/select",
            "http://10.0.0.5:8060/keyup/select",
        ]
    );
}

#[test]
fn ecp_with_malformed_address_sends_nothing() {
    let (rec, mut router) = router();
    router.selection_mut().select(id("10.0.0|ecp-http"));
    assert_eq!(
        router.dispatch(&UP, None),
        Delivery::Dropped(DropReason::InvalidAddress)
    );
    assert!(rec.snapshot().is_empty());
}

#[test]
fn adb_sends_keyevents_on_press_only() {
    let (rec, mut router) = router();
    router.selection_mut().select(id("10.0.0.5|adb-shell"));
    rec.take();

    assert_eq!(router.dispatch(&UP, Some(KeyPhase::Down)), Delivery::Sent);
    assert_eq!(
        router.dispatch(&UP, Some(KeyPhase::Up)),
        Delivery::Dropped(DropReason::Release)
    );
    assert_eq!(router.dispatch(&LogicalCommand::Key(NamedKey::Home), None), Delivery::Sent);
    assert_eq!(
        router.dispatch(&LogicalCommand::literal("x"), None),
        Delivery::Dropped(DropReason::Unsupported)
    );
    assert_eq!(
        rec.shell_commands(),
        vec!["shell input keyevent 19", "shell input keyevent 3"]
    );
}

#[test]
fn adb_without_session_is_presumed_offline() {
    let (rec, mut router) = router();
    router.selection_mut().select(id("10.0.0.5|adb-shell"));
    router.selection_mut().connection_mut().disconnect();
    rec.take();

    assert_eq!(
        router.dispatch(&UP, None),
        Delivery::Dropped(DropReason::NotConnected)
    );
    assert!(rec.snapshot().is_empty());
}

#[test]
fn switching_families_routes_to_the_new_protocol() {
    let (rec, mut router) = router();
    router.selection_mut().select(id("10.0.0.5|adb-shell"));
    router.dispatch(&UP, None);
    router.selection_mut().select(id("10.0.0.9|ecp-http"));
    router.dispatch(&UP, None);

    assert_eq!(
        rec.shell_commands(),
        vec!["connect 10.0.0.5", "shell input keyevent 19", "disconnect"]
    );
    assert_eq!(rec.http_urls(), vec!["http://10.0.0.9:8060/keypress/up"]);
}

#[test]
fn keyboard_to_wire_end_to_end() {
    let (rec, mut router) = router();
    router.selection_mut().select(id("192.168.1.40|ecp-http"));
    let keymap = Keymap::new(Platform::Standard);

    let events = [
        KeyEvent::down("ArrowDown", Some("ArrowDown")),
        KeyEvent::down("ArrowDown", Some("ArrowDown")).repeated(),
        KeyEvent::up("ArrowDown", Some("ArrowDown")),
        KeyEvent::down("KeyH", Some("h")).with_modifiers(Modifiers {
            control: true,
            ..Modifiers::default()
        }),
        KeyEvent::down("Digit2", Some("@")).with_modifiers(Modifiers {
            shift: true,
            ..Modifiers::default()
        }),
    ];
    for event in &events {
        if let Some(stroke) = keymap.normalize(event) {
            router.dispatch(&stroke.command, Some(stroke.phase));
        }
    }

    assert_eq!(
        rec.http_urls(),
        vec![
            "http://192.168.1.40:8060/keydown/down",
            "http://192.168.1.40:8060/keyup/down",
            "http://192.168.1.40:8060/keydown/home",
            "http://192.168.1.40:8060/keydown/lit_%40",
        ]
    );
}

use std::sync::Arc;
use tvlink_core::channel::{self, Endpoint};
use tvlink_core::preview::PreviewState;
use tvlink_core::settings::{DisplayFlag, WindowBounds};
use tvlink_core::{
    BorderStyle, CommandRouter, ControlSurface, Delivery, DeviceFamily, DeviceId, DeviceRecord,
    DropReason, Error, KeyEvent, Keymap, LogicalCommand, MemoryStore, NamedKey, Platform,
    Recorder, Resolution, Settings, SharedSettings, VideoSource, WindowMessage,
};

struct Harness {
    rec: Arc<Recorder>,
    store: Arc<MemoryStore>,
    surface: ControlSurface,
    preview: Endpoint,
}

fn harness_with(initial: Settings) -> Harness {
    let rec = Recorder::new();
    let store = Arc::new(MemoryStore::with(initial));
    let settings = SharedSettings::open(Box::new(Arc::clone(&store))).unwrap();
    let router = CommandRouter::with_transports(rec.clone(), rec.clone(), 8060);
    let (control, preview) = channel::pair();
    let surface =
        ControlSurface::new(settings, router, control).with_keymap(Keymap::new(Platform::Standard));
    Harness {
        rec,
        store,
        surface,
        preview,
    }
}

fn harness() -> Harness {
    harness_with(Settings::default())
}

fn record(address: &str, family: DeviceFamily) -> DeviceRecord {
    DeviceRecord {
        address: address.into(),
        family,
        alias: None,
    }
}

fn drain(preview: &mut Endpoint) -> Vec<WindowMessage> {
    std::iter::from_fn(|| preview.try_recv()).collect()
}

#[test]
fn selection_is_persisted_and_broadcast() {
    let mut h = harness();
    let id = DeviceId::new("10.0.0.5", DeviceFamily::AdbShell);

    assert!(h.surface.select_device(id.clone()).unwrap());
    assert!(!h.surface.select_device(id.clone()).unwrap());

    assert_eq!(h.rec.shell_commands(), vec!["connect 10.0.0.5"]);
    assert_eq!(h.store.saved().unwrap().control.device_id, Some(id.clone()));
    assert_eq!(
        drain(&mut h.preview),
        vec![
            WindowMessage::SetControlSelected(Some(id.clone())),
            WindowMessage::SetControlSelected(Some(id)),
        ]
    );
}

#[test]
fn persisted_selection_is_restored_on_start() {
    let mut initial = Settings::default();
    initial.control.device_id = Some(DeviceId::new("10.0.0.7", DeviceFamily::AdbShell));
    let h = harness_with(initial);

    assert_eq!(h.rec.shell_commands(), vec!["connect 10.0.0.7"]);
    assert_eq!(
        h.surface.press(&LogicalCommand::Key(NamedKey::Play)),
        Delivery::Sent
    );
    assert_eq!(h.rec.shell_commands().last().unwrap(), "shell input keyevent 85");
}

#[test]
fn removing_the_selected_adb_device_clears_and_disconnects_once() {
    let mut h = harness();
    let rec = record("10.0.0.5", DeviceFamily::AdbShell);
    h.surface.add_device(rec.clone()).unwrap();
    h.surface.select_device(rec.id()).unwrap();

    assert!(h.surface.remove_device(&rec.id()).unwrap());
    assert!(!h.surface.remove_device(&rec.id()).unwrap());

    assert!(h.surface.router().selection().current().is_none());
    let saved = h.store.saved().unwrap();
    assert!(saved.control.device_list.is_empty());
    assert_eq!(saved.control.device_id, None);
    assert_eq!(
        h.rec.shell_commands(),
        vec!["connect 10.0.0.5", "disconnect"]
    );
    assert_eq!(
        h.surface.press(&LogicalCommand::Key(NamedKey::Up)),
        Delivery::Dropped(DropReason::NoSelection)
    );
    assert_eq!(
        drain(&mut h.preview).last(),
        Some(&WindowMessage::SetControlSelected(None))
    );
}

#[test]
fn removing_another_device_keeps_the_selection() {
    let mut h = harness();
    let tv = record("10.0.0.5", DeviceFamily::EcpHttp);
    let stick = record("10.0.0.6", DeviceFamily::AdbShell);
    h.surface.add_device(tv.clone()).unwrap();
    h.surface.add_device(stick.clone()).unwrap();
    h.surface.select_device(tv.id()).unwrap();

    assert!(h.surface.remove_device(&stick.id()).unwrap());
    assert_eq!(h.surface.router().selection().current(), Some(&tv.id()));
    assert!(h.rec.shell_commands().is_empty());
}

#[test]
fn adding_an_existing_identity_updates_its_alias() {
    let mut h = harness();
    h.surface
        .add_device(record(" 10.0.0.5 ", DeviceFamily::EcpHttp))
        .unwrap();
    h.surface
        .add_device(DeviceRecord {
            alias: Some("Bedroom".into()),
            ..record("10.0.0.5", DeviceFamily::EcpHttp)
        })
        .unwrap();
    h.surface
        .add_device(record("10.0.0.5", DeviceFamily::AdbShell))
        .unwrap();

    let list = h.surface.settings().control.device_list.clone();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].address, "10.0.0.5");
    assert_eq!(list[0].label(), "Bedroom");

    assert!(matches!(
        h.surface.add_device(record("  ", DeviceFamily::EcpHttp)),
        Err(Error::InvalidValue { .. })
    ));
}

#[test]
fn visual_settings_reach_the_preview() {
    let mut h = harness();
    let mut view = PreviewState::from_settings(&h.surface.settings());

    h.surface
        .set_resolution(Resolution {
            width: 1280,
            height: 720,
        })
        .unwrap();
    h.surface.set_filter("grayscale(1)").unwrap();
    h.surface.set_transparency(1.7).unwrap();
    h.surface.set_border_width(4).unwrap();
    h.surface.set_border_style(BorderStyle::Solid).unwrap();
    h.surface.set_border_color("#00ff00").unwrap();
    h.surface.set_video_source(Some("cam-2".into())).unwrap();

    for msg in drain(&mut h.preview) {
        view.apply(&msg);
    }
    assert_eq!(view, PreviewState::from_settings(&h.surface.settings()));
    assert_eq!(view.transparency, 1.0);
    assert_eq!(view.css_border(), "4px solid #00ff00");
    assert_eq!(h.store.saved().unwrap().display.filter, "grayscale(1)");

    assert!(h.surface.set_transparency(f32::NAN).is_err());
}

#[test]
fn sync_preview_sends_a_full_snapshot() {
    let mut h = harness();
    h.surface.set_border_width(2).unwrap();
    drain(&mut h.preview);

    let mut view = PreviewState::from_settings(&Settings::default());
    h.surface.sync_preview();
    for msg in drain(&mut h.preview) {
        view.apply(&msg);
    }
    assert_eq!(view.border_width, 2);
    assert_eq!(view, PreviewState::from_settings(&h.surface.settings()));
}

#[test]
fn failed_save_surfaces_and_keeps_old_value() {
    let mut h = harness();
    h.surface.set_border_width(1).unwrap();
    drain(&mut h.preview);

    h.store.fail_saves(true);
    assert!(matches!(h.surface.set_border_width(9), Err(Error::Store(_))));
    assert_eq!(h.surface.settings().border.width, 1);
    assert!(drain(&mut h.preview).is_empty());
}

#[test]
fn failed_selection_save_still_routes_to_the_new_device() {
    let mut h = harness();
    let id = DeviceId::new("10.0.0.5", DeviceFamily::EcpHttp);

    h.store.fail_saves(true);
    assert!(matches!(h.surface.select_device(id.clone()), Err(Error::Store(_))));

    assert_eq!(h.surface.router().selection().current(), Some(&id));
    assert_eq!(h.surface.settings().control.device_id, None);
    assert!(h.surface.press(&LogicalCommand::Key(NamedKey::Up)).is_sent());
    assert_eq!(h.rec.http_urls(), vec!["http://10.0.0.5:8060/keypress/up"]);
}

#[test]
fn preview_adb_keys_go_straight_to_the_session() {
    let mut h = harness();
    h.surface
        .select_device(DeviceId::new("10.0.0.5", DeviceFamily::AdbShell))
        .unwrap();

    let cams = vec![VideoSource {
        device_id: "cam-1".into(),
        label: "HDMI".into(),
    }];
    h.preview.send(WindowMessage::SetWebcams(cams.clone()));
    h.preview
        .send(WindowMessage::SendAdbKey(LogicalCommand::Key(NamedKey::Back)));
    h.preview.send(WindowMessage::SetBorderWidth(5));

    assert_eq!(h.surface.poll_inbound(), 3);
    assert_eq!(h.surface.sources(), cams.as_slice());
    assert_eq!(h.rec.shell_commands().last().unwrap(), "shell input keyevent 4");
    assert_eq!(h.surface.settings().border.width, 0);
}

#[test]
fn keys_typing_and_flags() {
    let mut h = harness();
    h.surface
        .select_device(DeviceId::new("10.0.0.5", DeviceFamily::EcpHttp))
        .unwrap();

    assert_eq!(h.surface.handle_key(&KeyEvent::down("ArrowLeft", None)), Some(Delivery::Sent));
    assert_eq!(h.surface.handle_key_tap(&KeyEvent::up("ArrowLeft", None)), None);
    assert_eq!(h.surface.handle_key_tap(&KeyEvent::down("Escape", None)), Some(Delivery::Sent));
    assert_eq!(h.surface.handle_key(&KeyEvent::down("F13", None)), None);
    assert_eq!(h.surface.type_text("a b").len(), 3);

    assert_eq!(
        h.rec.http_urls(),
        vec![
            "http://10.0.0.5:8060/keydown/left",
            "http://10.0.0.5:8060/keypress/back",
            "http://10.0.0.5:8060/keypress/lit_a",
            "http://10.0.0.5:8060/keypress/lit_%20",
            "http://10.0.0.5:8060/keypress/lit_b",
        ]
    );

    h.surface.set_display_flag(DisplayFlag::DarkMode, true).unwrap();
    h.surface
        .set_window_bounds(
            "control",
            WindowBounds {
                x: 0,
                y: 0,
                width: 400,
                height: 600,
            },
        )
        .unwrap();
    h.surface
        .set_file_paths(Some("/tmp/shots".into()), None)
        .unwrap();
    let saved = h.store.saved().unwrap();
    assert!(saved.display.dark_mode);
    assert_eq!(saved.windows["control"].height, 600);
    assert_eq!(saved.files.screenshot_path.as_deref(), Some(std::path::Path::new("/tmp/shots")));
}

#[test]
fn reconnect_cycles_the_adb_session() {
    let mut h = harness();
    assert!(!h.surface.reconnect());
    h.surface
        .select_device(DeviceId::new("10.0.0.5", DeviceFamily::AdbShell))
        .unwrap();
    assert!(h.surface.reconnect());
    assert_eq!(
        h.rec.shell_commands(),
        vec!["connect 10.0.0.5", "disconnect", "connect 10.0.0.5"]
    );
}

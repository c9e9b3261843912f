use crossterm::event::{
    self, Event, KeyCode, KeyEvent as TermKey, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    MediaKeyCode, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tvlink_core::{ControlSurface, KeyEvent, KeyPhase, Modifiers};

const POLL: Duration = Duration::from_millis(100);
const INBOUND_TICK: Duration = Duration::from_millis(50);

struct RawMode {
    enhanced: bool,
}

impl RawMode {
    fn enter(enhanced: bool) -> io::Result<Self> {
        enable_raw_mode()?;
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
        }
        Ok(Self { enhanced })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
    }
}

/// Forwards the terminal keyboard until Ctrl+C / Ctrl+Q. Terminals that report
/// key releases get press-and-hold; the rest send one tap per press.
pub async fn run(surface: &mut ControlSurface) -> anyhow::Result<()> {
    let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);

    match surface.router().selection().current() {
        Some(id) => eprintln!("live: sending to {id} (Ctrl+C or Ctrl+Q to quit)"),
        None => eprintln!("live: no device selected; keys are dropped until one is"),
    }
    if !enhanced {
        debug!("terminal does not report key releases; using tap mode");
    }

    let _raw = RawMode::enter(enhanced)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader = tokio::task::spawn_blocking(move || read_keys(tx));
    let mut tick = tokio::time::interval(INBOUND_TICK);

    loop {
        tokio::select! {
            key = rx.recv() => {
                let Some(key) = key else { break };
                if is_quit(&key) {
                    break;
                }
                let Some(event) = convert(&key) else { continue };
                let delivery = if enhanced {
                    surface.handle_key(&event)
                } else {
                    surface.handle_key_tap(&event)
                };
                if let Some(delivery) = delivery {
                    debug!(code = %event.code, ?delivery, "key");
                }
            }
            _ = tick.tick() => {
                surface.poll_inbound();
            }
        }
    }

    drop(rx);
    let _ = reader.await;
    Ok(())
}

fn read_keys(tx: mpsc::UnboundedSender<TermKey>) {
    while !tx.is_closed() {
        match event::poll(POLL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "terminal read failed");
                    return;
                }
            },
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "terminal poll failed");
                return;
            }
        }
    }
}

fn is_quit(key: &TermKey) -> bool {
    key.kind == KeyEventKind::Press
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c' | 'C' | 'q' | 'Q'))
}

/// Maps a terminal key to the browser-style code/key pair the keymap expects.
fn convert(key: &TermKey) -> Option<KeyEvent> {
    let (code, produced): (String, Option<String>) = match key.code {
        KeyCode::Char(c) => (char_code(c), Some(c.to_string())),
        KeyCode::Up => named("ArrowUp"),
        KeyCode::Down => named("ArrowDown"),
        KeyCode::Left => named("ArrowLeft"),
        KeyCode::Right => named("ArrowRight"),
        KeyCode::Enter => named("Enter"),
        KeyCode::Esc => named("Escape"),
        KeyCode::Backspace => named("Backspace"),
        KeyCode::Home => named("Home"),
        KeyCode::End => named("End"),
        KeyCode::Tab => named("Tab"),
        KeyCode::Delete => named("Delete"),
        KeyCode::F(n) => (format!("F{n}"), Some(format!("F{n}"))),
        KeyCode::Media(media) => named(match media {
            MediaKeyCode::PlayPause | MediaKeyCode::Play | MediaKeyCode::Pause => "MediaPlayPause",
            MediaKeyCode::Rewind | MediaKeyCode::TrackPrevious => "MediaTrackPrevious",
            MediaKeyCode::FastForward | MediaKeyCode::TrackNext => "MediaTrackNext",
            MediaKeyCode::MuteVolume => "AudioVolumeMute",
            MediaKeyCode::RaiseVolume => "AudioVolumeUp",
            MediaKeyCode::LowerVolume => "AudioVolumeDown",
            _ => return None,
        }),
        _ => return None,
    };

    let m = key.modifiers;
    let modifiers = Modifiers {
        shift: m.contains(KeyModifiers::SHIFT),
        control: m.contains(KeyModifiers::CONTROL),
        alt: m.contains(KeyModifiers::ALT),
        meta: m.contains(KeyModifiers::META) || m.contains(KeyModifiers::SUPER),
    };
    let (phase, is_repeat) = match key.kind {
        KeyEventKind::Press => (KeyPhase::Down, false),
        KeyEventKind::Repeat => (KeyPhase::Down, true),
        KeyEventKind::Release => (KeyPhase::Up, false),
    };

    Some(KeyEvent {
        code,
        key: produced,
        modifiers,
        phase,
        is_repeat,
    })
}

fn named(name: &str) -> (String, Option<String>) {
    (name.to_string(), Some(name.to_string()))
}

fn char_code(c: char) -> String {
    match c {
        'a'..='z' | 'A'..='Z' => format!("Key{}", c.to_ascii_uppercase()),
        '0'..='9' => format!("Digit{c}"),
        ' ' => "Space".to_string(),
        _ => "Unidentified".to_string(),
    }
}

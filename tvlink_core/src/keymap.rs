use std::collections::HashMap;
use tvlink_protocol::{LogicalCommand, NamedKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub meta: bool,
}

/// A raw keyboard event. `code` names the physical key (`"ArrowUp"`, `"KeyA"`),
/// `key` is what the key produced (`"a"`, `"A"`, or a key name like `"Shift"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: String,
    pub key: Option<String>,
    pub modifiers: Modifiers,
    pub phase: KeyPhase,
    pub is_repeat: bool,
}

impl KeyEvent {
    pub fn down(code: impl Into<String>, key: Option<&str>) -> Self {
        Self {
            code: code.into(),
            key: key.map(str::to_string),
            modifiers: Modifiers::default(),
            phase: KeyPhase::Down,
            is_repeat: false,
        }
    }

    pub fn up(code: impl Into<String>, key: Option<&str>) -> Self {
        Self {
            phase: KeyPhase::Up,
            ..Self::down(code, key)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.is_repeat = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
    pub command: LogicalCommand,
    pub phase: KeyPhase,
}

/// Which modifier acts as the primary shortcut modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Command (`Meta`) is primary.
    Mac,
    /// Control is primary.
    Standard,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Standard
        }
    }

    fn primary_prefix(self) -> &'static str {
        match self {
            Platform::Mac => "Meta",
            Platform::Standard => "Control",
        }
    }
}

const PLAIN_KEYS: &[(&str, NamedKey)] = &[
    ("ArrowUp", NamedKey::Up),
    ("ArrowDown", NamedKey::Down),
    ("ArrowLeft", NamedKey::Left),
    ("ArrowRight", NamedKey::Right),
    ("Enter", NamedKey::Select),
    ("NumpadEnter", NamedKey::Select),
    ("Escape", NamedKey::Back),
    ("Backspace", NamedKey::Backspace),
    ("Home", NamedKey::Home),
    ("MediaPlayPause", NamedKey::Play),
    ("MediaTrackPrevious", NamedKey::Rewind),
    ("MediaTrackNext", NamedKey::Forward),
    ("AudioVolumeMute", NamedKey::VolumeMute),
    ("AudioVolumeUp", NamedKey::VolumeUp),
    ("AudioVolumeDown", NamedKey::VolumeDown),
    ("BrowserHome", NamedKey::Home),
    ("BrowserBack", NamedKey::Back),
    ("BrowserSearch", NamedKey::Search),
];

// Joined to the platform's primary modifier, e.g. "Meta+KeyH" on mac.
const PRIMARY_CHORDS: &[(&str, NamedKey)] = &[
    ("KeyH", NamedKey::Home),
    ("KeyI", NamedKey::Info),
    ("KeyP", NamedKey::Play),
    ("KeyM", NamedKey::VolumeMute),
    ("KeyF", NamedKey::Search),
    ("KeyR", NamedKey::InstantReplay),
    ("ArrowLeft", NamedKey::Rewind),
    ("ArrowRight", NamedKey::Forward),
    ("ArrowUp", NamedKey::VolumeUp),
    ("ArrowDown", NamedKey::VolumeDown),
    ("Backspace", NamedKey::Back),
    ("Enter", NamedKey::Enter),
];

/// Static lookup from compound key strings to named keys, built once per process.
#[derive(Debug, Clone)]
pub struct Keymap {
    table: HashMap<String, NamedKey>,
}

impl Keymap {
    pub fn new(platform: Platform) -> Self {
        let prefix = platform.primary_prefix();
        let mut table: HashMap<String, NamedKey> = PLAIN_KEYS
            .iter()
            .map(|(code, key)| (code.to_string(), *key))
            .collect();
        for (code, key) in PRIMARY_CHORDS {
            table.insert(format!("{prefix}+{code}"), *key);
        }
        Self { table }
    }

    pub fn lookup(&self, compound: &str) -> Option<NamedKey> {
        self.table.get(compound).copied()
    }

    pub fn normalize(&self, event: &KeyEvent) -> Option<KeyStroke> {
        if event.is_repeat && event.phase == KeyPhase::Down {
            return None;
        }

        let command = match self.lookup(&compound_key(event)) {
            Some(key) => LogicalCommand::Key(key),
            None => LogicalCommand::literal(typed_char(event)?),
        };

        Some(KeyStroke {
            command,
            phase: event.phase,
        })
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

/// The physical code prefixed by the first active modifier (shift > control > alt > meta).
/// A modifier key's own event never gets prefixed with itself.
pub fn compound_key(event: &KeyEvent) -> String {
    let m = event.modifiers;
    let order: [(bool, &str, [&str; 2]); 4] = [
        (m.shift, "Shift", ["ShiftLeft", "ShiftRight"]),
        (m.control, "Control", ["ControlLeft", "ControlRight"]),
        (m.alt, "Alt", ["AltLeft", "AltRight"]),
        (m.meta, "Meta", ["MetaLeft", "MetaRight"]),
    ];

    for (active, name, own_codes) in order {
        if active && !own_codes.contains(&event.code.as_str()) {
            return format!("{name}+{}", event.code);
        }
    }
    event.code.clone()
}

fn typed_char(event: &KeyEvent) -> Option<&str> {
    let key = event.key.as_deref()?;
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(_), None) => Some(key),
        _ => None,
    }
}

/// One literal command per character, with newlines sent as Enter.
pub fn text_commands(text: &str) -> Vec<LogicalCommand> {
    text.chars()
        .map(|c| match c {
            '\n' | '\r' => LogicalCommand::Key(NamedKey::Enter),
            c => LogicalCommand::literal(c.to_string()),
        })
        .collect()
}

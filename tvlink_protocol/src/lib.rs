use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Characters escaped in literal tokens: everything `encodeURIComponent` escapes.
const LITERAL_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const LITERAL_PREFIX: &str = "lit_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown device family: {0:?}")]
    UnknownFamily(String),
    #[error("device id must look like \"address|family\", got {0:?}")]
    MalformedDeviceId(String),
    #[error("unknown key token: {0:?}")]
    UnknownKey(String),
    #[error("invalid resolution: {0:?}")]
    InvalidResolution(String),
    #[error("unknown border style: {0:?}")]
    UnknownBorderStyle(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceFamily {
    EcpHttp,
    AdbShell,
}

impl DeviceFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceFamily::EcpHttp => "ecp-http",
            DeviceFamily::AdbShell => "adb-shell",
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceFamily {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ecp-http" | "ecp" | "roku" => Ok(DeviceFamily::EcpHttp),
            "adb-shell" | "adb" | "firetv" => Ok(DeviceFamily::AdbShell),
            other => Err(ParseError::UnknownFamily(other.to_string())),
        }
    }
}

/// Identity of a remote device, rendered as `"{address}|{family}"`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId {
    pub address: String,
    pub family: DeviceFamily,
}

impl DeviceId {
    pub fn new(address: impl Into<String>, family: DeviceFamily) -> Self {
        Self {
            address: address.into(),
            family,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.address, self.family)
    }
}

impl FromStr for DeviceId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((address, family)) = s.split_once('|') else {
            return Err(ParseError::MalformedDeviceId(s.to_string()));
        };
        Ok(Self {
            address: address.trim().to_string(),
            family: family.parse()?,
        })
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub address: String,
    pub family: DeviceFamily,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl DeviceRecord {
    pub fn id(&self) -> DeviceId {
        DeviceId::new(self.address.clone(), self.family)
    }

    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.address)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NamedKey {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Home,
    Info,
    Rewind,
    Play,
    Forward,
    VolumeMute,
    VolumeUp,
    VolumeDown,
    Backspace,
    Search,
    Enter,
    InstantReplay,
}

impl NamedKey {
    pub const ALL: [NamedKey; 18] = [
        NamedKey::Up,
        NamedKey::Down,
        NamedKey::Left,
        NamedKey::Right,
        NamedKey::Select,
        NamedKey::Back,
        NamedKey::Home,
        NamedKey::Info,
        NamedKey::Rewind,
        NamedKey::Play,
        NamedKey::Forward,
        NamedKey::VolumeMute,
        NamedKey::VolumeUp,
        NamedKey::VolumeDown,
        NamedKey::Backspace,
        NamedKey::Search,
        NamedKey::Enter,
        NamedKey::InstantReplay,
    ];

    pub fn token(self) -> &'static str {
        match self {
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Select => "select",
            NamedKey::Back => "back",
            NamedKey::Home => "home",
            NamedKey::Info => "info",
            NamedKey::Rewind => "rewind",
            NamedKey::Play => "play",
            NamedKey::Forward => "forward",
            NamedKey::VolumeMute => "volume-mute",
            NamedKey::VolumeUp => "volume-up",
            NamedKey::VolumeDown => "volume-down",
            NamedKey::Backspace => "backspace",
            NamedKey::Search => "search",
            NamedKey::Enter => "enter",
            NamedKey::InstantReplay => "instant-replay",
        }
    }
}

impl FromStr for NamedKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        NamedKey::ALL
            .into_iter()
            .find(|k| k.token() == wanted)
            .ok_or_else(|| ParseError::UnknownKey(s.to_string()))
    }
}

/// Protocol-agnostic operator intent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum LogicalCommand {
    Key(NamedKey),
    /// A typed character with no named mapping; holds the raw text.
    Literal(String),
}

impl LogicalCommand {
    pub fn literal(text: impl Into<String>) -> Self {
        LogicalCommand::Literal(text.into())
    }

    pub fn named(&self) -> Option<NamedKey> {
        match self {
            LogicalCommand::Key(k) => Some(*k),
            LogicalCommand::Literal(_) => None,
        }
    }

    /// Wire token: the key name, or `lit_` followed by the percent-encoded text.
    pub fn token(&self) -> String {
        match self {
            LogicalCommand::Key(k) => k.token().to_string(),
            LogicalCommand::Literal(text) => literal_token(text),
        }
    }
}

impl From<NamedKey> for LogicalCommand {
    fn from(key: NamedKey) -> Self {
        LogicalCommand::Key(key)
    }
}

impl fmt::Display for LogicalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

impl FromStr for LogicalCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(encoded) = s.strip_prefix(LITERAL_PREFIX) {
            let text = percent_decode_str(encoded)
                .decode_utf8()
                .map_err(|_| ParseError::UnknownKey(s.to_string()))?;
            if text.is_empty() {
                return Err(ParseError::UnknownKey(s.to_string()));
            }
            return Ok(LogicalCommand::Literal(text.into_owned()));
        }
        s.parse().map(LogicalCommand::Key)
    }
}

impl TryFrom<String> for LogicalCommand {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LogicalCommand> for String {
    fn from(cmd: LogicalCommand) -> Self {
        cmd.token()
    }
}

pub fn literal_token(text: &str) -> String {
    format!("{LITERAL_PREFIX}{}", utf8_percent_encode(text, LITERAL_ESCAPE))
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseError::InvalidResolution(s.to_string());
        let (w, h) = s.trim().split_once(|c: char| c == 'x' || c == 'X').ok_or_else(bad)?;
        let width: u32 = w.trim().parse().map_err(|_| bad())?;
        let height: u32 = h.trim().parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(Self { width, height })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BorderStyle {
    #[default]
    None,
    Solid,
    Dashed,
    Dotted,
    Double,
}

impl BorderStyle {
    pub fn as_css(self) -> &'static str {
        match self {
            BorderStyle::None => "none",
            BorderStyle::Solid => "solid",
            BorderStyle::Dashed => "dashed",
            BorderStyle::Dotted => "dotted",
            BorderStyle::Double => "double",
        }
    }
}

impl fmt::Display for BorderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

impl FromStr for BorderStyle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BorderStyle::None),
            "solid" => Ok(BorderStyle::Solid),
            "dashed" => Ok(BorderStyle::Dashed),
            "dotted" => Ok(BorderStyle::Dotted),
            "double" => Ok(BorderStyle::Double),
            _ => Err(ParseError::UnknownBorderStyle(s.to_string())),
        }
    }
}

/// A capture device the preview can show.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    pub device_id: String,
    pub label: String,
}

/// Messages exchanged between the control surface and the preview surface.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type", content = "payload")]
pub enum WindowMessage {
    SetWebcams(Vec<VideoSource>),
    SetVideoStream(Option<String>),
    SetTransparency(f32),
    SetResolution(Resolution),
    SetFilter(String),
    SetBorderWidth(u32),
    SetBorderStyle(BorderStyle),
    SetBorderColor(String),
    SetControlList(Vec<DeviceRecord>),
    SetControlSelected(Option<DeviceId>),
    SendAdbKey(LogicalCommand),
}

impl WindowMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WindowMessage::SetWebcams(_) => "set-webcams",
            WindowMessage::SetVideoStream(_) => "set-video-stream",
            WindowMessage::SetTransparency(_) => "set-transparency",
            WindowMessage::SetResolution(_) => "set-resolution",
            WindowMessage::SetFilter(_) => "set-filter",
            WindowMessage::SetBorderWidth(_) => "set-border-width",
            WindowMessage::SetBorderStyle(_) => "set-border-style",
            WindowMessage::SetBorderColor(_) => "set-border-color",
            WindowMessage::SetControlList(_) => "set-control-list",
            WindowMessage::SetControlSelected(_) => "set-control-selected",
            WindowMessage::SendAdbKey(_) => "send-adb-key",
        }
    }
}

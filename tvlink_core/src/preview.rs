use crate::channel::Endpoint;
use crate::settings::Settings;
use tracing::{debug, info};
use tvlink_protocol::{BorderStyle, DeviceId, DeviceRecord, Resolution, VideoSource, WindowMessage};

/// What the preview window currently shows. Only changed through [`PreviewState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub video_stream: Option<String>,
    pub transparency: f32,
    pub resolution: Resolution,
    pub filter: String,
    pub border_width: u32,
    pub border_style: BorderStyle,
    pub border_color: String,
    pub devices: Vec<DeviceRecord>,
    pub selected: Option<DeviceId>,
}

impl PreviewState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            video_stream: settings.display.device_id.clone(),
            transparency: settings.display.transparency,
            resolution: settings.display.resolution,
            filter: settings.display.filter.clone(),
            border_width: settings.border.width,
            border_style: settings.border.style,
            border_color: settings.border.color.clone(),
            devices: settings.control.device_list.clone(),
            selected: settings.control.device_id.clone(),
        }
    }

    /// Returns whether the message changed anything visible.
    pub fn apply(&mut self, msg: &WindowMessage) -> bool {
        match msg {
            WindowMessage::SetVideoStream(stream) => {
                replace(&mut self.video_stream, stream.clone())
            }
            WindowMessage::SetTransparency(t) => replace(&mut self.transparency, *t),
            WindowMessage::SetResolution(r) => replace(&mut self.resolution, *r),
            WindowMessage::SetFilter(f) => replace(&mut self.filter, f.clone()),
            WindowMessage::SetBorderWidth(w) => replace(&mut self.border_width, *w),
            WindowMessage::SetBorderStyle(s) => replace(&mut self.border_style, *s),
            WindowMessage::SetBorderColor(c) => replace(&mut self.border_color, c.clone()),
            WindowMessage::SetControlList(list) => replace(&mut self.devices, list.clone()),
            WindowMessage::SetControlSelected(id) => replace(&mut self.selected, id.clone()),
            // Travels preview -> control only.
            WindowMessage::SetWebcams(_) | WindowMessage::SendAdbKey(_) => false,
        }
    }

    /// CSS `border` shorthand for the current border settings.
    pub fn css_border(&self) -> String {
        if self.border_width == 0 || self.border_style == BorderStyle::None {
            return "none".to_string();
        }
        format!(
            "{}px {} {}",
            self.border_width,
            self.border_style.as_css(),
            self.border_color
        )
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Runs the preview side until the control end goes away. Announces the
/// capture sources first, then applies every message in order.
pub async fn run(
    mut endpoint: Endpoint,
    mut state: PreviewState,
    sources: Vec<VideoSource>,
) -> PreviewState {
    if !sources.is_empty() {
        endpoint.send(WindowMessage::SetWebcams(sources));
    }

    while let Some(msg) = endpoint.recv().await {
        let kind = msg.kind();
        if state.apply(&msg) {
            info!(
                kind,
                border = %state.css_border(),
                resolution = %state.resolution,
                filter = %state.filter,
                "preview updated"
            );
        } else {
            debug!(kind, "preview unchanged");
        }
    }
    state
}

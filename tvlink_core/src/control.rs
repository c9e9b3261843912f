//! The control surface: the only writer of settings and the owner of the router.
//!
//! Every mutation is persisted through [`SharedSettings::update`] before the
//! full new value of the changed field is broadcast to the preview.

use crate::channel::Endpoint;
use crate::error::{Error, Result};
use crate::keymap::{text_commands, KeyEvent, KeyPhase, Keymap};
use crate::router::{CommandRouter, Delivery};
use crate::settings::{DisplayFlag, Settings, SharedSettings, WindowBounds};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tvlink_protocol::{
    BorderStyle, DeviceId, DeviceRecord, LogicalCommand, Resolution, VideoSource, WindowMessage,
};

pub struct ControlSurface {
    settings: SharedSettings,
    router: CommandRouter,
    keymap: Keymap,
    preview: Endpoint,
    sources: Vec<VideoSource>,
}

impl ControlSurface {
    /// Restores the persisted device selection, reopening its adb session if it has one.
    pub fn new(settings: SharedSettings, router: CommandRouter, preview: Endpoint) -> Self {
        let mut surface = Self {
            settings,
            router,
            keymap: Keymap::default(),
            preview,
            sources: Vec::new(),
        };
        if let Some(id) = surface.settings.snapshot().control.device_id.clone() {
            info!(device = %id, "restoring selection");
            surface.router.selection_mut().select(id);
        }
        surface
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.snapshot()
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    pub fn sources(&self) -> &[VideoSource] {
        &self.sources
    }

    pub fn handle_key(&self, event: &KeyEvent) -> Option<Delivery> {
        let stroke = self.keymap.normalize(event)?;
        Some(self.router.dispatch(&stroke.command, Some(stroke.phase)))
    }

    /// For inputs that never report releases: each press is sent as a single tap.
    pub fn handle_key_tap(&self, event: &KeyEvent) -> Option<Delivery> {
        if event.phase == KeyPhase::Up {
            return None;
        }
        let stroke = self.keymap.normalize(event)?;
        Some(self.router.dispatch(&stroke.command, None))
    }

    pub fn press(&self, command: &LogicalCommand) -> Delivery {
        self.router.dispatch(command, None)
    }

    pub fn type_text(&self, text: &str) -> Vec<Delivery> {
        text_commands(text)
            .iter()
            .map(|cmd| self.router.dispatch(cmd, None))
            .collect()
    }

    /// Returns whether the selection changed.
    pub fn select_device(&mut self, id: DeviceId) -> Result<bool> {
        // The live selection is kept even if persisting it fails.
        let changed = self.router.selection_mut().select(id.clone());
        let persisted = Some(id);
        self.settings.update(|s| s.control.device_id = persisted.clone())?;
        self.preview.send(WindowMessage::SetControlSelected(persisted));
        Ok(changed)
    }

    pub fn unselect(&mut self) -> Result<()> {
        self.router.selection_mut().clear();
        self.settings.update(|s| s.control.device_id = None)?;
        self.preview.send(WindowMessage::SetControlSelected(None));
        Ok(())
    }

    /// Adds a record, or updates the alias of the one with the same identity.
    pub fn add_device(&mut self, record: DeviceRecord) -> Result<()> {
        let address = record.address.trim();
        if address.is_empty() {
            return Err(Error::InvalidValue {
                field: "device address",
                value: record.address.clone(),
            });
        }
        let record = DeviceRecord {
            address: address.to_string(),
            alias: record
                .alias
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            ..record
        };

        self.settings.update(|s| {
            let list = &mut s.control.device_list;
            match list.iter_mut().find(|d| d.id() == record.id()) {
                Some(existing) => existing.alias = record.alias.clone(),
                None => list.push(record.clone()),
            }
        })?;
        debug!(device = %record.id(), "device saved");
        self.broadcast_devices();
        Ok(())
    }

    /// Deletes a record. A selection pointing at it is cleared and its adb
    /// session closed. Returns whether a record was removed.
    pub fn remove_device(&mut self, id: &DeviceId) -> Result<bool> {
        let was_selected = self.router.selection_mut().forget(id);
        let removed = self.settings.update(|s| {
            let before = s.control.device_list.len();
            s.control.device_list.retain(|d| &d.id() != id);
            if s.control.device_id.as_ref() == Some(id) {
                s.control.device_id = None;
            }
            s.control.device_list.len() != before
        })?;

        if removed {
            info!(device = %id, "device removed");
            self.broadcast_devices();
        }
        if was_selected {
            self.preview.send(WindowMessage::SetControlSelected(None));
        }
        Ok(removed)
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.settings.update(|s| s.display.resolution = resolution)?;
        self.preview.send(WindowMessage::SetResolution(resolution));
        Ok(())
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) -> Result<()> {
        let filter = filter.into();
        let filter = if filter.trim().is_empty() {
            "none".to_string()
        } else {
            filter.trim().to_string()
        };
        self.settings.update(|s| s.display.filter = filter.clone())?;
        self.preview.send(WindowMessage::SetFilter(filter));
        Ok(())
    }

    /// Clamped to `0.0..=1.0`.
    pub fn set_transparency(&mut self, transparency: f32) -> Result<()> {
        if !transparency.is_finite() {
            return Err(Error::InvalidValue {
                field: "transparency",
                value: transparency.to_string(),
            });
        }
        let transparency = transparency.clamp(0.0, 1.0);
        self.settings.update(|s| s.display.transparency = transparency)?;
        self.preview.send(WindowMessage::SetTransparency(transparency));
        Ok(())
    }

    pub fn set_border_width(&mut self, width: u32) -> Result<()> {
        self.settings.update(|s| s.border.width = width)?;
        self.preview.send(WindowMessage::SetBorderWidth(width));
        Ok(())
    }

    pub fn set_border_style(&mut self, style: BorderStyle) -> Result<()> {
        self.settings.update(|s| s.border.style = style)?;
        self.preview.send(WindowMessage::SetBorderStyle(style));
        Ok(())
    }

    pub fn set_border_color(&mut self, color: impl Into<String>) -> Result<()> {
        let color = color.into().trim().to_string();
        if color.is_empty() {
            return Err(Error::InvalidValue {
                field: "border color",
                value: color,
            });
        }
        self.settings.update(|s| s.border.color = color.clone())?;
        self.preview.send(WindowMessage::SetBorderColor(color));
        Ok(())
    }

    /// Picks the capture device the preview shows; `None` blanks it.
    pub fn set_video_source(&mut self, device_id: Option<String>) -> Result<()> {
        self.settings.update(|s| s.display.device_id = device_id.clone())?;
        self.preview.send(WindowMessage::SetVideoStream(device_id));
        Ok(())
    }

    /// Capture devices reported by the preview. Not persisted.
    pub fn set_webcams(&mut self, sources: Vec<VideoSource>) {
        debug!(count = sources.len(), "capture sources updated");
        self.sources = sources;
    }

    pub fn set_window_bounds(&mut self, window: &str, bounds: WindowBounds) -> Result<()> {
        self.settings.update(|s| {
            s.windows.insert(window.to_string(), bounds);
        })
    }

    pub fn set_display_flag(&mut self, flag: DisplayFlag, value: bool) -> Result<()> {
        self.settings.update(|s| *s.display.flag_mut(flag) = value)
    }

    pub fn set_file_paths(
        &mut self,
        screenshot: Option<PathBuf>,
        recording: Option<PathBuf>,
    ) -> Result<()> {
        self.settings.update(|s| {
            s.files.screenshot_path = screenshot;
            s.files.recording_path = recording;
        })
    }

    /// Handles a message from the preview. Returns the delivery for forwarded keys.
    pub fn handle_message(&mut self, msg: WindowMessage) -> Option<Delivery> {
        match msg {
            WindowMessage::SendAdbKey(command) => Some(self.router.dispatch_adb(&command)),
            WindowMessage::SetWebcams(sources) => {
                self.set_webcams(sources);
                None
            }
            other => {
                debug!(kind = other.kind(), "control surface ignores message");
                None
            }
        }
    }

    /// Drains whatever the preview has sent so far.
    pub fn poll_inbound(&mut self) -> usize {
        let mut handled = 0;
        while let Some(msg) = self.preview.try_recv() {
            self.handle_message(msg);
            handled += 1;
        }
        handled
    }

    /// Pushes the full visual state, e.g. to a preview that just started.
    pub fn sync_preview(&self) {
        let s = self.settings.snapshot();
        for msg in [
            WindowMessage::SetVideoStream(s.display.device_id.clone()),
            WindowMessage::SetTransparency(s.display.transparency),
            WindowMessage::SetResolution(s.display.resolution),
            WindowMessage::SetFilter(s.display.filter.clone()),
            WindowMessage::SetBorderWidth(s.border.width),
            WindowMessage::SetBorderStyle(s.border.style),
            WindowMessage::SetBorderColor(s.border.color.clone()),
            WindowMessage::SetControlList(s.control.device_list.clone()),
            WindowMessage::SetControlSelected(s.control.device_id.clone()),
        ] {
            if !self.preview.send(msg) {
                break;
            }
        }
    }

    /// Reopens the adb session for the current target.
    pub fn reconnect(&mut self) -> bool {
        self.router.selection_mut().connection_mut().reconnect()
    }

    fn broadcast_devices(&self) {
        let list = self.settings.snapshot().control.device_list.clone();
        self.preview.send(WindowMessage::SetControlList(list));
    }
}

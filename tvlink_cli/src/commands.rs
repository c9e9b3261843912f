use crate::{Command, DevicesCmd, PhaseArg, SettingsCmd};
use anyhow::{bail, Context};
use tvlink_core::{
    BorderStyle, ControlSurface, Delivery, DeviceFamily, DeviceId, DeviceRecord, KeyPhase,
    LogicalCommand, Resolution,
};

pub fn run(surface: &mut ControlSurface, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Devices(cmd) => devices(surface, cmd),
        Command::Select { id } => {
            let id: DeviceId = id.parse().context("device ids look like `10.0.0.5|ecp-http`")?;
            if surface.select_device(id.clone())? {
                eprintln!("selected {id}");
            } else {
                eprintln!("{id} already selected");
            }
            Ok(())
        }
        Command::Unselect => {
            surface.unselect()?;
            Ok(())
        }
        Command::Press { token, phase } => {
            let command: LogicalCommand = token.parse()?;
            let phase = phase.map(|p| match p {
                PhaseArg::Down => KeyPhase::Down,
                PhaseArg::Up => KeyPhase::Up,
            });
            report(surface.router().dispatch(&command, phase));
            Ok(())
        }
        Command::Type { text } => {
            let dropped = surface
                .type_text(&text)
                .into_iter()
                .filter(|d| !d.is_sent())
                .count();
            if dropped > 0 {
                eprintln!("{dropped} character(s) not sent");
            }
            Ok(())
        }
        Command::Reconnect => {
            if !surface.reconnect() {
                bail!("no adb session to reconnect");
            }
            Ok(())
        }
        Command::Settings(cmd) => settings(surface, cmd),
        Command::Live => bail!("live mode runs from main"),
    }
}

fn devices(surface: &mut ControlSurface, cmd: DevicesCmd) -> anyhow::Result<()> {
    match cmd {
        DevicesCmd::List => {
            let settings = surface.settings();
            let current = surface.router().selection().current();
            if settings.control.device_list.is_empty() {
                eprintln!("no devices saved; add one with `tvlink devices add <address> <family>`");
            }
            for record in &settings.control.device_list {
                let id = record.id();
                let marker = if Some(&id) == current { '*' } else { ' ' };
                println!("{marker} {id:<28} {}", record.label());
            }
            Ok(())
        }
        DevicesCmd::Add {
            address,
            family,
            alias,
        } => {
            let family: DeviceFamily = family.parse()?;
            surface.add_device(DeviceRecord {
                address,
                family,
                alias,
            })?;
            Ok(())
        }
        DevicesCmd::Remove { id } => {
            let id: DeviceId = id.parse()?;
            if !surface.remove_device(&id)? {
                bail!("no saved device {id}");
            }
            Ok(())
        }
    }
}

fn settings(surface: &mut ControlSurface, cmd: SettingsCmd) -> anyhow::Result<()> {
    match cmd {
        SettingsCmd::Show => {
            println!("{}", serde_json::to_string_pretty(&*surface.settings())?);
        }
        SettingsCmd::SetResolution { resolution } => {
            let resolution: Resolution = resolution.parse()?;
            surface.set_resolution(resolution)?;
        }
        SettingsCmd::SetFilter { filter } => surface.set_filter(filter)?,
        SettingsCmd::SetTransparency { value } => surface.set_transparency(value)?,
        SettingsCmd::SetBorder {
            width,
            style,
            color,
        } => {
            if width.is_none() && style.is_none() && color.is_none() {
                bail!("pass at least one of --width, --style, --color");
            }
            if let Some(width) = width {
                surface.set_border_width(width)?;
            }
            if let Some(style) = style {
                let style: BorderStyle = style.parse()?;
                surface.set_border_style(style)?;
            }
            if let Some(color) = color {
                surface.set_border_color(color)?;
            }
        }
        SettingsCmd::SetSource { device_id } => surface.set_video_source(device_id)?,
    }
    Ok(())
}

fn report(delivery: Delivery) {
    if let Delivery::Dropped(reason) = delivery {
        eprintln!("not sent: {reason:?}");
    }
}

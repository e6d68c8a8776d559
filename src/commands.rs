//! Commands a camera accepts, and how host command text maps onto them.

use crate::channels::{
    CHANNEL_ENABLE, CHANNEL_EVENT_ALARM, CHANNEL_EVENT_MANUAL, CHANNEL_EVENT_MOTION, CHANNEL_MOVE,
    CHANNEL_RECORD, CHANNEL_SNAPSHOT, CHANNEL_ZOOM,
};
use crate::error::{CommandError, CommandResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
    Home,
}

// Speed used for every PTZ move
pub const PTZ_MOVE_SPEED: u32 = 1;

/// A command forwarded to the station for one camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    Record(bool),
    Enable(bool),
    Zoom(ZoomDirection),
    Move(MoveDirection),
}

impl CameraCommand {
    pub fn is_ptz(&self) -> bool {
        matches!(self, CameraCommand::Zoom(_) | CameraCommand::Move(_))
    }

    /// Station API method this command maps to.
    pub fn method(&self) -> &'static str {
        match self {
            CameraCommand::Record(_) => "Record",
            CameraCommand::Enable(true) => "Enable",
            CameraCommand::Enable(false) => "Disable",
            CameraCommand::Zoom(_) => "Zoom",
            CameraCommand::Move(_) => "Move",
        }
    }

    /// Request parameters in the station's vocabulary, excluding the camera id.
    pub fn wire_params(&self) -> Vec<(&'static str, String)> {
        match self {
            CameraCommand::Record(on) => vec![("action", (if *on { "start" } else { "stop" }).to_string())],
            CameraCommand::Enable(_) => Vec::new(),
            CameraCommand::Zoom(direction) => {
                let control = match direction {
                    ZoomDirection::In => "in",
                    ZoomDirection::Out => "out",
                };
                vec![("control", control.into()), ("moveType", "Start".into())]
            }
            CameraCommand::Move(direction) => {
                let direction = match direction {
                    MoveDirection::Up => "up",
                    MoveDirection::Down => "down",
                    MoveDirection::Left => "left",
                    MoveDirection::Right => "right",
                    MoveDirection::Home => "home",
                };
                vec![
                    ("direction", direction.into()),
                    ("speed", PTZ_MOVE_SPEED.to_string()),
                    ("moveType", "Start".into()),
                ]
            }
        }
    }
}

/// What a host asked a channel to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCommand {
    Refresh,
    Camera(CameraCommand),
}

impl ChannelCommand {
    /// Parses host command text (`ON`, `OFF`, `IN`, `UP`, `REFRESH`, ...) for a channel.
    pub fn parse(channel_id: &str, text: &str) -> CommandResult<Self> {
        let normalized = text.trim().to_ascii_uppercase();
        if normalized == "REFRESH" {
            return match channel_id {
                CHANNEL_SNAPSHOT | CHANNEL_EVENT_MOTION | CHANNEL_EVENT_ALARM
                | CHANNEL_EVENT_MANUAL => Ok(ChannelCommand::Refresh),
                CHANNEL_RECORD | CHANNEL_ENABLE | CHANNEL_ZOOM | CHANNEL_MOVE => {
                    Err(unsupported(channel_id, text))
                }
                other => Err(CommandError::UnsupportedChannel(other.to_string())),
            };
        }

        let command = match channel_id {
            CHANNEL_RECORD => CameraCommand::Record(parse_on_off(channel_id, text, &normalized)?),
            CHANNEL_ENABLE => CameraCommand::Enable(parse_on_off(channel_id, text, &normalized)?),
            CHANNEL_ZOOM => match normalized.as_str() {
                "IN" => CameraCommand::Zoom(ZoomDirection::In),
                "OUT" => CameraCommand::Zoom(ZoomDirection::Out),
                _ => return Err(unsupported(channel_id, text)),
            },
            CHANNEL_MOVE => match normalized.as_str() {
                "UP" => CameraCommand::Move(MoveDirection::Up),
                "DOWN" => CameraCommand::Move(MoveDirection::Down),
                "LEFT" => CameraCommand::Move(MoveDirection::Left),
                "RIGHT" => CameraCommand::Move(MoveDirection::Right),
                "HOME" => CameraCommand::Move(MoveDirection::Home),
                _ => return Err(unsupported(channel_id, text)),
            },
            CHANNEL_SNAPSHOT | CHANNEL_EVENT_MOTION | CHANNEL_EVENT_ALARM | CHANNEL_EVENT_MANUAL => {
                return Err(unsupported(channel_id, text));
            }
            other => return Err(CommandError::UnsupportedChannel(other.to_string())),
        };
        Ok(ChannelCommand::Camera(command))
    }
}

fn parse_on_off(channel_id: &str, text: &str, normalized: &str) -> CommandResult<bool> {
    match normalized {
        "ON" | "1" | "TRUE" => Ok(true),
        "OFF" | "0" | "FALSE" => Ok(false),
        _ => Err(unsupported(channel_id, text)),
    }
}

fn unsupported(channel_id: &str, text: &str) -> CommandError {
    CommandError::UnsupportedCommand {
        channel: channel_id.to_string(),
        command: text.to_string(),
    }
}

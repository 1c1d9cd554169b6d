use crate::protocol;
use crate::protocol::messages::PusherMessage;

/// A close-worthy wire error: a fixed numeric code plus message, emitted as a
/// `pusher:error` frame before the socket is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsError {
    pub code: u16,
    pub message: &'static str,
}

impl WsError {
    pub fn frame(&self) -> PusherMessage {
        PusherMessage::error(self.code, self.message)
    }
}

pub const APPLICATION_ONLY_ACCEPTS_SSL: WsError = WsError {
    code: protocol::APPLICATION_ONLY_ACCEPTS_SSL,
    message: "Application only accepts SSL connections, reconnect using wss://",
};

pub const APPLICATION_DOES_NOT_EXIST: WsError = WsError {
    code: protocol::APPLICATION_DOES_NOT_EXIST,
    message: "Could not found an app with the given key",
};

pub const APPLICATION_DISABLED: WsError = WsError {
    code: protocol::APPLICATION_DISABLED,
    message: "Application disabled",
};

pub const INVALID_VERSION_STRING_FORMAT: WsError = WsError {
    code: protocol::INVALID_VERSION_STRING_FORMAT,
    message: "Invalid version string format",
};

pub const UNSUPPORTED_PROTOCOL_VERSION: WsError = WsError {
    code: protocol::UNSUPPORTED_PROTOCOL_VERSION,
    message: "Unsupported protocol version",
};

pub const NO_PROTOCOL_VERSION_SUPPLIED: WsError = WsError {
    code: protocol::NO_PROTOCOL_VERSION_SUPPLIED,
    message: "No protocol version supplied",
};

pub const RECONNECT_IMMEDIATELY: WsError = WsError {
    code: protocol::GENERIC_RECONNECT_IMMEDIATELY,
    message: "Generic reconnect immediately",
};

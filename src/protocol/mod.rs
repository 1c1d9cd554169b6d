pub mod messages;

/// Only this protocol version is accepted during the handshake.
pub const SUPPORTED_PROTOCOL_VERSION: u32 = 7;

/// Advertised in `pusher:connection_established`. Advisory only; the broker
/// answers pings but runs no watchdog of its own.
pub const ACTIVITY_TIMEOUT_SECONDS: u32 = 120;

/// Maximum size of the `data` member of a published event, in bytes.
pub const MAX_EVENT_PAYLOAD_BYTES: usize = 10_000;

/// Upper bound on a single webhook delivery, connect to last body byte.
pub const WEBHOOK_TIMEOUT_SECONDS: u64 = 3;

// Close-worthy error codes (4000-4099: do not reconnect with the same
// parameters; 4200-4299: reconnect immediately).
pub const APPLICATION_ONLY_ACCEPTS_SSL: u16 = 4000;
pub const APPLICATION_DOES_NOT_EXIST: u16 = 4001;
pub const APPLICATION_DISABLED: u16 = 4003;
pub const INVALID_VERSION_STRING_FORMAT: u16 = 4006;
pub const UNSUPPORTED_PROTOCOL_VERSION: u16 = 4007;
pub const NO_PROTOCOL_VERSION_SUPPLIED: u16 = 4008;
pub const GENERIC_RECONNECT_IMMEDIATELY: u16 = 4200;

/// Rendered as a JSON `null` code on the wire.
pub const GENERIC_ERROR: u16 = 0;

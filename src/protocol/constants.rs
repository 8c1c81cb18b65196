//! Wire constants shared by the TCP line protocol and the UDP frame stream

/// Default TCP control port
pub const DEFAULT_TCP_PORT: u16 = 8080;

/// Default UDP video port
pub const DEFAULT_UDP_PORT: u16 = 44444;

/// Receive buffer for one datagram. Must exceed the camera's
/// max payload plus [`FRAGMENT_HEADER_SIZE`].
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// Frame id (2) + fragment index (1) + fragment count (1)
pub const FRAGMENT_HEADER_SIZE: usize = 4;

/// Payload bytes the camera simulator puts in one datagram
pub const DEFAULT_MAX_FRAGMENT_PAYLOAD: usize = 1400;

/// The fragment count is a single byte
pub const MAX_FRAGMENTS_PER_FRAME: usize = u8::MAX as usize;

/// Line terminator appended to every outbound command
pub const LINE_TERMINATOR: &str = "\n";

// Namespace tags
pub const TAG_IAM: &str = "IAM";
pub const TAG_BUTTON: &str = "BUTTON";
pub const TAG_ULTRASONIC: &str = "ULTRASONIC";
pub const TAG_THRESHOLDS: &str = "THRESHOLDS";
pub const TAG_CLIENT_DISCONNECTED: &str = "CLIENT_DISCONNECTED";
pub const TAG_IP: &str = "IP";

/// Separator between tag and payload
pub const TAG_SEPARATOR: char = ':';

// Ultrasonic sentinels and alarm tokens
pub const DANGER_SENTINEL: &str = "DANGER";
pub const SAFE_SENTINEL: &str = "SAFE";
pub const ALARM_ON: &str = "ALARM_ON";
pub const ALARM_OFF: &str = "ALARM_OFF";

// Well-known peripheral names
pub const BUTTON_PERIPHERAL: &str = "BUTTON";
pub const ULTRASONIC_PERIPHERAL: &str = "ULTRASONIC";
pub const CAMERA_PERIPHERAL: &str = "CAMERA";

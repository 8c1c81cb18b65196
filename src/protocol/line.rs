//! Tagged line grammar
//!
//! Peripheral firmware has shipped two line formats:
//!
//! ```text
//! generation 1:  BUTTON_1_PRESSED            plain token, no tag
//! generation 2:  BUTTON:<payload>            tag-prefixed
//!                ULTRASONIC:<payload>
//! ```
//!
//! Generation 1 peripherals that only send a payload (`DANGER`) are tagged by
//! the name they registered under, so a connection named `ULTRASONIC` sending
//! `DANGER` decodes the same as one sending `ULTRASONIC:DANGER`.
//!
//! `CLIENT_DISCONNECTED` is synthesized by the host and is never accepted from
//! the wire; such a line decodes as an untagged message.

use std::fmt;

use crate::protocol::constants::*;
use crate::protocol::thresholds::Thresholds;

/// Namespace of a control event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// Handshake, payload is the peripheral name
    Iam,
    /// Button press
    Button,
    /// Ultrasonic reading: danger/safe sentinel or a distance
    Ultrasonic,
    /// Threshold configuration
    Thresholds,
    /// Peripheral announced its address
    Address,
    /// Host-side: a named peripheral went away
    ClientDisconnected,
    /// Line without a recognized tag
    Message,
}

impl EventTag {
    /// Wire name of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::Iam => TAG_IAM,
            EventTag::Button => TAG_BUTTON,
            EventTag::Ultrasonic => TAG_ULTRASONIC,
            EventTag::Thresholds => TAG_THRESHOLDS,
            EventTag::Address => TAG_IP,
            EventTag::ClientDisconnected => TAG_CLIENT_DISCONNECTED,
            EventTag::Message => "MESSAGE",
        }
    }

    /// Tags a peripheral may put in front of a line
    fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            TAG_IAM => Some(EventTag::Iam),
            TAG_BUTTON => Some(EventTag::Button),
            TAG_ULTRASONIC => Some(EventTag::Ultrasonic),
            TAG_THRESHOLDS => Some(EventTag::Thresholds),
            TAG_IP => Some(EventTag::Address),
            _ => None,
        }
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded unit of control traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEvent {
    source: Option<String>,
    tag: EventTag,
    payload: String,
}

impl ControlEvent {
    /// Create an event
    pub fn new(source: Option<&str>, tag: EventTag, payload: impl Into<String>) -> Self {
        Self {
            source: source.map(str::to_string),
            tag,
            payload: payload.into(),
        }
    }

    /// Handshake event for `name`
    pub fn iam(name: &str) -> Self {
        Self::new(Some(name), EventTag::Iam, name)
    }

    /// Synthesized disconnect event for `name`
    pub fn disconnected(name: &str) -> Self {
        Self::new(Some(name), EventTag::ClientDisconnected, name)
    }

    /// Decode one line received from `source`
    pub fn decode(source: Option<&str>, line: &str) -> Self {
        let line = line.trim_end();

        if let Some((tag, payload)) = line.split_once(TAG_SEPARATOR) {
            if let Some(tag) = EventTag::from_wire(tag.trim()) {
                return Self::new(source, tag, payload.trim());
            }
        }

        if is_legacy_button(line) {
            return Self::new(source, EventTag::Button, line);
        }

        let by_source = source
            .and_then(EventTag::from_wire)
            .filter(|tag| matches!(tag, EventTag::Button | EventTag::Ultrasonic));
        if let Some(tag) = by_source {
            return Self::new(source, tag, line.trim());
        }

        Self::new(source, EventTag::Message, line)
    }

    /// Name of the peripheral the event came from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Event namespace
    pub fn tag(&self) -> EventTag {
        self.tag
    }

    /// Payload after the tag
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Check whether this is an ultrasonic reading equal to `sentinel`
    pub fn is_reading(&self, sentinel: &str) -> bool {
        self.tag == EventTag::Ultrasonic && self.payload.eq_ignore_ascii_case(sentinel)
    }

    /// Numeric distance of an ultrasonic reading, in cm
    pub fn distance_cm(&self) -> Option<f32> {
        if self.tag != EventTag::Ultrasonic {
            return None;
        }
        self.payload.parse().ok()
    }

    /// Parsed thresholds of a `THRESHOLDS` event
    pub fn thresholds(&self) -> Option<Thresholds> {
        if self.tag != EventTag::Thresholds {
            return None;
        }
        Thresholds::parse(&self.payload).ok()
    }
}

impl fmt::Display for ControlEvent {
    /// Canonical wire form, `<TAG>:<payload>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            EventTag::Message => f.write_str(&self.payload),
            tag => write!(f, "{tag}{TAG_SEPARATOR}{}", self.payload),
        }
    }
}

/// Generation 1 button tokens, e.g. `BUTTON_1_PRESSED`, `button3_pressed_twice`
fn is_legacy_button(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() > TAG_BUTTON.len()
        && bytes[..TAG_BUTTON.len()].eq_ignore_ascii_case(TAG_BUTTON.as_bytes())
        && !line.contains(TAG_SEPARATOR)
}

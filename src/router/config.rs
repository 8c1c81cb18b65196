//! Router configuration

use crate::protocol::constants::{
    ALARM_OFF, ALARM_ON, BUTTON_PERIPHERAL, DANGER_SENTINEL, SAFE_SENTINEL, ULTRASONIC_PERIPHERAL,
};

/// Names and tokens the router acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Peripheral that sounds the alarm
    pub alarm_peripheral: String,

    /// Peripheral whose readings trigger the alarm
    pub ultrasonic_peripheral: String,

    /// Reading that starts the alarm (compared case-insensitively)
    pub danger_sentinel: String,

    /// Reading that stops the alarm (compared case-insensitively)
    pub safe_sentinel: String,

    /// Command sent to start the alarm
    pub alarm_on: String,

    /// Command sent to stop the alarm
    pub alarm_off: String,

    /// Capacity of the forwarded event channel
    pub forward_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            alarm_peripheral: BUTTON_PERIPHERAL.to_string(),
            ultrasonic_peripheral: ULTRASONIC_PERIPHERAL.to_string(),
            danger_sentinel: DANGER_SENTINEL.to_string(),
            safe_sentinel: SAFE_SENTINEL.to_string(),
            alarm_on: ALARM_ON.to_string(),
            alarm_off: ALARM_OFF.to_string(),
            forward_capacity: 256,
        }
    }
}

impl RouterConfig {
    /// Set the alarm peripheral name
    pub fn alarm_peripheral(mut self, name: impl Into<String>) -> Self {
        self.alarm_peripheral = name.into();
        self
    }

    /// Set the ultrasonic peripheral name
    pub fn ultrasonic_peripheral(mut self, name: impl Into<String>) -> Self {
        self.ultrasonic_peripheral = name.into();
        self
    }

    /// Set the danger and safe sentinels
    pub fn sentinels(mut self, danger: impl Into<String>, safe: impl Into<String>) -> Self {
        self.danger_sentinel = danger.into();
        self.safe_sentinel = safe.into();
        self
    }

    /// Set the alarm on/off command tokens
    pub fn alarm_commands(mut self, on: impl Into<String>, off: impl Into<String>) -> Self {
        self.alarm_on = on.into();
        self.alarm_off = off.into();
        self
    }

    /// Set the forwarded channel capacity (at least 1)
    pub fn forward_capacity(mut self, capacity: usize) -> Self {
        self.forward_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();

        assert_eq!(config.alarm_peripheral, "BUTTON");
        assert_eq!(config.ultrasonic_peripheral, "ULTRASONIC");
        assert_eq!(config.danger_sentinel, "DANGER");
        assert_eq!(config.safe_sentinel, "SAFE");
        assert_eq!(config.alarm_on, "ALARM_ON");
        assert_eq!(config.alarm_off, "ALARM_OFF");
    }

    #[test]
    fn test_builder_chaining() {
        let config = RouterConfig::default()
            .alarm_peripheral("BUZZER")
            .ultrasonic_peripheral("SONAR")
            .sentinels("NEAR", "CLEAR")
            .alarm_commands("BEEP", "QUIET")
            .forward_capacity(0);

        assert_eq!(config.alarm_peripheral, "BUZZER");
        assert_eq!(config.ultrasonic_peripheral, "SONAR");
        assert_eq!(config.danger_sentinel, "NEAR");
        assert_eq!(config.safe_sentinel, "CLEAR");
        assert_eq!(config.alarm_on, "BEEP");
        assert_eq!(config.alarm_off, "QUIET");
        assert_eq!(config.forward_capacity, 1);
    }
}

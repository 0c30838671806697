//! Firewall port table.
//!
//! Rules are written the way `ufw` takes them (`22/tcp`, `47998:48000/udp`)
//! and validated before any rule is applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::error::ConfigError;

/// Transport protocol of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// One port or an inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ports {
    Single(u16),
    Range(u16, u16),
}

/// A single allow rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRule {
    pub ports: Ports,
    pub protocol: Protocol,
}

impl PortRule {
    #[must_use]
    pub const fn tcp(port: u16) -> Self {
        Self {
            ports: Ports::Single(port),
            protocol: Protocol::Tcp,
        }
    }

    #[must_use]
    pub const fn udp_range(start: u16, end: u16) -> Self {
        Self {
            ports: Ports::Range(start, end),
            protocol: Protocol::Udp,
        }
    }
}

/// SSH management port plus the Sunshine web UI, control and stream ports.
#[must_use]
pub fn default_rules() -> Vec<PortRule> {
    vec![
        PortRule::tcp(22),
        PortRule::tcp(47984),
        PortRule::tcp(47989),
        PortRule::tcp(47990),
        PortRule::tcp(48010),
        PortRule::udp_range(47998, 48000),
    ]
}

impl fmt::Display for PortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ports {
            Ports::Single(p) => write!(f, "{p}/{}", self.protocol.as_str()),
            Ports::Range(a, b) => write!(f, "{a}:{b}/{}", self.protocol.as_str()),
        }
    }
}

impl FromStr for PortRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidRule {
            rule: s.to_string(),
            reason: reason.to_string(),
        };

        let (ports, proto) = s
            .split_once('/')
            .ok_or_else(|| invalid("expected <port>/<tcp|udp> or <start>:<end>/<tcp|udp>"))?;
        let protocol = match proto {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            _ => return Err(invalid("protocol must be tcp or udp")),
        };
        let parse_port = |p: &str| -> Result<u16, ConfigError> {
            match p.parse::<u16>() {
                Ok(0) | Err(_) => Err(invalid("ports must be between 1 and 65535")),
                Ok(n) => Ok(n),
            }
        };
        let ports = match ports.split_once(':') {
            None => Ports::Single(parse_port(ports)?),
            Some((a, b)) => {
                let (start, end) = (parse_port(a)?, parse_port(b)?);
                if start > end {
                    return Err(invalid("range start must not exceed range end"));
                }
                Ports::Range(start, end)
            }
        };
        Ok(Self { ports, protocol })
    }
}

impl Serialize for PortRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

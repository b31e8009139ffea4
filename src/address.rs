//! Bluetooth device address of the tracked peer.
//!
//! Parsed from the usual `AA:BB:CC:DD:EE:FF` text form.  The kernel's
//! `bdaddr_t` stores the octets little-endian, so [`BdAddr::to_le_bytes`]
//! gives the wire order the HCI adapter needs.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A 48-bit Bluetooth device address, most significant octet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Octets in display order (`AA` first).
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Octets in `bdaddr_t` order (`FF` first).
    pub fn to_le_bytes(&self) -> [u8; 6] {
        let mut b = self.0;
        b.reverse();
        b
    }

    /// `00:00:00:00:00:00` is the placeholder shipped in the default config.
    pub fn is_unset(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl FromStr for BdAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidAddress(s.to_string());
        let mut octets = [0u8; 6];
        let mut parts = s.trim().split(':');
        for octet in &mut octets {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for BdAddr {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BdAddr> for String {
    fn from(addr: BdAddr) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

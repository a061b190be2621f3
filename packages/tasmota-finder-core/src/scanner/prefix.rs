//! Network prefix and candidate address enumeration.

use crate::error::PrefixError;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Number of host addresses probed per run (`.1` through `.255`).
pub const CANDIDATE_COUNT: usize = 255;

/// First three octets of the local /24 subnet, e.g. `192.168.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkPrefix([u8; 3]);

impl NetworkPrefix {
    pub fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// Prefix of the /24 containing `addr` (normally the default gateway).
    pub fn from_gateway(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self([a, b, c])
    }

    /// Full address for a last octet.
    pub fn host(&self, octet: u8) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, octet)
    }

    /// All candidate host addresses, `.1` to `.255` inclusive.
    ///
    /// `.255` is the broadcast address on most /24 networks but is probed anyway.
    pub fn candidates(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let prefix = *self;
        (1..=u8::MAX).map(move |octet| prefix.host(octet))
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{}.{}.{}", a, b, c)
    }
}

impl FromStr for NetworkPrefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PrefixError::InvalidPrefix(s.to_string());

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let mut octets = [0u8; 3];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_prefix() {
        let prefix: NetworkPrefix = "192.168.1".parse().unwrap();
        assert_eq!(prefix, NetworkPrefix::new(192, 168, 1));
        assert_eq!(prefix.to_string(), "192.168.1");
    }

    #[test]
    fn test_parse_prefix_rejects_malformed() {
        for bad in ["", "192.168", "192.168.1.0", "192.168.256", "a.b.c", "10..1", "10.+1.1"] {
            assert!(bad.parse::<NetworkPrefix>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_from_gateway() {
        let prefix = NetworkPrefix::from_gateway(Ipv4Addr::new(10, 0, 7, 254));
        assert_eq!(prefix.to_string(), "10.0.7");
    }

    #[test]
    fn test_candidates_cover_every_host_once() {
        let prefix = NetworkPrefix::new(192, 168, 1);
        let candidates: Vec<Ipv4Addr> = prefix.candidates().collect();

        assert_eq!(candidates.len(), CANDIDATE_COUNT);
        assert_eq!(candidates.first(), Some(&Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(candidates.last(), Some(&Ipv4Addr::new(192, 168, 1, 255)));

        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), CANDIDATE_COUNT);

        for octet in 1..=255u8 {
            assert!(unique.contains(&prefix.host(octet)));
        }
        assert!(!unique.contains(&prefix.host(0)));
    }
}

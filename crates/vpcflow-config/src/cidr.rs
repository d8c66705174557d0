//! Minimal IPv4 CIDR block handling for validating network layouts.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in `a.b.c.d/n` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Cidr {
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask(&self) -> u32 {
        (!0u32)
            .checked_shl(32 - u32::from(self.prefix_len))
            .unwrap_or(0)
    }

    /// Whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        if other.prefix_len < self.prefix_len {
            return false;
        }
        let mask = self.mask();
        (u32::from(other.network) & mask) == (u32::from(self.network) & mask)
    }

    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("'{}' は CIDR 形式 (a.b.c.d/n) ではありません", s))?;

        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("'{}' は IPv4 アドレスではありません", addr))?;
        let prefix_len: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| format!("プレフィックス長 '{}' は 0-32 の範囲外です", prefix))?;

        let cidr = Self {
            network,
            prefix_len,
        };

        // Host bits must be zero, the provider rejects blocks like 10.0.0.1/16
        if u32::from(network) & !cidr.mask() != 0 {
            return Err(format!("'{}' にホスト部のビットが含まれています", s));
        }

        Ok(cidr)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

//! IPv4 CIDR blocks and sequential subnet carving.
//!
//! Subnets are carved out of the VPC block in declaration order: every call to
//! [`CidrAllocator::allocate`] returns the next aligned, unused block of the
//! requested prefix length.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An IPv4 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Build a block from a network address and prefix length.
    ///
    /// Fails if the prefix is longer than 32 bits or the address has host bits set.
    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::invalid_cidr(
                format!("{}/{}", network, prefix),
                "prefix length must be between 0 and 32",
            ));
        }

        let raw = u32::from(network);
        if raw & !mask_bits(prefix) != 0 {
            return Err(Error::invalid_cidr(
                format!("{}/{}", network, prefix),
                format!(
                    "host bits are set (did you mean {}/{}?)",
                    Ipv4Addr::from(raw & mask_bits(prefix)),
                    prefix
                ),
            ));
        }

        Ok(Self { network, prefix })
    }

    /// Parse `a.b.c.d/n`.
    pub fn parse(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::invalid_cidr(s, "missing '/<prefix>'"))?;

        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| Error::invalid_cidr(s, format!("'{}' is not an IPv4 address", addr)))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| Error::invalid_cidr(s, format!("'{}' is not a prefix length", prefix)))?;

        Self::new(network, prefix)
    }

    /// Network address.
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Last address of the block.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !mask_bits(self.prefix))
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    /// Whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.network) & mask_bits(self.prefix) == u32::from(self.network)
    }

    /// Whether the two blocks share any address.
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The `0.0.0.0/0` block.
    pub fn any() -> Self {
        Self {
            network: Ipv4Addr::UNSPECIFIED,
            prefix: 0,
        }
    }
}

fn mask_bits(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

/// Hands out consecutive subnets from a parent block.
#[derive(Debug, Clone)]
pub struct CidrAllocator {
    block: Ipv4Cidr,
    /// Offset of the next free address, relative to the block's network address
    next: u64,
}

impl CidrAllocator {
    /// Create an allocator over `block`.
    pub fn new(block: Ipv4Cidr) -> Self {
        Self { block, next: 0 }
    }

    /// The parent block.
    pub fn block(&self) -> Ipv4Cidr {
        self.block
    }

    /// Allocate the next aligned `/mask` block.
    pub fn allocate(&mut self, mask: u8) -> Result<Ipv4Cidr> {
        if mask > 32 || mask < self.block.prefix {
            return Err(Error::invalid_cidr(
                format!("/{}", mask),
                format!(
                    "subnet mask must be between /{} and /32 for block {}",
                    self.block.prefix, self.block
                ),
            ));
        }

        let size = 1u64 << (32 - u32::from(mask));
        let start = self.next.div_ceil(size) * size;
        if start + size > self.block.size() {
            return Err(Error::CidrExhausted {
                block: self.block.to_string(),
                mask,
            });
        }

        self.next = start + size;
        // start < block size <= 2^32 so the sum stays within u32
        let network = u32::from(self.block.network) + start as u32;
        Ipv4Cidr::new(Ipv4Addr::from(network), mask)
    }
}

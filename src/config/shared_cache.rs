//! Shared session cache settings
//!
//! Only the address book of the replication peers is built here. The
//! table has a fixed capacity and never shrinks.

use serde::Serialize;

use crate::config::defaults::{MAX_MCASTIF_LEN, MAX_SHCUPD_PEERS};
use crate::config::endpoint::{parse_endpoint, Endpoint, EndpointRules, HostPort};
use crate::config::error::{ConfigError, Result};

/// Bounded list of update peers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PeerTable {
    peers: Vec<HostPort>,
}

impl PeerTable {
    /// Parse `spec` as a concrete `[HOST]:PORT` and append it
    pub fn add_peer(&mut self, spec: &str) -> Result<()> {
        if self.peers.len() >= MAX_SHCUPD_PEERS {
            return Err(ConfigError::CapacityExceeded(MAX_SHCUPD_PEERS));
        }

        match parse_endpoint(spec, EndpointRules::PEER)?.endpoint {
            Endpoint::Tcp(hp) => self.peers.push(hp),
            Endpoint::Unix(_) => return Err(ConfigError::InvalidAddress(spec.to_string())),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= MAX_SHCUPD_PEERS
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostPort> {
        self.peers.iter()
    }
}

/// Multicast interface and TTL for cache updates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct McastIf {
    /// `None` leaves the interface to the kernel
    pub iface: Option<String>,
    pub ttl: Option<u8>,
}

/// Parse `IFACE` or `IFACE,TTL`; `*` as interface pins none
pub fn parse_mcast_if(value: &str) -> Result<McastIf> {
    if value.len() >= MAX_MCASTIF_LEN {
        return Err(ConfigError::InvalidValue(
            "shared-cache-if".to_string(),
            "Invalid option for IFACE[,TTL]".to_string(),
        ));
    }

    let (iface, ttl) = match value.split_once(',') {
        Some((iface, ttl)) => (iface, Some(ttl)),
        None => (value, None),
    };

    let iface = match iface {
        "*" => None,
        other => Some(other.to_string()),
    };

    let ttl = ttl
        .map(|t| {
            t.parse::<u8>().map_err(|_| {
                ConfigError::InvalidValue(
                    "shared-cache-if".to_string(),
                    format!("Invalid multicast TTL '{}'", t),
                )
            })
        })
        .transpose()?;

    Ok(McastIf { iface, ttl })
}

/// Shared cache options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SharedCacheOptions {
    /// Number of cache entries; 0 disables the shared cache
    pub size: u32,
    /// Where to receive updates from peers
    pub listen: Option<HostPort>,
    pub peers: PeerTable,
    pub mcast_if: Option<McastIf>,
}

impl SharedCacheOptions {
    pub fn is_enabled(&self) -> bool {
        self.size > 0
    }
}

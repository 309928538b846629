use crate::time::{Duration, Expiration, Instant};
use crate::wire::{EthernetAddress, Ipv6Address};

/// Number of entries of the neighbor cache of an interface.
pub const NEIGHBOR_CACHE_SIZE: usize = 8;

/// A cached neighbor.
///
/// A neighbor mapping translates from an IPv6 address to a hardware address, and contains the
/// timestamp past which the mapping should be considered invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    protocol_addr: Ipv6Address,
    hardware_addr: EthernetAddress,
    expires_at:    Expiration,
}

/// Why an entry could not be added to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// There was no space to add the entry.
    ///
    /// Entries that do no expire will never be deleted.
    NoSpace,

    /// All other entries that could be evicted live longer.
    ExpiresTooSoon,
}

/// A neighbor cache with a fixed number of entries.
///
/// Filled from the link layer address options of inbound neighbor discovery messages and
/// consulted when resolving the next hop of an outbound packet. When full, the entry expiring
/// soonest is replaced.
#[derive(Debug, Clone)]
pub struct Cache {
    storage: [Option<Neighbor>; NEIGHBOR_CACHE_SIZE],
}

impl Cache {
    /// Neighbor entry lifetime, in milliseconds.
    pub const ENTRY_LIFETIME: Duration = Duration::from_millis(60_000);

    /// Create an empty cache.
    pub fn new() -> Self {
        Cache { storage: [None; NEIGHBOR_CACHE_SIZE] }
    }

    /// Add or refresh an entry.
    ///
    /// Provide the current timestamp or `None` to disable expiration.
    pub fn fill(
        &mut self,
        protocol_addr: Ipv6Address,
        hardware_addr: EthernetAddress,
        timestamp: Option<Instant>,
    ) -> Result<(), Error> {
        debug_assert!(protocol_addr.is_unicast());
        debug_assert!(hardware_addr.is_unicast());

        let new_neighbor = Neighbor {
            protocol_addr,
            hardware_addr,
            expires_at: timestamp.map(|ts| ts + Self::ENTRY_LIFETIME).into(),
        };

        // Is this already mapped?
        let existing = self.storage.iter_mut()
            .flatten()
            .find(|neighbor| neighbor.protocol_addr == protocol_addr);
        if let Some(entry) = existing {
            net_trace!("neighbor: refreshed {} -> {}", protocol_addr, hardware_addr);
            *entry = new_neighbor;
            return Ok(());
        }

        let free = match self.storage.iter().position(Option::is_none) {
            Some(idx) => idx,
            None => {
                // Find the entry expiring first.
                let (idx, oldest) = self.storage.iter()
                    .enumerate()
                    .filter_map(|(idx, entry)| entry.map(|neighbor| (idx, neighbor)))
                    .min_by_key(|(_, neighbor)| neighbor.expires_at)
                    .ok_or(Error::NoSpace)?;
                if oldest.expires_at == Expiration::Never {
                    return Err(Error::NoSpace);
                }
                if oldest.expires_at > new_neighbor.expires_at {
                    return Err(Error::ExpiresTooSoon);
                }
                idx
            },
        };

        net_trace!("neighbor: learned {} -> {}", protocol_addr, hardware_addr);
        self.storage[free] = Some(new_neighbor);
        Ok(())
    }

    /// Find the hardware address of a neighbor that has not expired at `timestamp`.
    pub fn lookup(&self, protocol_addr: Ipv6Address, timestamp: Instant) -> Option<EthernetAddress> {
        self.storage.iter()
            .flatten()
            .find(|neighbor| neighbor.protocol_addr == protocol_addr)
            .filter(|neighbor| neighbor.is_alive(timestamp))
            .map(|neighbor| neighbor.hardware_addr)
    }

    /// Remove an entry.
    pub fn forget(&mut self, protocol_addr: Ipv6Address) {
        for entry in self.storage.iter_mut() {
            if entry.map_or(false, |neighbor| neighbor.protocol_addr == protocol_addr) {
                *entry = None;
            }
        }
    }

    /// Iterate over all stored entries, including expired ones.
    pub fn iter(&self) -> impl Iterator<Item=&Neighbor> + '_ {
        self.storage.iter().flatten()
    }

    /// The number of stored entries, including expired ones.
    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Cache::new()
    }
}

impl Neighbor {
    /// The IPv6 address of the neighbor.
    pub fn protocol_addr(&self) -> Ipv6Address {
        self.protocol_addr
    }

    /// The hardware address that frames to the neighbor are sent to.
    pub fn hardware_addr(&self) -> EthernetAddress {
        self.hardware_addr
    }

    /// Whether the entry is still valid at `ts`.
    pub fn is_alive(&self, ts: Instant) -> bool {
        Expiration::When(ts) < self.expires_at
    }

    /// Whether the entry can no longer be used at `ts`.
    pub fn is_expired(&self, ts: Instant) -> bool {
        !self.is_alive(ts)
    }
}

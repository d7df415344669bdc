use alloc::format;
use core::fmt::Display;

use crate::config::{PEER_ADDRESS_FILE, PEER_ADDRESS_PATH, STORAGE_ROOT};
use crate::error::StorageError;
use crate::memlog::SharedLogger;
use crate::storage::{Lookup, Storage, WriteMode};

/// Link-layer address of the single peer. Fixed once the node has booted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerAddress(pub [u8; 6]);

impl PeerAddress {
    pub const BROADCAST: PeerAddress = PeerAddress([0xFF; 6]);

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Reads the persisted peer address, falling back to broadcast.
    pub fn load(storage: &mut impl Storage, memlog: SharedLogger) -> PeerAddress {
        match Self::try_load(storage) {
            Ok(address) => {
                memlog.info(format!("peer address {address}"));
                address
            }
            Err(error) => {
                memlog.warn(format!("peer address unavailable ({error}), using broadcast"));
                Self::BROADCAST
            }
        }
    }

    fn try_load(storage: &mut impl Storage) -> Result<PeerAddress, StorageError> {
        if storage.search(STORAGE_ROOT, PEER_ADDRESS_FILE)? == Lookup::NotFound {
            return Err(StorageError::NotFound);
        }

        let mut address = [0u8; 6];
        let count = storage.read(PEER_ADDRESS_PATH, 0, &mut address)?;
        if count != address.len() {
            return Err(StorageError::ShortRead {
                expected: address.len(),
                actual: count,
            });
        }

        Ok(PeerAddress(address))
    }

    pub fn store(&self, storage: &mut impl Storage) -> Result<(), StorageError> {
        storage.write(PEER_ADDRESS_PATH, 0, &self.0, WriteMode::Truncate)
    }
}

impl Display for PeerAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

//! Allow-lists of authorized nodes and approved firmware.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::AllowList;
use crate::error::{Error, Result};
use crate::types::{FirmwareMeasurement, HardwareIdentity, NodeRecord};

type NodeSlot = Arc<Mutex<NodeRecord>>;

/// Shared registry of authorized nodes and approved firmware.
///
/// Clones share state. Construct one per process (or per test) and hand it to
/// [`crate::AnchorVerifier`]. Each node sits behind its own mutex so counter
/// updates for one identity are serialized while other identities proceed.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    nodes: Arc<DashMap<HardwareIdentity, NodeSlot>>,
    firmware: Arc<DashSet<FirmwareMeasurement>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry populated from an allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for the first entry that is not a
    /// valid 32-byte hex value.
    pub async fn from_allow_list(allow_list: &AllowList) -> Result<Self> {
        let registry = Self::new();

        for node in &allow_list.nodes {
            registry
                .register_node(&node.hardware_identity, node.name.clone())
                .await?;
        }

        for firmware in &allow_list.firmware {
            registry.approve_firmware(firmware)?;
        }

        Ok(registry)
    }

    /// Authorizes a node, or re-registers it.
    ///
    /// Re-registering an existing identity renames it and resets its counter
    /// to 0. The reset waits for any in-flight verification of that node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `identity_hex` is not `0x` followed
    /// by 32 bytes of hex.
    pub async fn register_node(
        &self,
        identity_hex: &str,
        name: impl Into<String> + Send,
    ) -> Result<HardwareIdentity> {
        let identity =
            HardwareIdentity::from_hex(identity_hex).map_err(|source| Error::MalformedInput {
                field: "hardware_identity",
                source,
            })?;
        let name = name.into();

        let mut created = false;
        let slot = Arc::clone(
            self.nodes
                .entry(identity)
                .or_insert_with(|| {
                    created = true;
                    Arc::new(Mutex::new(NodeRecord::new(identity, name.clone())))
                })
                .value(),
        );

        if created {
            info!(%identity, name = %name, "authorized node added");
        } else {
            let mut record = slot.lock().await;
            warn!(
                %identity,
                name = %name,
                previous_counter = record.last_counter(),
                "node re-registered, counter reset to 0"
            );
            record.reset(name);
        }

        Ok(identity)
    }

    /// Approves a firmware measurement. Returns `false` if it was already approved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `hash_hex` is not `0x` followed by
    /// 32 bytes of hex.
    pub fn approve_firmware(&self, hash_hex: &str) -> Result<bool> {
        let firmware =
            FirmwareMeasurement::from_hex(hash_hex).map_err(|source| Error::MalformedInput {
                field: "firmware_hash",
                source,
            })?;

        let inserted = self.firmware.insert(firmware);
        if inserted {
            info!(%firmware, "approved firmware added");
        }

        Ok(inserted)
    }

    /// Whether `identity` is registered.
    #[must_use]
    pub fn is_authorized(&self, identity: &HardwareIdentity) -> bool {
        self.nodes.contains_key(identity)
    }

    /// Whether `firmware` is approved.
    #[must_use]
    pub fn is_firmware_approved(&self, firmware: &FirmwareMeasurement) -> bool {
        self.firmware.contains(firmware)
    }

    /// Snapshot of a node's record.
    pub async fn node(&self, identity: &HardwareIdentity) -> Option<NodeRecord> {
        let slot = self.slot(identity)?;
        let record = slot.lock().await;

        Some(record.clone())
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of approved firmware measurements.
    #[must_use]
    pub fn firmware_count(&self) -> usize {
        self.firmware.len()
    }

    /// The lockable record for `identity`, detached from the map shard.
    pub(crate) fn slot(&self, identity: &HardwareIdentity) -> Option<NodeSlot> {
        self.nodes.get(identity).map(|entry| Arc::clone(entry.value()))
    }
}

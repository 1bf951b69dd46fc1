//! The receipt verification pipeline.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::receipt::AttestationReceipt;
use crate::registry::Registry;
use crate::rejection::Rejection;
use crate::types::{ExecutionHash, HardwareIdentity, ReceiptDigest};

/// What the anchoring side needs to know about an accepted receipt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AcceptedReceipt {
    /// The node that produced the receipt.
    pub hardware_identity: HardwareIdentity,

    /// The node's registered name.
    pub display_name: String,

    /// The counter now stored for the node.
    pub counter: u64,

    /// The counter stored before this receipt was accepted.
    pub previous_counter: u64,

    /// The attested execution.
    pub execution_hash: ExecutionHash,

    /// The verified receipt digest.
    pub receipt_digest: ReceiptDigest,
}

/// Flat accept/reject projection handed to external collaborators.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether the receipt may be anchored.
    pub accepted: bool,

    /// [`Outcome::VALID`] on accept, otherwise [`Rejection::code`].
    pub reason: String,
}

impl Outcome {
    /// Reason reported for accepted receipts.
    pub const VALID: &'static str = "Valid";
}

impl From<&Result<AcceptedReceipt, Rejection>> for Outcome {
    fn from(result: &Result<AcceptedReceipt, Rejection>) -> Self {
        match result {
            Ok(_) => Self {
                accepted: true,
                reason: Self::VALID.to_string(),
            },
            Err(rejection) => Self {
                accepted: false,
                reason: rejection.code().to_string(),
            },
        }
    }
}

/// Decides whether receipts may be anchored, advancing node counters on success.
#[derive(Clone, Debug)]
pub struct AnchorVerifier {
    registry: Registry,
}

impl AnchorVerifier {
    /// Creates a verifier over `registry`.
    #[must_use]
    pub const fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry this verifier reads and updates.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Parses and verifies a JSON receipt.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first failed check. State is unchanged
    /// on every error path.
    pub async fn verify(&self, receipt_json: &str) -> Result<AcceptedReceipt, Rejection> {
        let receipt = match AttestationReceipt::from_json(receipt_json) {
            Ok(receipt) => receipt,
            Err(malformed) => {
                let rejection = Rejection::from(malformed);
                warn!(reason = rejection.code(), %rejection, "receipt rejected");
                return Err(rejection);
            }
        };

        self.verify_receipt(&receipt).await
    }

    /// Verifies an already-parsed receipt.
    ///
    /// Runs identity, firmware, monotonicity and digest checks in that order,
    /// then commits the new counter. The node's lock is held from the identity
    /// lookup through the commit.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first failed check.
    pub async fn verify_receipt(
        &self,
        receipt: &AttestationReceipt,
    ) -> Result<AcceptedReceipt, Rejection> {
        let result = self.check_and_commit(receipt).await;

        match &result {
            Ok(accepted) => info!(
                identity = %accepted.hardware_identity,
                name = %accepted.display_name,
                counter = accepted.counter,
                "receipt authorized for anchoring"
            ),
            Err(rejection) => warn!(
                identity = %receipt.hardware_identity,
                counter = receipt.counter,
                reason = rejection.code(),
                %rejection,
                "receipt rejected"
            ),
        }

        result
    }

    async fn check_and_commit(
        &self,
        receipt: &AttestationReceipt,
    ) -> Result<AcceptedReceipt, Rejection> {
        let slot = self
            .registry
            .slot(&receipt.hardware_identity)
            .ok_or(Rejection::UnauthorizedIdentity(receipt.hardware_identity))?;
        let mut record = slot.lock().await;
        debug!(name = record.display_name(), "[1/4] identity check passed");

        if !self.registry.is_firmware_approved(&receipt.firmware_hash) {
            return Err(Rejection::UnapprovedFirmware(receipt.firmware_hash));
        }
        debug!("[2/4] firmware check passed");

        let last_counter = record.last_counter();
        if receipt.counter <= last_counter {
            return Err(Rejection::ReplayDetected {
                counter: receipt.counter,
                last_counter,
            });
        }
        debug!(
            counter = receipt.counter,
            last_counter, "[3/4] monotonicity check passed"
        );

        if receipt.expected_digest() != receipt.receipt_digest {
            return Err(Rejection::DigestMismatch);
        }
        debug!("[4/4] digest reconstruction passed");

        record.advance(receipt.counter);

        Ok(AcceptedReceipt {
            hardware_identity: receipt.hardware_identity,
            display_name: record.display_name().to_string(),
            counter: receipt.counter,
            previous_counter: last_counter,
            execution_hash: receipt.execution_hash,
            receipt_digest: receipt.receipt_digest,
        })
    }
}

// crates/trustgate-core/src/attestation.rs

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::crypto::{self, Keypair};
use crate::encoding::{hex32, hex64};
use crate::error::TrustgateError;
use crate::snapshot::Tier;

/// Domain tag prefixed to every attestation digest.
pub const ATTESTATION_DIGEST_DOMAIN: &[u8] = b"trustgate/attestation/v1";

/// Identifies one registry deployment. Signatures are bound to it so an
/// update signed for one chain or registry cannot be replayed on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDomain {
    pub registry_address: Address,
    pub chain_id: u64,
}

/// A tier update signed by the attestation authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationUpdate {
    /// Wallet address the tier applies to.
    pub subject: Address,
    pub tier: Tier,
    /// Canonical hash of the off-chain snapshot this update anchors.
    #[serde(with = "hex32")]
    pub snapshot_hash: [u8; 32],
    /// Unix seconds after which the anchor no longer authorizes anything.
    pub expires_at: i64,
    /// Must be strictly greater than the subject's anchored nonce.
    pub nonce: u64,
}

impl AttestationUpdate {
    /// Domain-separated digest the authority signs.
    ///
    /// SHA-256 over:
    ///   ATTESTATION_DIGEST_DOMAIN
    ///   registry_address   20 bytes
    ///   chain_id           u64 big-endian
    ///   subject            20 bytes
    ///   tier               1 byte
    ///   snapshot_hash      32 bytes
    ///   expires_at         i64 big-endian
    ///   nonce              u64 big-endian
    pub fn digest(&self, domain: &RegistryDomain) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(ATTESTATION_DIGEST_DOMAIN);
        hasher.update(domain.registry_address.as_bytes());
        hasher.update(domain.chain_id.to_be_bytes());
        hasher.update(self.subject.as_bytes());
        hasher.update([self.tier.value()]);
        hasher.update(self.snapshot_hash);
        hasher.update(self.expires_at.to_be_bytes());
        hasher.update(self.nonce.to_be_bytes());
        let result = hasher.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }

    /// Sign this update for the given registry deployment.
    pub fn sign(&self, domain: &RegistryDomain, keypair: &Keypair) -> AttestationSignature {
        AttestationSignature {
            signer_key: keypair.public_key_bytes(),
            signature: keypair.sign(&self.digest(domain)),
        }
    }
}

/// Detached ed25519 signature over an attestation digest.
///
/// Ed25519 has no public-key recovery, so the envelope names the signing key.
/// The key is only trusted after the signature verifies and its derived
/// address matches the configured authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationSignature {
    #[serde(with = "hex32")]
    pub signer_key: [u8; 32],
    #[serde(with = "hex64")]
    pub signature: [u8; 64],
}

impl AttestationSignature {
    /// Verify the signature against the update's digest and return the
    /// signer's address.
    ///
    /// Any verification failure, including a malformed key, collapses to
    /// `InvalidAuthoritySignature`.
    pub fn recover_signer(
        &self,
        update: &AttestationUpdate,
        domain: &RegistryDomain,
    ) -> Result<Address, TrustgateError> {
        let digest = update.digest(domain);
        match crypto::verify_signature(&self.signer_key, &digest, &self.signature) {
            Ok(true) => Ok(Address::from_public_key(&self.signer_key)),
            Ok(false) | Err(_) => Err(TrustgateError::InvalidAuthoritySignature),
        }
    }
}

/// The anchored on-chain tuple for a subject.
///
/// `Anchor::default()` is the zero value returned for subjects that were
/// never anchored: `expires_at == 0` makes it expired at any real time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Anchor {
    pub tier: Tier,
    #[serde(with = "hex32")]
    pub snapshot_hash: [u8; 32],
    pub expires_at: i64,
    pub nonce: u64,
}

impl Anchor {
    pub fn from_update(update: &AttestationUpdate) -> Self {
        Self {
            tier: update.tier,
            snapshot_hash: update.snapshot_hash,
            expires_at: update.expires_at,
            nonce: update.nonce,
        }
    }

    /// True for the zero tuple of a never-anchored subject.
    pub fn is_unset(&self) -> bool {
        self.nonce == 0 && self.expires_at == 0 && self.snapshot_hash == [0u8; 32]
    }

    /// Whether the anchor still authorizes anything at `now_unix`.
    pub fn is_live_at(&self, now_unix: i64) -> bool {
        now_unix < self.expires_at
    }
}

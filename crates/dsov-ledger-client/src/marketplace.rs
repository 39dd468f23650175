//! # Marketplace Ledger (Ledger B) Adapter
//!
//! Listings of personal data for sale. Every listing and purchase call must
//! carry an access proof that passes the configured [`AccessGate`]; any
//! failure is `LedgerError::AccessDenied`. The marketplace alone moves a
//! listing to sold or cancelled.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use dsov_core::{AccountId, DataType, IdentityId, IdentityStatus, ListingId, Timestamp};
use dsov_proof::AccessProof;
use dsov_state::DigitalIdentity;

use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::gate::AccessGate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataListing {
    pub listing_id: ListingId,
    pub owner: AccountId,
    pub identity_id: IdentityId,
    pub data_type: DataType,
    pub price: u64,
    pub is_active: bool,
    /// Cleared while the backing identity is not VERIFIED.
    pub visible: bool,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,
}

#[async_trait]
pub trait Marketplace: Send + Sync {
    async fn get_listing(&self, id: ListingId) -> Result<Option<DataListing>, LedgerError>;

    /// List `data_type` of the identity named by `proof` for `price`.
    async fn create_listing(
        &self,
        owner: &AccountId,
        price: u64,
        data_type: DataType,
        proof: &AccessProof,
    ) -> Result<DataListing, LedgerError>;

    async fn cancel_listing(&self, caller: &AccountId, id: ListingId) -> Result<DataListing, LedgerError>;

    async fn purchase(
        &self,
        buyer: &AccountId,
        id: ListingId,
        proof: &AccessProof,
    ) -> Result<DataListing, LedgerError>;

    /// Align access-gated visibility of the identity's listings with its
    /// current status. Returns the number of listings touched.
    async fn reconcile_identity(&self, identity: &DigitalIdentity) -> Result<usize, LedgerError>;

    async fn listings_for(&self, identity_id: &IdentityId) -> Result<Vec<DataListing>, LedgerError>;

    fn adapter_name(&self) -> &str;
}

/// In-process marketplace that validates proofs through an [`AccessGate`].
pub struct InMemoryMarketplace {
    listings: DashMap<ListingId, DataListing>,
    next_id: AtomicU64,
    gate: Arc<dyn AccessGate>,
    clock: Arc<dyn Clock>,
    unreachable: AtomicBool,
}

impl InMemoryMarketplace {
    pub fn new(gate: Arc<dyn AccessGate>) -> Self {
        Self::with_clock(gate, Arc::new(SystemClock))
    }

    pub fn with_clock(gate: Arc<dyn AccessGate>, clock: Arc<dyn Clock>) -> Self {
        Self {
            listings: DashMap::new(),
            next_id: AtomicU64::new(1),
            gate,
            clock,
            unreachable: AtomicBool::new(false),
        }
    }

    /// Make every call fail with `Unavailable` until cleared.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn enter(&self, operation: &'static str) -> Result<(), LedgerError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable {
                operation,
                reason: "marketplace unreachable".into(),
            });
        }
        Ok(())
    }

    async fn admit(&self, proof: &AccessProof) -> Result<(), LedgerError> {
        let result = self.gate.validate_access_proof(proof).await;
        match result.authoritative_failure() {
            None => Ok(()),
            Some(failure) => {
                tracing::warn!(
                    identity_id = %proof.identity_id,
                    consumer = %proof.consumer,
                    %failure,
                    "access proof refused"
                );
                Err(LedgerError::AccessDenied {
                    reason: format!("access proof failed validation: {failure}"),
                })
            }
        }
    }

    fn not_found(id: ListingId) -> LedgerError {
        LedgerError::NotFound {
            kind: "listing",
            id: id.to_string(),
        }
    }
}

fn proof_mismatch(what: &str) -> LedgerError {
    LedgerError::AccessDenied {
        reason: format!("access proof does not cover {what}"),
    }
}

#[async_trait]
impl Marketplace for InMemoryMarketplace {
    async fn get_listing(&self, id: ListingId) -> Result<Option<DataListing>, LedgerError> {
        self.enter("get_listing")?;
        Ok(self.listings.get(&id).map(|l| l.clone()))
    }

    async fn create_listing(
        &self,
        owner: &AccountId,
        price: u64,
        data_type: DataType,
        proof: &AccessProof,
    ) -> Result<DataListing, LedgerError> {
        self.enter("create_listing")?;
        if price == 0 {
            return Err(LedgerError::Rejected {
                reason: "listing price must be positive".into(),
            });
        }
        if &proof.consumer != owner {
            return Err(proof_mismatch("the listing owner"));
        }
        if proof.data_type != data_type {
            return Err(proof_mismatch("the listed data type"));
        }
        self.admit(proof).await?;

        let listing = DataListing {
            listing_id: ListingId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            owner: owner.clone(),
            identity_id: proof.identity_id.clone(),
            data_type,
            price,
            is_active: true,
            visible: true,
            created_at: self.clock.now(),
            buyer: None,
            sold_at: None,
            cancelled_at: None,
        };
        self.listings.insert(listing.listing_id, listing.clone());
        tracing::info!(listing_id = %listing.listing_id, identity_id = %listing.identity_id, "listing created");
        Ok(listing)
    }

    async fn cancel_listing(&self, caller: &AccountId, id: ListingId) -> Result<DataListing, LedgerError> {
        self.enter("cancel_listing")?;
        let mut listing = self.listings.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        if !listing.is_active {
            return Err(LedgerError::Conflict {
                reason: format!("{id} is not active"),
            });
        }
        if &listing.owner != caller {
            return Err(LedgerError::Rejected {
                reason: format!("{caller} does not own {id}"),
            });
        }
        listing.is_active = false;
        listing.cancelled_at = Some(self.clock.now());
        Ok(listing.clone())
    }

    async fn purchase(
        &self,
        buyer: &AccountId,
        id: ListingId,
        proof: &AccessProof,
    ) -> Result<DataListing, LedgerError> {
        self.enter("purchase")?;
        let snapshot = self
            .listings
            .get(&id)
            .map(|l| l.clone())
            .ok_or_else(|| Self::not_found(id))?;
        if !snapshot.is_active || !snapshot.visible {
            return Err(LedgerError::Conflict {
                reason: format!("{id} is not available"),
            });
        }
        if &snapshot.owner == buyer {
            return Err(LedgerError::Rejected {
                reason: "owner cannot buy their own listing".into(),
            });
        }
        if &proof.consumer != buyer {
            return Err(proof_mismatch("the buyer"));
        }
        if proof.identity_id != snapshot.identity_id || proof.data_type != snapshot.data_type {
            return Err(proof_mismatch("the listed data"));
        }
        // No guard is held across the gate's ledger read.
        self.admit(proof).await?;

        let mut listing = self.listings.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        if !listing.is_active {
            return Err(LedgerError::Conflict {
                reason: format!("{id} was sold or cancelled concurrently"),
            });
        }
        listing.is_active = false;
        listing.buyer = Some(buyer.clone());
        listing.sold_at = Some(self.clock.now());
        tracing::info!(listing_id = %id, buyer = %buyer, "listing purchased");
        Ok(listing.clone())
    }

    async fn reconcile_identity(&self, identity: &DigitalIdentity) -> Result<usize, LedgerError> {
        self.enter("reconcile_identity")?;
        let visible = identity.status == IdentityStatus::Verified;
        let mut touched = 0;
        for mut listing in self.listings.iter_mut() {
            if listing.identity_id == identity.identity_id {
                listing.visible = visible;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn listings_for(&self, identity_id: &IdentityId) -> Result<Vec<DataListing>, LedgerError> {
        self.enter("listings_for")?;
        let mut listings: Vec<DataListing> = self
            .listings
            .iter()
            .filter(|l| &l.identity_id == identity_id)
            .map(|l| l.clone())
            .collect();
        listings.sort_by_key(|l| l.listing_id);
        Ok(listings)
    }

    fn adapter_name(&self) -> &str {
        "InMemoryMarketplace"
    }
}

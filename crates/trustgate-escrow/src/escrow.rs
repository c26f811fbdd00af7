// crates/trustgate-escrow/src/escrow.rs
//
// LoanEscrow: the loan state machine.
//
//   submit_loan   -> SUBMITTED   (caller becomes the lender)
//   fund_loan     -> FUNDED      (lender only, value == amount)
//   release_loan  -> ACTIVE      (lender only, borrower's anchor live and tier good enough)
//   repay_loan    -> ACTIVE/REPAID (borrower only, accumulates until amount is covered)
//
// Each loan sits behind its own async mutex, held for the whole
// check-transition-transfer sequence. Checks run in the order
// authorization, state, amount, and nothing is written until all pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};

use trustgate_core::address::Address;
use trustgate_core::clock::Clock;
use trustgate_core::error::TrustgateError;
use trustgate_core::snapshot::Tier;
use trustgate_core::traits::AnchorSource;

use crate::events::EscrowEvent;
use crate::loan::{Loan, LoanId, LoanStatus};
use crate::token::{Eth, Wei};
use crate::vault::Vault;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct LoanEscrow {
    /// Anchored reputation. Read-only from the escrow's side.
    reputation: Arc<dyn AnchorSource>,
    clock: Arc<dyn Clock>,
    loans: RwLock<HashMap<LoanId, Arc<Mutex<Loan>>>>,
    next_id: AtomicU64,
    vault: Mutex<Vault>,
    events: broadcast::Sender<EscrowEvent>,
}

impl LoanEscrow {
    pub fn new(reputation: Arc<dyn AnchorSource>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            reputation,
            clock,
            loans: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            vault: Mutex::new(Vault::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EscrowEvent> {
        self.events.subscribe()
    }

    /// Open a loan offer. The caller becomes the lender.
    pub async fn submit_loan(
        &self,
        lender: Address,
        borrower: Address,
        amount: Wei,
        min_tier: Tier,
    ) -> Result<EscrowEvent, TrustgateError> {
        if amount == 0 {
            return Err(TrustgateError::InvalidAmount(
                "Loan amount must be greater than zero".to_string(),
            ));
        }

        let id = LoanId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let loan = Loan {
            id,
            borrower,
            lender,
            amount,
            min_tier,
            status: LoanStatus::Submitted,
            funded_amount: 0,
            repaid_amount: 0,
        };
        self.loans.write().await.insert(id, Arc::new(Mutex::new(loan)));

        info!(
            loan_id = %id,
            borrower = %borrower,
            lender = %lender,
            amount = %Eth::from_wei(amount),
            min_tier = %min_tier,
            "Loan submitted"
        );
        Ok(self.emit(EscrowEvent::LoanSubmitted {
            loan_id: id,
            borrower,
            lender,
            amount,
            min_tier,
        }))
    }

    /// Fund a submitted loan with exactly its principal.
    pub async fn fund_loan(
        &self,
        caller: Address,
        loan_id: LoanId,
        value: Wei,
    ) -> Result<EscrowEvent, TrustgateError> {
        let slot = self.slot(loan_id).await?;
        let mut loan = slot.lock().await;

        if caller != loan.lender {
            return Err(unauthorized("fund", &caller, &loan));
        }
        expect_status(&loan, LoanStatus::Submitted)?;
        if value != loan.amount {
            return Err(TrustgateError::InvalidAmount(format!(
                "Funding must equal the loan amount: expected {} wei, got {} wei",
                loan.amount, value
            )));
        }

        self.vault.lock().await.deposit(value);
        loan.funded_amount = value;
        loan.status = LoanStatus::Funded;

        info!(loan_id = %loan_id, amount = %Eth::from_wei(value), "Loan funded");
        Ok(self.emit(EscrowEvent::LoanFunded {
            loan_id,
            lender: loan.lender,
            amount: value,
        }))
    }

    /// Release funded principal to the borrower.
    ///
    /// Authorized by the borrower's anchored reputation only: the anchor must
    /// be unexpired and its tier at least as good as the loan's `min_tier`.
    pub async fn release_loan(
        &self,
        caller: Address,
        loan_id: LoanId,
    ) -> Result<EscrowEvent, TrustgateError> {
        let slot = self.slot(loan_id).await?;
        let mut loan = slot.lock().await;

        if caller != loan.lender {
            return Err(unauthorized("release", &caller, &loan));
        }
        expect_status(&loan, LoanStatus::Funded)?;
        if !loan.is_fully_funded() {
            return Err(TrustgateError::InvalidState(format!(
                "Loan {} funded with {} of {} wei",
                loan_id, loan.funded_amount, loan.amount
            )));
        }

        let anchor = self.reputation.get_reputation(&loan.borrower).await?;
        let now = self.clock.unix_now();
        if !anchor.is_live_at(now) {
            warn!(loan_id = %loan_id, expires_at = anchor.expires_at, now, "Release blocked: anchor expired");
            return Err(TrustgateError::SnapshotExpired {
                expires_at: anchor.expires_at,
                now,
            });
        }
        if !anchor.tier.satisfies(loan.min_tier) {
            warn!(
                loan_id = %loan_id,
                required = %loan.min_tier,
                actual = %anchor.tier,
                "Release blocked: tier insufficient"
            );
            return Err(TrustgateError::TierInsufficient {
                required: loan.min_tier,
                actual: anchor.tier,
            });
        }

        self.vault.lock().await.release_to(loan.borrower, loan.amount)?;
        loan.status = LoanStatus::Active;

        info!(loan_id = %loan_id, borrower = %loan.borrower, tier = %anchor.tier, "Loan released");
        Ok(self.emit(EscrowEvent::LoanReleased {
            loan_id,
            borrower: loan.borrower,
            amount: loan.amount,
        }))
    }

    /// Repay part or all of an active loan. Payments are credited to the
    /// lender; a payment larger than the outstanding balance is rejected.
    pub async fn repay_loan(
        &self,
        caller: Address,
        loan_id: LoanId,
        value: Wei,
    ) -> Result<EscrowEvent, TrustgateError> {
        let slot = self.slot(loan_id).await?;
        let mut loan = slot.lock().await;

        if caller != loan.borrower {
            return Err(unauthorized("repay", &caller, &loan));
        }
        expect_status(&loan, LoanStatus::Active)?;
        if value == 0 {
            return Err(TrustgateError::InvalidAmount(
                "Repayment must be greater than zero".to_string(),
            ));
        }
        let outstanding = loan.outstanding();
        if value > outstanding {
            return Err(TrustgateError::InvalidAmount(format!(
                "Repayment of {} wei exceeds outstanding {} wei",
                value, outstanding
            )));
        }

        self.vault.lock().await.credit(loan.lender, value);
        loan.repaid_amount += value;
        let fully_repaid = loan.repaid_amount == loan.amount;
        if fully_repaid {
            loan.status = LoanStatus::Repaid;
        }

        info!(
            loan_id = %loan_id,
            amount = %Eth::from_wei(value),
            outstanding = %Eth::from_wei(loan.outstanding()),
            fully_repaid,
            "Repayment made"
        );
        Ok(self.emit(EscrowEvent::RepaymentMade {
            loan_id,
            payer: caller,
            amount: value,
            fully_repaid,
        }))
    }

    pub async fn get_loan(&self, loan_id: LoanId) -> Result<Loan, TrustgateError> {
        let slot = self.slot(loan_id).await?;
        let loan = slot.lock().await;
        Ok(loan.clone())
    }

    /// Withdrawable balance of an address (released principal or repayments).
    pub async fn balance_of(&self, owner: &Address) -> Wei {
        self.vault.lock().await.balance_of(owner)
    }

    /// Withdraw from the caller's balance. Returns the remaining balance.
    pub async fn withdraw(&self, caller: Address, amount: Wei) -> Result<Wei, TrustgateError> {
        let remaining = self.vault.lock().await.withdraw(&caller, amount)?;
        info!(owner = %caller, amount = %Eth::from_wei(amount), "Withdrawal");
        Ok(remaining)
    }

    async fn slot(&self, loan_id: LoanId) -> Result<Arc<Mutex<Loan>>, TrustgateError> {
        self.loans
            .read()
            .await
            .get(&loan_id)
            .cloned()
            .ok_or(TrustgateError::LoanNotFound(loan_id.0))
    }

    fn emit(&self, event: EscrowEvent) -> EscrowEvent {
        // No subscribers is not an error.
        let _ = self.events.send(event.clone());
        event
    }
}

fn expect_status(loan: &Loan, expected: LoanStatus) -> Result<(), TrustgateError> {
    if loan.status != expected {
        return Err(TrustgateError::InvalidState(format!(
            "Loan {} is {}, expected {}",
            loan.id, loan.status, expected
        )));
    }
    Ok(())
}

fn unauthorized(action: &str, caller: &Address, loan: &Loan) -> TrustgateError {
    warn!(loan_id = %loan.id, caller = %caller, action, "Unauthorized escrow call");
    TrustgateError::Unauthorized(format!("{} may not {} loan {}", caller, action, loan.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use trustgate_core::attestation::Anchor;
    use trustgate_core::clock::ManualClock;

    use crate::token::eth;

    const LENDER: Address = Address([0x1e; 20]);
    const BORROWER: Address = Address([0xb0; 20]);
    const STRANGER: Address = Address([0x55; 20]);
    const NOW: i64 = 1_800_000_000;

    /// Anchor source with a settable tuple for the borrower.
    #[derive(Default)]
    struct FixedAnchors {
        anchor: StdMutex<Anchor>,
    }

    impl FixedAnchors {
        fn set(&self, tier: u8, expires_at: i64) {
            *self.anchor.lock().unwrap() = Anchor {
                tier: Tier::new(tier),
                snapshot_hash: [9; 32],
                expires_at,
                nonce: 1,
            };
        }
    }

    #[async_trait]
    impl AnchorSource for FixedAnchors {
        async fn get_reputation(&self, _subject: &Address) -> Result<Anchor, TrustgateError> {
            Ok(*self.anchor.lock().unwrap())
        }
    }

    fn setup() -> (LoanEscrow, Arc<FixedAnchors>, Arc<ManualClock>) {
        let anchors = Arc::new(FixedAnchors::default());
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let escrow = LoanEscrow::new(anchors.clone(), clock.clone());
        (escrow, anchors, clock)
    }

    async fn funded_loan(escrow: &LoanEscrow, min_tier: u8) -> LoanId {
        let event = escrow
            .submit_loan(LENDER, BORROWER, eth(1), Tier::new(min_tier))
            .await
            .unwrap();
        let id = event.loan_id();
        escrow.fund_loan(LENDER, id, eth(1)).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_submit_zero_amount_rejected() {
        let (escrow, _, _) = setup();
        let err = escrow
            .submit_loan(LENDER, BORROWER, 0, Tier::new(2))
            .await
            .unwrap_err();
        assert!(matches!(err, TrustgateError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_loan_ids_are_sequential() {
        let (escrow, _, _) = setup();
        let a = escrow.submit_loan(LENDER, BORROWER, eth(1), Tier::new(2)).await.unwrap();
        let b = escrow.submit_loan(LENDER, BORROWER, eth(1), Tier::new(2)).await.unwrap();
        assert_eq!(a.loan_id(), LoanId(1));
        assert_eq!(b.loan_id(), LoanId(2));
    }

    #[tokio::test]
    async fn test_fund_requires_lender_and_exact_value() {
        let (escrow, _, _) = setup();
        let id = escrow
            .submit_loan(LENDER, BORROWER, eth(1), Tier::new(2))
            .await
            .unwrap()
            .loan_id();

        let err = escrow.fund_loan(STRANGER, id, eth(1)).await.unwrap_err();
        assert!(matches!(err, TrustgateError::Unauthorized(_)));

        let err = escrow.fund_loan(LENDER, id, eth(1) - 1).await.unwrap_err();
        assert!(matches!(err, TrustgateError::InvalidAmount(_)));
        assert_eq!(escrow.get_loan(id).await.unwrap().status, LoanStatus::Submitted);

        escrow.fund_loan(LENDER, id, eth(1)).await.unwrap();
        let loan = escrow.get_loan(id).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Funded);
        assert_eq!(loan.funded_amount, eth(1));
    }

    #[tokio::test]
    async fn test_double_fund_rejected() {
        let (escrow, _, _) = setup();
        let id = funded_loan(&escrow, 2).await;
        let err = escrow.fund_loan(LENDER, id, eth(1)).await.unwrap_err();
        assert!(matches!(err, TrustgateError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_unknown_loan() {
        let (escrow, _, _) = setup();
        let err = escrow.fund_loan(LENDER, LoanId(99), eth(1)).await.unwrap_err();
        assert!(matches!(err, TrustgateError::LoanNotFound(99)));
    }

    #[tokio::test]
    async fn test_release_without_anchor_is_expired() {
        let (escrow, _, _) = setup();
        let id = funded_loan(&escrow, 2).await;
        let err = escrow.release_loan(LENDER, id).await.unwrap_err();
        assert!(matches!(err, TrustgateError::SnapshotExpired { expires_at: 0, .. }));
    }

    #[tokio::test]
    async fn test_release_at_expiry_instant_fails() {
        let (escrow, anchors, _) = setup();
        anchors.set(0, NOW);
        let id = funded_loan(&escrow, 2).await;
        let err = escrow.release_loan(LENDER, id).await.unwrap_err();
        assert!(matches!(err, TrustgateError::SnapshotExpired { .. }));
    }

    #[tokio::test]
    async fn test_release_tier_gate() {
        let (escrow, anchors, _) = setup();
        anchors.set(2, NOW + 3600);

        let strict = funded_loan(&escrow, 1).await;
        let err = escrow.release_loan(LENDER, strict).await.unwrap_err();
        assert!(matches!(err, TrustgateError::TierInsufficient { .. }));
        assert_eq!(escrow.get_loan(strict).await.unwrap().status, LoanStatus::Funded);

        // Equal tier satisfies the gate.
        let equal = funded_loan(&escrow, 2).await;
        escrow.release_loan(LENDER, equal).await.unwrap();
        assert_eq!(escrow.get_loan(equal).await.unwrap().status, LoanStatus::Active);
    }

    #[tokio::test]
    async fn test_release_only_by_lender() {
        let (escrow, anchors, _) = setup();
        anchors.set(0, NOW + 3600);
        let id = funded_loan(&escrow, 2).await;
        let err = escrow.release_loan(BORROWER, id).await.unwrap_err();
        assert!(matches!(err, TrustgateError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_anchor_expires_while_funded() {
        let (escrow, anchors, clock) = setup();
        anchors.set(0, NOW + 60);
        let id = funded_loan(&escrow, 2).await;
        clock.advance_secs(61);
        assert!(matches!(
            escrow.release_loan(LENDER, id).await,
            Err(TrustgateError::SnapshotExpired { .. })
        ));
    }

    #[tokio::test]
    async fn test_partial_repayment_accumulates() {
        let (escrow, anchors, _) = setup();
        anchors.set(1, NOW + 3600);
        let id = funded_loan(&escrow, 2).await;
        escrow.release_loan(LENDER, id).await.unwrap();
        assert_eq!(escrow.balance_of(&BORROWER).await, eth(1));

        let quarter = eth(1) / 4;
        let event = escrow.repay_loan(BORROWER, id, quarter).await.unwrap();
        assert!(matches!(event, EscrowEvent::RepaymentMade { fully_repaid: false, .. }));
        assert_eq!(escrow.get_loan(id).await.unwrap().status, LoanStatus::Active);

        let err = escrow.repay_loan(BORROWER, id, eth(1)).await.unwrap_err();
        assert!(matches!(err, TrustgateError::InvalidAmount(_)));

        let event = escrow.repay_loan(BORROWER, id, eth(1) - quarter).await.unwrap();
        assert!(matches!(event, EscrowEvent::RepaymentMade { fully_repaid: true, .. }));
        let loan = escrow.get_loan(id).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Repaid);
        assert_eq!(loan.repaid_amount, eth(1));
        assert_eq!(escrow.balance_of(&LENDER).await, eth(1));
    }

    #[tokio::test]
    async fn test_repay_only_by_borrower_and_only_when_active() {
        let (escrow, anchors, _) = setup();
        anchors.set(1, NOW + 3600);
        let id = funded_loan(&escrow, 2).await;

        let err = escrow.repay_loan(BORROWER, id, eth(1)).await.unwrap_err();
        assert!(matches!(err, TrustgateError::InvalidState(_)));

        escrow.release_loan(LENDER, id).await.unwrap();
        let err = escrow.repay_loan(LENDER, id, eth(1)).await.unwrap_err();
        assert!(matches!(err, TrustgateError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_withdraw_released_funds() {
        let (escrow, anchors, _) = setup();
        anchors.set(0, NOW + 3600);
        let id = funded_loan(&escrow, 0).await;
        escrow.release_loan(LENDER, id).await.unwrap();

        assert_eq!(escrow.withdraw(BORROWER, eth(1)).await.unwrap(), 0);
        assert!(escrow.withdraw(BORROWER, 1).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_release_happens_once() {
        let (escrow, anchors, _) = setup();
        anchors.set(0, NOW + 3600);
        let escrow = Arc::new(escrow);
        let id = funded_loan(&escrow, 2).await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let escrow = Arc::clone(&escrow);
            handles.push(tokio::spawn(async move { escrow.release_loan(LENDER, id).await }));
        }
        let mut released = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                released += 1;
            }
        }
        assert_eq!(released, 1);
        assert_eq!(escrow.balance_of(&BORROWER).await, eth(1));
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (escrow, _, _) = setup();
        let mut rx = escrow.subscribe();
        escrow.submit_loan(LENDER, BORROWER, eth(1), Tier::new(2)).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, EscrowEvent::LoanSubmitted { lender: LENDER, .. }));
    }
}

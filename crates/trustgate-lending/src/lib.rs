// crates/trustgate-lending/src/lib.rs
//
// trustgate-lending: the off-chain loan request path.
//
// A request passes two independent gates before it is persisted: the
// verification bridge (integrity, 403-class on failure) and the tier policy
// (amount cap and score floor, 400-class on failure). Approval is automatic
// once both pass.

pub mod orchestrator;
pub mod policy;

pub use orchestrator::{LoanRequestOrchestrator, MAX_DURATION_DAYS};
pub use policy::{policy_for_tier, validate_loan_request, LoanPolicy, MINIMUM_SCORE};

// crates/trustgate-rpc/src/handlers/loans.rs
//
// Loan request handlers: CreateLoanRequest, ListLoanRequests.

use serde::{Deserialize, Serialize};

use trustgate_core::identity::Principal;
use trustgate_core::loan_request::LoanRequestRecord;
use trustgate_core::traits::LoanRequestStore;

use super::{parse_user_id, ApiContext, ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    pub user_id: String,
    pub amount: f64,
    /// Term in days.
    pub duration: u32,
}

/// `POST /api/loans/request`
pub async fn handle_create_loan_request(
    ctx: &ApiContext,
    principal: &Principal,
    request: CreateLoanRequest,
) -> Result<LoanRequestRecord, ApiError> {
    let user_id = parse_user_id(&request.user_id)?;
    ctx.authorize_user_access(principal, &user_id, "loans.request_for_other_user", "loan_request")
        .await?;
    Ok(ctx
        .orchestrator
        .create_loan_request(user_id, request.amount, request.duration)
        .await?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLoanRequestsResponse {
    pub user_id: String,
    pub requests: Vec<LoanRequestRecord>,
}

/// `GET /api/loans/user/:user_id`
pub async fn handle_list_loan_requests(
    ctx: &ApiContext,
    principal: &Principal,
    raw_user_id: &str,
) -> Result<ListLoanRequestsResponse, ApiError> {
    let user_id = parse_user_id(raw_user_id)?;
    ctx.authorize_user_access(principal, &user_id, "loans.read_other_user", "loan_request")
        .await?;
    let requests = ctx.loan_requests.list_loan_requests(&user_id).await?;
    Ok(ListLoanRequestsResponse {
        user_id: user_id.to_string(),
        requests,
    })
}

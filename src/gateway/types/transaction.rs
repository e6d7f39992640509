//! Transaction service DTOs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::transaction::CreateTransaction;

/// POST /transactions
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateTransactionRequest {
    #[validate(range(max = 9223372036854775807u64))]
    #[schema(example = 1)]
    pub source_account_id: u64,
    #[validate(range(max = 9223372036854775807u64))]
    #[schema(example = 2)]
    pub destination_account_id: u64,
    /// Minor units
    #[schema(example = 5000)]
    pub amount: i64,
    #[validate(length(max = 255))]
    #[schema(example = "rent")]
    pub description: Option<String>,
}

impl From<CreateTransactionRequest> for CreateTransaction {
    fn from(req: CreateTransactionRequest) -> Self {
        Self {
            source_account_id: req.source_account_id,
            dest_account_id: req.destination_account_id,
            amount: req.amount,
            description: req.description.unwrap_or_default(),
        }
    }
}

/// GET /accounts/{id}/transactions
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTransactionsQuery {
    /// Defaults to 50, capped at 500
    pub limit: Option<usize>,
}

use crate::envelope::{Page, Unwrap};
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::keys::{QueryKey, PAYMENT_METHODS, PROMOTIONS, TRANSACTIONS, WITHDRAW_METHODS};
use crate::mutation::Mutation;
use crate::query::Query;
use crate::resource::{Collection, ItemUpdate};
use crate::types::{
    PaymentMethod, Promotion, Transaction, TransactionFilters, TransactionInput, TransactionStats, WithdrawMethod,
};

#[derive(Debug, Clone)]
pub struct PaymentsApi {
    gateway: Gateway,
}

impl PaymentsApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Payment methods; `set_status` toggles one on or off.
    pub fn payment_methods(&self) -> Collection<PaymentMethod> {
        Collection::new(self.gateway.clone(), PAYMENT_METHODS)
    }

    pub fn withdraw_methods(&self) -> Collection<WithdrawMethod> {
        Collection::new(self.gateway.clone(), WITHDRAW_METHODS)
    }

    pub fn promotions(&self) -> Collection<Promotion> {
        Collection::new(self.gateway.clone(), PROMOTIONS)
    }

    pub fn transactions(&self) -> Collection<Transaction> {
        Collection::new(self.gateway.clone(), TRANSACTIONS)
    }

    pub fn transaction_page(&self, filters: TransactionFilters) -> Result<Query<Page<Transaction>>, ApiError> {
        self.transactions().paged(filters)
    }

    pub fn transaction(&self, id: &str) -> Query<Transaction> {
        self.transactions().detail(id)
    }

    pub fn create_transaction(&self) -> Mutation<TransactionInput, Option<Transaction>> {
        self.transactions().create()
    }

    pub fn update_transaction(&self) -> Mutation<ItemUpdate<TransactionInput>, Option<Transaction>> {
        self.transactions().update().invalidates(vec![Self::stats_key()])
    }

    pub fn patch_transaction(&self) -> Mutation<ItemUpdate<TransactionInput>, Option<Transaction>> {
        self.transactions().patch().invalidates(vec![Self::stats_key()])
    }

    pub fn delete_transaction(&self) -> Mutation<String, ()> {
        self.transactions().delete().invalidates(vec![Self::stats_key()])
    }

    pub fn stats_key() -> QueryKey {
        TRANSACTIONS.all().push("stats")
    }

    /// `GET /transactions/stats`.
    pub fn transaction_stats(&self) -> Query<TransactionStats> {
        self.gateway.query(Self::stats_key(), Unwrap::Field("stats"), |api| {
            api.build_get(&format!("{}/stats", TRANSACTIONS.path), &())
        })
    }

    /// `GET /transactions/provider/:provider`. Disabled while `provider` is
    /// empty.
    pub fn transactions_by_provider(&self, provider: &str) -> Query<Vec<Transaction>> {
        let path = format!("{}/provider/{provider}", TRANSACTIONS.path);
        self.gateway
            .query(
                TRANSACTIONS.all().push("provider").push(provider),
                Unwrap::Field(TRANSACTIONS.list_field),
                move |api| api.build_get(&path, &()),
            )
            .enabled(!provider.is_empty())
    }
}

//! Loans repository for document-store operations

use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanStatus},
};

use super::{server_timestamp, Document, DocumentStore, OrderBy, StoreError};

pub const COLLECTION: &str = "loans";

#[derive(Clone)]
pub struct LoansRepository {
    store: Arc<dyn DocumentStore>,
}

impl LoansRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn decode(document: Document) -> Result<Loan, StoreError> {
        let mut loan: Loan = serde_json::from_value(document.data)?;
        loan.id = Some(document.id);
        Ok(loan)
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<Loan> {
        let data = self
            .store
            .get_by_id(COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        Ok(Self::decode(Document { id: id.to_string(), data })?)
    }

    /// Create a new loan. The loan date and last-updated fields are
    /// assigned by the store clock, not the caller's.
    pub async fn create(&self, loan: &Loan) -> AppResult<String> {
        let mut record = serde_json::to_value(loan).map_err(StoreError::from)?;
        if let Value::Object(map) = &mut record {
            map.insert("loan_date".to_string(), server_timestamp());
            map.insert("last_updated".to_string(), server_timestamp());
        }
        Ok(self.store.insert(COLLECTION, record).await?)
    }

    /// Shallow-merge a patch into a loan document
    pub async fn update(&self, id: &str, patch: Value) -> AppResult<()> {
        Ok(self.store.update_by_id(COLLECTION, id, patch).await?)
    }

    /// All loans without a return date, ordered by due date.
    /// This is the expensive scan the overdue cache sits in front of.
    pub async fn find_unreturned(&self) -> AppResult<Vec<Loan>> {
        let documents = self
            .store
            .query_by_field(
                COLLECTION,
                "actual_return_date",
                Value::Null,
                Some(OrderBy::asc("expected_return_date")),
            )
            .await?;
        let mut loans = Vec::with_capacity(documents.len());
        for document in documents {
            loans.push(Self::decode(document)?);
        }
        Ok(loans)
    }

    /// All loans held by a user, newest first
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Loan>> {
        let documents = self
            .store
            .query_by_field(
                COLLECTION,
                "user_id",
                Value::String(user_id.to_string()),
                Some(OrderBy::desc("loan_date")),
            )
            .await?;
        let mut loans = Vec::with_capacity(documents.len());
        for document in documents {
            loans.push(Self::decode(document)?);
        }
        Ok(loans)
    }

    /// Loans attached to an activity, narrowed to the given statuses.
    /// The store only supports single-field equality, so the status
    /// filter runs client-side.
    pub async fn find_by_activity_with_status(
        &self,
        activity_id: &str,
        statuses: &[LoanStatus],
    ) -> AppResult<Vec<Loan>> {
        let documents = self
            .store
            .query_by_field(
                COLLECTION,
                "activity_id",
                Value::String(activity_id.to_string()),
                None,
            )
            .await?;
        let mut loans = Vec::new();
        for document in documents {
            let loan = Self::decode(document)?;
            if statuses.contains(&loan.status) {
                loans.push(loan);
            }
        }
        Ok(loans)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Value;

    use super::*;
    use crate::repository::{
        Document, DocumentStore, OrderBy, StoreError, WriteBatch, SERVER_TIMESTAMP_FIELD,
    };

    mockall::mock! {
        Store {}

        #[async_trait]
        impl DocumentStore for Store {
            async fn insert(&self, collection: &str, record: Value) -> Result<String, StoreError>;
            async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;
            async fn query_by_field(
                &self,
                collection: &str,
                field: &str,
                value: Value,
                order_by: Option<OrderBy>,
            ) -> Result<Vec<Document>, StoreError>;
            async fn update_by_id(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;
            fn batch(&self) -> Box<dyn WriteBatch>;
        }
    }

    fn sample_loan() -> Loan {
        Loan {
            id: None,
            material_id: "m1".to_string(),
            user_id: "u1".to_string(),
            activity_id: None,
            quantity_borrowed: 1,
            loan_date: Utc::now(),
            expected_return_date: Utc::now(),
            actual_return_date: None,
            last_updated: None,
            status: LoanStatus::InUse,
            observations: String::new(),
            incident: None,
            auto_marked_overdue: false,
            auto_marked_at: None,
        }
    }

    #[test]
    fn create_delegates_timestamps_to_the_store_clock() {
        let mut store = MockStore::new();
        store
            .expect_insert()
            .withf(|collection, record| {
                collection == COLLECTION
                    && record["loan_date"][SERVER_TIMESTAMP_FIELD] == true
                    && record["last_updated"][SERVER_TIMESTAMP_FIELD] == true
            })
            .returning(|_, _| Ok("new-id".to_string()));

        let repository = LoansRepository::new(std::sync::Arc::new(store));
        let id = tokio_test::block_on(repository.create(&sample_loan())).unwrap();
        assert_eq!(id, "new-id");
    }

    #[test]
    fn missing_loan_maps_to_not_found() {
        let mut store = MockStore::new();
        store.expect_get_by_id().returning(|_, _| Ok(None));

        let repository = LoansRepository::new(std::sync::Arc::new(store));
        let result = tokio_test::block_on(repository.get_by_id("nope"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}

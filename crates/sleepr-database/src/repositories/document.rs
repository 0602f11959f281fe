//! Generic document repository.
//!
//! Uniqueness is enforced on two paths. Inserts rely on the store's own
//! unique indexes and translate a duplicate-key failure into a conflict.
//! Updates pre-check every declared unique field assigned by `$set` before
//! the update is applied, because the apply step alone only sees
//! store-native indexes.
//!
//! The pre-check and the apply step are separate round trips. Two
//! concurrent updates assigning the same unique value can both pass the
//! pre-check; only a store-native unique index on that field stops the
//! second one.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, warn};

use sleepr_core::error::AppError;
use sleepr_core::result::AppResult;
use sleepr_core::traits::store::{StoreClient, StoreError};
use sleepr_core::traits::{Document, Repository};
use sleepr_core::types::{DocumentId, Filter, StoredDocument, UpdateQuery};

const NOT_FOUND_MESSAGE: &str = "Document was not found";
const DUPLICATE_KEY_MESSAGE: &str =
    "Duplicate key error: The value provided for a unique field is already in use.";

/// Repository for documents of type `T` with a fixed set of unique fields.
pub struct DocumentRepository<T: Document> {
    store: Arc<dyn StoreClient>,
    unique_fields: &'static [&'static str],
    _document: PhantomData<fn() -> T>,
}

impl<T: Document> DocumentRepository<T> {
    /// Create a repository over `store`.
    ///
    /// `unique_fields` lists the fields whose values must be unique across
    /// the collection; updates check them in this order.
    pub fn new(store: Arc<dyn StoreClient>, unique_fields: &'static [&'static str]) -> Self {
        Self {
            store,
            unique_fields,
            _document: PhantomData,
        }
    }

    /// The declared unique fields.
    pub fn unique_fields(&self) -> &'static [&'static str] {
        self.unique_fields
    }

    /// The underlying store client.
    pub fn store(&self) -> &Arc<dyn StoreClient> {
        &self.store
    }

    /// Ask the store to back every declared unique field with a unique index.
    pub async fn sync_indexes(&self) -> AppResult<()> {
        for field in self.unique_fields {
            self.store.ensure_unique_index(T::COLLECTION, field).await?;
        }
        debug!(
            collection = T::COLLECTION,
            fields = ?self.unique_fields,
            "Unique indexes synchronized"
        );
        Ok(())
    }

    /// Find a document by identifier.
    pub async fn find_by_id(&self, id: DocumentId) -> AppResult<T> {
        self.find_one(&Filter::by_id(id)).await
    }

    fn handle_not_found(&self, filter: &Filter) -> AppError {
        warn!(
            collection = T::COLLECTION,
            %filter,
            "Document was not found with filter"
        );
        AppError::not_found(NOT_FOUND_MESSAGE)
    }

    fn handle_duplicate_key(&self, index: &str) -> AppError {
        error!(collection = T::COLLECTION, index, "Duplicate key error");
        AppError::conflict(DUPLICATE_KEY_MESSAGE)
    }

    /// Declared unique fields assigned a non-null value by `update`, in
    /// declaration order. Stores do not index null values.
    fn fields_to_check<'u>(&self, update: &'u UpdateQuery) -> Vec<(&'static str, &'u Value)> {
        self.unique_fields
            .iter()
            .filter_map(|field| update.set_value(field).map(|value| (*field, value)))
            .filter(|(_, value)| !value.is_null())
            .collect()
    }

    /// Fail with a conflict if another document already holds a value that
    /// `update` assigns to a declared unique field.
    async fn check_for_duplicates(&self, filter: &Filter, update: &UpdateQuery) -> AppResult<()> {
        if !update.has_set() {
            return Ok(());
        }

        // Resolved on the first collision only.
        let mut target: Option<Option<DocumentId>> = None;

        for (field, value) in self.fields_to_check(update) {
            let holder_filter = Filter::all().eq(field, value.clone());
            let Some(holder) = self.store.query_one(T::COLLECTION, &holder_filter).await? else {
                continue;
            };

            let target_id = match target {
                Some(id) => id,
                None => {
                    let id = self
                        .store
                        .query_one(T::COLLECTION, filter)
                        .await?
                        .and_then(|doc| doc.id());
                    target = Some(id);
                    id
                }
            };

            match target_id {
                None => return Err(self.handle_not_found(filter)),
                Some(id) if holder.id() == Some(id) => continue,
                Some(_) => {
                    warn!(
                        collection = T::COLLECTION,
                        field,
                        "Duplicate key error for {field} field"
                    );
                    return Err(AppError::conflict(format!(
                        "Duplicate key error: The value provided for the {field} field is already in use."
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Document> Repository<T> for DocumentRepository<T> {
    async fn create(&self, payload: T::Payload) -> AppResult<T> {
        let id = DocumentId::new();
        let document = StoredDocument::from_payload(id, &payload)?;

        match self.store.insert(T::COLLECTION, document).await {
            Ok(stored) => {
                debug!(collection = T::COLLECTION, %id, "Document created");
                stored.into_document()
            }
            Err(StoreError::DuplicateKey { index }) => Err(self.handle_duplicate_key(&index)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_one(&self, filter: &Filter) -> AppResult<T> {
        match self.store.query_one(T::COLLECTION, filter).await? {
            Some(stored) => stored.into_document(),
            None => Err(self.handle_not_found(filter)),
        }
    }

    async fn find(&self, filter: &Filter) -> AppResult<Vec<T>> {
        self.store
            .query_many(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(StoredDocument::into_document)
            .collect()
    }

    async fn find_one_and_update(&self, filter: &Filter, update: &UpdateQuery) -> AppResult<T> {
        update.validate()?;
        self.check_for_duplicates(filter, update).await?;

        match self.store.update_one(T::COLLECTION, filter, update).await {
            Ok(Some(stored)) => stored.into_document(),
            Ok(None) => Err(self.handle_not_found(filter)),
            Err(StoreError::DuplicateKey { index }) => Err(self.handle_duplicate_key(&index)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> AppResult<T> {
        match self.store.delete_one(T::COLLECTION, filter).await? {
            Some(stored) => {
                debug!(collection = T::COLLECTION, %filter, "Document deleted");
                stored.into_document()
            }
            None => Err(self.handle_not_found(filter)),
        }
    }
}

impl<T: Document> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            unique_fields: self.unique_fields,
            _document: PhantomData,
        }
    }
}

impl<T: Document> fmt::Debug for DocumentRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("collection", &T::COLLECTION)
            .field("unique_fields", &self.unique_fields)
            .field("store", &self.store)
            .finish()
    }
}

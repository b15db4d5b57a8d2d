//! MongoDB client, typed collections, and the Mongo-backed stores

use async_trait::async_trait;
use bson::{doc, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::{
    AdminDoc, GuestDoc, GuestFilter, GuestPatch, ADMIN_COLLECTION, GUEST_COLLECTION,
};
use crate::db::{AdminStore, GuestStore};
use crate::types::GatewayError;

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;

    /// `(index name, field)` pairs for unique indexes, used to name the
    /// field in a duplicate key error
    fn unique_fields() -> &'static [(&'static str, &'static str)] {
        &[]
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, GatewayError> {
        info!("Connecting to MongoDB");

        // Fail fast when MongoDB is unreachable
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| GatewayError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| GatewayError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, GatewayError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, GatewayError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), GatewayError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| GatewayError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document
    ///
    /// A duplicate key error becomes `UniqueConstraintViolation` naming the
    /// offending field; the unique index is the only uniqueness check.
    pub async fn insert_one(&self, item: &T) -> Result<(), GatewayError> {
        self.inner.insert_one(item).await.map_err(|e| {
            match duplicate_key_message(&e) {
                Some(message) => GatewayError::UniqueConstraintViolation {
                    field: unique_field_for::<T>(&message),
                },
                None => GatewayError::Database(format!("Insert failed: {}", e)),
            }
        })?;

        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, GatewayError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| GatewayError::Database(format!("Find failed: {}", e)))
    }

    /// Find all documents matching `filter`, in `sort` order
    pub async fn find_many(&self, filter: Document, sort: Document) -> Result<Vec<T>, GatewayError> {
        let cursor = self
            .inner
            .find(filter)
            .sort(sort)
            .await
            .map_err(|e| GatewayError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect::<Vec<T>>()
            .await
            .map_err(|e| GatewayError::Database(format!("Reading documents failed: {}", e)))
    }

    /// Apply an update operator document and return the document as it is
    /// afterwards, or `None` if nothing matched
    pub async fn update_one_returning(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<T>, GatewayError> {
        self.inner
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| GatewayError::Database(format!("Update failed: {}", e)))
    }

    /// Delete one document; returns whether a document matched
    pub async fn delete_one(&self, filter: Document) -> Result<bool, GatewayError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| GatewayError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count > 0)
    }

    /// Replace one document; returns whether a document matched
    pub async fn replace_one(&self, filter: Document, item: &T) -> Result<bool, GatewayError> {
        let result = self
            .inner
            .replace_one(filter, item)
            .await
            .map_err(|e| GatewayError::Database(format!("Update failed: {}", e)))?;

        Ok(result.matched_count > 0)
    }
}

fn duplicate_key_message(err: &mongodb::error::Error) -> Option<String> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY =>
        {
            Some(write_error.message.clone())
        }
        _ => {
            let error_str = err.to_string();
            error_str.contains("E11000").then_some(error_str)
        }
    }
}

fn unique_field_for<T: IntoIndexes>(message: &str) -> &'static str {
    T::unique_fields()
        .iter()
        .find(|(index, _)| message.contains(index))
        .map(|(_, field)| *field)
        .unwrap_or("unknown")
}

/// Administrator and guest storage backed by MongoDB
#[derive(Clone)]
pub struct MongoStore {
    admins: MongoCollection<AdminDoc>,
    guests: MongoCollection<GuestDoc>,
}

impl MongoStore {
    /// Open both collections and ensure their indexes exist
    pub async fn new(client: &MongoClient) -> Result<Self, GatewayError> {
        Ok(Self {
            admins: client.collection(ADMIN_COLLECTION).await?,
            guests: client.collection(GUEST_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl AdminStore for MongoStore {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<AdminDoc>, GatewayError> {
        self.admins.find_one(doc! { "identity": identity }).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AdminDoc>, GatewayError> {
        self.admins.find_one(doc! { "_id": id }).await
    }

    async fn insert(&self, admin: AdminDoc) -> Result<(), GatewayError> {
        self.admins.insert_one(&admin).await
    }

    async fn update(&self, admin: &AdminDoc) -> Result<(), GatewayError> {
        // identity is immutable, so it is part of the match
        let filter = doc! { "_id": &admin.id, "identity": &admin.identity };
        if self.admins.replace_one(filter, admin).await? {
            Ok(())
        } else {
            Err(GatewayError::NotFound("Administrator not found".into()))
        }
    }
}

#[async_trait]
impl GuestStore for MongoStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<GuestDoc>, GatewayError> {
        self.guests.find_one(doc! { "_id": id }).await
    }

    async fn find_by_access_code(&self, code: &str) -> Result<Option<GuestDoc>, GatewayError> {
        self.guests.find_one(doc! { "access_code": code }).await
    }

    async fn list(&self, filter: &GuestFilter) -> Result<Vec<GuestDoc>, GatewayError> {
        self.guests
            .find_many(filter.to_document()?, doc! { "last_name": 1, "first_name": 1 })
            .await
    }

    async fn insert(&self, guest: GuestDoc) -> Result<(), GatewayError> {
        self.guests.insert_one(&guest).await
    }

    async fn update(&self, id: &str, patch: &GuestPatch) -> Result<Option<GuestDoc>, GatewayError> {
        let set = patch.to_set_document(DateTime::now())?;
        self.guests
            .update_one_returning(doc! { "_id": id }, doc! { "$set": set })
            .await
    }

    async fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        self.guests.delete_one(doc! { "_id": id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Collection behaviour needs a running MongoDB instance; only the pure
    // helpers are covered here.

    #[test]
    fn test_unique_field_from_error_message() {
        let message = "E11000 duplicate key error collection: rsvp.guests index: access_code_unique dup key: { access_code: \"AB12CD34\" }";
        assert_eq!(unique_field_for::<GuestDoc>(message), "access_code");

        let message = "E11000 duplicate key error collection: rsvp.admins index: identity_unique dup key";
        assert_eq!(unique_field_for::<AdminDoc>(message), "identity");
    }

    #[test]
    fn test_unknown_index_name() {
        assert_eq!(unique_field_for::<GuestDoc>("index: _id_ dup key"), "unknown");
    }
}

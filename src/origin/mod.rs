use async_trait::async_trait;
use firestore::{FirestoreDb, FirestoreDbOptions};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::models::credential::{Credential, CredentialMeta};

/// Firestore populates any field aliased `_firestore_id` with the
/// document's id when deserializing a query result — capturing it this
/// way lets the rest of the pipeline treat the stored document id as an
/// ordinary field rather than threading it through separately.
#[derive(Debug, Deserialize)]
struct IdentifiedDocument {
    #[serde(rename = "_firestore_id")]
    id: String,
    #[serde(flatten)]
    fields: Value,
}

pub const INDIVIDUAL_JOBS_COLLECTION_DEFAULT: &str = "individual_jobs";
pub const JOB_LIST_COLLECTION_DEFAULT: &str = "job_list";
const CREDENTIALS_COLLECTION: &str = "credentials";
const CREDENTIALS_META_COLLECTION: &str = "credentials_meta";
const CREDENTIALS_META_DOC: &str = "metadata";

#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("origin store error: {0}")]
    Store(String),
    #[allow(dead_code)]
    #[error("document not found")]
    NotFound,
}

impl From<firestore::errors::FirestoreError> for OriginError {
    fn from(e: firestore::errors::FirestoreError) -> Self {
        OriginError::Store(e.to_string())
    }
}

/// Narrow async seam over the managed document store and the credential
/// collections it also hosts — a trait, rather than a concrete struct,
/// so the query pipeline and credential service can be driven by a fake
/// in tests without a live Firestore connection.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Returns the raw stored document (ingestion metadata plus the
    /// vendor-shaped payload under `state`/`job`) — callers run it through
    /// `transform::transform_document` rather than deserializing it
    /// directly into a `JobRecord`, since the document on disk doesn't
    /// share that shape (§4.F).
    #[allow(dead_code)]
    async fn get_job(&self, id: &str) -> Result<Option<Value>, OriginError>;

    #[allow(dead_code)]
    async fn get_job_summary(&self, id: &str) -> Result<Option<Value>, OriginError>;

    /// Streams the individual-jobs collection ordered by the native field
    /// corresponding to the requested sort, overfetched per §4.G's
    /// `limit + offset` formula. Callers apply residual filtering,
    /// transformation, and pagination downstream; this only narrows by the
    /// native sort field to avoid shipping the whole collection across the
    /// wire.
    async fn stream_jobs(
        &self,
        native_sort_field: &str,
        descending: bool,
        overfetch: u32,
    ) -> Result<BoxStream<'static, Result<(String, Value), OriginError>>, OriginError>;

    async fn stream_job_summaries(
        &self,
        native_sort_field: &str,
        descending: bool,
        overfetch: u32,
    ) -> Result<BoxStream<'static, Result<(String, Value), OriginError>>, OriginError>;

    async fn get_credential(&self, key_hash: &str) -> Result<Option<Credential>, OriginError>;
    async fn put_credential(&self, key_hash: &str, credential: &Credential) -> Result<(), OriginError>;
    async fn delete_credential(&self, key_hash: &str) -> Result<(), OriginError>;
    async fn list_credentials(&self) -> Result<Vec<Credential>, OriginError>;

    #[allow(dead_code)]
    async fn get_credential_meta(&self) -> Result<Option<CredentialMeta>, OriginError>;
    async fn put_credential_meta(&self, meta: &CredentialMeta) -> Result<(), OriginError>;
}

/// Thin typed wrapper over the managed document store, mirroring the
/// convention of giving each external service its own narrow async client
/// rather than threading a raw SDK handle through the rest of the crate.
#[derive(Clone)]
pub struct OriginStore {
    db: FirestoreDb,
    individual_jobs_collection: String,
    job_list_collection: String,
}

impl OriginStore {
    pub async fn connect(
        project_id: &str,
        service_account_path: Option<&str>,
        individual_jobs_collection: String,
        job_list_collection: String,
    ) -> anyhow::Result<Self> {
        let options = FirestoreDbOptions::new(project_id.to_string());
        let db = match service_account_path {
            Some(path) => FirestoreDb::with_options_service_account_key_file(options, path.into()).await?,
            None => FirestoreDb::with_options(options).await?,
        };
        tracing::info!(project_id, "origin store connected");
        Ok(Self {
            db,
            individual_jobs_collection,
            job_list_collection,
        })
    }
}

#[async_trait]
impl Origin for OriginStore {
    #[allow(dead_code)]
    async fn get_job(&self, id: &str) -> Result<Option<Value>, OriginError> {
        self.db
            .fluent()
            .select()
            .by_id_in(&self.individual_jobs_collection)
            .obj()
            .one(id)
            .await
            .map_err(OriginError::from)
    }

    #[allow(dead_code)]
    async fn get_job_summary(&self, id: &str) -> Result<Option<Value>, OriginError> {
        self.db
            .fluent()
            .select()
            .by_id_in(&self.job_list_collection)
            .obj()
            .one(id)
            .await
            .map_err(OriginError::from)
    }

    async fn stream_jobs(
        &self,
        native_sort_field: &str,
        descending: bool,
        overfetch: u32,
    ) -> Result<BoxStream<'static, Result<(String, Value), OriginError>>, OriginError> {
        let direction = if descending {
            firestore::FirestoreQueryDirection::Descending
        } else {
            firestore::FirestoreQueryDirection::Ascending
        };

        let stream = self
            .db
            .fluent()
            .select()
            .from(self.individual_jobs_collection.as_str())
            .order_by([(native_sort_field, direction)])
            .limit(overfetch)
            .obj::<IdentifiedDocument>()
            .stream_query()
            .await?;

        Ok(stream
            .map(|r| r.map(|doc| (doc.id, doc.fields)).map_err(OriginError::from))
            .boxed())
    }

    async fn stream_job_summaries(
        &self,
        native_sort_field: &str,
        descending: bool,
        overfetch: u32,
    ) -> Result<BoxStream<'static, Result<(String, Value), OriginError>>, OriginError> {
        let direction = if descending {
            firestore::FirestoreQueryDirection::Descending
        } else {
            firestore::FirestoreQueryDirection::Ascending
        };

        let stream = self
            .db
            .fluent()
            .select()
            .from(self.job_list_collection.as_str())
            .order_by([(native_sort_field, direction)])
            .limit(overfetch)
            .obj::<IdentifiedDocument>()
            .stream_query()
            .await?;

        Ok(stream
            .map(|r| r.map(|doc| (doc.id, doc.fields)).map_err(OriginError::from))
            .boxed())
    }

    async fn get_credential(&self, key_hash: &str) -> Result<Option<Credential>, OriginError> {
        self.db
            .fluent()
            .select()
            .by_id_in(CREDENTIALS_COLLECTION)
            .obj()
            .one(key_hash)
            .await
            .map_err(OriginError::from)
    }

    async fn put_credential(&self, key_hash: &str, credential: &Credential) -> Result<(), OriginError> {
        self.db
            .fluent()
            .update()
            .in_col(CREDENTIALS_COLLECTION)
            .document_id(key_hash)
            .object(credential)
            .execute::<Credential>()
            .await?;
        Ok(())
    }

    async fn delete_credential(&self, key_hash: &str) -> Result<(), OriginError> {
        self.db
            .fluent()
            .delete()
            .from(CREDENTIALS_COLLECTION)
            .document_id(key_hash)
            .execute()
            .await?;
        Ok(())
    }

    async fn list_credentials(&self) -> Result<Vec<Credential>, OriginError> {
        let stream = self
            .db
            .fluent()
            .select()
            .from(CREDENTIALS_COLLECTION)
            .obj::<Credential>()
            .stream_query()
            .await?;
        stream
            .map(|r| r.map_err(OriginError::from))
            .try_collect()
            .await
    }

    #[allow(dead_code)]
    async fn get_credential_meta(&self) -> Result<Option<CredentialMeta>, OriginError> {
        self.db
            .fluent()
            .select()
            .by_id_in(CREDENTIALS_META_COLLECTION)
            .obj()
            .one(CREDENTIALS_META_DOC)
            .await
            .map_err(OriginError::from)
    }

    async fn put_credential_meta(&self, meta: &CredentialMeta) -> Result<(), OriginError> {
        self.db
            .fluent()
            .update()
            .in_col(CREDENTIALS_META_COLLECTION)
            .document_id(CREDENTIALS_META_DOC)
            .object(meta)
            .execute::<CredentialMeta>()
            .await?;
        Ok(())
    }
}

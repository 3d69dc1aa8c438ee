use std::{collections::HashMap, fmt::Debug, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Content of a file together with the revision it is at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredDocument {
    pub content: String,
    pub revision: u64,
}

/// Backing storage for documents. Rooms load from it when they are created
/// and write to it after every accepted change.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    async fn get(&self, project_id: &str, file_id: &str) -> Result<Option<StoredDocument>>;

    async fn put(&self, project_id: &str, file_id: &str, document: StoredDocument) -> Result<()>;
}

/// Keeps documents for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<(String, String), StoredDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, project_id: &str, file_id: &str) -> Result<Option<StoredDocument>> {
        let documents = self.documents.lock().await;

        Ok(documents
            .get(&(project_id.to_owned(), file_id.to_owned()))
            .cloned())
    }

    async fn put(&self, project_id: &str, file_id: &str, document: StoredDocument) -> Result<()> {
        let mut documents = self.documents.lock().await;
        documents.insert((project_id.to_owned(), file_id.to_owned()), document);

        Ok(())
    }
}

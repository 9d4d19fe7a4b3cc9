//! In-memory connectors for engine tests.

use async_trait::async_trait;
use paperbridge_integration::{
    AccountingService, ConnectionStatus, Connector, ConnectorError, ConnectorProvider,
    ContactQuery, DocumentService, DocumentUpload,
};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn not_found() -> ConnectorError {
    ConnectorError::HttpStatus {
        status: 404,
        body: "Not found.".to_string(),
    }
}

#[derive(Default)]
pub(crate) struct FakeDocuments {
    pub documents: Mutex<HashMap<i64, JsonValue>>,
    pub files: Mutex<HashMap<i64, Vec<u8>>>,
    pub uploads: Mutex<Vec<DocumentUpload>>,
    pub failure: Option<ConnectorError>,
    pub closed: AtomicUsize,
}

impl FakeDocuments {
    pub fn with_document(self, id: i64, metadata: JsonValue, content: Vec<u8>) -> Self {
        self.documents.lock().unwrap().insert(id, metadata);
        self.files.lock().unwrap().insert(id, content);
        self
    }

    pub fn failing(error: ConnectorError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), ConnectorError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Connector for FakeDocuments {
    fn name(&self) -> &'static str {
        "fake-documents"
    }

    async fn test_connection(&self) -> ConnectionStatus {
        ConnectionStatus::connected("ok", JsonValue::Null)
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentService for FakeDocuments {
    async fn get_document(&self, document_id: i64) -> Result<JsonValue, ConnectorError> {
        self.check()?;
        self.documents
            .lock()
            .unwrap()
            .get(&document_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn download_document(&self, document_id: i64) -> Result<Vec<u8>, ConnectorError> {
        self.check()?;
        self.files
            .lock()
            .unwrap()
            .get(&document_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<JsonValue, ConnectorError> {
        self.check()?;
        self.uploads.lock().unwrap().push(upload);
        Ok(json!({ "status": "accepted", "task_id": "task-1" }))
    }

    async fn update_document(
        &self,
        document_id: i64,
        data: JsonValue,
    ) -> Result<JsonValue, ConnectorError> {
        self.check()?;
        let mut documents = self.documents.lock().unwrap();
        let document = documents.get_mut(&document_id).ok_or_else(not_found)?;
        if let (Some(target), Some(changes)) = (document.as_object_mut(), data.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(document.clone())
    }
}

#[derive(Default)]
pub(crate) struct FakeAccounting {
    pub contacts: Vec<JsonValue>,
    pub vouchers: Mutex<Vec<JsonValue>>,
    pub created_contacts: Mutex<Vec<JsonValue>>,
    pub searches: Mutex<Vec<ContactQuery>>,
    pub failure: Option<ConnectorError>,
    pub closed: AtomicUsize,
}

impl FakeAccounting {
    pub fn with_contacts(contacts: Vec<JsonValue>) -> Self {
        Self {
            contacts,
            ..Self::default()
        }
    }

    pub fn failing(error: ConnectorError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), ConnectorError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Connector for FakeAccounting {
    fn name(&self) -> &'static str {
        "fake-accounting"
    }

    async fn test_connection(&self) -> ConnectionStatus {
        ConnectionStatus::connected("ok", JsonValue::Null)
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountingService for FakeAccounting {
    async fn create_voucher(&self, voucher: JsonValue) -> Result<JsonValue, ConnectorError> {
        self.check()?;
        let mut vouchers = self.vouchers.lock().unwrap();
        vouchers.push(voucher);
        Ok(json!({ "id": format!("voucher-{}", vouchers.len()) }))
    }

    async fn search_contacts(&self, query: ContactQuery) -> Result<JsonValue, ConnectorError> {
        self.check()?;
        let matches: Vec<JsonValue> = self
            .contacts
            .iter()
            .filter(|c| c["company"]["name"].as_str() == query.name.as_deref())
            .cloned()
            .collect();
        self.searches.lock().unwrap().push(query);
        Ok(json!({ "content": matches }))
    }

    async fn create_contact(&self, contact: JsonValue) -> Result<JsonValue, ConnectorError> {
        self.check()?;
        self.created_contacts.lock().unwrap().push(contact);
        Ok(json!({ "id": "contact-new" }))
    }
}

#[derive(Default)]
pub(crate) struct FakeProvider {
    pub documents: Arc<FakeDocuments>,
    pub accounting: Arc<FakeAccounting>,
    pub refuse: Option<ConnectorError>,
    pub opened_documents: AtomicUsize,
    pub opened_accounting: AtomicUsize,
}

impl ConnectorProvider for FakeProvider {
    fn open_documents(&self) -> Result<Arc<dyn DocumentService>, ConnectorError> {
        if let Some(e) = &self.refuse {
            return Err(e.clone());
        }
        self.opened_documents.fetch_add(1, Ordering::SeqCst);
        let documents: Arc<dyn DocumentService> = self.documents.clone();
        Ok(documents)
    }

    fn open_accounting(&self) -> Result<Arc<dyn AccountingService>, ConnectorError> {
        if let Some(e) = &self.refuse {
            return Err(e.clone());
        }
        self.opened_accounting.fetch_add(1, Ordering::SeqCst);
        let accounting: Arc<dyn AccountingService> = self.accounting.clone();
        Ok(accounting)
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::state::{AuditEntry, ReclassTrackingRecord, WorkflowItem, WorkflowState, state_key};
use super::{AuditSink, ReclassTracker, StateStore, most_recent_for_loan};
use crate::error::StoreError;

/// JSON-document backend rooted in a data directory.
///
/// Layout:
/// - `<state_table>.json`: map of `request#execution` to stored item
/// - `<state_table>-reclass.json`: reclass tracking records by key
/// - `<audit_table>.json`: append-only array of audit entries
pub struct FileStore {
    state_path: PathBuf,
    reclass_path: PathBuf,
    audit_path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub async fn open(
        data_dir: &Path,
        state_table: &str,
        audit_table: &str,
    ) -> Result<Self, StoreError> {
        let reclass_table = format!("{state_table}-reclass");
        if audit_table == state_table || audit_table == reclass_table {
            return Err(StoreError::Config(format!(
                "audit table '{audit_table}' would share a document with state table \
                 '{state_table}'"
            )));
        }

        fs::create_dir_all(data_dir).await?;
        info!(data_dir = %data_dir.display(), state_table, audit_table, "Opened file store");
        Ok(Self {
            state_path: data_dir.join(format!("{state_table}.json")),
            reclass_path: data_dir.join(format!("{reclass_table}.json")),
            audit_path: data_dir.join(format!("{audit_table}.json")),
            lock: Mutex::new(()),
        })
    }

    pub async fn audit_entries(&self) -> Result<Vec<AuditEntry>, StoreError> {
        read_document(&self.audit_path).await
    }

    pub async fn reclass_records(&self) -> Result<Vec<ReclassTrackingRecord>, StoreError> {
        let records: BTreeMap<String, ReclassTrackingRecord> =
            read_document(&self.reclass_path).await?;
        Ok(records.into_values().collect())
    }

    async fn load_items(&self) -> Result<BTreeMap<String, WorkflowItem>, StoreError> {
        read_document(&self.state_path).await
    }
}

async fn read_document<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path).await {
        Ok(contents) if contents.trim().is_empty() => Ok(T::default()),
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
            key: path.display().to_string(),
            reason: e.to_string(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

/// Writes through a sibling temp file and renames it into place.
async fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl StateStore for FileStore {
    async fn save(&self, state: &WorkflowState) -> Result<WorkflowState, StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_items().await?;
        let key = state.key();
        let item = WorkflowItem::stamp(state, items.get(&key), Utc::now())?;
        items.insert(key, item.clone());
        write_document(&self.state_path, &items).await?;
        debug!(
            request_number = %state.request_number,
            execution_id = %state.execution_id,
            "Saved workflow state"
        );
        item.into_state()
    }

    async fn find_by_key(
        &self,
        request_number: &str,
        execution_id: &str,
    ) -> Result<Option<WorkflowState>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_items().await?;
        items
            .remove(&state_key(request_number, execution_id))
            .map(WorkflowItem::into_state)
            .transpose()
    }

    async fn find_most_recent_by_loan_number(
        &self,
        loan_number: &str,
    ) -> Result<Option<WorkflowState>, StoreError> {
        let _guard = self.lock.lock().await;
        let items = self.load_items().await?;
        most_recent_for_loan(items.values(), loan_number)
            .cloned()
            .map(WorkflowItem::into_state)
            .transpose()
    }
}

#[async_trait]
impl AuditSink for FileStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries: Vec<AuditEntry> = read_document(&self.audit_path).await?;
        entries.push(entry.clone());
        write_document(&self.audit_path, &entries).await
    }
}

#[async_trait]
impl ReclassTracker for FileStore {
    async fn create(&self, record: &ReclassTrackingRecord) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records: BTreeMap<String, ReclassTrackingRecord> =
            read_document(&self.reclass_path).await?;
        let key = record.key();
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, record.clone());
        write_document(&self.reclass_path, &records).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{AttributeDecision, DecisionValue};
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> FileStore {
        FileStore::open(dir.path(), "loan-state", "loan-audit")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let mut state = WorkflowState::new("REQ-1", "exec-1", "LOAN-1", "ConduitReview");
        state.attributes = vec![
            AttributeDecision::decided("CreditScore", DecisionValue::Rejected),
            AttributeDecision::decided("DebtRatio", DecisionValue::Pending),
        ];
        state.task_token = Some("token-abc".into());

        let written = open(&dir).await.save(&state).await.unwrap();

        let reopened = open(&dir).await;
        let loaded = reopened.find_by_key("REQ-1", "exec-1").await.unwrap().unwrap();
        assert_eq!(loaded, written);
        assert_eq!(loaded.attributes, state.attributes);
        assert!(loaded.is_suspended());

        let by_loan = reopened
            .find_most_recent_by_loan_number("LOAN-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_loan.execution_id, "exec-1");
    }

    #[tokio::test]
    async fn attributes_are_an_embedded_blob_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        let mut state = WorkflowState::new("REQ-1", "exec-1", "LOAN-1", "LDCReview");
        state.attributes = vec![AttributeDecision::decided("CreditScore", DecisionValue::Approved)];
        store.save(&state).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("loan-state.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let attrs = &doc["REQ-1#exec-1"]["attributes"];
        assert!(attrs.is_string(), "expected serialized blob, got {attrs}");
        assert!(doc["REQ-1#exec-1"].get("taskToken").is_none());
    }

    #[tokio::test]
    async fn audit_and_reclass_documents() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;

        let entry = AuditEntry::new("REQ-1", "LOAN-1", "exec-1", "Started", None, Utc::now());
        store.append(&entry).await.unwrap();
        store.append(&entry).await.unwrap();
        assert_eq!(store.audit_entries().await.unwrap().len(), 2);
        assert!(dir.path().join("loan-audit.json").exists());

        let mut record = ReclassTrackingRecord::new("REQ-1", "exec-1", "LOAN-1");
        record.reclass_confirmed = true;
        assert!(store.create(&record).await.unwrap());
        let fresh = ReclassTrackingRecord::new("REQ-1", "exec-1", "LOAN-1");
        assert!(!store.create(&fresh).await.unwrap());
        assert_eq!(store.reclass_records().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn audit_table_must_not_share_a_document() {
        let dir = TempDir::new().unwrap();
        for audit in ["loan-state", "loan-state-reclass"] {
            let err = FileStore::open(dir.path(), "loan-state", audit)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, StoreError::Config(_)), "{err}");
        }
        assert!(!dir.path().join("loan-state.json").exists());
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("loan-state.json"), "{ nope").unwrap();
        let store = open(&dir).await;
        let err = store.find_by_key("REQ-1", "exec-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}

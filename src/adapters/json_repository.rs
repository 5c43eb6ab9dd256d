use crate::domain::model::{CostRecord, Dataset, Document, Shipment, ShipmentStatus};
use crate::domain::ports::{Repository, Storage};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

/// Keeps the whole dataset in one JSON file behind a `Storage`.
pub struct JsonFileRepository<S: Storage> {
    storage: S,
    file_name: String,
    write_lock: Mutex<()>,
}

impl<S: Storage> JsonFileRepository<S> {
    pub fn new(storage: S, file_name: impl Into<String>) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Dataset> {
        if !self.storage.exists(&self.file_name).await {
            tracing::warn!("Dataset file {} not found, starting empty", self.file_name);
            return Ok(Dataset::default());
        }
        let bytes = self.storage.read_file(&self.file_name).await?;
        let dataset: Dataset = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            "Loaded {} shipments, {} cost records, {} documents from {}",
            dataset.shipments.len(),
            dataset.cost_records.len(),
            dataset.documents.len(),
            self.file_name
        );
        Ok(dataset)
    }

    async fn write(&self, dataset: &Dataset) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(dataset)?;
        self.storage.write_file(&self.file_name, &bytes).await
    }
}

fn shipment_not_found(reference: &str) -> AppError {
    AppError::NotFound {
        entity: "shipment".to_string(),
        id: reference.to_string(),
    }
}

#[async_trait]
impl<S: Storage> Repository for JsonFileRepository<S> {
    async fn load_dataset(&self) -> Result<Dataset> {
        self.read().await
    }

    async fn list_shipments(&self) -> Result<Vec<Shipment>> {
        Ok(self.read().await?.shipments)
    }

    async fn get_shipment(&self, reference: &str) -> Result<Shipment> {
        self.read()
            .await?
            .shipment(reference)
            .cloned()
            .ok_or_else(|| shipment_not_found(reference))
    }

    async fn save_shipment(&self, shipment: &Shipment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut dataset = self.read().await?;
        match dataset.shipments.iter_mut().find(|s| s.id == shipment.id) {
            Some(existing) => *existing = shipment.clone(),
            None => dataset.shipments.push(shipment.clone()),
        }
        self.write(&dataset).await
    }

    async fn update_status(&self, reference: &str, status: ShipmentStatus) -> Result<Shipment> {
        let _guard = self.write_lock.lock().await;
        let mut dataset = self.read().await?;
        let shipment = dataset
            .shipments
            .iter_mut()
            .find(|s| s.id == reference || s.code == reference)
            .ok_or_else(|| shipment_not_found(reference))?;

        let changed = shipment.set_status(status, Utc::now())?;
        let updated = shipment.clone();
        if changed {
            self.write(&dataset).await?;
        }
        Ok(updated)
    }

    async fn get_cost_record(&self, shipment_id: &str) -> Result<Option<CostRecord>> {
        Ok(self.read().await?.cost_record_for(shipment_id).cloned())
    }

    async fn save_cost_record(&self, record: &CostRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut dataset = self.read().await?;
        if dataset.shipment(&record.shipment_id).is_none() {
            return Err(shipment_not_found(&record.shipment_id));
        }
        match dataset
            .cost_records
            .iter_mut()
            .find(|r| r.shipment_id == record.shipment_id)
        {
            Some(existing) => *existing = record.clone(),
            None => dataset.cost_records.push(record.clone()),
        }
        self.write(&dataset).await
    }

    async fn list_documents(&self, shipment_id: &str) -> Result<Vec<Document>> {
        Ok(self
            .read()
            .await?
            .documents_for(shipment_id)
            .cloned()
            .collect())
    }

    async fn add_document(&self, document: &Document) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut dataset = self.read().await?;
        if dataset.shipment(&document.shipment_id).is_none() {
            return Err(shipment_not_found(&document.shipment_id));
        }
        dataset.documents.push(document.clone());
        self.write(&dataset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::CostInputs;
    use crate::domain::model::DocumentKind;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                AppError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }
    }

    fn shipment(id: &str, code: &str) -> Shipment {
        Shipment {
            id: id.to_string(),
            code: code.to_string(),
            supplier: "Guangzhou Textiles".to_string(),
            origin: "CN".to_string(),
            status: ShipmentStatus::Preparing,
            departure_date: None,
            eta: None,
            status_changed_at: None,
            purchase_orders: vec![],
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty_dataset() {
        let repo = JsonFileRepository::new(MockStorage::default(), "dataset.json");
        assert!(repo.list_shipments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_update_shipment() {
        let storage = MockStorage::default();
        let repo = JsonFileRepository::new(storage.clone(), "dataset.json");

        repo.save_shipment(&shipment("s1", "EMB-001")).await.unwrap();
        let mut edited = shipment("s1", "EMB-001");
        edited.notes = Some("consolidated with EMB-002".to_string());
        repo.save_shipment(&edited).await.unwrap();

        let all = repo.list_shipments().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].notes.as_deref(), Some("consolidated with EMB-002"));

        let updated = repo
            .update_status("EMB-001", ShipmentStatus::InTransit)
            .await
            .unwrap();
        assert_eq!(updated.status, ShipmentStatus::InTransit);
        assert!(updated.status_changed_at.is_some());

        let reloaded = repo.get_shipment("s1").await.unwrap();
        assert_eq!(reloaded.status, ShipmentStatus::InTransit);

        let err = repo
            .update_status("EMB-001", ShipmentStatus::Preparing)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_cost_record_upsert_requires_shipment() {
        let repo = JsonFileRepository::new(MockStorage::default(), "dataset.json");
        let record = CostRecord::new("s1", CostInputs::default());
        assert!(matches!(
            repo.save_cost_record(&record).await,
            Err(AppError::NotFound { .. })
        ));

        repo.save_shipment(&shipment("s1", "EMB-001")).await.unwrap();
        repo.save_cost_record(&record).await.unwrap();

        let mut revised = record.clone();
        revised.inputs.fob_value = 5000.0;
        repo.save_cost_record(&revised).await.unwrap();

        let dataset = repo.load_dataset().await.unwrap();
        assert_eq!(dataset.cost_records.len(), 1);
        assert_eq!(
            repo.get_cost_record("s1").await.unwrap().unwrap().inputs.fob_value,
            5000.0
        );
        assert!(repo.get_cost_record("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_documents_are_listed_per_shipment() {
        let repo = JsonFileRepository::new(MockStorage::default(), "dataset.json");
        repo.save_shipment(&shipment("s1", "EMB-001")).await.unwrap();
        repo.save_shipment(&shipment("s2", "EMB-002")).await.unwrap();

        let doc = Document::new("s1", DocumentKind::Invoice, "inv.pdf", b"pdf", Utc::now());
        repo.add_document(&doc).await.unwrap();

        assert_eq!(repo.list_documents("s1").await.unwrap(), vec![doc]);
        assert!(repo.list_documents("s2").await.unwrap().is_empty());

        let orphan = Document::new("s9", DocumentKind::Dua, "dua.pdf", b"pdf", Utc::now());
        assert!(repo.add_document(&orphan).await.is_err());
    }
}

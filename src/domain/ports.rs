use crate::domain::alerts::AlertThresholds;
use crate::domain::model::{
    CostRecord, Dataset, Document, ExportBundle, Shipment, ShipmentStatus,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn business_name(&self) -> &str;
    fn output_path(&self) -> &str;
    fn export_filename(&self) -> &str;
    fn include_documents(&self) -> bool;
    fn alert_thresholds(&self) -> AlertThresholds;
}

/// Shipment data access, local or hosted.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn load_dataset(&self) -> Result<Dataset>;
    async fn list_shipments(&self) -> Result<Vec<Shipment>>;
    /// Accepts a shipment id or code.
    async fn get_shipment(&self, reference: &str) -> Result<Shipment>;
    async fn save_shipment(&self, shipment: &Shipment) -> Result<()>;
    async fn update_status(&self, reference: &str, status: ShipmentStatus) -> Result<Shipment>;
    async fn get_cost_record(&self, shipment_id: &str) -> Result<Option<CostRecord>>;
    async fn save_cost_record(&self, record: &CostRecord) -> Result<()>;
    async fn list_documents(&self, shipment_id: &str) -> Result<Vec<Document>>;
    async fn add_document(&self, document: &Document) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<ExportBundle>;
    async fn load(&self, bundle: ExportBundle) -> Result<String>;
}

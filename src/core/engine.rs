use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct ExportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting export");

        tracing::info!("Loading shipment data...");
        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded {} shipments, {} cost records, {} documents",
            dataset.shipments.len(),
            dataset.cost_records.len(),
            dataset.documents.len()
        );

        tracing::info!("Building sheets and report...");
        let bundle = self.pipeline.transform(dataset).await?;
        tracing::info!(
            "Prepared {} sheets, {} documents, {} alerts",
            bundle.sheets.len(),
            bundle.documents.len(),
            bundle.alerts.len()
        );

        tracing::info!("Writing archive...");
        let output_path = self.pipeline.load(bundle).await?;
        tracing::info!(
            "Export saved to {} in {:?}",
            output_path,
            started.elapsed()
        );

        Ok(output_path)
    }
}

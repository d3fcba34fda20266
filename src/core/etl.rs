use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting extraction");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} records across {} accounts",
            raw_data.record_count(),
            raw_data.account_count()
        );
        self.monitor.log_stats("Extract");

        let data = self.pipeline.transform(raw_data).await?;
        tracing::info!("Resolved item links for {} records", data.record_count());
        self.monitor.log_stats("Transform");

        let destination = self.pipeline.load(data).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(destination)
    }
}

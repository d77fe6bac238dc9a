use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

/// Runs a pipeline's extract, transform and load phases in order.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitoring: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitoring),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting export run");
        self.monitor.log_stats("start");

        tracing::info!("📥 Extracting...");
        let extracted = self.pipeline.extract().await?;
        self.monitor.log_stats("extract");

        tracing::info!("🔄 Transforming...");
        let transformed = self.pipeline.transform(extracted).await?;
        self.monitor.log_stats("transform");

        tracing::info!("💾 Loading...");
        let output = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        tracing::info!("✅ Run finished in {:?}, output: {}", started.elapsed(), output);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Pipeline for Counting {
        type Extracted = Vec<u32>;
        type Transformed = u32;

        async fn extract(&self) -> Result<Vec<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        }

        async fn transform(&self, data: Vec<u32>) -> Result<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(data.iter().sum())
        }

        async fn load(&self, result: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("sum={}", result))
        }
    }

    #[tokio::test]
    async fn test_runs_all_phases() {
        let engine = EtlEngine::new(Counting::default());
        assert_eq!(engine.run().await.unwrap(), "sum=6");
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_monitoring_does_not_change_output() {
        let engine = EtlEngine::new_with_monitoring(Counting::default(), true);
        assert_eq!(engine.run().await.unwrap(), "sum=6");
    }
}

//! Simulated camera device driving every profiling hook

use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use aidl_profiler::{AidlProfiler, EventType};

pub struct CameraPipeline {
    config: PipelineConfig,
    profiler: Arc<dyn AidlProfiler>,
}

impl CameraPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let profiler = aidl_profiler::create_with_flags(config.camera_id, config.profiling.clone());
        Self::with_profiler(config, profiler)
    }

    pub fn with_profiler(config: PipelineConfig, profiler: Arc<dyn AidlProfiler>) -> Self {
        Self { config, profiler }
    }

    async fn open(&self) {
        let _scope = self.profiler.make_scoped_profiler(EventType::Open, None, None);
        sleep(Duration::from_millis(15)).await;
        info!("Camera {} opened", self.profiler.camera_id());
    }

    async fn configure_streams(&self) {
        let _scope = self.profiler.make_scoped_profiler(EventType::ConfigureStream, None, None);
        sleep(Duration::from_millis(25)).await;
        info!("Configured streams: {:?}", self.config.streams);
    }

    async fn capture(&self) -> anyhow::Result<()> {
        let mut ticker = interval(Duration::from_micros(self.config.frame_interval_us.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reprocessing = Vec::new();

        for frame in 0..self.config.frames {
            if frame == 0 {
                self.profiler.first_frame_start();
            }
            ticker.tick().await;

            for stream in &self.config.streams {
                self.profiler.profile_frame_rate(stream);
            }
            if frame == 0 {
                self.profiler.first_frame_end();
            }

            if self.config.reprocess_every > 0 && frame % self.config.reprocess_every == 0 {
                let profiler = Arc::clone(&self.profiler);
                let latency = Duration::from_micros(self.config.reprocess_latency_us);
                let id = i32::try_from(frame)?;
                profiler.reprocessing_request_start(None, id);
                reprocessing.push(tokio::spawn(async move {
                    sleep(latency).await;
                    profiler.reprocessing_result_end(id);
                }));
            }
        }

        for handle in reprocessing {
            handle.await?;
        }
        Ok(())
    }

    async fn flush(&self) {
        let _scope = self.profiler.make_scoped_profiler(EventType::Flush, None, None);
        sleep(Duration::from_millis(5)).await;
    }

    async fn close(&self) {
        let _scope = self.profiler.make_scoped_profiler(EventType::Close, None, None);
        sleep(Duration::from_millis(10)).await;
        info!("Camera {} closed", self.profiler.camera_id());
    }

    /// Runs the whole device lifecycle, cutting capture short on ctrl-c.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    pub async fn run_until<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        self.open().await;
        self.configure_streams().await;

        tokio::select! {
            result = self.capture() => result?,
            _ = shutdown => {
                warn!("Capture interrupted");
                // A first frame that never arrived still closes its measurement.
                self.profiler.first_frame_end();
            }
        }

        self.flush().await;
        self.close().await;
        Ok(())
    }
}

//! Application state shared by all handlers.

use std::sync::Arc;

use pagebind_core::Config;
use pagebind_processing::{
    ConversionPipeline, HeapSampler, MemoryGovernor, ResultAssembler, StreamIngester,
};

pub struct AppState {
    pub config: Config,
    pub pipeline: ConversionPipeline,
    pub assembler: ResultAssembler,
}

impl AppState {
    /// Build the shared pipeline from configuration. Each request still runs
    /// its own job with its own document and decoder.
    pub fn new(config: Config, heap_sampler: Option<Arc<dyn HeapSampler>>) -> Self {
        let limits = config.limits;

        let mut governor = MemoryGovernor::new(limits.memory_watermark_bytes);
        if let Some(sampler) = heap_sampler {
            governor = governor.with_sampler(sampler);
        }
        let ingester = StreamIngester::new(
            limits.max_item_size_bytes,
            config.ingest_yield_bytes,
            governor,
        );

        Self {
            pipeline: ConversionPipeline::new(limits).with_ingester(ingester),
            assembler: ResultAssembler::new(config.default_output_name.clone()),
            config,
        }
    }
}

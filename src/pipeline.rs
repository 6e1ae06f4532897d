use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::info;

use crate::api::GenerationBackend;
use crate::cache::CacheStore;
use crate::error::{Result, ScriptError, Stage};
use crate::generation::ConstrainedGenerator;
use crate::script::ScriptProcessor;

type Flight = Arc<OnceCell<String>>;

/// Topic in, paced and repaired script out.
///
/// Concurrent requests for a topic that is already being generated wait for
/// that generation instead of starting their own. Failures are not cached.
pub struct ScriptPipeline<B, C> {
    generator: ConstrainedGenerator<B>,
    cache: C,
    processor: ScriptProcessor,
    in_flight: Mutex<HashMap<String, Flight>>,
}

impl<B, C> ScriptPipeline<B, C>
where
    B: GenerationBackend,
    C: CacheStore,
{
    pub fn new(generator: ConstrainedGenerator<B>, cache: C) -> Self {
        Self::with_processor(generator, cache, ScriptProcessor::default())
    }

    pub fn with_processor(
        generator: ConstrainedGenerator<B>,
        cache: C,
        processor: ScriptProcessor,
    ) -> Self {
        Self {
            generator,
            cache,
            processor,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn generator(&self) -> &ConstrainedGenerator<B> {
        &self.generator
    }

    pub async fn script_for(&self, topic: &str) -> Result<String> {
        if topic.trim().is_empty() {
            return Err(ScriptError::EmptyTopic);
        }

        info!("Checking cache for Manim script: {}", topic);
        if let Some(entry) = self
            .cache
            .lookup(topic)
            .await
            .map_err(|e| e.at(topic, Stage::Cache))?
        {
            info!("Cache HIT - using stored script for: {}", topic);
            return Ok(entry.validated_text);
        }

        let flight = self.join_flight(topic)?;
        let result = flight
            .get_or_try_init(|| self.produce(topic))
            .await
            .cloned();
        self.land_flight(topic, &flight);
        result
    }

    fn join_flight(&self, topic: &str) -> Result<Flight> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| ScriptError::Cache("in-flight map lock poisoned".to_string()))?;
        Ok(in_flight.entry(topic.to_string()).or_default().clone())
    }

    fn land_flight(&self, topic: &str, flight: &Flight) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if in_flight.get(topic).is_some_and(|current| Arc::ptr_eq(current, flight)) {
                in_flight.remove(topic);
            }
        }
    }

    async fn produce(&self, topic: &str) -> Result<String> {
        // A flight that landed between our cache miss and joining may
        // already have stored the script.
        if let Some(entry) = self
            .cache
            .lookup(topic)
            .await
            .map_err(|e| e.at(topic, Stage::Cache))?
        {
            return Ok(entry.validated_text);
        }
        info!("Cache MISS - generating new Manim script for: {}", topic);

        let raw = self
            .generator
            .generate(topic)
            .await
            .map_err(|e| e.at(topic, Stage::Generation))?;

        let validated = self
            .processor
            .process(&raw)
            .map_err(|e| e.at(topic, Stage::Validation))?;

        self.cache
            .store(topic, &raw, &validated)
            .await
            .map_err(|e| e.at(topic, Stage::Cache))?;
        info!("Stored Manim script for future use: {}", topic);

        Ok(validated)
    }
}

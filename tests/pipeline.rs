use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use auto_manim::{
    BackendError, CacheEntry, CacheStore, ConstrainedGenerator, DurationBalancer, GenerationBackend,
    MemoryCache, OutputSchema, ScriptError, ScriptPipeline, Stage,
};
use serde_json::{json, Value};

const PYTHAGORAS: &str = "from manim import *

class PythagoreanTheorem(Scene):
    def construct(self):
        triangle = Polygon(ORIGIN, RIGHT * 3, UP * 4)
        self.play(Create(triangle))
";

/// Answers every request with the same script and counts calls.
struct FixedBackend {
    script: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedBackend {
    fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(script: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(script)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerationBackend for FixedBackend {
    async fn invoke(&self, _prompt: &str, _schema: OutputSchema) -> Result<Value, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(json!({
            "imports": ["from manim import *"],
            "class_name": "PythagoreanTheorem",
            "class_definition": {
                "name": "PythagoreanTheorem",
                "methods": [{ "name": "construct", "parameters": ["self"], "body": "" }]
            },
            "complete_script": self.script
        }))
    }
}

fn pipeline(backend: FixedBackend) -> ScriptPipeline<FixedBackend, MemoryCache> {
    ScriptPipeline::new(ConstrainedGenerator::new(backend), MemoryCache::new())
}

#[tokio::test]
async fn pre_seeded_cache_skips_generation() {
    let pipeline = pipeline(FixedBackend::new(PYTHAGORAS));
    pipeline
        .cache()
        .store("Pythagorean theorem", "raw", "cached script")
        .await
        .unwrap();

    for _ in 0..2 {
        let script = pipeline.script_for("Pythagorean theorem").await.unwrap();
        assert_eq!(script, "cached script");
    }
    assert_eq!(pipeline.generator().backend().calls(), 0);
}

#[tokio::test]
async fn pythagorean_topic_end_to_end() {
    let pipeline = pipeline(FixedBackend::new(PYTHAGORAS));

    let script = pipeline.script_for("Pythagorean theorem").await.unwrap();
    assert!(script.contains("        self.play(Create(triangle))\n        self.wait("));

    let estimate = DurationBalancer::default().estimate(&script);
    assert!(estimate.directive_count >= 1);
    assert!(
        (26.0..=32.0).contains(&estimate.total),
        "estimate {} outside band",
        estimate.total
    );

    let again = pipeline.script_for("Pythagorean theorem").await.unwrap();
    assert_eq!(again, script);
    assert_eq!(pipeline.generator().backend().calls(), 1);

    let entry = pipeline
        .cache()
        .lookup("Pythagorean theorem")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.raw_text, PYTHAGORAS);
    assert_eq!(entry.validated_text, script);
}

#[tokio::test]
async fn concurrent_requests_share_one_generation() {
    let pipeline = pipeline(FixedBackend::slow(PYTHAGORAS, Duration::from_millis(50)));

    let (first, second) = tokio::join!(
        pipeline.script_for("Pythagorean theorem"),
        pipeline.script_for("Pythagorean theorem"),
    );

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(pipeline.generator().backend().calls(), 1);
}

/// Misses on the first lookup, as if another caller stored the script right
/// after it.
struct LateCache {
    inner: MemoryCache,
    missed: AtomicBool,
}

impl CacheStore for LateCache {
    async fn lookup(&self, topic: &str) -> auto_manim::Result<Option<CacheEntry>> {
        if !self.missed.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.lookup(topic).await
    }

    async fn store(&self, topic: &str, raw_text: &str, validated_text: &str) -> auto_manim::Result<()> {
        self.inner.store(topic, raw_text, validated_text).await
    }
}

#[tokio::test]
async fn script_stored_after_cache_miss_is_reused() {
    let cache = LateCache {
        inner: MemoryCache::new(),
        missed: AtomicBool::new(false),
    };
    cache
        .inner
        .store("Pythagorean theorem", "raw", "stored by another caller")
        .await
        .unwrap();
    let pipeline = ScriptPipeline::new(
        ConstrainedGenerator::new(FixedBackend::new(PYTHAGORAS)),
        cache,
    );

    let script = pipeline.script_for("Pythagorean theorem").await.unwrap();
    assert_eq!(script, "stored by another caller");
    assert_eq!(pipeline.generator().backend().calls(), 0);
}

#[tokio::test]
async fn different_topics_generate_separately() {
    let pipeline = pipeline(FixedBackend::new(PYTHAGORAS));
    pipeline.script_for("Pythagorean theorem").await.unwrap();
    pipeline.script_for("pythagorean theorem").await.unwrap();
    assert_eq!(pipeline.generator().backend().calls(), 2);
    assert_eq!(pipeline.cache().len(), 2);
}

#[tokio::test]
async fn missing_entry_method_reports_topic_and_stage() {
    let pipeline = pipeline(FixedBackend::new(
        "from manim import *\n\nclass Broken(Scene):\n    def setup(self):\n        pass\n",
    ));

    let err = pipeline.script_for("Broken topic").await.unwrap_err();
    match &err {
        ScriptError::Stage { topic, stage, .. } => {
            assert_eq!(topic, "Broken topic");
            assert_eq!(*stage, Stage::Validation);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root(), ScriptError::MissingEntryMethod));
    assert!(pipeline.cache().is_empty());
}

#[tokio::test]
async fn empty_topic_is_rejected() {
    let pipeline = pipeline(FixedBackend::new(PYTHAGORAS));
    let err = pipeline.script_for("  ").await.unwrap_err();
    assert!(matches!(err, ScriptError::EmptyTopic));
    assert_eq!(pipeline.generator().backend().calls(), 0);
}

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use food_quality::database::{AnalysisStore, Database, DatabaseError};
use food_quality::food::image::{ImageData, ImageError, ImageStore};
use food_quality::food::record::{AnalysisRecord, NewAnalysisRecord};
use food_quality::food::{AnalyzerConfig, FoodAnalyzer};
use food_quality::providers::InferenceProvider;
use image::{ImageOutputFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, Rgb([30, 160, 60]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .expect("encode png");
    buf
}

pub fn test_config() -> AnalyzerConfig {
    AnalyzerConfig {
        history_limit: 10,
        persist_retries: 1,
        retry_delay: Duration::from_millis(1),
    }
}

/// Answers from a queue of scripted replies, then repeats the fallback.
pub struct ScriptedInference {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    pub calls: AtomicUsize,
    pub instructions: Mutex<Vec<String>>,
}

impl ScriptedInference {
    pub fn answering(text: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fallback: Err(message.to_string()),
            ..Self::answering("")
        }
    }

    pub fn then(self, reply: Result<&str, &str>) -> Self {
        self.replies
            .lock()
            .push_back(reply.map(str::to_string).map_err(str::to_string));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceProvider for ScriptedInference {
    async fn analyze_image(&self, _image: &ImageData, instruction: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instructions.lock().push(instruction.to_string());
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        reply.map_err(|e| anyhow!(e))
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("scripted".to_string())
    }
}

/// Never answers; used to hold a workflow in flight.
#[derive(Default)]
pub struct StalledInference {
    pub calls: AtomicUsize,
}

#[async_trait]
impl InferenceProvider for StalledInference {
    async fn analyze_image(&self, _image: &ImageData, _instruction: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("stalled".to_string())
    }
}

/// Serves the same PNG for any reference except ones starting with `missing`.
pub struct FixedImageStore;

#[async_trait]
impl ImageStore for FixedImageStore {
    async fn store(&self, source: &Path) -> Result<String, ImageError> {
        Ok(format!("mem://{}", source.display()))
    }

    async fn load(&self, reference: &str) -> Result<ImageData, ImageError> {
        if reference.starts_with("missing") {
            return Err(ImageError::InvalidReference(reference.to_string()));
        }
        ImageData::from_bytes(png_bytes())
    }
}

/// An in-memory database whose operations can be made to fail.
pub struct FlakyStore {
    pub db: Database,
    pub failing_creates: AtomicU32,
    pub fail_list: AtomicBool,
    pub fail_delete: AtomicBool,
    /// When set, `list_recent` signals `list_entered` and never returns.
    pub stall_list: AtomicBool,
    pub list_entered: Notify,
    pub create_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub created: Mutex<Vec<NewAnalysisRecord>>,
}

impl FlakyStore {
    pub async fn new() -> Self {
        Self {
            db: Database::in_memory().await.expect("in-memory database"),
            failing_creates: AtomicU32::new(0),
            fail_list: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            stall_list: AtomicBool::new(false),
            list_entered: Notify::new(),
            create_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisStore for FlakyStore {
    async fn create(&self, record: NewAnalysisRecord) -> Result<String, DatabaseError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(DatabaseError::Connection("write unavailable".to_string()));
        }
        self.created.lock().push(record.clone());
        self.db.create(record).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>, DatabaseError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection("read unavailable".to_string()));
        }
        if self.stall_list.load(Ordering::SeqCst) {
            self.list_entered.notify_one();
            std::future::pending::<()>().await;
        }
        self.db.list_recent(limit).await
    }

    async fn delete(&self, id: &str) -> Result<(), DatabaseError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection("delete unavailable".to_string()));
        }
        self.db.delete(id).await
    }
}

pub fn analyzer_with(
    inference: Arc<dyn InferenceProvider>,
    store: Arc<FlakyStore>,
) -> FoodAnalyzer {
    FoodAnalyzer::new(inference, store, Arc::new(FixedImageStore), test_config())
}

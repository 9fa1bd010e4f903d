//! Scripted inference providers for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use aistylehub_core::ProductId;

use crate::inference::{
    CatalogEntry, GeneratedImage, InferenceError, OutfitRecommender, OverlayGenerator,
    OverlayRequest,
};

/// Recommender returning a fixed answer and counting calls.
pub(crate) struct FakeRecommender {
    ids: Vec<ProductId>,
    fail_with: Option<String>,
    calls: AtomicUsize,
    last_style: Mutex<Option<String>>,
}

impl FakeRecommender {
    pub(crate) fn returning(ids: &[i32]) -> Self {
        Self {
            ids: ids.iter().copied().map(ProductId::new).collect(),
            fail_with: None,
            calls: AtomicUsize::new(0),
            last_style: Mutex::new(None),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_owned()),
            ..Self::returning(&[])
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_style(&self) -> Option<String> {
        self.last_style.lock().expect("lock").clone()
    }
}

#[async_trait]
impl OutfitRecommender for FakeRecommender {
    async fn recommend_product_ids(
        &self,
        style: &str,
        _catalog: &[CatalogEntry<'_>],
        max_items: usize,
    ) -> Result<Vec<ProductId>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_style.lock().expect("lock") = Some(style.to_owned());

        match &self.fail_with {
            Some(message) => Err(InferenceError::InvalidResponse(message.clone())),
            None => Ok(self.ids.iter().copied().take(max_items).collect()),
        }
    }
}

/// Generator returning a fixed image and counting calls.
pub(crate) struct FakeGenerator {
    mime_type: String,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub(crate) fn returning(mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_owned(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning("image/png")
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OverlayGenerator for FakeGenerator {
    async fn generate_overlay(
        &self,
        image: &[u8],
        _request: &OverlayRequest,
    ) -> Result<GeneratedImage, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(InferenceError::Service {
                provider: "Hugging Face",
                message: "Model is loading".to_owned(),
            });
        }

        let mut bytes = b"overlay:".to_vec();
        bytes.extend_from_slice(image);
        Ok(GeneratedImage {
            bytes,
            mime_type: self.mime_type.clone(),
        })
    }
}

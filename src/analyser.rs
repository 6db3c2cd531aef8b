//! The whole pipeline: upload in, description out

use crate::error::AnalysisError;
use crate::inference::InferenceClient;
use crate::normalizer::{self, EncodedImage};
use crate::runtime::ModelRuntime;
use std::sync::Arc;
use tracing::info;

/// The result of analysing one upload
#[derive(Debug, Clone)]
pub struct Analysis {
    pub description: String,

    /// The JPEG that was sent to the model, for display alongside the text
    pub image: EncodedImage,
}

/// Shared by every request handler. Nothing inside changes after start-up
#[derive(Clone)]
pub struct Analyser {
    client: InferenceClient,
}

impl Analyser {
    pub fn new(runtime: Arc<dyn ModelRuntime>, model_id: impl Into<String>) -> Self {
        Self {
            client: InferenceClient::new(runtime, model_id),
        }
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    /// Normalize the upload and ask the model to describe it. Decoding and
    /// re-encoding run on the blocking pool, not the request's worker
    pub async fn analyze(&self, image_bytes: Vec<u8>) -> Result<Analysis, AnalysisError> {
        let upload_len = image_bytes.len();
        let image = off_runtime(move || normalizer::normalize(&image_bytes)).await??;
        info!(
            "normalized {} byte upload to {} base64 chars",
            upload_len,
            image.data().len()
        );

        let description = self.client.describe(&image).await?;
        Ok(Analysis { description, image })
    }
}

/// Run CPU-heavy work on tokio's blocking pool
async fn off_runtime<F, T>(work: F) -> Result<T, AnalysisError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AnalysisError::Internal(format!("image processing task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::InvokeError;
    use async_trait::async_trait;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRuntime {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelRuntime for CountingRuntime {
        async fn invoke_model(&self, _: &str, _: Vec<u8>) -> Result<Vec<u8>, InvokeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(br#"{"content":[{"type":"text","text":"A red square."}]}"#.to_vec())
        }
    }

    fn red_png() -> Vec<u8> {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])))
            .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
            .unwrap();
        png
    }

    #[tokio::test]
    async fn test_analyze_red_square() {
        let runtime = Arc::new(CountingRuntime::default());
        let analyser = Analyser::new(runtime.clone(), "model-x");

        let analysis = analyser.analyze(red_png()).await.unwrap();
        assert_eq!(analysis.description, "A red square.");
        assert!(analysis.image.data_uri().starts_with("data:image/jpeg;base64,/9j/"));
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_upload_never_reaches_model() {
        let runtime = Arc::new(CountingRuntime::default());
        let analyser = Analyser::new(runtime.clone(), "model-x");

        let err = analyser.analyze(vec![]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_normalization_leaves_the_runtime_thread() {
        let runtime_thread = std::thread::current().id();
        let worker_thread = off_runtime(|| std::thread::current().id()).await.unwrap();
        assert_ne!(runtime_thread, worker_thread);

        let runtime = Arc::new(CountingRuntime::default());
        let analyser = Analyser::new(runtime, "model-x");
        let analysis = analyser.analyze(red_png()).await.unwrap();
        assert_eq!(analysis.description, "A red square.");
    }

    #[tokio::test]
    async fn test_panicking_task_is_internal_error() {
        let err = off_runtime(|| -> () { panic!("decoder blew up") })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Internal(_)));
    }
}

//! Test helper utilities: an in-process server with a stub vision model

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;
use tokio::time::sleep;
use uuid::Uuid;

use gallery_enrich::{
    app_state::AppState,
    models::image::AnalysisResult,
    routes,
    services::{
        analysis::{parse_analysis_reply, AnalysisError, ImageAnalyzer},
        validation::UploadRules,
        worker::{EnrichmentWorker, WorkerConfig},
    },
    store::memory::InMemoryMetadataStore,
};

/// Vision model stand-in: replies with canned text keyed by the exact image
/// bytes, and fails upstream for anything it does not know.
#[derive(Default)]
pub struct StubAnalyzer {
    replies: Mutex<HashMap<Vec<u8>, String>>,
    pub calls: Mutex<Vec<Vec<u8>>>,
}

impl StubAnalyzer {
    pub fn reply_to(&self, image: &[u8], text: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(image.to_vec(), text.to_string());
    }
}

#[async_trait]
impl ImageAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        image_bytes: &[u8],
        _mime_type: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.calls.lock().unwrap().push(image_bytes.to_vec());
        let reply = self.replies.lock().unwrap().get(image_bytes).cloned();
        match reply {
            Some(text) => Ok(parse_analysis_reply(&text)),
            None => Err(AnalysisError::Upstream("stub has no reply".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub user: Uuid,
    pub analyzer: Arc<StubAnalyzer>,
    pub worker: EnrichmentWorker,
}

/// Start the real router on an ephemeral port.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(InMemoryMetadataStore::new());
    let analyzer = Arc::new(StubAnalyzer::default());
    let worker = EnrichmentWorker::new(
        store.clone(),
        analyzer.clone(),
        WorkerConfig {
            inter_job_delay: Duration::from_millis(5),
            ..Default::default()
        },
    );
    let rules = UploadRules {
        max_file_size: 1024 * 1024,
        max_files_per_upload: 10,
        allowed_formats: vec!["image/jpeg".to_string(), "image/png".to_string()],
    };
    let state = AppState::new(store, worker.clone(), rules);
    let app = routes::router(state, 16 * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        user: Uuid::new_v4(),
        analyzer,
        worker,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-user-id", self.user.to_string())
            .send()
            .await
            .expect("GET request")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        let response = self.get(path).await;
        assert!(
            response.status().is_success(),
            "GET {} returned {}",
            path,
            response.status()
        );
        response.json().await.expect("JSON body")
    }

    /// Upload files as `images` parts; returns the raw response.
    pub async fn upload(&self, files: &[(&str, &str, Vec<u8>)]) -> reqwest::Response {
        let mut form = multipart::Form::new();
        for (name, mime, bytes) in files {
            form = form.part(
                "images",
                multipart::Part::bytes(bytes.clone())
                    .file_name(name.to_string())
                    .mime_str(mime)
                    .expect("valid mime"),
            );
        }
        self.client
            .post(self.url("/api/upload"))
            .header("x-user-id", self.user.to_string())
            .multipart(form)
            .send()
            .await
            .expect("upload request")
    }

    /// Upload one PNG and return its image id.
    pub async fn upload_png(&self, name: &str, bytes: Vec<u8>) -> i64 {
        let response = self.upload(&[(name, "image/png", bytes)]).await;
        assert!(response.status().is_success(), "upload failed: {}", response.status());
        let body: Value = response.json().await.expect("upload JSON");
        body["results"][0]["image"]["id"]
            .as_i64()
            .expect("stored image id")
    }

    /// Poll an image until its enrichment reaches a terminal status.
    pub async fn wait_for_enrichment(&self, image_id: i64) -> Value {
        for _ in 0..200 {
            let image = self.get_json(&format!("/api/images/{}", image_id)).await;
            match image["metadata"]["ai_processing_status"].as_str() {
                Some("completed") | Some("failed") => return image,
                _ => sleep(Duration::from_millis(10)).await,
            }
        }
        panic!("image {} was not enriched in time", image_id);
    }

    pub async fn wait_idle(&self) {
        while self.worker.status().is_processing {
            sleep(Duration::from_millis(10)).await;
        }
    }
}

//! End-to-end tests against a running server
//!
//! These tests require:
//! 1. The server running (Postgres optional; in-memory metadata works too)
//! 2. A valid GEMINI_API_KEY configured for that server
//!
//! Run with: cargo test --test e2e_test -- --ignored --nocapture
//!
//! Set API_BASE_URL to override default (http://localhost:3000)

mod fixtures;

use std::time::Duration;

use fixtures::solid_png;
use reqwest::multipart;
use serde_json::Value;
use tokio::time::sleep;
use uuid::Uuid;

fn get_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[tokio::test]
#[ignore] // Requires a running server
async fn test_e2e_health_check() {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/health", get_base_url()))
        .send()
        .await
        .expect("Health check failed");

    assert!(
        response.status().is_success(),
        "Health check returned non-success status: {}",
        response.status()
    );
    let body: Value = response.json().await.expect("health JSON");
    assert!(body["queue"]["pending"].is_u64());
    assert!(body["queue"]["isProcessing"].is_boolean());

    println!("✓ Health check passed");
}

#[tokio::test]
#[ignore] // Requires a running server and a live vision model
async fn test_e2e_upload_is_enriched() {
    let base_url = get_base_url();
    let client = reqwest::Client::new();
    let user = Uuid::new_v4().to_string();

    let form = multipart::Form::new().part(
        "images",
        multipart::Part::bytes(solid_png(220, 30, 30))
            .file_name("red.png")
            .mime_str("image/png")
            .expect("valid mime"),
    );
    let body: Value = client
        .post(format!("{}/api/upload", base_url))
        .header("x-user-id", &user)
        .multipart(form)
        .send()
        .await
        .expect("upload request")
        .json()
        .await
        .expect("upload JSON");

    let image_id = body["results"][0]["image"]["id"]
        .as_i64()
        .expect("stored image id");
    println!("  ✓ Uploaded, image_id: {}", image_id);

    // Poll every 500ms for up to two minutes
    for attempt in 0..240 {
        let image: Value = client
            .get(format!("{}/api/images/{}", base_url, image_id))
            .header("x-user-id", &user)
            .send()
            .await
            .expect("status request")
            .json()
            .await
            .expect("image JSON");

        match image["metadata"]["ai_processing_status"].as_str() {
            Some("completed") => {
                let meta = &image["metadata"];
                println!(
                    "  ✓ Enriched: {} / tags {} / colors {}",
                    meta["description"], meta["tags"], meta["colors"]
                );
                assert!(meta["tags"].as_array().unwrap().len() <= 10);
                assert!(meta["colors"].as_array().unwrap().len() <= 3);
                return;
            }
            Some("failed") => panic!("Enrichment failed for image {}", image_id),
            _ => {
                if attempt % 10 == 0 && attempt > 0 {
                    println!("  ... still waiting (attempt {}/240)", attempt);
                }
                sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("Image {} was not enriched within 120 seconds", image_id);
}

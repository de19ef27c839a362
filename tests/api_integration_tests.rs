// API Integration Tests
//
// Purpose: Exercise every endpoint against an in-memory engine and mock services
// Run with: cargo test --features api --test api_integration_tests

#[cfg(feature = "api")]
mod api_tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use debris_reward_rust::services::{
        CertificateMetadata, GeoLocator, RewardLedger, ServiceError, VisionAnalyzer,
    };
    use debris_reward_rust::{
        create_router, AppState, RewardPolicy, SustainabilityEngine, SustainabilityRecord,
    };
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt; // for oneshot

    // =========================================================================
    // Mock services
    // =========================================================================

    struct MockVision {
        reply: Result<String, ()>,
    }

    impl VisionAnalyzer for MockVision {
        fn analyze(&self, _image: &[u8], _prompt: &str) -> Result<String, ServiceError> {
            self.reply.clone().map_err(|_| ServiceError::Malformed {
                service: "vision",
                message: "mock failure".to_string(),
            })
        }
    }

    struct MockGeo {
        code: Option<&'static str>,
    }

    impl GeoLocator for MockGeo {
        fn country_code(&self) -> Result<String, ServiceError> {
            self.code.map(str::to_string).ok_or_else(|| ServiceError::NotConfigured {
                service: "geolocation",
                message: "mock offline".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct MockLedger {
        minted: Mutex<Vec<(String, CertificateMetadata)>>,
        updated: Mutex<Vec<(String, CertificateMetadata)>>,
        transfers: Mutex<Vec<(String, u64, String)>>,
    }

    impl RewardLedger for MockLedger {
        fn mint_certificate(&self, owner: &str, metadata: &CertificateMetadata) -> Result<String, ServiceError> {
            let mut minted = self.minted.lock().unwrap();
            minted.push((owner.to_string(), metadata.clone()));
            Ok(format!("asset-{}", minted.len()))
        }

        fn update_certificate(&self, asset_id: &str, metadata: &CertificateMetadata) -> Result<String, ServiceError> {
            self.updated.lock().unwrap().push((asset_id.to_string(), metadata.clone()));
            Ok("update-sig".to_string())
        }

        fn transfer(&self, recipient: &str, lamports: u64, memo: &str) -> Result<String, ServiceError> {
            self.transfers
                .lock()
                .unwrap()
                .push((recipient.to_string(), lamports, memo.to_string()));
            Ok("transfer-sig".to_string())
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn record(code: &str, co2: f64, gdp: f64, res: f64, pov: Option<f64>, ren: f64) -> SustainabilityRecord {
        SustainabilityRecord {
            country_code: code.to_string(),
            year: 2020,
            co2_damage: Some(co2),
            gdp_per_capita: Some(gdp),
            resource_depletion: Some(res),
            poverty_rate: pov,
            renewable_share: Some(ren),
        }
    }

    fn test_engine() -> SustainabilityEngine {
        let mut gap = record("GAP", 5.0, 26000.0, 1.0, None, 10.0);
        gap.gdp_per_capita = None;

        SustainabilityEngine::from_records(vec![
            record("LOW", 0.0, 51000.0, 0.0, Some(0.0), 100.0),
            record("HIGH", 10.0, 1000.0, 30.0, Some(50.0), 0.0),
            record("MID", 5.0, 26000.0, 15.0, Some(25.0), 50.0),
            gap,
        ])
    }

    const FENCED_REPLY: &str =
        "```json\n{\"items\": [{\"label\": \"net\", \"weight\": 3.0}, {\"label\": \"bottle\", \"weight\": 1.0}], \"total_weight\": 4.0}\n```";

    fn create_test_app_with(
        vision_reply: Result<String, ()>,
        geo: Option<&'static str>,
    ) -> (axum::Router, Arc<MockLedger>) {
        let ledger = Arc::new(MockLedger::default());
        let state = AppState::with_services(
            test_engine(),
            Arc::new(MockVision { reply: vision_reply }),
            Arc::new(MockGeo { code: geo }),
            ledger.clone(),
            RewardPolicy::default(),
            "LOW",
        );
        (create_router(state), ledger)
    }

    fn create_test_app() -> (axum::Router, Arc<MockLedger>) {
        create_test_app_with(Ok(FENCED_REPLY.to_string()), Some("MID"))
    }

    async fn json_response(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&body).expect("Failed to parse JSON")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn detection_body(detections: usize, country: Option<&str>) -> Value {
        serde_json::json!({
            "detections": detections,
            "image_base64": base64::encode(b"\xff\xd8fake-jpeg"),
            "collector_wallet": "CollectorWallet111",
            "country_code": country,
        })
    }

    // =========================================================================
    // Section 1: Health Check
    // =========================================================================

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["countries"], 4);
        assert!(body["timestamp"].is_string());
    }

    // =========================================================================
    // Section 2: Multiplier Lookups
    // =========================================================================

    #[tokio::test]
    async fn test_multiplier_known_country() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get("/api/multiplier/mid")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["country"], "MID");
        assert_eq!(body["known"], true);
        assert_eq!(body["multiplier"].as_f64().unwrap(), 1.75);
        assert!((body["breakdown"]["score"].as_f64().unwrap() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_multiplier_unknown_country_is_neutral() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get("/api/multiplier/ZZZ")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["known"], false);
        assert_eq!(body["multiplier"].as_f64().unwrap(), 1.0);
        assert!(body["breakdown"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_multiplier_missing_indicator_is_unprocessable() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get("/api/multiplier/GAP")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_response(response).await;
        assert!(body["error"].as_str().unwrap().contains("GDP per capita"));
    }

    #[tokio::test]
    async fn test_multiplier_batch() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(post_json(
                "/api/multiplier/batch",
                serde_json::json!({ "countries": ["high", "nope", "GAP", "LOW"] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["rows"], 4);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data[0]["country"], "HIGH");
        assert_eq!(data[0]["multiplier"].as_f64().unwrap(), 3.0);
        assert_eq!(data[1]["multiplier"].as_f64().unwrap(), 1.0);
        assert!(data[2]["error"].is_string());
        assert_eq!(data[3]["multiplier"].as_f64().unwrap(), 0.5);
    }

    // =========================================================================
    // Section 3: Detection Pipeline
    // =========================================================================

    #[tokio::test]
    async fn test_detection_without_debris() {
        let (app, ledger) = create_test_app();
        let response = app
            .oneshot(post_json("/process_detection", detection_body(0, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["status"], "no_debris");
        assert!(ledger.minted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detection_success_uses_geolocation() {
        let (app, ledger) = create_test_app();
        let response = app
            .clone()
            .oneshot(post_json("/process_detection", detection_body(2, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["location"], "MID");
        assert_eq!(body["weight"].as_f64().unwrap(), 4.0);
        assert_eq!(body["multiplier"].as_f64().unwrap(), 1.75);
        // 4 kg × 0.01 SOL/kg × 1.75
        assert!((body["reward_sol"].as_f64().unwrap() - 0.07).abs() < 1e-9);
        assert_eq!(body["nft_address"], "asset-1");
        assert_eq!(body["items"].as_array().unwrap().len(), 2);

        let minted = ledger.minted.lock().unwrap();
        assert_eq!(minted.len(), 1);
        assert_eq!(minted[0].0, "CollectorWallet111");
        let mass = minted[0].1.attributes.iter().find(|a| a.trait_type == "Mass").unwrap();
        assert_eq!(mass.value, "4.00 kg");
        drop(minted);

        // Last scan is now available
        let response = app.oneshot(get("/api/last-scan")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_response(response).await;
        assert_eq!(body["nft_address"], "asset-1");
        assert_eq!(body["collector_wallet"], "CollectorWallet111");
    }

    #[tokio::test]
    async fn test_detection_explicit_country_skips_geolocation() {
        let (app, _) = create_test_app_with(Ok(FENCED_REPLY.to_string()), None);
        let response = app
            .oneshot(post_json("/process_detection", detection_body(1, Some("high"))))
            .await
            .unwrap();

        let body = json_response(response).await;
        assert_eq!(body["location"], "HIGH");
        assert_eq!(body["multiplier"].as_f64().unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_detection_geolocation_failure_uses_default_country() {
        let (app, _) = create_test_app_with(Ok(FENCED_REPLY.to_string()), None);
        let response = app
            .oneshot(post_json("/process_detection", detection_body(1, None)))
            .await
            .unwrap();

        let body = json_response(response).await;
        assert_eq!(body["location"], "LOW");
        assert_eq!(body["multiplier"].as_f64().unwrap(), 0.5);
    }

    #[tokio::test]
    async fn test_detection_zero_weight_mints_nothing() {
        let reply = r#"{"items": [], "total_weight": 0}"#.to_string();
        let (app, ledger) = create_test_app_with(Ok(reply), Some("MID"));
        let response = app
            .oneshot(post_json("/process_detection", detection_body(1, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_response(response).await;
        assert!(body["nft_address"].is_null());
        assert_eq!(body["lamports"], 0);
        assert!(ledger.minted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detection_vision_failure_is_bad_gateway() {
        let (app, _) = create_test_app_with(Err(()), Some("MID"));
        let response = app
            .oneshot(post_json("/process_detection", detection_body(1, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_detection_unparseable_vision_reply_is_bad_gateway() {
        let (app, _) = create_test_app_with(Ok("no idea, sorry".to_string()), Some("MID"));
        let response = app
            .oneshot(post_json("/process_detection", detection_body(1, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_response(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Vision analysis failed"));
    }

    #[tokio::test]
    async fn test_detection_rejects_bad_image() {
        let (app, _) = create_test_app();
        let response = app
            .oneshot(post_json(
                "/process_detection",
                serde_json::json!({
                    "detections": 1,
                    "image_base64": "%%% not base64 %%%",
                    "collector_wallet": "CollectorWallet111",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_last_scan_empty_is_not_found() {
        let (app, _) = create_test_app();
        let response = app.oneshot(get("/api/last-scan")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // =========================================================================
    // Section 4: Recycling Confirmation
    // =========================================================================

    #[tokio::test]
    async fn test_confirm_recycle_pays_with_memo() {
        let (app, ledger) = create_test_app();

        // Mint via a detection so the certificate matches the last scan
        let response = app
            .clone()
            .oneshot(post_json("/process_detection", detection_body(1, None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_json(
                "/confirm_recycle",
                serde_json::json!({
                    "nft_address": "asset-1",
                    "collector_wallet": "CollectorWallet111",
                    "amount": 0.07,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["signature"], "transfer-sig");
        assert_eq!(body["certificate_signature"], "update-sig");

        let updated = ledger.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        let status = updated[0].1.attributes.iter().find(|a| a.trait_type == "Status").unwrap();
        assert_eq!(status.value, "Recycled");
        let mass = updated[0].1.attributes.iter().find(|a| a.trait_type == "Mass").unwrap();
        assert_eq!(mass.value, "4.00 kg");

        let transfers = ledger.transfers.lock().unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].0, "CollectorWallet111");
        assert!(transfers[0].1 >= 69_999_999 && transfers[0].1 <= 70_000_000);
        assert!(transfers[0].2.contains("asset-1"));
        drop(transfers);
        drop(updated);

        // The settled scan is cleared
        let response = app.oneshot(get("/api/last-scan")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_confirm_recycle_rejects_non_positive_amount() {
        let (app, ledger) = create_test_app();
        let response = app
            .oneshot(post_json(
                "/confirm_recycle",
                serde_json::json!({
                    "nft_address": "asset-9",
                    "collector_wallet": "CollectorWallet111",
                    "amount": 0.0,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(ledger.transfers.lock().unwrap().is_empty());
    }
}

//! Full HTTP install scenarios against the assembled router.
//!
//! Each test drives the real middleware stack, pipeline, correlator, and
//! bus in process, with the storage backend stubbed at its port and a
//! spawned task standing in for the device agent. Assertions are made on
//! the wire contract: status code plus `{success, description}` body.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use bytes::Bytes;
    use farm_api::adapters::InMemoryDirectory;
    use farm_api::{
        build_router, AppState, InstallPipeline, SessionHeaders, StorageBackend,
        TransactionCorrelator,
    };
    use farm_api::ports::{StorageError, UploadReply};
    use farm_bus::{BusTransport, Channel, InMemoryBus, WireMessage};
    use farm_types::Device;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const MAX_UPLOAD: u64 = 1024;

    /// Storage stub: accepts uploads and serves a fixed manifest.
    struct FakeStorage {
        manifest: serde_json::Value,
        reject: Option<(u16, String)>,
    }

    impl FakeStorage {
        fn serving(manifest: serde_json::Value) -> Self {
            Self {
                manifest,
                reject: None,
            }
        }

        fn rejecting(status: u16, description: &str) -> Self {
            Self {
                manifest: serde_json::Value::Null,
                reject: Some((status, description.to_string())),
            }
        }
    }

    #[async_trait]
    impl StorageBackend for FakeStorage {
        async fn relay_upload(
            &self,
            _body: Bytes,
            _content_type: Option<&str>,
        ) -> Result<UploadReply, StorageError> {
            if let Some((status, description)) = &self.reject {
                return Ok(UploadReply {
                    success: false,
                    status: *status,
                    description: Some(description.clone()),
                    resources: serde_json::Map::new(),
                });
            }
            let mut resources = serde_json::Map::new();
            resources.insert(
                "file".to_string(),
                serde_json::json!({"href": "/s/apk/stored"}),
            );
            Ok(UploadReply {
                success: true,
                status: 201,
                description: None,
                resources,
            })
        }

        async fn fetch_manifest(
            &self,
            _href: &str,
            _session: &SessionHeaders,
        ) -> Result<serde_json::Value, StorageError> {
            Ok(self.manifest.clone())
        }
    }

    struct Farm {
        bus: Arc<InMemoryBus>,
        router: Router,
    }

    fn farm(storage: FakeStorage, devices: Vec<Device>) -> Farm {
        let bus = Arc::new(InMemoryBus::new());
        let message_router = Arc::new(farm_bus::MessageRouter::new());
        let _pump = bus.spawn_inbound(Arc::clone(&message_router));
        let correlator = Arc::new(TransactionCorrelator::new(
            Arc::clone(&bus) as Arc<dyn BusTransport>,
            message_router,
        ));

        let directory = InMemoryDirectory::new();
        for device in devices {
            directory.upsert(device);
        }

        let pipeline = Arc::new(InstallPipeline::new(
            Arc::new(storage),
            Arc::new(directory),
            correlator,
            Duration::from_millis(200),
        ));
        let router = build_router(AppState {
            pipeline,
            max_upload_size: MAX_UPLOAD,
        });
        Farm { bus, router }
    }

    fn device(serial: &str, owner: &str, group: &str) -> Device {
        Device {
            serial: serial.into(),
            channel: Channel::named(format!("dev.{serial}")),
            owner: Some(owner.into()),
            group: group.into(),
            using: false,
        }
    }

    /// Device agent acknowledging install commands on its channel.
    fn spawn_agent(bus: &Arc<InMemoryBus>, serial: &str, success: bool) {
        let mut sub = bus.open(Channel::named(format!("dev.{serial}")));
        let bus = Arc::clone(bus);
        tokio::spawn(async move {
            while let Some(message) = sub.recv().await {
                if let Some(reply_to) = message.reply_to {
                    let _ = bus
                        .publish(WireMessage::transaction_done(
                            reply_to,
                            success,
                            serde_json::Value::Null,
                        ))
                        .await;
                }
            }
        });
    }

    fn install_request(serial: &str, email: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/devices/{serial}/install"))
            .header("content-length", body.len().to_string())
            .header("content-type", "application/octet-stream")
            .header("x-requester-email", email)
            .header("x-requester-groups", "common")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_install_succeeds_end_to_end() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );
        spawn_agent(&f.bus, "emulator-5554", true);

        let response = f
            .router
            .oneshot(install_request("emulator-5554", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["description"], "APK installed successfully");
    }

    #[tokio::test]
    async fn test_empty_manifest_yields_400() {
        let f = farm(
            FakeStorage::serving(serde_json::json!("")),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );
        spawn_agent(&f.bus, "emulator-5554", true);

        let response = f
            .router
            .oneshot(install_request("emulator-5554", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["description"], "Unable to retrieve manifest");
    }

    #[tokio::test]
    async fn test_install_on_foreign_device_yields_403() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![device("emulator-5554", "bob@example.org", "common")],
        );
        spawn_agent(&f.bus, "emulator-5554", true);

        let response = f
            .router
            .oneshot(install_request("emulator-5554", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["description"],
            "You cannot install on this device. Not owned by you"
        );
    }

    #[tokio::test]
    async fn test_unknown_device_yields_403() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![],
        );

        let response = f
            .router
            .oneshot(install_request("no-such-serial", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unresponsive_device_yields_400() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );
        // No agent spawned: the dispatch times out.

        let response = f
            .router
            .oneshot(install_request("emulator-5554", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["description"], "Device is not responding");
    }

    #[tokio::test]
    async fn test_rejecting_device_yields_400() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );
        spawn_agent(&f.bus, "emulator-5554", false);

        let response = f
            .router
            .oneshot(install_request("emulator-5554", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["description"], "Device is not responding");
    }

    #[tokio::test]
    async fn test_storage_rejection_is_forwarded() {
        let f = farm(
            FakeStorage::rejecting(400, "Not an apk file"),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );

        let response = f
            .router
            .oneshot(install_request("emulator-5554", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["description"], "Not an apk file");
    }

    #[tokio::test]
    async fn test_storage_rejection_with_200_status_yields_500() {
        let f = farm(
            FakeStorage::rejecting(200, "upload failed"),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );

        let response = f
            .router
            .oneshot(install_request("emulator-5554", "alice@example.org", "apk"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["description"], "ServerError");
    }

    #[tokio::test]
    async fn test_oversize_upload_rejected_before_relay() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );

        let response = f
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/devices/emulator-5554/install")
                    .header("content-length", (MAX_UPLOAD + 1).to_string())
                    .header("x-requester-email", "alice@example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["description"], "File is too big");
        // Nothing may have reached the bus.
        assert_eq!(f.bus.messages_published(), 0);
    }

    #[tokio::test]
    async fn test_missing_content_length_rejected() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );

        let response = f
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/devices/emulator-5554/install")
                    .header("x-requester-email", "alice@example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["description"], "Invalid content-length header");
    }

    #[tokio::test]
    async fn test_anonymous_request_rejected() {
        let f = farm(
            FakeStorage::serving(serde_json::json!({"package": "com.example.app"})),
            vec![device("emulator-5554", "alice@example.org", "common")],
        );

        let response = f
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/devices/emulator-5554/install")
                    .header("content-length", "3")
                    .body(Body::from("apk"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

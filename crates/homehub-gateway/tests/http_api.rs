// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end tests against a gateway bound to a local port.

use axum::extract::RawQuery;
use axum::routing::get;
use homehub_gateway::config::{DispatchSettings, GatewayConfig};
use homehub_gateway::{build_router, AppState};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use uuid::Uuid;

const HUB_CODE: &str = "s3cret";

struct Gateway {
    _dir: TempDir,
    base: String,
    client: reqwest::Client,
}

impl Gateway {
    async fn spawn() -> Self {
        let dir = TempDir::new().unwrap();
        let config = GatewayConfig {
            hub_code: HUB_CODE.to_string(),
            database: dir.path().join("hub.db"),
            dispatch: DispatchSettings {
                timeout_ms: 1_000,
                connect_timeout_ms: 300,
                ..Default::default()
            },
            ..Default::default()
        };
        let state = Arc::new(AppState::from_config(&config).unwrap());
        let app = build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            _dir: dir,
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn connect(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/connect"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn register(&self, name: &str, serv: &str, addr: Option<&str>) -> Uuid {
        let mut body = json!({
            "hub-code": HUB_CODE,
            "name": name,
            "serv": serv,
            "algo": "none",
        });
        if let Some(addr) = addr {
            body["addr"] = json!(addr);
        }
        let response = self.connect(body).await;
        assert_eq!(response.status().as_u16(), 200);
        Uuid::parse_str(&response.text().await.unwrap()).unwrap()
    }
}

/// A device answering `/Toggle` with its raw query string.
async fn spawn_device() -> SocketAddr {
    let app = axum::Router::new().route(
        "/Toggle",
        get(|RawQuery(query): RawQuery| async move {
            format!("toggled:{}", query.unwrap_or_default())
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_home_works() {
    let gw = Gateway::spawn().await;
    let response = gw.get("/").await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "Works");
}

#[tokio::test]
async fn test_register_lamp_end_to_end() {
    let gw = Gateway::spawn().await;
    let id = gw.register("Lamp", "service Toggle():bool;", None).await;

    let summary: Value = gw.get(&format!("/device/{}", id)).await.json().await.unwrap();
    assert_eq!(summary["id"], id.to_string());
    assert_eq!(summary["name"], "Lamp");
    assert_eq!(summary["address"], "127.0.0.1:80");

    let services_link = summary["services"].as_str().unwrap().to_string();
    assert_eq!(services_link, format!("/device/{}/services", id));

    let services = gw.get(&services_link).await.text().await.unwrap();
    assert_eq!(
        services,
        r#"[{"name":"Toggle","response":{"isScalar":"true","value":"bool"},"request":[]}]"#
    );
}

#[tokio::test]
async fn test_messages_endpoint() {
    let gw = Gateway::spawn().await;
    let id = gw
        .register(
            "Lamp",
            "message Color { required uint32 r; optional uint32 g; } service Paint(Color);",
            None,
        )
        .await;

    let messages: Value = gw
        .get(&format!("/device/{}/messages", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(
        messages,
        json!([{
            "name": "Color",
            "definitions": [
                {"name": "r", "isOptional": "false", "value": {"isScalar": "true", "value": "uint32"}},
                {"name": "g", "isOptional": "true", "value": {"isScalar": "true", "value": "uint32"}}
            ]
        }])
    );

    let services: Value = gw
        .get(&format!("/device/{}/services", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(services[0]["response"], Value::Null);
    assert_eq!(services[0]["request"][0]["isScalar"], "false");
}

#[tokio::test]
async fn test_bad_hub_code_is_rejected() {
    let gw = Gateway::spawn().await;
    let response = gw
        .connect(json!({
            "hub-code": "wrong",
            "name": "Lamp",
            "serv": "service Toggle():bool;",
            "algo": "none",
        }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let devices: Value = gw.get("/device/").await.json().await.unwrap();
    assert_eq!(devices, json!([]));
}

#[tokio::test]
async fn test_bad_payloads_are_400() {
    let gw = Gateway::spawn().await;

    let response = gw
        .client
        .post(gw.url("/connect"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = gw
        .connect(json!({
            "hub-code": HUB_CODE,
            "name": "Lamp",
            "serv": "service Toggle(int34);",
            "algo": "none",
        }))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], 400);
    assert!(error["error"].as_str().unwrap().contains("int34"));

    let response = gw
        .connect(json!({
            "hub-code": HUB_CODE,
            "name": "Lamp",
            "serv": "service Toggle():bool;",
            "algo": "gzip",
        }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = gw
        .connect(json!({
            "hub-code": HUB_CODE,
            "name": "Lamp",
            "serv": "service Toggle():bool;",
            "algo": "none",
            "addr": "lamp.local",
        }))
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_reconnect_keeps_schema_and_moves_address() {
    let gw = Gateway::spawn().await;
    let id = gw
        .register("Lamp", "service Toggle():bool;", Some("10.0.0.5:8081"))
        .await;

    let response = gw
        .connect(json!({
            "hub-code": HUB_CODE,
            "name": "Renamed",
            "serv": "service Other();",
            "algo": "none",
            "id": id.to_string(),
            "addr": "10.0.0.6",
        }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "Device Reconnected to Hub!");

    let summary: Value = gw.get(&format!("/device/{}", id)).await.json().await.unwrap();
    assert_eq!(summary["address"], "10.0.0.6:80");
    assert_eq!(summary["name"], "Lamp");

    let services: Value = gw
        .get(&format!("/device/{}/services", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(services.as_array().unwrap().len(), 1);
    assert_eq!(services[0]["name"], "Toggle");
}

#[tokio::test]
async fn test_reconnect_unknown_device_is_404() {
    let gw = Gateway::spawn().await;
    let response = gw
        .connect(json!({
            "hub-code": HUB_CODE,
            "name": "Lamp",
            "serv": "",
            "algo": "none",
            "id": Uuid::new_v4().to_string(),
        }))
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_unknown_device_is_no_content() {
    let gw = Gateway::spawn().await;
    let id = Uuid::new_v4();

    for path in [
        format!("/device/{}", id),
        format!("/device/{}/services", id),
        format!("/device/{}/messages", id),
        format!("/device/{}/services/Toggle", id),
    ] {
        let response = gw.get(&path).await;
        assert_eq!(response.status().as_u16(), 204, "{}", path);
    }

    let response = gw
        .client
        .delete(gw.url(&format!("/device/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
}

#[tokio::test]
async fn test_invalid_device_id_is_400() {
    let gw = Gateway::spawn().await;
    let response = gw.get("/device/not-a-uuid").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_list_devices_in_registration_order() {
    let gw = Gateway::spawn().await;
    let first = gw.register("First", "service A();", Some("10.0.0.1")).await;
    let second = gw.register("Second", "service B();", Some("10.0.0.2")).await;

    for path in ["/device", "/device/"] {
        let devices: Value = gw.get(path).await.json().await.unwrap();
        let ids: Vec<&str> = devices
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![first.to_string(), second.to_string()]);
    }
}

#[tokio::test]
async fn test_service_call_is_forwarded() {
    let gw = Gateway::spawn().await;
    let device = spawn_device().await;
    let id = gw
        .register("Lamp", "service Toggle():bool;", Some(&device.to_string()))
        .await;

    let response = gw
        .get(&format!("/device/{}/services/Toggle?state=on&level=3", id))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "toggled:state=on&level=3");
}

#[tokio::test]
async fn test_service_call_to_unreachable_device_is_503() {
    let gw = Gateway::spawn().await;
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let id = gw
        .register("Lamp", "service Toggle():bool;", Some(&closed.to_string()))
        .await;

    let response = gw.get(&format!("/device/{}/services/Toggle", id)).await;
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn test_delete_device() {
    let gw = Gateway::spawn().await;
    let id = gw.register("Lamp", "service Toggle():bool;", None).await;

    let response = gw
        .client
        .delete(gw.url(&format!("/device/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "Device removed");

    let response = gw.get(&format!("/device/{}", id)).await;
    assert_eq!(response.status().as_u16(), 204);
}

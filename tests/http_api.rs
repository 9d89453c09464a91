use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use ulid::Ulid;

use nextsus::engine::{Engine, Policy};
use nextsus::http;
use nextsus::notify::NotifyHub;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = std::env::temp_dir().join(format!("nextsus_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let engine = Arc::new(
        Engine::new(dir.join("nextsus.wal"), Arc::new(NotifyHub::new()), Policy::default()).unwrap(),
    );
    let app = http::router(engine, Duration::from_secs(10));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

struct Api {
    client: Client,
    base: String,
}

impl Api {
    async fn start() -> Self {
        let addr = start_test_server().await;
        Self {
            client: Client::new(),
            base: format!("http://{addr}"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn as_user(&self, builder: RequestBuilder, user: &str) -> RequestBuilder {
        builder.header("x-user-id", user)
    }

    fn as_admin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("x-user-id", "admin-1").header("x-user-role", "admin")
    }

    async fn create_room(&self, name: &str) -> String {
        let resp = self
            .as_admin(self.client.post(self.url("/api/rooms")))
            .json(&json!({
                "name": name,
                "building": "Science Hall",
                "floor": 2,
                "capacity": 8,
                "type": "study-niche",
                "amenities": ["projector"]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let room: Value = resp.json().await.unwrap();
        room["id"].as_str().unwrap().to_string()
    }

    async fn book(&self, user: &str, room_id: &str, start: &str, end: &str) -> reqwest::Response {
        self.as_user(self.client.post(self.url("/api/bookings")), user)
            .json(&json!({
                "roomId": room_id,
                "date": "2030-03-14",
                "startTime": start,
                "endTime": end,
                "purpose": "Group study",
                "attendees": 3
            }))
            .send()
            .await
            .unwrap()
    }
}

async fn message(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["message"].as_str().unwrap_or_default().to_string()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let api = Api::start().await;
    let resp = api.client.get(api.url("/api/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn reservation_routes_require_identity() {
    let api = Api::start().await;
    let resp = api.client.get(api.url("/api/bookings")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(resp).await, "authentication required");

    let resp = api
        .client
        .get(api.url("/api/bookings"))
        .header("x-user-id", "s-1")
        .header("x-user-role", "superuser")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_admins_manage_rooms() {
    let api = Api::start().await;
    let resp = api
        .as_user(api.client.post(api.url("/api/rooms")), "s-1")
        .json(&json!({
            "name": "Niche",
            "building": "Library",
            "floor": 1,
            "capacity": 4,
            "type": "study-niche"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let id = api.create_room("Niche 1").await;
    let resp = api.client.get(api.url(&format!("/api/rooms/{id}"))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let room: Value = resp.json().await.unwrap();
    assert_eq!(room["name"], "Niche 1");
    assert_eq!(room["status"], "available");

    let rooms: Value = api
        .client
        .get(api.url("/api/rooms?type=study-niche"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn double_booking_is_rejected() {
    let api = Api::start().await;
    let room = api.create_room("Niche 2").await;

    let resp = api.book("alice", &room, "09:00", "10:00").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let booking: Value = resp.json().await.unwrap();
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["domain"], "room");
    assert_eq!(booking["startTime"], "09:00");

    let resp = api.book("bob", &room, "09:30", "10:30").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(message(resp).await.contains("already booked"));

    let resp = api.book("bob", &room, "10:00", "11:00").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let avail: Value = api
        .client
        .get(api.url(&format!("/api/rooms/{room}/availability?date=2030-03-14")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let free = avail["free"].as_array().unwrap();
    assert_eq!(free.len(), 2);
    assert_eq!(free[0]["startTime"], "07:00");
    assert_eq!(free[0]["endTime"], "09:00");
    assert_eq!(free[1]["startTime"], "11:00");
}

#[tokio::test]
async fn owner_edits_booking_details() {
    let api = Api::start().await;
    let room = api.create_room("Niche 5").await;
    let booking: Value = api.book("alice", &room, "09:00", "10:00").await.json().await.unwrap();
    let id = booking["id"].as_str().unwrap();
    let put = |body: Value, user: &str| {
        api.as_user(api.client.put(api.url(&format!("/api/bookings/{id}"))), user)
            .json(&body)
            .send()
    };

    let resp = put(json!({ "purpose": "Defense rehearsal", "attendees": 8 }), "alice")
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let edited: Value = resp.json().await.unwrap();
    assert_eq!(edited["purpose"], "Defense rehearsal");
    assert_eq!(edited["attendees"], 8);
    assert_eq!(edited["startTime"], "09:00");

    let resp = put(json!({ "attendees": 9 }), "alice").await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = put(json!({ "date": "2030-03-14", "startTime": "13:00" }), "alice")
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = put(json!({ "purpose": "Hijack" }), "bob").await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let api = Api::start().await;
    let room = api.create_room("Niche 3").await;

    let resp = api.book("alice", &room, "10:00", "09:00").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = api.book("alice", &room, "9am", "10:00").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = api.book("alice", "not-an-id", "09:00", "10:00").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = api
        .as_user(api.client.post(api.url("/api/bookings")), "alice")
        .header("content-type", "application/json")
        .body("{")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = api
        .client
        .get(api.url(&format!("/api/rooms/{}", Ulid::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_is_owner_only() {
    let api = Api::start().await;
    let room = api.create_room("Niche 4").await;
    let booking: Value = api.book("alice", &room, "13:00", "14:00").await.json().await.unwrap();
    let id = booking["id"].as_str().unwrap();

    let resp = api
        .as_user(api.client.delete(api.url(&format!("/api/bookings/{id}"))), "mallory")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = api
        .as_user(api.client.delete(api.url(&format!("/api/bookings/{id}"))), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");

    // Terminal.
    let resp = api
        .as_user(api.client.delete(api.url(&format!("/api/bookings/{id}"))), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(message(resp).await.contains("cannot cancel"));
}

#[tokio::test]
async fn canteen_order_flow() {
    let api = Api::start().await;
    let resp = api
        .as_user(api.client.post(api.url("/api/canteen/orders")), "s-1")
        .json(&json!({
            "items": [
                { "mealName": "Adobo", "quantity": 2, "price": 85.5 },
                { "mealName": "Rice", "quantity": 1, "price": 15 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["totalAmount"], 186.0);
    assert_eq!(order["status"], "pending");
    let id = order["id"].as_str().unwrap();

    let resp = api
        .as_user(api.client.patch(api.url(&format!("/api/reservations/{id}/transition"))), "s-1")
        .json(&json!({ "action": "prepare" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = api
        .as_admin(api.client.patch(api.url(&format!("/api/reservations/{id}/transition"))))
        .json(&json!({ "action": "prepare" }))
        .send()
        .await
        .unwrap();
    let prepared: Value = resp.json().await.unwrap();
    assert_eq!(prepared["status"], "preparing");

    // A canteen order is not a library loan.
    let resp = api
        .as_user(api.client.patch(api.url(&format!("/api/library/borrows/{id}/return"))), "s-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = api
        .as_user(api.client.patch(api.url(&format!("/api/canteen/orders/{id}/cancel"))), "s-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn parking_occupy_and_release() {
    let api = Api::start().await;
    let spot: Value = api
        .as_admin(api.client.post(api.url("/api/parking")))
        .json(&json!({ "spotNumber": "A-1", "zone": "North" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = spot["id"].as_str().unwrap();
    assert_eq!(spot["type"], "car");

    let resp = api
        .as_user(api.client.post(api.url(&format!("/api/parking/{id}/occupy"))), "alice")
        .send()
        .await
        .unwrap();
    let taken: Value = resp.json().await.unwrap();
    assert_eq!(taken["status"], "occupied");
    assert_eq!(taken["occupiedBy"], "alice");

    let resp = api
        .as_user(api.client.post(api.url(&format!("/api/parking/{id}/occupy"))), "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let stats: Value = api
        .client
        .get(api.url("/api/parking/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["occupied"], 1);

    let resp = api
        .as_user(api.client.post(api.url(&format!("/api/parking/{id}/release"))), "alice")
        .send()
        .await
        .unwrap();
    let freed: Value = resp.json().await.unwrap();
    assert_eq!(freed["status"], "available");
    assert!(freed["occupiedBy"].is_null());
}

#[tokio::test]
async fn library_borrow_and_return() {
    let api = Api::start().await;
    let due = chrono::Utc::now() + chrono::Duration::days(14);
    let resp = api
        .as_user(api.client.post(api.url("/api/library/borrows")), "s-1")
        .json(&json!({ "bookTitle": "Dune", "dueDate": due }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let loan: Value = resp.json().await.unwrap();
    assert_eq!(loan["status"], "borrowed");
    let id = loan["id"].as_str().unwrap();

    let resp = api
        .as_user(api.client.patch(api.url(&format!("/api/library/borrows/{id}/return"))), "s-1")
        .send()
        .await
        .unwrap();
    let returned: Value = resp.json().await.unwrap();
    assert_eq!(returned["status"], "returned");
    assert_eq!(returned["fine"], 0.0);
}

#[tokio::test]
async fn schedule_spans_services() {
    let api = Api::start().await;
    let room = api.create_room("Niche 5").await;
    api.book("s-1", &room, "15:00", "16:00").await;

    let resp = api
        .as_user(api.client.post(api.url("/api/faculty/consults")), "s-1")
        .json(&json!({
            "facultyName": "Dr. Reyes",
            "date": "2030-03-14",
            "startTime": "08:00",
            "purpose": "Advising"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let consult: Value = resp.json().await.unwrap();
    assert_eq!(consult["status"], "pending");
    assert_eq!(consult["endTime"], "08:30");

    let resp = api
        .as_user(api.client.post(api.url("/api/health/appointments")), "s-1")
        .json(&json!({ "serviceType": "dental", "date": "2030-03-14", "time": "11:00" }))
        .send()
        .await
        .unwrap();
    let appt: Value = resp.json().await.unwrap();
    assert_eq!(appt["queueNumber"], 1);

    let schedule: Value = api
        .as_user(api.client.get(api.url("/api/schedule")), "s-1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let domains: Vec<_> = schedule
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["domain"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(domains, vec!["faculty", "health", "room"]);

    let others: Value = api
        .as_user(api.client.get(api.url("/api/schedule")), "s-2")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(others.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn parking_feed_streams_changes() {
    let api = Api::start().await;
    let spot: Value = api
        .as_admin(api.client.post(api.url("/api/parking")))
        .json(&json!({ "spotNumber": "F-1", "zone": "East" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = spot["id"].as_str().unwrap().to_string();

    let mut feed = api.client.get(api.url("/api/parking/events")).send().await.unwrap();
    assert_eq!(feed.status(), StatusCode::OK);
    // Response headers arrive once the handler has subscribed.
    api.as_user(api.client.post(api.url(&format!("/api/parking/{id}/occupy"))), "alice")
        .send()
        .await
        .unwrap();

    let mut seen = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !seen.contains("spot-updated") {
        let chunk = tokio::time::timeout_at(deadline, feed.chunk())
            .await
            .expect("no feed event within 5s")
            .unwrap()
            .expect("feed closed");
        seen.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(seen.contains("event: spot-updated"));
    assert!(seen.contains("\"occupiedBy\":\"alice\""));
}

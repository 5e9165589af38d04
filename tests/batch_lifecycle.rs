// tests/batch_lifecycle.rs
//
// Cadeia de custódia de ponta a ponta: registro, convites e as quatro
// etapas seguintes, sempre pela API HTTP.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::Value;

use common::{png, test_app, TestApp};

fn stamp(batch: &Value, field: &str) -> DateTime<Utc> {
    let raw = batch[field]
        .as_str()
        .unwrap_or_else(|| panic!("{field} should be set: {batch}"));
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

struct Registered {
    asm: String,
    batch_id: i64,
}

async fn registered_batch(app: &TestApp) -> Registered {
    let asm = app.user("kwame", "asm").await;
    let mine = app.create_mine(&asm, "Obuasi North Pit").await;
    let res = app.register_batch(&asm, mine).await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    Registered {
        asm,
        batch_id: res.body["id"].as_i64().unwrap(),
    }
}

/// Lote já recebido pelo dealer `ama`; devolve o token do dealer.
async fn received_by_dealer(app: &TestApp, batch: &Registered) -> String {
    let dealer = app.user("ama", "dealer").await;
    let invite = app.invite_dealer(&batch.asm, batch.batch_id, "ama").await;
    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();
    app.decide(&dealer, "dealer-invitations", invitation, "accept").await;

    let res = app.dealer_receive(&dealer, batch.batch_id).await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    dealer
}

#[tokio::test]
async fn registration_numbers_batches_per_registrant() {
    let app = test_app();
    let kwame = app.user("kwame", "asm").await;
    let esi = app.user("esi", "asm").await;
    let kwame_mine = app.create_mine(&kwame, "Obuasi North Pit").await;
    let esi_mine = app.create_mine(&esi, "Prestea Ridge").await;

    let first = app.register_batch(&kwame, kwame_mine).await;
    assert_eq!(first.status, StatusCode::OK, "{:?}", first.body);
    assert_eq!(first.body["batch_id"], "BATCH-1");
    assert_eq!(first.body["weight_kg"], 12.5);
    assert_eq!(first.body["date_collected"], "2024-01-01");
    assert!(first.body["created_at"].is_string());
    assert!(first.body["dealer_received_at"].is_null());
    assert!(first.body["origin_cert_image_url"].as_str().unwrap().starts_with("memory://"));

    let second = app.register_batch(&kwame, kwame_mine).await;
    assert_eq!(second.body["batch_id"], "BATCH-2");

    let other = app.register_batch(&esi, esi_mine).await;
    assert_eq!(other.body["batch_id"], "BATCH-1");

    assert_eq!(app.objects.object_count(), 3);
    assert_eq!(app.get("/batches", &kwame).await.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn registration_requires_the_certificate_and_an_owned_mine() {
    let app = test_app();
    let kwame = app.user("kwame", "asm").await;
    let esi = app.user("esi", "asm").await;
    let esi_mine = app.create_mine(&esi, "Prestea Ridge").await;
    let kwame_mine = app.create_mine(&kwame, "Obuasi North Pit").await;

    let mine_id = kwame_mine.to_string();
    let no_file = app
        .multipart(
            Method::POST,
            "/batches",
            &kwame,
            &[
                ("mine_id", mine_id.as_str()),
                ("date_collected", "2024-01-01"),
                ("weight_kg", "12.5"),
            ],
            &[],
        )
        .await;
    assert_eq!(no_file.status, StatusCode::BAD_REQUEST);

    let bad_weight = app
        .multipart(
            Method::POST,
            "/batches",
            &kwame,
            &[
                ("mine_id", mine_id.as_str()),
                ("date_collected", "2024-01-01"),
                ("weight_kg", "-1"),
            ],
            &[png("origin_cert")],
        )
        .await;
    assert_eq!(bad_weight.status, StatusCode::BAD_REQUEST);
    assert!(bad_weight.body["details"]["weight_kg"].is_array());

    let foreign = app.register_batch(&kwame, esi_mine).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let missing = app.register_batch(&kwame, 9999).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    assert!(app.get("/batches", &kwame).await.body.as_array().unwrap().is_empty());
    assert_eq!(app.objects.object_count(), 0);

    // O contador só avança quando o lote é de fato criado
    let created = app.register_batch(&kwame, kwame_mine).await;
    assert_eq!(created.body["batch_id"], "BATCH-1");
}

#[tokio::test]
async fn transport_before_dealer_receipt_belongs_to_the_registrant() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let dealer = app.user("ama", "dealer").await;
    let uri = format!("/batches/{}", batch.batch_id);

    let before = app.get(&uri, &batch.asm).await.body;

    let denied = app.transport(&dealer, batch.batch_id).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["error"], "forbidden");

    // A escrita negada não deixa rastro
    assert_eq!(app.get(&uri, &batch.asm).await.body, before);

    let shipped = app.transport(&batch.asm, batch.batch_id).await;
    assert_eq!(shipped.status, StatusCode::OK, "{:?}", shipped.body);
    assert!(shipped.body["transport_shipped_at"].is_string());
    assert_eq!(shipped.body["transport_leg"], "miner");
    assert_eq!(shipped.body["transport_courier"], "DHL");
}

#[tokio::test]
async fn concurrent_dealer_invitations_admit_exactly_one() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    app.user("ama", "dealer").await;
    app.user("kofi", "dealer").await;

    let (a, b) = tokio::join!(
        app.invite_dealer(&batch.asm, batch.batch_id, "ama"),
        app.invite_dealer(&batch.asm, batch.batch_id, "kofi"),
    );

    let mut statuses = vec![a.status, b.status];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn full_chain_of_custody() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let id = batch.batch_id;

    // Dealer
    let dealer = app.user("ama", "dealer").await;
    let invite = app.invite_dealer(&batch.asm, id, "ama").await;
    assert_eq!(invite.status, StatusCode::OK, "{:?}", invite.body);
    assert_eq!(invite.body["message"], "Dealer invited.");
    assert_eq!(invite.body["invitation"]["dealer_username"], "ama");
    assert!(invite.body["invitation"]["accepted"].is_null());

    let pending = app.get("/dealer-invitations", &dealer).await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body[0]["batch_label"], "BATCH-1");
    assert_eq!(pending.body[0]["inviter_username"], "kwame");
    assert_eq!(pending.body[0]["mine_name"], "Obuasi North Pit");

    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();
    let accepted = app.decide(&dealer, "dealer-invitations", invitation, "accept").await;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(accepted.body["accepted"], true);

    assert!(app.get("/dealer-invitations", &dealer).await.body.as_array().unwrap().is_empty());
    assert_eq!(
        app.get("/dealer-invitations/history", &dealer).await.body.as_array().unwrap().len(),
        1
    );
    assert_eq!(app.get("/batches", &dealer).await.body[0]["id"], id);

    let owner = app.get(&format!("/dealer-for-batch/{id}"), &batch.asm).await;
    assert_eq!(owner.body["dealer_username"], "ama");

    let received = app.dealer_receive(&dealer, id).await;
    assert_eq!(received.status, StatusCode::OK, "{:?}", received.body);
    assert_eq!(received.body["dealer_location"], "Kumasi");
    assert!(received.body["dealer_license_image_url"].is_string());

    let shipped = app.transport(&dealer, id).await;
    assert_eq!(shipped.status, StatusCode::OK, "{:?}", shipped.body);
    assert_eq!(shipped.body["transport_leg"], "dealer");

    // Autoridade
    let goldbod = app.user("gb-officer", "goldbod").await;
    let invite = app.invite_goldbod(&dealer, id, "gb-officer").await;
    assert_eq!(invite.status, StatusCode::OK, "{:?}", invite.body);
    assert_eq!(invite.body["message"], "Goldbod invited.");

    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();
    let accepted = app.decide(&goldbod, "goldbod-invitations", invitation, "accept").await;
    assert_eq!(accepted.status, StatusCode::OK);

    let intake = app.goldbod_intake(&goldbod, id).await;
    assert_eq!(intake.status, StatusCode::OK, "{:?}", intake.body);
    assert_eq!(intake.body["goldbod_intake_weight"], 12.3);

    let assayed = app.assay(&goldbod, id).await;
    assert_eq!(assayed.status, StatusCode::OK, "{:?}", assayed.body);
    assert_eq!(assayed.body["purity_percent"], 91.6);

    let done = app.get(&format!("/batches/{id}"), &batch.asm).await.body;
    let stamps = [
        stamp(&done, "created_at"),
        stamp(&done, "dealer_received_at"),
        stamp(&done, "transport_shipped_at"),
        stamp(&done, "goldbod_intake_at"),
        stamp(&done, "assay_completed_at"),
    ];
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]), "{stamps:?}");

    // Etapa concluída não é regravada
    let again = app.assay(&goldbod, id).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    let late_transport = app.transport(&dealer, id).await;
    assert_eq!(late_transport.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn stages_cannot_be_skipped() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let goldbod = app.user("gb-officer", "goldbod").await;

    // O minerador pode convidar a autoridade antes do dealer
    let invite = app.invite_goldbod(&batch.asm, batch.batch_id, "gb-officer").await;
    assert_eq!(invite.status, StatusCode::OK, "{:?}", invite.body);
    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();
    app.decide(&goldbod, "goldbod-invitations", invitation, "accept").await;

    let intake = app.goldbod_intake(&goldbod, batch.batch_id).await;
    assert_eq!(intake.status, StatusCode::CONFLICT);

    let assay = app.assay(&goldbod, batch.batch_id).await;
    assert_eq!(assay.status, StatusCode::CONFLICT);

    let res = app.get(&format!("/batches/{}", batch.batch_id), &goldbod).await;
    assert!(res.body["goldbod_intake_at"].is_null());
    assert!(res.body["assay_completed_at"].is_null());
}

#[tokio::test]
async fn dealer_needs_an_accepted_invitation_to_receive() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let dealer = app.user("ama", "dealer").await;

    let uninvited = app.dealer_receive(&dealer, batch.batch_id).await;
    assert_eq!(uninvited.status, StatusCode::FORBIDDEN);

    let invite = app.invite_dealer(&batch.asm, batch.batch_id, "ama").await;
    let pending = app.dealer_receive(&dealer, batch.batch_id).await;
    assert_eq!(pending.status, StatusCode::FORBIDDEN);

    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();
    let rejected = app.decide(&dealer, "dealer-invitations", invitation, "reject").await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["accepted"], false);

    // Recusado perde até a leitura
    let res = app.get(&format!("/batches/{}", batch.batch_id), &dealer).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let decided_again = app.decide(&dealer, "dealer-invitations", invitation, "accept").await;
    assert_eq!(decided_again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn storage_outage_leaves_the_batch_untouched() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let dealer = app.user("ama", "dealer").await;
    let invite = app.invite_dealer(&batch.asm, batch.batch_id, "ama").await;
    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();
    app.decide(&dealer, "dealer-invitations", invitation, "accept").await;

    let uri = format!("/batches/{}", batch.batch_id);
    let before = app.get(&uri, &batch.asm).await.body;

    app.objects.set_unavailable(true);
    let res = app.dealer_receive(&dealer, batch.batch_id).await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    assert_eq!(res.body["error"], "storage_error");

    let after = app.get(&uri, &batch.asm).await.body;
    assert_eq!(after, before);
    assert!(after["dealer_received_at"].is_null());

    // Com o storage de volta a mesma chamada passa
    app.objects.set_unavailable(false);
    let retried = app.dealer_receive(&dealer, batch.batch_id).await;
    assert_eq!(retried.status, StatusCode::OK);
}

#[tokio::test]
async fn assay_requires_a_pdf_report() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let dealer = received_by_dealer(&app, &batch).await;
    app.transport(&dealer, batch.batch_id).await;

    let goldbod = app.user("gb-officer", "goldbod").await;
    let invite = app.invite_goldbod(&dealer, batch.batch_id, "gb-officer").await;
    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();
    app.decide(&goldbod, "goldbod-invitations", invitation, "accept").await;
    app.goldbod_intake(&goldbod, batch.batch_id).await;

    let uri = format!("/batches/{}/assay", batch.batch_id);
    let no_report = app
        .multipart(Method::PATCH, &uri, &goldbod, &[("purity_percent", "91.6")], &[])
        .await;
    assert_eq!(no_report.status, StatusCode::BAD_REQUEST);

    let image = app
        .multipart(
            Method::PATCH,
            &uri,
            &goldbod,
            &[("purity_percent", "91.6")],
            &[png("assay_report")],
        )
        .await;
    assert_eq!(image.status, StatusCode::BAD_REQUEST);

    let out_of_range = app
        .multipart(
            Method::PATCH,
            &uri,
            &goldbod,
            &[("purity_percent", "120")],
            &[common::pdf("assay_report")],
        )
        .await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_pending_invitations_can_be_deleted() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let dealer = app.user("ama", "dealer").await;
    let invite = app.invite_dealer(&batch.asm, batch.batch_id, "ama").await;
    let invitation = invite.body["invitation"]["id"].as_i64().unwrap();

    app.decide(&dealer, "dealer-invitations", invitation, "accept").await;
    let res = app
        .json(
            Method::DELETE,
            &format!("/dealer-invitations/{invitation}"),
            Some(dealer.as_str()),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    // Um convite pendente some e libera o lote para outro dealer
    let other = registered_batch_for(&app, &batch.asm).await;
    let invite = app.invite_dealer(&batch.asm, other, "ama").await;
    let pending = invite.body["invitation"]["id"].as_i64().unwrap();
    let deleted = app
        .json(
            Method::DELETE,
            &format!("/dealer-invitations/{pending}"),
            Some(dealer.as_str()),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["success"], true);

    let reinvite = app.invite_dealer(&batch.asm, other, "ama").await;
    assert_eq!(reinvite.status, StatusCode::OK);
}

async fn registered_batch_for(app: &TestApp, asm: &str) -> i64 {
    let mine = app.create_mine(asm, "Second Pit").await;
    let res = app.register_batch(asm, mine).await;
    res.body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn miner_loses_the_goldbod_invite_once_the_dealer_receives() {
    let app = test_app();
    let batch = registered_batch(&app).await;
    let dealer = received_by_dealer(&app, &batch).await;
    let goldbod = app.user("gb-officer", "goldbod").await;

    let denied = app.invite_goldbod(&batch.asm, batch.batch_id, "gb-officer").await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["error"], "forbidden");

    // Nenhum convite foi criado
    assert!(app.get("/goldbod-invitations", &goldbod).await.body.as_array().unwrap().is_empty());
    assert!(app.get("/goldbod-invitations/history", &goldbod).await.body.as_array().unwrap().is_empty());

    // A partir daqui quem convida a autoridade é o dealer
    let invited = app.invite_goldbod(&dealer, batch.batch_id, "gb-officer").await;
    assert_eq!(invited.status, StatusCode::OK, "{:?}", invited.body);
    assert_eq!(app.get("/goldbod-invitations", &goldbod).await.body.as_array().unwrap().len(), 1);
}

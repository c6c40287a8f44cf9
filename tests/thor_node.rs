// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end tests of the HTTP chain client and delegation service client
//! against mock servers bound to ephemeral ports.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use vechain_nodes::blockchain::client::LOG_PAGE_SIZE;
use vechain_nodes::blockchain::{
    ChainApi, Clause, RemoteDelegator, Revision, SigningKey, ThorClient, ThorError,
    TransferCriteria, TransferFilter, TxBuilder, TxOptions, VECHAIN_SOLO,
};

const BEST_NUMBER: u64 = 1234;
const SENDER_KEY: &str = "0x7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a";

/// More transfers than one log page holds.
const TRANSFER_COUNT: u64 = 300;

#[derive(Clone, Default)]
struct MockNode {
    submitted: Arc<Mutex<Vec<String>>>,
    log_pages: Arc<Mutex<Vec<(u64, u64)>>>,
}

fn hash(byte: u8) -> String {
    format!("0x{}", format!("{byte:02x}").repeat(32))
}

fn best_block() -> Value {
    json!({
        "number": BEST_NUMBER,
        "id": format!("0x000004d2{}", "ab".repeat(28)),
        "size": 360,
        "parentID": hash(0xaa),
        "timestamp": 1_700_000_000u64,
        "gasLimit": 40_000_000u64,
        "beneficiary": "0x0000000000000000000000000000000000000000",
        "gasUsed": 0,
        "totalScore": 1234,
        "signer": "0x0000000000000000000000000000000000000000",
        "isTrunk": true,
        "isFinalized": false,
        "transactions": []
    })
}

async fn block(Path(revision): Path<String>) -> impl IntoResponse {
    if revision == "best" {
        (StatusCode::OK, Json(best_block())).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn transaction(Path(_id): Path<String>) -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn submit(State(node): State<MockNode>, Json(body): Json<Value>) -> Json<Value> {
    let raw = body["raw"].as_str().unwrap_or_default().to_string();
    node.submitted.lock().unwrap().push(raw);
    Json(json!({ "id": hash(0x42) }))
}

/// Serves `TRANSFER_COUNT` transfers, honouring `options` and defaulting to a
/// limit of 100 when none is given.
async fn transfer_logs(State(node): State<MockNode>, Json(filter): Json<Value>) -> Json<Value> {
    let offset = filter["options"]["offset"].as_u64().unwrap_or(0);
    let limit = filter["options"]["limit"].as_u64().unwrap_or(100);
    node.log_pages.lock().unwrap().push((offset, limit));

    let end = (offset + limit).min(TRANSFER_COUNT);
    let logs: Vec<Value> = (offset.min(end)..end)
        .map(|i| {
            json!({
                "sender": "0x00000000000000000000000000000000000000aa",
                "recipient": "0x00000000000000000000000000000000000000bb",
                "amount": format!("{:#x}", i + 1),
                "meta": {
                    "blockID": hash(0xbb),
                    "blockNumber": BEST_NUMBER,
                    "blockTimestamp": 1_700_000_000u64,
                    "txID": hash(0x10),
                    "txOrigin": "0x00000000000000000000000000000000000000aa",
                    "clauseIndex": 0
                }
            })
        })
        .collect();
    Json(Value::Array(logs))
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn mock_node() -> (MockNode, ThorClient) {
    let node = MockNode::default();
    let app = Router::new()
        .route("/blocks/{revision}", get(block))
        .route("/transactions/{id}", get(transaction))
        .route("/transactions/{id}/receipt", get(transaction))
        .route("/transactions", post(submit))
        .route("/logs/transfer", post(transfer_logs))
        .with_state(node.clone());
    let addr = spawn(app).await;
    let client = ThorClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    (node, client)
}

fn transfer() -> Vec<Clause> {
    let to: Address = "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed".parse().unwrap();
    vec![Clause::transfer(to, U256::from(1_000u64))]
}

#[tokio::test]
async fn reads_best_block_and_treats_404_as_absent() {
    let (_, client) = mock_node().await;

    let best = client.best_block().await.unwrap();
    assert_eq!(best.number, BEST_NUMBER);
    assert!(best.is_trunk);

    assert!(client.get_block(Revision::Number(5)).await.unwrap().is_none());
    assert!(client.get_transaction(B256::repeat_byte(0xcd)).await.unwrap().is_none());
    assert!(client
        .get_transaction_receipt(B256::repeat_byte(0xcd))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn signs_and_submits_with_explicit_gas() {
    let (node, client) = mock_node().await;
    let builder = TxBuilder::new(Arc::new(client), VECHAIN_SOLO);
    let sender = SigningKey::from_hex(SENDER_KEY).unwrap();
    let options = TxOptions {
        gas: Some(21_000),
        ..Default::default()
    };

    let submitted = builder.send(transfer(), &options, &sender, None).await.unwrap();

    assert_eq!(submitted.id, B256::repeat_byte(0x42));
    let raws = node.submitted.lock().unwrap().clone();
    assert_eq!(raws, vec![submitted.raw.clone()]);
    assert!(submitted.raw.starts_with("0x"));
    assert!(!submitted.raw.contains(&SENDER_KEY[2..]));
}

#[tokio::test]
async fn unreachable_node_is_chain_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ThorClient::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let err = client.best_block().await.unwrap_err();
    assert!(matches!(err, ThorError::ChainUnavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn refused_sponsorship_never_reaches_the_node() {
    let (node, client) = mock_node().await;
    let sponsor = Router::new().route(
        "/delegate",
        post(|| async { Json(json!({ "error": "sponsor quota exhausted" })) }),
    );
    let sponsor_addr = spawn(sponsor).await;
    let delegator =
        RemoteDelegator::new(&format!("http://{sponsor_addr}"), Duration::from_secs(5), None)
            .unwrap();

    let builder = TxBuilder::new(Arc::new(client), VECHAIN_SOLO);
    let sender = SigningKey::from_hex(SENDER_KEY).unwrap();
    let options = TxOptions {
        gas: Some(21_000),
        delegate: true,
        ..Default::default()
    };

    let err = builder
        .send(transfer(), &options, &sender, Some(&delegator))
        .await
        .unwrap_err();

    assert!(matches!(err, ThorError::DelegationFailed(_)), "got {err:?}");
    assert!(node.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transfer_filter_pages_past_node_limit() {
    let (node, client) = mock_node().await;
    let filter = TransferFilter::range(BEST_NUMBER, BEST_NUMBER, vec![TransferCriteria::default()]);

    let logs = client.filter_transfers(&filter).await.unwrap();

    assert_eq!(logs.len() as u64, TRANSFER_COUNT);
    assert_eq!(logs.last().unwrap().amount, U256::from(TRANSFER_COUNT));
    let pages = node.log_pages.lock().unwrap().clone();
    assert_eq!(pages, vec![(0, LOG_PAGE_SIZE), (LOG_PAGE_SIZE, LOG_PAGE_SIZE)]);
}

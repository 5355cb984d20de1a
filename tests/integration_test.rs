//! Integration tests for the swap advisor

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use swap_advisor::api::{create_router, AppState};
use swap_advisor::models::types::NumericField;
use swap_advisor::{
    AdviseRequest, Advisor, AdvisorConfig, AdvisoryTelemetry, Asset, ErrorCode, NotFoundReason,
    Pool, PoolRegistry, RawTransaction, RiskLevel, RiskTables, RouteCandidate, RouteOutcome,
};
use tower::ServiceExt;

const BAD_ADDRESS: &str = "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984";
const UNLISTED_SPENDER: &str = "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
const USDC_TOKEN: &str = "0x8A93d247134d91e0de6f96547cB0204e5BE8e5D8";
const APPROVE_SELECTOR: &str = "095ea7b3";

fn builtin_advisor() -> Advisor {
    Advisor::from_config(AdvisorConfig::default()).unwrap()
}

fn scenario_advisor() -> Advisor {
    let registry = PoolRegistry::new(
        vec![
            Asset::new("WETH", 2000.0, 18),
            Asset::new("USDC", 1.0, 6),
            Asset::new("DAI", 1.0, 18),
        ],
        vec![
            Pool::new("WETH", "USDC", "uniswap", 0.003, 2000.0, 1e9),
            Pool::new("USDC", "DAI", "uniswap", 0.001, 1.0, 1e12),
        ],
    )
    .unwrap();
    Advisor::new(AdvisorConfig::default(), registry, RiskTables::builtin().unwrap()).unwrap()
}

/// Found route or the loss-making candidate attached to a NotFound
fn candidate(outcome: &RouteOutcome) -> Option<&RouteCandidate> {
    match outcome {
        RouteOutcome::Found(route) => Some(route),
        RouteOutcome::NotFound {
            best_unprofitable, ..
        } => best_unprofitable.as_deref(),
    }
}

fn approve_max(spender_hex: &str) -> String {
    format!(
        "0x{}{:0>64}{}",
        APPROVE_SELECTOR,
        spender_hex,
        "f".repeat(64)
    )
}

// ============================================
// Route optimizer
// ============================================

#[test]
fn test_weth_usdc_dai_two_hop() {
    let advisor = scenario_advisor();
    let route = advisor
        .find_best_route("WETH", "DAI", 1.0, Some(2))
        .unwrap()
        .into_route()
        .expect("route should exist");

    assert_eq!(route.path, vec!["WETH", "USDC", "DAI"]);
    assert!((route.fee_rate - 0.004).abs() < 1e-3, "fee {}", route.fee_rate);
    assert!(
        (route.estimated_output - 1991.0).abs() < 2.0,
        "output {}",
        route.estimated_output
    );
}

#[test]
fn test_hop_limit_never_exceeded() {
    let advisor = builtin_advisor();
    for (src, dst) in [("WETH", "DAI"), ("RISE", "DAI"), ("DAI", "RISE"), ("ETH", "USDC")] {
        for max_hops in 1..=4 {
            let outcome = advisor.find_best_route(src, dst, 1.0, Some(max_hops)).unwrap();
            if let Some(route) = candidate(&outcome) {
                assert!(route.hop_count() <= max_hops, "{} -> {} in {}", src, dst, max_hops);
                assert_eq!(route.pools.len(), route.hop_count());
                assert_eq!(route.path.len(), route.hop_count() + 1);
            }
        }
    }
}

#[test]
fn test_cost_never_improves_with_fewer_hops() {
    let advisor = builtin_advisor();
    let queries = [
        ("WETH", "DAI", 1.0),
        ("RISE", "DAI", 50_000.0),
        ("DAI", "RISE", 500.0),
    ];
    for (src, dst, amount) in queries {
        let mut previous: Option<f64> = None;
        for max_hops in 1..=4 {
            let outcome = advisor.find_best_route(src, dst, amount, Some(max_hops)).unwrap();
            let cost = candidate(&outcome).map(|r| r.total_cost_usd);
            if let Some(prev) = previous {
                let cost = cost.expect("a wider hop limit keeps every narrower path");
                assert!(cost <= prev + 1e-9, "{} -> {}: {} > {}", src, dst, cost, prev);
            }
            previous = cost.or(previous);
        }
    }
}

#[test]
fn test_identity_route_is_free() {
    let advisor = builtin_advisor();
    let route = advisor
        .find_best_route("USDC", "USDC", 42.0, None)
        .unwrap()
        .into_route()
        .unwrap();
    assert_eq!(route.hop_count(), 0);
    assert_eq!(route.fee_rate, 0.0);
    assert_eq!(route.estimated_output, 42.0);
    assert_eq!(route.gas_cost_usd, 0.0);
}

#[test]
fn test_route_errors() {
    let advisor = builtin_advisor();
    assert_eq!(
        advisor.find_best_route("DOGE", "USDC", 1.0, None).unwrap_err().code,
        ErrorCode::UnknownAsset
    );
    assert_eq!(
        advisor.find_best_route("WETH", "USDC", -3.0, None).unwrap_err().code,
        ErrorCode::InvalidAmount
    );
}

#[test]
fn test_disconnected_assets_not_found() {
    let registry = PoolRegistry::new(
        vec![
            Asset::new("WETH", 2000.0, 18),
            Asset::new("USDC", 1.0, 6),
            Asset::new("ISLAND", 3.0, 18),
            Asset::new("REEF", 3.0, 18),
        ],
        vec![
            Pool::new("WETH", "USDC", "uniswap", 0.003, 2000.0, 1000.0),
            Pool::new("ISLAND", "REEF", "uniswap", 0.003, 1.0, 1000.0),
        ],
    )
    .unwrap();
    let advisor =
        Advisor::new(AdvisorConfig::default(), registry, RiskTables::builtin().unwrap()).unwrap();

    let outcome = advisor.find_best_route("WETH", "REEF", 1.0, Some(6)).unwrap();
    assert_eq!(
        outcome,
        RouteOutcome::NotFound {
            reason: NotFoundReason::NoPathWithinHops,
            best_unprofitable: None
        }
    );
}

// ============================================
// Risk scorer
// ============================================

#[test]
fn test_analyze_is_deterministic() {
    let advisor = builtin_advisor();
    let raw = RawTransaction {
        to: Some(USDC_TOKEN.to_string()),
        data: Some(approve_max(UNLISTED_SPENDER)),
        gas: Some(NumericField::from(60_000)),
        ..RawTransaction::default()
    };

    let first = advisor.analyze(raw.clone()).unwrap();
    let second = advisor.analyze(raw).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unlimited_approval_to_unlisted_spender() {
    let advisor = builtin_advisor();
    let assessment = advisor
        .analyze(RawTransaction {
            to: Some(USDC_TOKEN.to_string()),
            data: Some(approve_max(UNLISTED_SPENDER)),
            ..RawTransaction::default()
        })
        .unwrap();

    assert!(assessment.level >= RiskLevel::High, "{:?}", assessment.level);
    assert!(assessment
        .warnings
        .iter()
        .any(|w| w.to_lowercase().contains("unlimited approval")));
    assert!(assessment.recommend_against);
}

#[test]
fn test_transfer_to_known_bad_is_critical() {
    let advisor = builtin_advisor();
    let assessment = advisor
        .analyze(RawTransaction {
            to: Some(BAD_ADDRESS.to_string()),
            value: Some(NumericField::Text("1000000000000000".to_string())),
            ..RawTransaction::default()
        })
        .unwrap();

    assert_eq!(assessment.level, RiskLevel::Critical);
    assert!(assessment.forced_critical);
    assert!(assessment.score >= 85);
}

#[test]
fn test_bad_target_with_unlimited_approval() {
    let advisor = builtin_advisor();
    let assessment = advisor
        .analyze(RawTransaction {
            to: Some(BAD_ADDRESS.to_string()),
            data: Some(approve_max(UNLISTED_SPENDER)),
            ..RawTransaction::default()
        })
        .unwrap();

    assert!(assessment.score >= 85, "score {}", assessment.score);
    assert_eq!(assessment.level, RiskLevel::Critical);
    assert!(assessment.warnings.iter().any(|w| w.contains("Known-bad")));
    assert!(assessment.warnings.iter().any(|w| w.contains("Unlimited approval")));
}

#[test]
fn test_bad_target_with_truncated_unlimited_approval() {
    let advisor = builtin_advisor();
    // Spender word missing: only the selector and an all-ones amount
    let data = format!("0x{}{}", APPROVE_SELECTOR, "f".repeat(64));
    let assessment = advisor
        .analyze(RawTransaction {
            to: Some(BAD_ADDRESS.to_string()),
            data: Some(data),
            ..RawTransaction::default()
        })
        .unwrap();

    assert!(assessment.score >= 85, "score {}", assessment.score);
    assert_eq!(assessment.level, RiskLevel::Critical);
    assert!(assessment.warnings.iter().any(|w| w.contains("Unlimited approval")));
}

#[test]
fn test_malformed_descriptor_rejected() {
    let advisor = builtin_advisor();
    let err = advisor
        .analyze(RawTransaction {
            to: Some("0x1234".to_string()),
            ..RawTransaction::default()
        })
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTransactionDescriptor);

    let err = advisor.analyze(RawTransaction::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTransactionDescriptor);
}

#[test]
fn test_unparseable_optional_fields_are_scored() {
    let advisor = builtin_advisor();
    let assessment = advisor
        .analyze(RawTransaction {
            to: Some(USDC_TOKEN.to_string()),
            data: Some("0x095".to_string()),
            value: Some(NumericField::Text("not-a-number".to_string())),
            ..RawTransaction::default()
        })
        .unwrap();
    assert!(assessment.detected_function.is_none());
    assert!(assessment.warnings.iter().any(|w| w.contains("Calldata")));
    assert!(assessment.warnings.iter().any(|w| w.contains("value")));
}

#[test]
fn test_check_address() {
    let advisor = builtin_advisor();
    let bad = advisor.check_address(BAD_ADDRESS).unwrap();
    assert_eq!(bad.level, RiskLevel::Critical);

    let router = advisor
        .check_address("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D")
        .unwrap();
    assert_eq!(router.level, RiskLevel::Low);

    assert_eq!(
        advisor.check_address("not-an-address").unwrap_err().code,
        ErrorCode::InvalidAddress
    );
}

// ============================================
// Facade
// ============================================

#[test]
fn test_advise_native_swap() {
    let advisor = builtin_advisor();
    let advisory = advisor
        .advise(&AdviseRequest {
            source: "ETH".to_string(),
            destination: "USDC".to_string(),
            amount: 1.0,
            max_hops: None,
            sender: Some(format!("0x{}", UNLISTED_SPENDER)),
        })
        .unwrap();

    assert!(advisory.route.is_found());
    assert!(advisory.transaction.is_some());
    assert!(advisory.approval.is_none());
    let assessment = advisory.assessment.unwrap();
    assert!(assessment.level <= RiskLevel::Medium, "{}", assessment.summary());
    assert!(advisory.proceed);
}

#[test]
fn test_reload_registry_applies_to_new_queries() {
    let advisor = builtin_advisor();
    let held = advisor.registry();

    let replacement = PoolRegistry::new(
        vec![Asset::new("WETH", 2000.0, 18), Asset::new("USDC", 1.0, 6)],
        vec![Pool::new("WETH", "USDC", "uniswap", 0.003, 2000.0, 1000.0)],
    )
    .unwrap();
    advisor.reload_registry(replacement).unwrap();

    assert_eq!(held.asset_count(), 4);
    assert_eq!(advisor.registry().asset_count(), 2);
    assert_eq!(
        advisor.find_best_route("RISE", "USDC", 1.0, None).unwrap_err().code,
        ErrorCode::UnknownAsset
    );
}

// ============================================
// File loading
// ============================================

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_registry_and_tables_from_files() {
    let pools = write_temp(
        &json!({
            "assets": [
                {"symbol": "WETH", "price_usd": 2000.0, "decimals": 18, "aliases": ["ETH"]},
                {"symbol": "USDC", "price_usd": 1.0, "decimals": 6}
            ],
            "pools": [
                {"asset_a": "WETH", "asset_b": "USDC", "venue": "uniswap",
                 "fee_rate": 0.003, "rate": 2000.0, "liquidity_depth": 1000.0}
            ]
        })
        .to_string(),
    );
    let reputation = write_temp(
        &json!([
            {"address": format!("0x{}", UNLISTED_SPENDER), "category": "bad", "label": "drainer"}
        ])
        .to_string(),
    );
    let signatures = write_temp(
        &json!([
            {"selector": "0x095ea7b3", "name": "approve(address,uint256)", "risk_weight": 50, "is_approval": true}
        ])
        .to_string(),
    );

    let config = AdvisorConfig {
        pools_file: Some(pools.path().to_path_buf()),
        reputation_file: Some(reputation.path().to_path_buf()),
        signatures_file: Some(signatures.path().to_path_buf()),
        ..AdvisorConfig::default()
    };
    let advisor = Advisor::from_config(config).unwrap();

    assert_eq!(advisor.registry().pool_count(), 1);
    assert_eq!(advisor.tables().reputation.len(), 1);
    assert_eq!(advisor.tables().signatures.len(), 1);
    assert!(advisor.find_best_route("ETH", "USDC", 1.0, None).unwrap().is_found());

    let flagged = advisor
        .check_address(&format!("0x{}", UNLISTED_SPENDER))
        .unwrap();
    assert_eq!(flagged.level, RiskLevel::Critical);
}

#[test]
fn test_malformed_registry_file_rejected() {
    let pools = write_temp(
        &json!({
            "assets": [{"symbol": "WETH", "price_usd": 2000.0, "decimals": 18}],
            "pools": [
                {"asset_a": "WETH", "asset_b": "GHOST", "venue": "uniswap",
                 "fee_rate": 0.003, "rate": 1.0, "liquidity_depth": 1.0}
            ]
        })
        .to_string(),
    );
    let err = PoolRegistry::from_file(pools.path()).unwrap_err();
    assert_eq!(err.code, ErrorCode::RegistryLoadError);

    let garbage = write_temp("{ not json");
    assert_eq!(
        PoolRegistry::from_file(garbage.path()).unwrap_err().code,
        ErrorCode::RegistryLoadError
    );
}

// ============================================
// HTTP API
// ============================================

fn app() -> axum::Router {
    let state = Arc::new(AppState::new(
        Arc::new(builtin_advisor()),
        Arc::new(AdvisoryTelemetry::new()),
    ));
    create_router(state)
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_api_health() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_api_route() {
    let (status, body) = post_json(
        app(),
        "/v1/route",
        json!({"source": "WETH", "destination": "USDC", "amount": 1.0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "found");
    assert_eq!(body["data"]["path"], json!(["WETH", "USDC"]));
}

#[tokio::test]
async fn test_api_route_unknown_asset() {
    let (status, body) = post_json(
        app(),
        "/v1/route",
        json!({"source": "WETH", "destination": "DOGE", "amount": 1.0}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "ROUTE_UNKNOWN_ASSET");
}

#[tokio::test]
async fn test_api_analyze() {
    let (status, body) = post_json(
        app(),
        "/v1/analyze",
        json!({"to": BAD_ADDRESS, "data": approve_max(UNLISTED_SPENDER)}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level"], "CRITICAL");
    assert_eq!(body["data"]["recommend_against"], true);
}

#[tokio::test]
async fn test_api_analyze_rejects_bad_descriptor() {
    let (status, body) = post_json(app(), "/v1/analyze", json!({"to": "0xzz"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "TX_INVALID_DESCRIPTOR");

    let (status, body) = post_json(
        app(),
        "/v1/analyze",
        json!({"to": USDC_TOKEN, "data": "0x095"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["detected_function"].is_null());
}

#[tokio::test]
async fn test_api_impact_and_advise() {
    let (status, body) = post_json(
        app(),
        "/v1/route/impact",
        json!({"source": "ETH", "destination": "USDC", "amounts": [0.1, 1.0, 200.0]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["samples"].as_array().map(Vec::len), Some(3));

    let (status, body) = post_json(
        app(),
        "/v1/advise",
        json!({"source": "ETH", "destination": "USDC", "amount": 1.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["transaction"].is_object());
}

#[tokio::test]
async fn test_api_rejects_invalid_key() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/address/check")
                .header("content-type", "application/json")
                .header("X-API-Key", "letmein")
                .body(Body::from(json!({"address": BAD_ADDRESS}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

//! End-to-end search flow: JobCoordinator -> HttpBlastService -> mock compute proxy

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blastwatch_core::application::{JobCoordinator, Phase, PollPolicy, SearchView};
use blastwatch_core::domain::{Algorithm, SearchParameters};
use blastwatch_core::port::blast_service::mocks::sample_result_set;
use blastwatch_core::{AppError, ErrorKind};
use blastwatch_infra_http::HttpBlastService;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const KRAS: &str = "MTEYKLVVVGAGGVGKSALTIQLIQNHFVDEYDPTIEDSYRKQVVIDGETCLLDILDTAGQEEYSAMRDQYMRTGEGFLCVFAINNTKSFEDIHQYREQIKRVKDSDDVPMVLVGNKCDLAARTVESRQAQDLARSYGIPYIETSAKTRQGVEDAFYTLVREIRQHKLRKLNPPDESGPGCMSCKCVLS";

/// Answers with each template in turn, then repeats the last one
struct Sequence {
    responses: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl Sequence {
    fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for Sequence {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.responses[i.min(self.responses.len() - 1)].clone()
    }
}

fn status(job_id: &str, state: &str, progress: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jobId": job_id,
        "status": state,
        "progress": progress
    }))
}

fn fast_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        request_timeout: Duration::from_secs(5),
        max_attempts: Some(200),
        max_consecutive_errors: 3,
    }
}

fn coordinator(server: &MockServer) -> JobCoordinator {
    let service = HttpBlastService::new(server.uri()).unwrap();
    JobCoordinator::new(Arc::new(service), fast_policy())
}

fn kras_search() -> SearchParameters {
    SearchParameters::new(KRAS, Algorithm::Blastp)
        .with_evalue(1e-5)
        .with_max_hits(50)
}

async fn mount_submit(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path("/blast/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": job_id})))
        .mount(server)
        .await;
}

async fn settle(coordinator: &JobCoordinator) -> SearchView {
    tokio::time::timeout(Duration::from_secs(10), coordinator.wait_until_settled())
        .await
        .expect("search did not settle")
}

async fn requests_to(server: &MockServer, wanted: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == wanted)
        .count()
}

/// KRAS blastp round trip through always-succeeding endpoints
#[tokio::test]
async fn test_kras_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/blast/submit"))
        .and(body_partial_json(json!({
            "algorithm": "blastp",
            "evalue": 1e-5,
            "maxTargetSeqs": 50
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": "job-kras"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blast/status/job-kras"))
        .respond_with(Sequence::new(vec![
            status("job-kras", "pending", 0),
            status("job-kras", "running", 60),
            status("job-kras", "completed", 100),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blast/results/job-kras"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_result_set("job-kras")))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    let handle = coordinator.submit(kras_search()).await.unwrap();
    let view = settle(&coordinator).await;

    assert_eq!(view.phase, Phase::Completed);
    assert!(view.error.is_none());
    let result = view.result.expect("result set");
    assert_eq!(result.job_id, handle.id);
    assert_eq!(result.best_hit().map(|h| h.id.as_str()), Some("P01116"));
    assert_eq!(requests_to(&server, "/blast/status/job-kras").await, 3);
}

/// Validation failures never reach the service
#[tokio::test]
async fn test_invalid_sequence_is_not_submitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/blast/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    let too_long = "A".repeat(10_001);
    for bad in ["MTEY", "MTEYKLVVVG123456", too_long.as_str()] {
        let err = coordinator
            .submit(SearchParameters::new(bad, Algorithm::Blastp))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{}", bad.len());
        assert_eq!(coordinator.snapshot().error_kind(), Some(ErrorKind::Validation));
    }
}

#[tokio::test]
async fn test_job_failure_message_surfaces() {
    let server = MockServer::start().await;
    mount_submit(&server, "job-9").await;
    Mock::given(method("GET"))
        .and(path("/blast/status/job-9"))
        .respond_with(Sequence::new(vec![
            status("job-9", "running", 20),
            ResponseTemplate::new(200).set_body_json(json!({
                "jobId": "job-9",
                "status": "failed",
                "progress": 20,
                "error": "alignment engine crashed"
            })),
        ]))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    coordinator.submit(kras_search()).await.unwrap();
    let view = settle(&coordinator).await;

    assert!(view.is_failed());
    assert!(!view.is_completed());
    assert_eq!(view.current_error(), Some("alignment engine crashed"));
    assert_eq!(requests_to(&server, "/blast/results/job-9").await, 0);
}

#[tokio::test]
async fn test_rejected_submission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/blast/submit"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "queue full"})))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    let err = coordinator.submit(kras_search()).await.unwrap_err();

    assert!(matches!(err, AppError::SubmissionRejected(_)));
    let view = coordinator.snapshot();
    assert_eq!(view.phase, Phase::Idle);
    assert_eq!(view.current_error(), Some("queue full"));
}

#[tokio::test]
async fn test_transient_gateway_errors_are_ridden_out() {
    let server = MockServer::start().await;
    mount_submit(&server, "job-5").await;
    Mock::given(method("GET"))
        .and(path("/blast/status/job-5"))
        .respond_with(Sequence::new(vec![
            status("job-5", "running", 10),
            ResponseTemplate::new(502).set_body_string("Bad Gateway"),
            ResponseTemplate::new(502).set_body_string("Bad Gateway"),
            status("job-5", "completed", 100),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blast/results/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_result_set("job-5")))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    coordinator.submit(kras_search()).await.unwrap();
    let view = settle(&coordinator).await;

    assert!(view.is_completed());
    assert!(view.error.is_none());
    assert_eq!(view.poll_count, 4);
}

#[tokio::test]
async fn test_results_accepted_before_ready() {
    let server = MockServer::start().await;
    mount_submit(&server, "job-7").await;
    Mock::given(method("GET"))
        .and(path("/blast/status/job-7"))
        .respond_with(status("job-7", "completed", 100))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blast/results/job-7"))
        .respond_with(Sequence::new(vec![
            ResponseTemplate::new(202),
            ResponseTemplate::new(200).set_body_json(sample_result_set("job-7")),
        ]))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    coordinator.submit(kras_search()).await.unwrap();
    let view = settle(&coordinator).await;

    assert_eq!(view.result.map(|r| r.job_id.clone()), Some("job-7".to_string()));
    assert_eq!(requests_to(&server, "/blast/results/job-7").await, 2);
}

#[tokio::test]
async fn test_clear_stops_polling() {
    let server = MockServer::start().await;
    mount_submit(&server, "job-3").await;
    Mock::given(method("GET"))
        .and(path("/blast/status/job-3"))
        .respond_with(status("job-3", "running", 5))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    coordinator.submit(kras_search()).await.unwrap();

    let mut rx = coordinator.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.poll_count >= 2))
        .await
        .unwrap()
        .unwrap();
    coordinator.clear();
    assert!(coordinator.current_job().is_none());

    // At most one request was already in flight
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_clear = requests_to(&server, "/blast/status/job-3").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(requests_to(&server, "/blast/status/job-3").await, after_clear);
    assert_eq!(coordinator.snapshot().phase, Phase::Idle);
}

#[tokio::test]
async fn test_service_down_gives_up_after_consecutive_errors() {
    let server = MockServer::start().await;
    mount_submit(&server, "job-4").await;
    Mock::given(method("GET"))
        .and(path("/blast/status/job-4"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "database offline"})),
        )
        .mount(&server)
        .await;

    let coordinator = coordinator(&server);
    coordinator.submit(kras_search()).await.unwrap();
    let view = settle(&coordinator).await;

    assert_eq!(view.phase, Phase::Failed);
    assert_eq!(view.error_kind(), Some(ErrorKind::Poll));
    assert!(view.current_error().unwrap().contains("database offline"));
    assert_eq!(requests_to(&server, "/blast/status/job-4").await, 3);
}

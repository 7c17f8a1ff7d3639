use std::time::Duration;

use jobwatch_engine::{ApiSettings, FailureKind, JobApi, JobStatus, ReqwestJobApi};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> ReqwestJobApi {
    ReqwestJobApi::new(ApiSettings {
        base_url: server.uri(),
        bearer_token: Some("secret-token".to_string()),
        ..ApiSettings::default()
    })
    .expect("client builds")
}

fn job_body(id: u64, status: &str, message: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("project {id}"),
        "description": null,
        "use_gan_model": true,
        "user_id": 1,
        "status": status,
        "video_path": format!("uploads/{id}/input.mp4"),
        "audio_path": format!("uploads/{id}/input.wav"),
        "output_path": null,
        "progress": 0,
        "status_message": message,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": null,
        "completed_at": null,
        "error_message": null
    })
}

#[tokio::test]
async fn get_job_decodes_payload_and_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/12"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body(
            12,
            "processing",
            Some("Progress 30%: Video optimization completed"),
        )))
        .mount(&server)
        .await;

    let job = api_for(&server).get_job(12).await.expect("job");
    assert_eq!(job.id, 12);
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(
        job.status_message.as_deref(),
        Some("Progress 30%: Video optimization completed")
    );
    assert_eq!(job.files.input_video.as_deref(), Some("uploads/12/input.mp4"));
}

#[tokio::test]
async fn naive_service_timestamps_decode() {
    let server = MockServer::start().await;
    let mut body = job_body(14, "completed", Some("Processing completed successfully!"));
    body["created_at"] = json!("2024-05-01T10:00:00");
    body["updated_at"] = json!("2024-05-01T10:05:12.123456");
    body["completed_at"] = json!("2024-05-01T10:05:12.123456");
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let job = api_for(&server).get_job(14).await.expect("naive timestamps decode");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.created_at.map(|stamp| stamp.to_rfc3339()).as_deref(),
        Some("2024-05-01T10:00:00+00:00")
    );
    assert_eq!(job.completed_at, job.updated_at);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn missing_job_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Project not found"})))
        .mount(&server)
        .await;

    let err = api_for(&server).get_job(404).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn server_error_maps_to_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api_for(&server).get_job(3).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}

#[tokio::test]
async fn garbage_body_maps_to_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = api_for(&server).get_job(3).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(job_body(5, "pending", None)),
        )
        .mount(&server)
        .await;

    let api = ReqwestJobApi::new(ApiSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ApiSettings::default()
    })
    .unwrap();
    let err = api.get_job(5).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn list_start_and_delete_use_configured_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            job_body(1, "pending", None),
            job_body(2, "completed", Some("Processing completed successfully!")),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/lipsync/process/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"project_id": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/projects/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let jobs = api.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[1].status, JobStatus::Completed);

    api.start_job(1).await.unwrap();
    api.delete_job(2).await.unwrap();
}

#[tokio::test]
async fn custom_routes_are_honoured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body(9, "failed", Some("Error: boom"))))
        .mount(&server)
        .await;

    let api = ReqwestJobApi::new(ApiSettings {
        base_url: format!("{}/", server.uri()),
        jobs_path: "/jobs/".to_string(),
        ..ApiSettings::default()
    })
    .unwrap();
    let job = api.get_job(9).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ReqwestJobApi::new(ApiSettings {
        base_url: "not a url".to_string(),
        ..ApiSettings::default()
    })
    .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

use std::time::Duration;
use futures::StreamExt;
use presigned_uploader::{
    CancellationToken, PresignedUploader, UploadError, UploadEvent, UploadFile, UploadStatus, UploaderConfig,
};
use wiremock::matchers::{header, method, path, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_presigned_url_upload_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/photo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/bucket/photo.png?sig=1", server.uri());
    let uploader = PresignedUploader::new(UploaderConfig::with_presigned_url(url)).unwrap();
    let mut events = uploader.subscribe();

    let last = uploader
        .select_files(vec![UploadFile::from_bytes("photo.png", "data")], CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(last.status, UploadStatus::Success);

    let completed = uploader.completed().await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0], last);

    let mut states = Vec::new();
    let mut lists = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            UploadEvent::State(state) => states.push(state),
            UploadEvent::Completed(list) => lists.push(list),
        }
    }

    assert_eq!(states.first().unwrap().status, UploadStatus::Ready);
    assert_eq!(states.last().unwrap().status, UploadStatus::Success);
    assert_eq!(lists, vec![vec![last]]);
}

#[tokio::test]
async fn test_server_endpoint_flow() {
    let storage = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/object"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&storage)
        .await;

    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/presign"))
        .and(header("x-api-key", "k1"))
        .and(query_param_contains("key", "cache/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}/bucket/object?sig=1", storage.uri())))
        .expect(1)
        .mount(&api)
        .await;

    let config = UploaderConfig::with_server_endpoint(format!("{}/presign", api.uri()))
        .header("X-Api-Key", "k1")
        .s3_prefix("cache");
    let uploader = PresignedUploader::new(config).unwrap();

    let last = uploader
        .select_files(vec![UploadFile::from_bytes("photo.png", "data")], CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(last.status, UploadStatus::Success);
    assert_eq!(last.source, Some(format!("{}/bucket/object", storage.uri())));
}

#[tokio::test]
async fn test_only_first_selected_file_is_uploaded() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = PresignedUploader::new(UploaderConfig::with_presigned_url(format!("{}/a", server.uri()))).unwrap();
    let files = vec![
        UploadFile::from_bytes("first.png", "1"),
        UploadFile::from_bytes("second.png", "2"),
    ];

    let last = uploader.select_files(files, CancellationToken::new()).await.unwrap().unwrap();
    assert_eq!(last.file.name, "first.png");
}

#[tokio::test]
async fn test_every_outcome_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let ok = PresignedUploader::new(UploaderConfig::with_presigned_url(format!("{}/ok", server.uri()))).unwrap();
    ok.select_files(vec![UploadFile::from_bytes("a.png", "a")], CancellationToken::new())
        .await
        .unwrap();
    ok.select_files(vec![UploadFile::from_bytes("b.png", "b")], CancellationToken::new())
        .await
        .unwrap();

    let statuses: Vec<_> = ok.completed().await.iter().map(|s| s.status).collect();
    assert_eq!(statuses, vec![UploadStatus::Success, UploadStatus::Success]);

    let slow = PresignedUploader::new(UploaderConfig::with_presigned_url(format!("{}/slow", server.uri()))).unwrap();
    let cancel = CancellationToken::new();
    let mut stream = slow
        .upload(UploadFile::from_bytes("c.png", "c"), cancel.clone())
        .await
        .unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap().status, UploadStatus::Ready);
    cancel.cancel();
    while stream.next().await.is_some() {}

    let completed = slow.completed().await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, UploadStatus::Cancelled);
}

#[tokio::test]
async fn test_done_marker_is_not_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let config = UploaderConfig::with_presigned_url(format!("{}/a", server.uri())).emit_done_marker(true);
    let uploader = PresignedUploader::new(config).unwrap();

    let last = uploader
        .select_files(vec![UploadFile::from_bytes("a.png", "a")], CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(last.status, UploadStatus::Error);
    let completed = uploader.completed().await;
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, UploadStatus::Error);
}

#[tokio::test]
async fn test_presign_failure_prevents_upload() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&api)
        .await;

    let uploader = PresignedUploader::new(UploaderConfig::with_server_endpoint(api.uri())).unwrap();
    let result = uploader
        .select_files(vec![UploadFile::from_bytes("a.png", "a")], CancellationToken::new())
        .await;

    assert!(matches!(result, Err(UploadError::Presign { status_code: 401, .. })));
    assert!(uploader.completed().await.is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_not_recorded() {
    let uploader = PresignedUploader::new(UploaderConfig::with_presigned_url("http://127.0.0.1:1/a")).unwrap();
    let result = uploader
        .select_files(vec![UploadFile::from_bytes("a.png", "a")], CancellationToken::new())
        .await;

    assert!(matches!(result, Err(UploadError::Transport(_))));
    assert!(uploader.completed().await.is_empty());
}

//! End-to-end write-path tests against a mock server: batching,
//! throttling, split accounting, and error correlation.

use directory_client::{
    Action, Connection, ConnectionConfig, DirectoryError, ExecutionStatus, OnConflict,
    RetryConfig, StaticCredentialProvider, ThrottleConfig, UserAction, UserProfile,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connection_for(uri: &str) -> Connection {
    let config = ConnectionConfig::builder()
        .endpoint(uri)
        .org_id("org-123")
        .retry(RetryConfig {
            max_attempts: 2,
            first_delay: Duration::from_millis(5),
            jitter_max: 0,
        })
        .throttle(ThrottleConfig::default())
        .build()
        .unwrap();
    Connection::new(config, Arc::new(StaticCredentialProvider::new("tok"))).unwrap()
}

fn success() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"result": "success"}))
}

async fn received_batches(server: &MockServer) -> Vec<Vec<Value>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.to_string() == "POST")
        .map(|r| {
            serde_json::from_slice::<Value>(&r.body)
                .unwrap()
                .as_array()
                .unwrap()
                .clone()
        })
        .collect()
}

#[tokio::test]
async fn single_action_success_accounting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/action/org-123"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let action = Action::new()
        .frame_field("user", "u@example.com")
        .append("update", json!({"firstName": "Example"}));
    let status = connection.execute_single(&action, true).await.unwrap();
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 0,
            sent: 1,
            completed: 1
        }
    );
    assert!(action.execution_errors().is_empty());
}

#[tokio::test]
async fn partial_failure_correlates_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "partial",
            "completed": 1,
            "notCompleted": 1,
            "errors": [{
                "index": 0,
                "step": 1,
                "errorCode": "error.code",
                "message": "command b failed"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let actions = vec![
        Action::new()
            .frame_field("user", "u@example.com")
            .append("a", "a0")
            .append("b", "b"),
        Action::new()
            .frame_field("user", "v@example.com")
            .append("c", "c0"),
    ];
    let status = connection.execute_multiple(&actions, true).await.unwrap();
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 0,
            sent: 2,
            completed: 1
        }
    );
    let errors = actions[0].execution_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].command, json!({"b": "b"}));
    assert_eq!(errors[0].error_code, "error.code");
    assert_eq!(errors[0].message.as_deref(), Some("command b failed"));
    assert!(actions[1].execution_errors().is_empty());
}

#[tokio::test]
async fn oversized_action_splits_into_two() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let mut action = Action::new().frame_field("user", "u@example.com");
    for i in 0..14 {
        action = action.append("update", json!({ "nickname": format!("n{}", i) }));
    }
    let status = connection.execute_single(&action, true).await.unwrap();
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 0,
            sent: 2,
            completed: 2
        }
    );
    let batches = received_batches(&server).await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0]["do"].as_array().unwrap().len(), 10);
    assert_eq!(batches[0][1]["do"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn split_chunk_errors_land_on_original_action() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "partial",
            "completed": 1,
            "errors": [{"index": 1, "step": 2, "errorCode": "error.code"}]
        })))
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let mut action = Action::new().frame_field("user", "u@example.com");
    for i in 0..14 {
        action = action.append("update", json!({ "nickname": format!("n{}", i) }));
    }
    connection.execute_single(&action, true).await.unwrap();
    // Index 1 step 2 is global command position 12.
    let errors = action.execution_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].command, json!({"update": {"nickname": "n12"}}));
}

#[tokio::test]
async fn large_group_list_flushes_in_one_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let groups: Vec<String> = (1..=150).map(|n| format!("G{}", n)).collect();
    let group_refs: Vec<&str> = groups.iter().map(String::as_str).collect();
    let user = UserAction::new("u@example.com")
        .unwrap()
        .add_to_groups("usergroup", &group_refs);
    let status = connection.execute_single(user.action(), true).await.unwrap();
    // 150 entries slice into 15 commands, which split into two actions.
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 0,
            sent: 2,
            completed: 2
        }
    );
    let batches = received_batches(&server).await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(
        batches[0][0]["do"][0]["add"]["usergroup"]
            .as_array()
            .unwrap()
            .len(),
        10
    );
}

#[tokio::test]
async fn action_overflow_uses_two_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(2)
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let actions: Vec<Action> = (0..12)
        .map(|i| {
            Action::new()
                .frame_field("user", format!("user{}@example.com", i))
                .append("update", json!({ "nickname": format!("n{}", i) }))
        })
        .collect();
    let status = connection.execute_multiple(&actions, true).await.unwrap();
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 0,
            sent: 12,
            completed: 12
        }
    );
    let batches = received_batches(&server).await;
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 10);
    assert_eq!(batches[1].len(), 2);
}

#[tokio::test]
async fn later_batch_failure_keeps_earlier_progress() {
    let server = MockServer::start().await;
    // First batch succeeds, second hits a hard server failure.
    Mock::given(method("POST"))
        .respond_with(success())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let actions: Vec<Action> = (0..12)
        .map(|i| {
            Action::new()
                .frame_field("user", format!("user{}@example.com", i))
                .append("update", json!({ "nickname": format!("n{}", i) }))
        })
        .collect();
    let error = connection
        .execute_multiple(&actions, true)
        .await
        .unwrap_err();
    match error {
        DirectoryError::Batch { causes, status } => {
            assert_eq!(causes.len(), 1);
            assert!(matches!(causes[0], DirectoryError::Server { status: 500, .. }));
            assert_eq!(
                status,
                ExecutionStatus {
                    queued: 0,
                    sent: 12,
                    completed: 10
                }
            );
        }
        other => panic!("expected Batch, got {}", other),
    }
}

#[tokio::test]
async fn non_immediate_queueing_and_flush() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let first: Vec<Action> = (0..5)
        .map(|i| Action::new().append("update", json!({ "nickname": format!("n{}", i) })))
        .collect();
    let status = connection.execute_multiple(&first, false).await.unwrap();
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 5,
            sent: 0,
            completed: 0
        }
    );

    let second: Vec<Action> = (5..11)
        .map(|i| Action::new().append("update", json!({ "nickname": format!("n{}", i) })))
        .collect();
    let status = connection.execute_multiple(&second, false).await.unwrap();
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 1,
            sent: 10,
            completed: 10
        }
    );

    let status = connection.flush().await.unwrap();
    assert_eq!(
        status,
        ExecutionStatus {
            queued: 0,
            sent: 1,
            completed: 1
        }
    );
    let batches = received_batches(&server).await;
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 10);
    assert_eq!(batches[1].len(), 1);
}

#[tokio::test]
async fn retry_exhaustion_surfaces_as_batch_cause() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let action = Action::new().append("update", json!({"nickname": "n"}));
    let error = connection.execute_single(&action, true).await.unwrap_err();
    match error {
        DirectoryError::Batch { causes, status } => {
            assert!(matches!(
                causes[0],
                DirectoryError::Unavailable { attempts: 2, .. }
            ));
            assert_eq!(status.completed, 0);
            assert_eq!(status.sent, 1);
        }
        other => panic!("expected Batch, got {}", other),
    }
}

#[tokio::test]
async fn typed_builders_produce_expected_wire_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;
    let mut connection = connection_for(&server.uri());
    let user = UserAction::new("jdoe@example.com")
        .unwrap()
        .create(
            UserProfile {
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                country: Some("US".into()),
                ..Default::default()
            },
            OnConflict::Ignore,
        )
        .add_to_groups("usergroup", &["Engineering"]);
    connection.execute_single(user.action(), true).await.unwrap();
    let batches = received_batches(&server).await;
    assert_eq!(
        batches[0][0],
        json!({
            "user": "jdoe@example.com",
            "do": [
                {"createUser": {
                    "firstName": "Jane",
                    "lastName": "Doe",
                    "country": "US",
                    "email": "jdoe@example.com",
                    "option": "ignoreIfAlreadyExists"
                }},
                {"add": {"usergroup": ["Engineering"]}}
            ]
        })
    );
}

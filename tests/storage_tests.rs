//! Thread/response/task persistence on a tempdir SQLite database.

mod common;

use common::TestHarness;

use genbid::ai::status::RecommendationStatus;
use genbid::ai::types::WireError;
use genbid::error::ServiceError;

#[tokio::test]
async fn threads_list_in_descending_order() {
    let h = TestHarness::new().await;
    let a = h.store.create_thread(1, "first").await.unwrap();
    let b = h.store.create_thread(1, "second").await.unwrap();
    h.store.create_thread(2, "other project").await.unwrap();

    let threads = h.store.list_threads(1).await.unwrap();
    assert_eq!(
        threads.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![b.id, a.id]
    );
}

#[tokio::test]
async fn deleting_a_thread_cascades_to_responses() {
    let h = TestHarness::new().await;
    let thread = h.store.create_thread(1, "t").await.unwrap();
    let response = h
        .store
        .create_response(thread.id, "q", "SELECT 1", None, None)
        .await
        .unwrap();

    h.store.delete_thread(thread.id).await.unwrap();
    assert!(h.store.find_thread(thread.id).await.unwrap().is_none());
    assert!(h.store.find_response(response.id).await.unwrap().is_none());

    // Deleting again is not-found.
    assert!(matches!(
        h.store.delete_thread(thread.id).await.unwrap_err(),
        ServiceError::NotFound("thread", _)
    ));
}

#[tokio::test]
async fn response_sql_is_write_once() {
    let h = TestHarness::new().await;
    let thread = h.store.create_thread(1, "t").await.unwrap();
    let response = h
        .store
        .create_response(thread.id, "q", "", None, None)
        .await
        .unwrap();

    assert!(h.store.set_response_sql(response.id, "SELECT 1").await.unwrap());
    assert!(
        !h.store.set_response_sql(response.id, "SELECT 2").await.unwrap(),
        "second write must be refused"
    );
    let row = h.store.get_response(response.id).await.unwrap();
    assert_eq!(row.sql, "SELECT 1");
}

#[tokio::test]
async fn latest_responses_with_sql_skips_empty_sql() {
    let h = TestHarness::new().await;
    let thread = h.store.create_thread(1, "t").await.unwrap();
    h.store
        .create_response(thread.id, "q1", "SELECT 1", None, None)
        .await
        .unwrap();
    h.store
        .create_response(thread.id, "q2", "", None, None)
        .await
        .unwrap();
    h.store
        .create_response(thread.id, "q3", "SELECT 3", None, None)
        .await
        .unwrap();

    let rows = h.store.latest_responses_with_sql(thread.id, 10).await.unwrap();
    assert_eq!(
        rows.iter().map(|r| r.question.as_str()).collect::<Vec<_>>(),
        vec!["q3", "q1"]
    );
}

#[tokio::test]
async fn thread_questions_round_trip_with_error_payload() {
    let h = TestHarness::new().await;
    let thread = h.store.create_thread(1, "t").await.unwrap();

    h.store
        .update_thread_questions(
            thread.id,
            RecommendationStatus::Failed,
            None,
            Some(&WireError {
                code: "NO_DATA".into(),
                message: "nothing to recommend".into(),
            }),
        )
        .await
        .unwrap();

    let row = h.store.get_thread(thread.id).await.unwrap();
    assert_eq!(row.questions_status().unwrap(), Some(RecommendationStatus::Failed));
    assert!(row.questions_error.as_deref().unwrap().contains("NO_DATA"));
    assert!(row.questions().unwrap().is_empty());

    h.store.clear_thread_questions(thread.id).await.unwrap();
    let row = h.store.get_thread(thread.id).await.unwrap();
    assert!(row.questions_status().unwrap().is_none());
    assert!(row.questions_error.is_none());
}

#[tokio::test]
async fn task_bindings_keep_the_supersession_trail() {
    let h = TestHarness::new().await;
    let thread = h.store.create_thread(1, "t").await.unwrap();
    let response = h
        .store
        .create_response(thread.id, "q", "SELECT 1", None, None)
        .await
        .unwrap();

    h.bindings
        .create("q-1", None, None, "q", None)
        .await
        .unwrap();
    h.bindings.link("q-1", thread.id, Some(response.id)).await.unwrap();
    h.bindings
        .create("q-2", Some(thread.id), Some(response.id), "q", Some("q-1"))
        .await
        .unwrap();

    let first = h.bindings.get("q-1").await.unwrap();
    assert_eq!(first.thread_id, Some(thread.id));
    assert_eq!(first.response_id, Some(response.id));

    let second = h.bindings.get("q-2").await.unwrap();
    assert_eq!(second.previous_query_id.as_deref(), Some("q-1"));

    assert!(matches!(
        h.bindings.get("q-missing").await.unwrap_err(),
        ServiceError::TaskNotFound(_)
    ));
}

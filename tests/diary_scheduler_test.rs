mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{future_date, TestApp, TEST_USER};
use firecrm_api::{
    entities::diary_entry::DiaryStatus,
    errors::ServiceError,
    services::diary::{DiaryEntryChanges, DiaryEntryView, NewDiaryEntry},
};
use std::sync::Arc;

fn booking(call_number: &str, engineer: &str, start: &str, end: &str) -> NewDiaryEntry {
    NewDiaryEntry {
        call_number: call_number.to_string(),
        site_id: None,
        engineer_id: engineer.to_string(),
        date: future_date(3),
        start_time: start.to_string(),
        end_time: end.to_string(),
        status: None,
        notes: None,
    }
}

async fn book(app: &TestApp, input: NewDiaryEntry) -> Result<DiaryEntryView, ServiceError> {
    app.state.services.diary.create_entry(input, TEST_USER).await
}

async fn app_with_call() -> (TestApp, String) {
    let app = TestApp::new().await;
    let site = app.seed_site("Riverside Hospital").await;
    let call = app.seed_call(site.id).await;
    (app, call.call_number)
}

#[tokio::test]
async fn touching_slots_do_not_conflict() {
    let (app, call) = app_with_call().await;

    book(&app, booking(&call, "eng-1", "09:00", "10:00"))
        .await
        .expect("first booking");
    let second = book(&app, booking(&call, "eng-1", "10:00", "11:00"))
        .await
        .expect("back-to-back booking");

    assert_eq!(second.entry.start_time, "10:00");
    assert!(!second.entry.is_initial_assignment);
}

#[tokio::test]
async fn overlapping_slot_is_rejected() {
    let (app, call) = app_with_call().await;

    book(&app, booking(&call, "eng-1", "09:00", "10:00"))
        .await
        .expect("first booking");
    let err = book(&app, booking(&call, "eng-1", "09:30", "10:30"))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("09:00") && msg.contains("10:00"));

    let day = app
        .state
        .services
        .diary
        .list_by_engineer_and_date("eng-1", future_date(3))
        .await
        .unwrap();
    assert_eq!(day.len(), 1);
}

#[tokio::test]
async fn other_engineers_and_cancelled_entries_do_not_block() {
    let (app, call) = app_with_call().await;

    book(&app, booking(&call, "eng-1", "09:00", "12:00"))
        .await
        .unwrap();
    book(&app, booking(&call, "eng-2", "09:00", "12:00"))
        .await
        .expect("different engineer, same slot");

    let mut cancelled = booking(&call, "eng-3", "13:00", "15:00");
    cancelled.status = Some(DiaryStatus::Cancelled);
    book(&app, cancelled).await.unwrap();
    book(&app, booking(&call, "eng-3", "14:00", "16:00"))
        .await
        .expect("cancelled entries free their slot");
}

#[tokio::test]
async fn duration_and_normalised_times_round_trip() {
    let (app, call) = app_with_call().await;

    let created = book(&app, booking(&call, "eng-1", "9:00", "11:15"))
        .await
        .unwrap();
    let fetched = app
        .state
        .services
        .diary
        .get_entry(created.entry.id)
        .await
        .unwrap();

    assert_eq!(fetched.entry.start_time, "09:00");
    assert_eq!(fetched.entry.end_time, "11:15");
    assert_eq!(fetched.entry.duration, "2h 15m");
    assert_eq!(fetched.call_number, call);
    assert_eq!(fetched.site_name.as_deref(), Some("Riverside Hospital"));
}

#[tokio::test]
async fn invalid_times_and_past_dates_are_rejected() {
    let (app, call) = app_with_call().await;

    let err = book(&app, booking(&call, "eng-1", "10:00", "10:00"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = book(&app, booking(&call, "eng-1", "25:00", "26:00"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let mut past = booking(&call, "eng-1", "09:00", "10:00");
    past.date = future_date(0) - Duration::days(1);
    let err = book(&app, past).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("past"));
}

#[tokio::test]
async fn unknown_call_is_not_found() {
    let app = TestApp::new().await;
    let err = book(&app, booking("999999", "eng-1", "09:00", "10:00"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn initial_assignment_is_protected_while_siblings_exist() {
    let (app, call) = app_with_call().await;
    let diary = &app.state.services.diary;

    let initial = book(&app, booking(&call, "eng-1", "09:00", "10:00"))
        .await
        .unwrap();
    assert!(initial.entry.is_initial_assignment);

    let follow_up = book(&app, booking(&call, "eng-2", "11:00", "12:00"))
        .await
        .unwrap();
    assert!(!follow_up.entry.is_initial_assignment);

    let err = diary.delete_entry(initial.entry.id).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = diary
        .update_entry(
            initial.entry.id,
            DiaryEntryChanges {
                engineer_id: Some("eng-9".into()),
                ..Default::default()
            },
            TEST_USER,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Timing edits on the initial assignment remain allowed.
    let moved = diary
        .update_entry(
            initial.entry.id,
            DiaryEntryChanges {
                start_time: Some("08:00".into()),
                end_time: Some("09:30".into()),
                ..Default::default()
            },
            TEST_USER,
        )
        .await
        .unwrap();
    assert_eq!(moved.entry.duration, "1h 30m");
    assert_eq!(moved.entry.updated_by.as_deref(), Some(TEST_USER));

    // Once it is the only assignment left, the rule no longer applies.
    diary.delete_entry(follow_up.entry.id).await.unwrap();
    diary.delete_entry(initial.entry.id).await.unwrap();
    assert!(diary.list_by_call(&call).await.unwrap().is_empty());
}

#[tokio::test]
async fn initial_flag_is_not_recomputed() {
    let (app, call) = app_with_call().await;
    let diary = &app.state.services.diary;

    let initial = book(&app, booking(&call, "eng-1", "09:00", "10:00"))
        .await
        .unwrap();
    diary.delete_entry(initial.entry.id).await.unwrap();

    // With no entries left, the next booking is the initial assignment.
    let next = book(&app, booking(&call, "eng-2", "09:00", "10:00"))
        .await
        .unwrap();
    assert!(next.entry.is_initial_assignment);

    let later = book(&app, booking(&call, "eng-3", "09:00", "10:00"))
        .await
        .unwrap();
    diary.delete_entry(later.entry.id).await.unwrap();
    let refreshed = diary.get_entry(next.entry.id).await.unwrap();
    assert!(refreshed.entry.is_initial_assignment);
}

#[tokio::test]
async fn update_rechecks_overlap_and_reactivation() {
    let (app, call) = app_with_call().await;
    let diary = &app.state.services.diary;

    book(&app, booking(&call, "eng-1", "09:00", "10:00"))
        .await
        .unwrap();
    let other = book(&app, booking(&call, "eng-1", "10:00", "11:00"))
        .await
        .unwrap();

    let err = diary
        .update_entry(
            other.entry.id,
            DiaryEntryChanges {
                start_time: Some("09:45".into()),
                ..Default::default()
            },
            TEST_USER,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Editing notes only does not trip over the entry itself.
    diary
        .update_entry(
            other.entry.id,
            DiaryEntryChanges {
                notes: Some(Some("bring ladder".into())),
                ..Default::default()
            },
            TEST_USER,
        )
        .await
        .unwrap();

    let mut cancelled = booking(&call, "eng-1", "09:30", "10:30");
    cancelled.status = Some(DiaryStatus::Cancelled);
    let cancelled = book(&app, cancelled).await.unwrap();

    let err = diary
        .update_entry(
            cancelled.entry.id,
            DiaryEntryChanges {
                status: Some(DiaryStatus::Scheduled),
                ..Default::default()
            },
            TEST_USER,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn check_conflict_excludes_the_edited_entry() {
    let (app, call) = app_with_call().await;
    let diary = &app.state.services.diary;
    let date = future_date(3);

    let entry = book(&app, booking(&call, "eng-1", "09:00", "10:00"))
        .await
        .unwrap();

    let report = diary
        .check_conflict("eng-1", date, "09:30", "10:30", None)
        .await
        .unwrap();
    assert!(report.has_conflict);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].id, entry.entry.id);

    let report = diary
        .check_conflict("eng-1", date, "09:30", "10:30", Some(entry.entry.id))
        .await
        .unwrap();
    assert!(!report.has_conflict);

    let report = diary
        .check_conflict("eng-1", date, "10:00", "11:00", None)
        .await
        .unwrap();
    assert!(!report.has_conflict);
}

#[tokio::test]
async fn listings_are_ordered() {
    let (app, call) = app_with_call().await;
    let diary = &app.state.services.diary;

    book(&app, booking(&call, "eng-1", "14:00", "15:00"))
        .await
        .unwrap();
    book(&app, booking(&call, "eng-1", "08:00", "09:00"))
        .await
        .unwrap();
    let mut earlier_day = booking(&call, "eng-2", "16:00", "17:00");
    earlier_day.date = future_date(2);
    book(&app, earlier_day).await.unwrap();

    let day: Vec<String> = diary
        .list_by_engineer_and_date("eng-1", future_date(3))
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.entry.start_time)
        .collect();
    assert_eq!(day, vec!["08:00", "14:00"]);

    let by_call: Vec<(chrono::NaiveDate, String)> = diary
        .list_by_call(&call)
        .await
        .unwrap()
        .into_iter()
        .map(|v| (v.entry.date, v.entry.start_time))
        .collect();
    assert_eq!(
        by_call,
        vec![
            (future_date(2), "16:00".to_string()),
            (future_date(3), "08:00".to_string()),
            (future_date(3), "14:00".to_string()),
        ]
    );
}

#[tokio::test]
async fn concurrent_bookings_for_one_engineer_never_overlap() {
    let (app, call) = app_with_call().await;
    let diary = Arc::clone(&app.state.services.diary);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let diary = Arc::clone(&diary);
        let input = booking(&call, "eng-1", "09:00", "10:00");
        handles.push(tokio::spawn(async move {
            diary.create_entry(input, TEST_USER).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
}

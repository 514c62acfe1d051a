use core::time::Duration;

use campus_events_client::{ApiError, BusinessRule, CampusApi, Deadline, MemoryApi};
use campus_events_model::{
    EventFilter, EventStatus, EventType, FeedbackRequest, RegistrationRequest, Student,
};

fn api_with_students(count: i32) -> MemoryApi {
    let api = MemoryApi::seeded();
    {
        let mut store = api.store();
        for id in 11..11 + count {
            store.students.push(Student {
                id,
                name: format!("Student {id}"),
                email: format!("student{id}@student.edu"),
                college_id: 1,
            });
        }
    }
    api
}

fn registrations_count(api: &MemoryApi, event_id: i32) -> i32 {
    api.store()
        .events
        .iter()
        .find(|event| event.id == event_id)
        .map(|event| event.registrations_count)
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_caller_gets_the_last_seat() {
    let api = api_with_students(8);
    api.store().events[0].registrations_count = 49;

    let tasks: Vec<_> = (11..19)
        .map(|student_id| {
            let api = api.clone();
            tokio::spawn(async move {
                api.register(RegistrationRequest {
                    student_id,
                    event_id: 1,
                })
                .await
            })
        })
        .collect();

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(error) => assert!(error.is_capacity_exceeded(), "{error}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(registrations_count(&api, 1), 50);
}

#[tokio::test]
async fn full_events_reject_registrations() {
    let api = api_with_students(1);
    api.store().events[0].registrations_count = 50;

    let error = api
        .register(RegistrationRequest {
            student_id: 11,
            event_id: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        ApiError::BusinessRule {
            rule: BusinessRule::CapacityExceeded,
            ..
        }
    ));
    assert_eq!(error.user_message("Failed to register"), "Event is at full capacity");
    assert_eq!(registrations_count(&api, 1), 50);
}

#[tokio::test]
async fn registration_shows_up_in_the_next_listing() {
    let api = MemoryApi::seeded();
    let registration = api
        .register(RegistrationRequest {
            student_id: 9,
            event_id: 1,
        })
        .await
        .unwrap();
    assert_eq!(registration.event_id, 1);

    let events = api.list_events(&EventFilter::active()).await.unwrap();
    let event = events.iter().find(|event| event.id == 1).unwrap();
    assert_eq!(event.registrations_count, 36);
    assert_eq!(event.capacity, 50);
}

#[tokio::test]
async fn inactive_events_reject_registrations() {
    let api = MemoryApi::seeded();
    api.store().events[1].status = EventStatus::Closed;

    let error = api
        .register(RegistrationRequest {
            student_id: 1,
            event_id: 2,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        ApiError::BusinessRule {
            rule: BusinessRule::EventNotActive,
            ..
        }
    ));
    assert_eq!(registrations_count(&api, 2), 75);
}

#[tokio::test]
async fn out_of_range_ratings_are_validation_errors() {
    let api = MemoryApi::seeded();
    let error = api
        .submit_feedback(FeedbackRequest {
            student_id: 1,
            event_id: 5,
            rating: 6,
            comment: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(error, ApiError::Validation { detail: Some(_) }));
    assert_eq!(api.store().feedback.len(), 2);
}

#[tokio::test]
async fn unknown_events_are_not_found() {
    let api = MemoryApi::seeded();
    let error = api
        .register(RegistrationRequest {
            student_id: 1,
            event_id: 999,
        })
        .await
        .unwrap_err();
    assert_eq!(
        error,
        ApiError::NotFound {
            detail: Some("Event not found".to_owned())
        }
    );
}

#[tokio::test]
async fn listing_is_idempotent_and_filtered() {
    let api = MemoryApi::seeded();
    let filter = EventFilter {
        event_type: Some(EventType::Workshop),
        college_id: Some(1),
        status: Some(EventStatus::Active),
    };
    let first = api.list_events(&filter).await.unwrap();
    let second = api.list_events(&filter).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].title, "AI Workshop");

    let none = api
        .list_events(&EventFilter {
            college_id: Some(4),
            event_type: Some(EventType::Workshop),
            status: None,
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn reports_reflect_the_seed_data() {
    let api = MemoryApi::seeded();

    let popularity = api.event_popularity().await.unwrap();
    assert_eq!(popularity[0].title, "Sports Day");

    let attendance = api.attendance_report().await.unwrap();
    let sports_day = attendance.iter().find(|row| row.event_id == 5).unwrap();
    assert_eq!(sports_day.attended, 2);

    let top = api.top_students(5).await.unwrap();
    assert_eq!(top.len(), 5);
    assert_eq!(top[0].events_attended, 1);

    let upcoming = api.upcoming_events(30).await.unwrap();
    assert_eq!(upcoming.len(), 4);
    assert!(upcoming.windows(2).all(|pair| pair[0].date <= pair[1].date));
}

#[tokio::test]
async fn slow_backends_time_out() {
    let api = Deadline::new(
        MemoryApi::seeded().with_latency(Duration::from_millis(500)),
        Duration::from_millis(20),
    );
    let error = api.list_colleges().await.unwrap_err();
    assert_eq!(error, ApiError::TimedOut(Duration::from_millis(20)));
    assert_eq!(error.user_message("Failed to register"), "Request timed out");
}

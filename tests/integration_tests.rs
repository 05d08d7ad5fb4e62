// Integration tests for LegalTendr

use legaltendr::core::{Matcher, RankRequest};
use legaltendr::models::{
    DiscoverFilters, LawyerProfile, ScoringWeights, Specialty, SwipeDirection, UpdateCaseRequest, UserType,
};
use legaltendr::services::{NewAccount, PostgresClient, PostgresError};
use std::collections::HashSet;
use std::sync::Arc;

fn create_test_lawyer(id: &str, rating: f64, rate: i32, specialties: &[&str]) -> LawyerProfile {
    LawyerProfile {
        lawyer_id: id.to_string(),
        email: format!("{}@example.com", id),
        first_name: "Lawyer".to_string(),
        last_name: id.to_string(),
        profile_picture_url: None,
        province_id: Some("0128".to_string()),
        province_name: Some("Ilocos Norte".to_string()),
        city_id: Some("012805".to_string()),
        city_name: Some("Laoag City".to_string()),
        bio: None,
        matches_count: 0,
        rating,
        reviews: 0,
        hourly_rate: rate,
        years_of_experience: 5,
        specialties: specialties
            .iter()
            .map(|s| Specialty {
                specialty_id: s.to_string(),
                name: s.to_string(),
                description: None,
            })
            .collect(),
    }
}

fn wanted(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_integration_end_to_end_ranking() {
    let matcher = Matcher::with_default_weights();

    let candidates = vec![
        create_test_lawyer("1", 4.8, 600, &["family-law", "criminal-law"]), // Covers both
        create_test_lawyer("2", 4.9, 600, &["family-law"]),                 // Covers one
        create_test_lawyer("3", 3.0, 400, &["criminal-law"]),               // Covers one, weaker
        create_test_lawyer("4", 5.0, 500, &["corporate-law"]),              // Filtered out
        create_test_lawyer("5", 4.0, 2500, &["family-law"]),                // Too expensive
    ];

    let wanted = wanted(&["family-law", "criminal-law"]);
    let filters = DiscoverFilters {
        specialties: wanted.clone(),
        max_rate: Some(1000),
        ..Default::default()
    };
    let swiped = HashSet::new();

    let result = matcher.rank(
        candidates,
        &RankRequest {
            filters: &filters,
            wanted_specialties: &wanted,
            exclude_ids: &swiped,
            offset: 0,
            limit: 10,
        },
    );

    assert_eq!(result.total_candidates, 5);
    assert_eq!(result.total_eligible, 3);
    assert_eq!(result.next_offset, None);
    assert_eq!(result.lawyers[0].profile.lawyer_id, "1");
    assert_eq!(result.lawyers[0].shared_specialties.len(), 2);

    for window in result.lawyers.windows(2) {
        assert!(window[0].match_score >= window[1].match_score);
    }
}

#[test]
fn test_paging_walks_every_lawyer_once() {
    let matcher = Matcher::with_default_weights();
    let candidates: Vec<LawyerProfile> = (0..25)
        .map(|i| create_test_lawyer(&format!("lawyer-{:02}", i), 3.0 + (i % 5) as f64 * 0.4, 500, &[]))
        .collect();

    let filters = DiscoverFilters::default();
    let swiped = HashSet::new();
    let mut seen = HashSet::new();
    let mut offset = 0;

    loop {
        let page = matcher.rank(
            candidates.clone(),
            &RankRequest {
                filters: &filters,
                wanted_specialties: &[],
                exclude_ids: &swiped,
                offset,
                limit: 10,
            },
        );
        for lawyer in &page.lawyers {
            assert!(seen.insert(lawyer.profile.lawyer_id.clone()));
        }
        match page.next_offset {
            Some(next) => offset = next,
            None => break,
        }
    }

    assert_eq!(seen.len(), 25);
}

#[test]
fn test_swiped_lawyers_never_come_back() {
    let matcher = Matcher::with_default_weights();
    let candidates = vec![
        create_test_lawyer("a", 4.0, 500, &[]),
        create_test_lawyer("b", 4.0, 500, &[]),
        create_test_lawyer("c", 4.0, 500, &[]),
    ];
    let filters = DiscoverFilters::default();
    let swiped: HashSet<String> = ["a".to_string(), "c".to_string()].into_iter().collect();

    let result = matcher.rank(
        candidates,
        &RankRequest {
            filters: &filters,
            wanted_specialties: &[],
            exclude_ids: &swiped,
            offset: 0,
            limit: 10,
        },
    );

    assert_eq!(result.total_eligible, 1);
    assert_eq!(result.lawyers[0].profile.lawyer_id, "b");
}

#[test]
fn test_custom_weights_change_order() {
    let cheap = create_test_lawyer("cheap", 3.0, 100, &[]);
    let rated = create_test_lawyer("rated", 5.0, 900, &[]);

    let price_only = Matcher::new(
        ScoringWeights {
            specialty: 0.0,
            rating: 0.0,
            experience: 0.0,
            price: 1.0,
            popularity: 0.0,
        },
        1000,
    );
    let filters = DiscoverFilters::default();
    let swiped = HashSet::new();
    let request = RankRequest {
        filters: &filters,
        wanted_specialties: &[],
        exclude_ids: &swiped,
        offset: 0,
        limit: 10,
    };

    let result = price_only.rank(vec![rated.clone(), cheap.clone()], &request);
    assert_eq!(result.lawyers[0].profile.lawyer_id, "cheap");

    let result = Matcher::with_default_weights().rank(vec![cheap, rated], &request);
    assert_eq!(result.lawyers[0].profile.lawyer_id, "rated");
}

async fn connect() -> PostgresClient {
    connect_with(2).await
}

async fn connect_with(max_connections: u32) -> PostgresClient {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PostgresClient::from_settings(&url, Some(max_connections), Some(1), Some(5), Some(60))
        .await
        .expect("database should be reachable")
}

fn new_account(user_type: UserType, specialties: &[&str]) -> NewAccount {
    let user_id = uuid::Uuid::new_v4().simple().to_string();
    NewAccount {
        email: format!("{}@example.com", user_id),
        user_id,
        password_hash: "salt$hash".to_string(),
        user_type,
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        phone_number: None,
        profile_picture_url: None,
        province_id: None,
        province_name: None,
        city_id: None,
        city_name: None,
        bio: None,
        hourly_rate: if user_type == UserType::Lawyer { 750 } else { 0 },
        years_of_experience: 0,
        specialties: wanted(specialties),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_right_swipe_opens_conversation_and_undo_removes_it() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db
        .create_account(new_account(UserType::Lawyer, &["family-law"]))
        .await
        .unwrap();

    let recorded = db
        .record_swipe(&client.user_id, &lawyer.user_id, SwipeDirection::Right)
        .await
        .unwrap();
    assert!(recorded.swipe.matched);
    assert!(recorded.conversation_id.is_some());
    assert_eq!(db.get_lawyer(&lawyer.user_id).await.unwrap().matches_count, 1);

    let again = db
        .record_swipe(&client.user_id, &lawyer.user_id, SwipeDirection::Left)
        .await;
    assert!(matches!(again, Err(PostgresError::Conflict(_))));

    let undone = db.undo_last_swipe(&client.user_id).await.unwrap();
    assert!(undone.conversation_removed);
    assert_eq!(db.get_lawyer(&lawyer.user_id).await.unwrap().matches_count, 0);
    assert!(db.swiped_lawyer_ids(&client.user_id).await.unwrap().is_empty());

    let nothing_left = db.undo_last_swipe(&client.user_id).await;
    assert!(matches!(nothing_left, Err(PostgresError::NotFound(_))));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_reset_only_forgets_passes() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let liked = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();
    let passed = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    db.record_swipe(&client.user_id, &liked.user_id, SwipeDirection::Right)
        .await
        .unwrap();
    db.record_swipe(&client.user_id, &passed.user_id, SwipeDirection::Left)
        .await
        .unwrap();

    assert_eq!(db.reset_passed_swipes(&client.user_id).await.unwrap(), 1);

    let remaining = db.swiped_lawyer_ids(&client.user_id).await.unwrap();
    assert!(remaining.contains(&liked.user_id));
    assert!(!remaining.contains(&passed.user_id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_messages_and_read_receipts() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    let (conversation, first) = db
        .start_conversation(&client.user_id, &lawyer.user_id, "Hello, I need help", None)
        .await
        .unwrap();
    let reply = db
        .send_message(conversation.conversation_id, &lawyer.user_id, "Happy to help")
        .await
        .unwrap();

    let outsider = db.send_message(conversation.conversation_id, "someone-else", "hi").await;
    assert!(matches!(outsider, Err(PostgresError::Forbidden(_))));

    // Readers cannot mark their own messages
    let marked = db
        .mark_read(&client.user_id, &[first.message_id, reply.message_id])
        .await
        .unwrap();
    assert_eq!(marked, 1);

    let messages = db.list_messages(conversation.conversation_id, None).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_id, first.message_id);

    let summaries = db.list_conversations(&client.user_id).await.unwrap();
    let summary = summaries
        .iter()
        .find(|s| s.conversation.conversation_id == conversation.conversation_id)
        .unwrap();
    assert_eq!(summary.unread_count, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_closed_cases_are_frozen() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();

    let case = db
        .create_case(&client.user_id, "Annulment", "Need counsel", &wanted(&["family-law"]))
        .await
        .unwrap();
    assert_eq!(case.specialty_ids(), vec!["family-law"]);

    let close: UpdateCaseRequest = serde_json::from_value(serde_json::json!({"status": "closed"})).unwrap();
    db.update_case(case.case_id, &client.user_id, &close).await.unwrap();

    let rename: UpdateCaseRequest = serde_json::from_value(serde_json::json!({"title": "New title"})).unwrap();
    let result = db.update_case(case.case_id, &client.user_id, &rename).await;
    assert!(matches!(result, Err(PostgresError::Conflict(_))));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_undo_keeps_conversation_with_messages() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    let recorded = db
        .record_swipe(&client.user_id, &lawyer.user_id, SwipeDirection::Right)
        .await
        .unwrap();
    let conversation_id = recorded.conversation_id.unwrap();
    db.send_message(conversation_id, &client.user_id, "Are you available next week?")
        .await
        .unwrap();

    let undone = db.undo_last_swipe(&client.user_id).await.unwrap();
    assert!(!undone.conversation_removed);
    assert!(db.get_conversation(conversation_id).await.is_ok());
    assert_eq!(db.list_messages(conversation_id, None).await.unwrap().len(), 1);

    let again = db
        .record_swipe(&client.user_id, &lawyer.user_id, SwipeDirection::Right)
        .await
        .unwrap();
    assert_eq!(again.conversation_id, Some(conversation_id));

    let conversation = db.get_conversation(conversation_id).await.unwrap();
    assert_eq!(conversation.match_id, Some(again.swipe.swipe_id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_start_conversation_reuses_the_pair() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    let (first, _) = db
        .start_conversation(&client.user_id, &lawyer.user_id, "First question", None)
        .await
        .unwrap();
    let (second, message) = db
        .start_conversation(&client.user_id, &lawyer.user_id, "Second question", None)
        .await
        .unwrap();

    assert_eq!(first.conversation_id, second.conversation_id);
    assert_eq!(second.latest_message_id, Some(message.message_id));

    let inbox = db.list_conversations(&lawyer.user_id).await.unwrap();
    let summary = inbox
        .iter()
        .find(|s| s.conversation.conversation_id == first.conversation_id)
        .unwrap();
    assert_eq!(summary.unread_count, 2);
    assert_eq!(db.list_messages(first.conversation_id, None).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_messages_since_are_strictly_newer() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    let (conversation, first) = db
        .start_conversation(&client.user_id, &lawyer.user_id, "One", None)
        .await
        .unwrap();
    let second = db
        .send_message(conversation.conversation_id, &lawyer.user_id, "Two")
        .await
        .unwrap();
    let third = db
        .send_message(conversation.conversation_id, &client.user_id, "Three")
        .await
        .unwrap();

    assert!(first.timestamp < second.timestamp);
    assert!(second.timestamp < third.timestamp);

    let newer = db
        .list_messages(conversation.conversation_id, Some(second.timestamp))
        .await
        .unwrap();
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].message_id, third.message_id);

    let none = db
        .list_messages(conversation.conversation_id, Some(third.timestamp))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_polling_since_sees_every_concurrent_message() {
    let db = Arc::new(connect_with(10).await);
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    let (conversation, _) = db
        .start_conversation(&client.user_id, &lawyer.user_id, "Opening", None)
        .await
        .unwrap();
    let conversation_id = conversation.conversation_id;

    let senders: Vec<_> = (0..8)
        .map(|i| {
            let db = db.clone();
            let sender = if i % 2 == 0 { client.user_id.clone() } else { lawyer.user_id.clone() };
            tokio::spawn(async move {
                for n in 0..5 {
                    db.send_message(conversation_id, &sender, &format!("sender {} message {}", i, n))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();

    let mut received = Vec::new();
    let mut since = None;
    loop {
        let finished = senders.iter().all(|handle| handle.is_finished());
        let batch = db.list_messages(conversation_id, since).await.unwrap();
        if let Some(last) = batch.last() {
            since = Some(last.timestamp);
        }
        received.extend(batch);
        if finished {
            break;
        }
    }

    for handle in senders {
        handle.await.unwrap();
    }

    let ids: HashSet<_> = received.iter().map(|m| m.message_id).collect();
    assert_eq!(ids.len(), received.len());
    assert_eq!(received.len(), 41);
    for window in received.windows(2) {
        assert!(window[0].timestamp < window[1].timestamp);
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_shared_case_text_reaches_conversation() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    let case = db
        .create_case(&client.user_id, "Land dispute", "Neighbor built over the boundary", &[])
        .await
        .unwrap();
    let (conversation, _) = db
        .start_conversation(&client.user_id, &lawyer.user_id, "Hello", None)
        .await
        .unwrap();

    let shared = db
        .send_message(conversation.conversation_id, &client.user_id, &case.share_text())
        .await
        .unwrap();
    assert!(shared.content.contains("Land dispute"));
    assert!(shared.content.contains("Neighbor built over the boundary"));

    let messages = db.list_messages(conversation.conversation_id, None).await.unwrap();
    assert_eq!(messages.last().unwrap().message_id, shared.message_id);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_mark_read_ignores_other_conversations() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();
    let stranger = db.create_account(new_account(UserType::Client, &[])).await.unwrap();

    let (_, message) = db
        .start_conversation(&client.user_id, &lawyer.user_id, "Private matter", None)
        .await
        .unwrap();

    assert_eq!(db.mark_read(&stranger.user_id, &[message.message_id]).await.unwrap(), 0);
    assert_eq!(db.mark_read(&lawyer.user_id, &[message.message_id]).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_case_edits_are_trimmed_and_hire_sticks() {
    let db = connect().await;
    let client = db.create_account(new_account(UserType::Client, &[])).await.unwrap();
    let lawyer = db.create_account(new_account(UserType::Lawyer, &[])).await.unwrap();

    let case = db
        .create_case(&client.user_id, "Unpaid wages", "Employer withheld pay", &[])
        .await
        .unwrap();

    let hire: UpdateCaseRequest = serde_json::from_value(serde_json::json!({
        "title": "  Unpaid overtime  ",
        "description": "\tThree months unpaid\n",
        "hired_lawyer_id": lawyer.user_id,
    }))
    .unwrap();
    let updated = db.update_case(case.case_id, &client.user_id, &hire).await.unwrap();
    assert_eq!(updated.title, "Unpaid overtime");
    assert_eq!(updated.description, "Three months unpaid");
    assert_eq!(updated.hired_lawyer_id.as_deref(), Some(lawyer.user_id.as_str()));

    let progress: UpdateCaseRequest =
        serde_json::from_value(serde_json::json!({"status": "in_progress"})).unwrap();
    let updated = db.update_case(case.case_id, &client.user_id, &progress).await.unwrap();
    assert_eq!(updated.hired_lawyer_id.as_deref(), Some(lawyer.user_id.as_str()));
}

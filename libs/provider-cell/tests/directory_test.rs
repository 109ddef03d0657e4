use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use provider_cell::{
    CareProvider, DirectoryError, InMemoryProviderDirectory, ProviderDirectory,
    ShiftWindow, SupabaseProviderDirectory,
};
use shared_database::SupabaseClient;

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

#[tokio::test]
async fn test_in_memory_lists_only_active_members_of_group() {
    let physical = CareProvider::new(Uuid::new_v4(), "Dr. Ade", "physical");
    let mut retired = CareProvider::new(Uuid::new_v4(), "Dr. Bello", "physical");
    retired.active = false;
    let mental = CareProvider::new(Uuid::new_v4(), "Ms. Chi", "mental");

    let directory = InMemoryProviderDirectory::with_providers(vec![
        physical.clone(),
        retired,
        mental,
    ]);

    let found = directory.list_active_in_group("Physical").await.unwrap();
    assert_eq!(found, vec![physical]);
}

#[tokio::test]
async fn test_set_active_removes_provider_from_listing() {
    let provider = CareProvider::new(Uuid::new_v4(), "Dr. Ade", "mental");
    let directory = InMemoryProviderDirectory::with_providers(vec![provider.clone()]);

    directory.set_active(provider.staff_id, false).await;

    assert!(directory.list_active_in_group("mental").await.unwrap().is_empty());
    assert!(directory.get(provider.staff_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_upsert_adds_and_replaces_by_staff_id() {
    let directory = InMemoryProviderDirectory::new();
    let mut provider = CareProvider::new(Uuid::new_v4(), "Dr. Ade", "physical");
    directory.upsert(provider.clone()).await;
    assert_eq!(directory.list_active_in_group("physical").await.unwrap(), vec![provider.clone()]);

    provider.specialty_group = "mental".to_string();
    directory.upsert(provider.clone()).await;

    assert!(directory.list_active_in_group("physical").await.unwrap().is_empty());
    assert_eq!(directory.list_active_in_group("mental").await.unwrap(), vec![provider]);
}

#[test]
fn test_shift_window_is_half_open() {
    let provider = CareProvider::new(Uuid::new_v4(), "Dr. Ade", "physical")
        .with_shift(ShiftWindow { weekday: Weekday::Mon, start: t(9, 0), end: t(12, 0) });
    let monday = NaiveDate::from_ymd_opt(2025, 6, 23).unwrap();
    let tuesday = NaiveDate::from_ymd_opt(2025, 6, 24).unwrap();

    assert!(provider.on_shift(monday, t(9, 0)));
    assert!(provider.on_shift(monday, t(11, 40)));
    assert!(!provider.on_shift(monday, t(12, 0)));
    assert!(!provider.on_shift(tuesday, t(10, 0)));
}

#[tokio::test]
async fn test_supabase_directory_filters_by_group_and_active() {
    let mock_server = MockServer::start().await;
    let staff_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/care_providers"))
        .and(query_param("specialty_group", "eq.mental"))
        .and(query_param("active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "staff_id": staff_id,
                "display_name": "Ms. Chi",
                "specialty_group": "mental",
                "active": true
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = SupabaseProviderDirectory::from_client(
        SupabaseClient::with_base_url(&mock_server.uri(), "service-key"),
    );

    let found = directory.list_active_in_group("Mental").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].staff_id, staff_id);
    assert!(found[0].weekly_shifts.is_empty());
}

#[tokio::test]
async fn test_supabase_directory_surfaces_backend_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/care_providers"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let directory = SupabaseProviderDirectory::from_client(
        SupabaseClient::with_base_url(&mock_server.uri(), "service-key"),
    );

    assert_matches!(directory.get(Uuid::new_v4()).await, Err(DirectoryError::Backend(_)));
}

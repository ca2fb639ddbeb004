//! Tests for the counter service.

use std::collections::HashMap;
use std::sync::Arc;

use super::*;
use crate::domain::fixtures::{branch, counter, fixture_clock, fixture_timestamp};
use crate::domain::ports::{
    CounterActivityQueryError, MockBranchRepository, MockCounterActivityQuery,
    MockCounterRepository, FixtureBranchActivityQuery, FixtureUserDirectory,
};
use crate::domain::{Branch, DeviceId, DeviceSession, ErrorCode};
use chrono::Duration;
use rstest::rstest;

struct Harness {
    counters: MockCounterRepository,
    branches: MockBranchRepository,
    activity: MockCounterActivityQuery,
}

impl Harness {
    fn new() -> Self {
        Self {
            counters: MockCounterRepository::new(),
            branches: MockBranchRepository::new(),
            activity: MockCounterActivityQuery::new(),
        }
    }

    /// `branch` is live; projections of it report no active counters.
    fn live_branch(mut self, branch: Branch) -> Self {
        self.branches
            .expect_find_by_id()
            .returning(move |_| Ok(Some(branch.clone())));
        self.counters
            .expect_active_counts()
            .returning(|_| Ok(HashMap::new()));
        self
    }

    fn build(self) -> CounterService {
        CounterService::new(
            Arc::new(self.counters),
            Arc::new(self.branches),
            Arc::new(self.activity),
            Arc::new(FixtureBranchActivityQuery),
            Arc::new(FixtureUserDirectory),
            fixture_clock(),
        )
    }
}

fn draft(branch_id: BranchId, number: i64, device: Option<&str>) -> CounterDraft {
    CounterDraft {
        branch_id,
        number,
        name: format!("Counter {number}"),
        device_id: device.map(str::to_owned),
        is_active: true,
    }
}

fn field_messages(error: &Error, field: &str) -> usize {
    error
        .details()
        .and_then(|details| details["fieldErrors"][field].as_array())
        .map_or(0, Vec::len)
}

#[rstest]
#[tokio::test]
async fn create_rejects_duplicate_number_in_branch() {
    let branch_a = branch("BR1");
    let branch_id = branch_a.id;
    let mut harness = Harness::new().live_branch(branch_a);
    harness
        .counters
        .expect_find_by_number()
        .return_once(|_, _| Ok(Some(CounterId::random())));
    harness.counters.expect_insert().times(0);

    let error = harness
        .build()
        .create(&UserId::random(), draft(branch_id, 1, None))
        .await
        .expect_err("number taken");
    assert_eq!(field_messages(&error, "counter_number"), 1);
}

#[rstest]
#[tokio::test]
async fn create_rejects_device_held_elsewhere() {
    let branch_a = branch("BR1");
    let branch_id = branch_a.id;
    let mut harness = Harness::new().live_branch(branch_a);
    harness
        .counters
        .expect_find_by_number()
        .return_once(|_, _| Ok(None));
    harness
        .counters
        .expect_find_by_device()
        .withf(|device| device.as_str() == "DEV-100")
        .return_once(|_| Ok(Some(CounterId::random())));
    harness.counters.expect_insert().times(0);

    let error = harness
        .build()
        .create(&UserId::random(), draft(branch_id, 2, Some("DEV-100")))
        .await
        .expect_err("device in use");
    assert_eq!(field_messages(&error, "device_id"), 1);
    assert_eq!(field_messages(&error, "counter_number"), 0);
}

#[rstest]
#[tokio::test]
async fn create_rejects_counter_number_zero_without_lookups() {
    let mut harness = Harness::new();
    harness.branches.expect_find_by_id().times(0);

    let error = harness
        .build()
        .create(&UserId::random(), draft(BranchId::random(), 0, None))
        .await
        .expect_err("number must be positive");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(field_messages(&error, "counter_number"), 1);
}

#[rstest]
#[tokio::test]
async fn create_requires_live_branch() {
    let mut harness = Harness::new();
    harness
        .branches
        .expect_find_by_id()
        .return_once(|_| Ok(None));
    harness.counters.expect_find_by_number().times(0);

    let error = harness
        .build()
        .create(&UserId::random(), draft(BranchId::random(), 1, None))
        .await
        .expect_err("branch missing");
    assert_eq!(field_messages(&error, "branch"), 1);
}

#[rstest]
#[tokio::test]
async fn create_persists_valid_counter() {
    let branch_a = branch("BR1");
    let branch_id = branch_a.id;
    let mut harness = Harness::new().live_branch(branch_a);
    harness
        .counters
        .expect_find_by_number()
        .return_once(|_, _| Ok(None));
    harness
        .counters
        .expect_find_by_device()
        .return_once(|_| Ok(None));
    harness
        .counters
        .expect_insert()
        .withf(move |counter| counter.branch_id == branch_id && counter.number.get() == 2)
        .times(1)
        .return_once(|_| Ok(()));
    harness
        .activity
        .expect_latest_session()
        .return_once(|_| Ok(None));

    let detail = harness
        .build()
        .create(&UserId::random(), draft(branch_id, 2, Some("DEV-200")))
        .await
        .expect("counter created");
    assert_eq!(detail.branch.branch.code.as_str(), "BR1");
    assert_eq!(detail.current_user, Derived::Available(None));
}

#[rstest]
#[tokio::test]
async fn update_to_own_number_and_device_succeeds() {
    let branch_a = branch("BR1");
    let existing = counter(branch_a.id, 1, Some("DEV-100"));
    let own_id = existing.id;
    let mut harness = Harness::new().live_branch(branch_a);
    harness
        .counters
        .expect_find_by_id()
        .returning(move |_| Ok(Some(existing.clone())));
    harness
        .counters
        .expect_find_by_number()
        .return_once(move |_, _| Ok(Some(own_id)));
    harness
        .counters
        .expect_find_by_device()
        .return_once(move |_| Ok(Some(own_id)));
    harness
        .counters
        .expect_update()
        .times(1)
        .return_once(|_| Ok(()));
    harness
        .activity
        .expect_latest_session()
        .return_once(|_| Ok(None));
    let changes = CounterChanges {
        number: Some(1),
        name: Some("Renamed".to_owned()),
        ..CounterChanges::default()
    };

    let detail = harness
        .build()
        .update(&UserId::random(), &own_id, changes)
        .await
        .expect("self-exclusion applies");
    assert_eq!(detail.counter.name, "Renamed");
    assert_eq!(detail.counter.updated_at, fixture_timestamp());
}

#[rstest]
#[tokio::test]
async fn update_colliding_with_sibling_number_fails() {
    let branch_a = branch("BR1");
    let existing = counter(branch_a.id, 2, None);
    let own_id = existing.id;
    let mut harness = Harness::new().live_branch(branch_a);
    harness
        .counters
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(existing)));
    harness
        .counters
        .expect_find_by_number()
        .return_once(|_, _| Ok(Some(CounterId::random())));
    harness.counters.expect_update().times(0);

    let error = harness
        .build()
        .update(
            &UserId::random(),
            &own_id,
            CounterChanges {
                number: Some(1),
                ..CounterChanges::default()
            },
        )
        .await
        .expect_err("collision");
    assert_eq!(field_messages(&error, "counter_number"), 1);
}

#[rstest]
#[tokio::test]
async fn assign_in_use_device_without_force_fails() {
    let target = counter(BranchId::random(), 2, None);
    let mut harness = Harness::new();
    harness
        .counters
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(target)));
    harness
        .counters
        .expect_find_by_device()
        .return_once(|_| Ok(Some(CounterId::random())));
    harness.counters.expect_reassign_device().times(0);

    let error = harness
        .build()
        .assign_device(
            &UserId::random(),
            &CounterId::random(),
            CounterAssignment {
                device_id: DeviceId::parse("DEV-100").expect("valid device"),
                force: false,
            },
        )
        .await
        .expect_err("device in use");
    assert_eq!(field_messages(&error, "device_id"), 1);
}

#[rstest]
#[tokio::test]
async fn forced_assignment_moves_device_from_previous_counter() {
    let branch_a = branch("BR1");
    let target = counter(branch_a.id, 2, None);
    let target_id = target.id;
    let previous = CounterId::random();
    let mut moved = target.clone();
    moved.device_id = Some(DeviceId::parse("DEV-100").expect("valid device"));

    let mut harness = Harness::new().live_branch(branch_a);
    let mut loads = vec![moved, target];
    harness
        .counters
        .expect_find_by_id()
        .times(2)
        .returning(move |_| Ok(loads.pop()));
    harness
        .counters
        .expect_find_by_device()
        .return_once(move |_| Ok(Some(previous)));
    harness
        .counters
        .expect_reassign_device()
        .withf(move |device, from, to, _| {
            device.as_str() == "DEV-100" && *from == Some(previous) && *to == target_id
        })
        .times(1)
        .return_once(|_, _, _, _| Ok(()));
    harness
        .activity
        .expect_latest_session()
        .return_once(|_| Ok(None));

    let detail = harness
        .build()
        .assign_device(
            &UserId::random(),
            &target_id,
            CounterAssignment {
                device_id: DeviceId::parse("DEV-100").expect("valid device"),
                force: true,
            },
        )
        .await
        .expect("forced assignment");
    assert_eq!(
        detail.counter.device_id.as_ref().map(DeviceId::as_str),
        Some("DEV-100")
    );
}

#[rstest]
#[case::recent(10, true)]
#[case::stale(45, false)]
#[tokio::test]
async fn detail_reports_current_user_within_window(#[case] minutes_ago: i64, #[case] present: bool) {
    let branch_a = branch("BR1");
    let existing = counter(branch_a.id, 1, Some("DEV-100"));
    let id = existing.id;
    let mut harness = Harness::new().live_branch(branch_a);
    harness
        .counters
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(existing)));
    harness.activity.expect_latest_session().return_once(move |_| {
        Ok(Some(DeviceSession {
            user_id: UserId::random(),
            user_email: "desk@clinic.test".to_owned(),
            user_name: "Front Desk".to_owned(),
            last_seen: fixture_timestamp() - Duration::minutes(minutes_ago),
        }))
    });

    let detail = harness.build().get(&id).await.expect("detail");
    assert_eq!(detail.current_user.or_default().is_some(), present);
}

#[rstest]
#[tokio::test]
async fn detail_yields_null_user_when_sessions_unavailable() {
    let branch_a = branch("BR1");
    let existing = counter(branch_a.id, 1, Some("DEV-100"));
    let id = existing.id;
    let mut harness = Harness::new().live_branch(branch_a);
    harness
        .counters
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(existing)));
    harness
        .activity
        .expect_latest_session()
        .return_once(|_| Err(CounterActivityQueryError::unavailable("no sessions relation")));

    let detail = harness.build().get(&id).await.expect("detail");
    assert_eq!(detail.current_user, Derived::Unavailable);
    assert_eq!(detail.current_user.or_default(), None);
}

#[rstest]
#[tokio::test]
async fn list_denormalises_branch_name_and_code() {
    let branch_a = branch("BR1");
    let branch_id = branch_a.id;
    let mut harness = Harness::new();
    harness.counters.expect_list().return_once(move |_| {
        Ok(vec![
            counter(branch_id, 1, None),
            counter(branch_id, 2, Some("DEV-2")),
        ])
    });
    harness
        .branches
        .expect_find_by_ids()
        .return_once(move |_| Ok(vec![branch_a]));

    let items = harness
        .build()
        .list(Some(branch_id))
        .await
        .expect("list");
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.branch_code.as_str() == "BR1"));
}

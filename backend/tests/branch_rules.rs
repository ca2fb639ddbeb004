//! Branch lifecycle rules exercised through the services and the in-memory
//! store.

use std::sync::Arc;

use backend::domain::ports::{BranchCommand, BranchQuery, BranchRepository, SyncQuery};
use backend::domain::{
    AppointmentTotals, BranchChanges, BranchConfiguration, BranchDraft, BranchSearch, Derived,
    EodAction, EodRequest, Error, ErrorCode, ExportRequest, SyncRequest, UserId, UserSummary,
};
use backend::test_support::{FixedClock, InMemoryStore, Services};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

struct World {
    store: Arc<InMemoryStore>,
    clock: Arc<FixedClock>,
    services: Services,
    actor: UserId,
}

fn opening_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time")
}

fn draft(name: &str, code: &str, city: &str) -> BranchDraft {
    BranchDraft {
        name: name.to_owned(),
        code: code.to_owned(),
        address: format!("1 {name} Street"),
        phone: "+91 80 5555 0100".to_owned(),
        email: None,
        city: Some(city.to_owned()),
        state: Some("Karnataka".to_owned()),
        latitude: Some(Decimal::new(12_971_599, 6)),
        longitude: Some(Decimal::new(77_594_566, 6)),
        opening_time: time(9),
        closing_time: time(18),
        is_active: true,
    }
}

fn field_messages(err: &Error, field: &str) -> Vec<String> {
    err.details()
        .and_then(|details| details["fieldErrors"][field].as_array())
        .map(|messages| {
            messages
                .iter()
                .filter_map(|message| message.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

fn lock() -> EodRequest {
    EodRequest {
        action: EodAction::Lock,
        reason: Some("day closed".to_owned()),
    }
}

fn unlock() -> EodRequest {
    EodRequest {
        action: EodAction::Unlock,
        reason: None,
    }
}

#[fixture]
fn world() -> World {
    let store = InMemoryStore::new();
    let clock = FixedClock::new(opening_day());
    let services = Services::new(&store, clock.clone());
    World {
        store,
        clock,
        services,
        actor: UserId::random(),
    }
}

#[rstest]
#[tokio::test]
async fn duplicate_codes_are_rejected_until_the_holder_is_deleted(world: World) {
    let first = world
        .services
        .branches
        .create(&world.actor, draft("Main", "main01", "Bengaluru"))
        .await
        .expect("first branch");
    assert_eq!(first.branch.code.as_str(), "MAIN01");

    let err = world
        .services
        .branches
        .create(&world.actor, draft("Other", "MAIN01", "Mysuru"))
        .await
        .expect_err("duplicate code");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        field_messages(&err, "code"),
        vec!["branch with this code already exists"]
    );

    world
        .services
        .branches
        .delete(&world.actor, &first.branch.id)
        .await
        .expect("delete");
    world
        .services
        .branches
        .create(&world.actor, draft("Other", "MAIN01", "Mysuru"))
        .await
        .expect("code free after soft delete");
}

#[rstest]
#[tokio::test]
async fn closing_before_opening_is_rejected(world: World) {
    let mut bad = draft("Night", "NIGHT", "Bengaluru");
    bad.opening_time = time(20);
    bad.closing_time = time(8);

    let err = world
        .services
        .branches
        .create(&world.actor, bad)
        .await
        .expect_err("hours out of order");
    assert_eq!(
        field_messages(&err, "closing_time"),
        vec!["opening time must be before closing time"]
    );
}

#[rstest]
#[tokio::test]
async fn eod_lock_freezes_hours_and_activity(world: World) {
    let created = world
        .services
        .branches
        .create(&world.actor, draft("Main", "MAIN", "Bengaluru"))
        .await
        .expect("branch");
    let id = created.branch.id;
    world.store.add_user(UserSummary {
        id: world.actor,
        email: "manager@clinic.test".to_owned(),
        name: "Branch Manager".to_owned(),
    });

    let locked = world
        .services
        .branches
        .transition_eod(&world.actor, &id, lock())
        .await
        .expect("lock");
    assert!(locked.branch.is_eod_locked());
    assert_eq!(
        locked.locked_by.map(|user| user.email),
        Some("manager@clinic.test".to_owned())
    );

    let err = world
        .services
        .branches
        .update(
            &world.actor,
            &id,
            BranchChanges {
                opening_time: Some(time(8)),
                is_active: Some(false),
                ..BranchChanges::default()
            },
        )
        .await
        .expect_err("frozen fields");
    assert_eq!(
        field_messages(&err, "opening_time"),
        vec!["cannot modify opening_time while branch is EOD locked"]
    );
    assert!(!field_messages(&err, "is_active").is_empty());

    let renamed = world
        .services
        .branches
        .update(
            &world.actor,
            &id,
            BranchChanges {
                name: Some("Main Clinic".to_owned()),
                opening_time: Some(time(9)),
                ..BranchChanges::default()
            },
        )
        .await
        .expect("unchanged hours and other fields are allowed");
    assert_eq!(renamed.branch.name, "Main Clinic");
}

#[rstest]
#[tokio::test]
async fn repeated_transitions_conflict_and_last_lock_survives(world: World) {
    let id = world
        .services
        .branches
        .create(&world.actor, draft("Main", "MAIN", "Bengaluru"))
        .await
        .expect("branch")
        .branch
        .id;

    let err = world
        .services
        .branches
        .transition_eod(&world.actor, &id, unlock())
        .await
        .expect_err("not locked yet");
    assert_eq!(err.code(), ErrorCode::Conflict);

    world
        .services
        .branches
        .transition_eod(&world.actor, &id, lock())
        .await
        .expect("lock");
    let err = world
        .services
        .branches
        .transition_eod(&world.actor, &id, lock())
        .await
        .expect_err("already locked");
    assert_eq!(err.code(), ErrorCode::Conflict);

    world.clock.advance(Duration::days(3));
    let unlocked = world
        .services
        .branches
        .transition_eod(&world.actor, &id, unlock())
        .await
        .expect("unlock");
    assert!(!unlocked.branch.is_eod_locked());
    assert_eq!(unlocked.branch.last_locked_at, Some(opening_day()));

    let stats = world.services.branches.stats(&id).await.expect("stats");
    assert_eq!(stats.days_since_last_lock, Some(3));
    assert!(!stats.is_eod_locked);
}

#[rstest]
#[tokio::test]
async fn stale_writes_cannot_undo_a_lock_or_a_delete(world: World) {
    let id = world
        .services
        .branches
        .create(&world.actor, draft("Main", "MAIN", "Bengaluru"))
        .await
        .expect("branch")
        .branch
        .id;
    let mut stale = world.store.branch(&id).expect("stored branch");
    stale.is_active = false;

    world
        .services
        .branches
        .transition_eod(&world.actor, &id, lock())
        .await
        .expect("lock");
    let written = BranchRepository::update(world.store.as_ref(), &stale, None)
        .await
        .expect("guarded update");
    assert!(!written);
    let current = world.store.branch(&id).expect("stored branch");
    assert!(current.is_eod_locked());
    assert!(current.is_active);

    world
        .services
        .branches
        .delete(&world.actor, &id)
        .await
        .expect("delete");
    let locked_at = current.eod_locked_at();
    let written = BranchRepository::update(world.store.as_ref(), &current, locked_at)
        .await
        .expect("guarded update");
    assert!(!written);
    assert!(world.store.branch(&id).expect("row kept").is_deleted());
    let err = world
        .services
        .branches
        .get(&id)
        .await
        .expect_err("deleted branch stays hidden");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn disabled_locking_is_a_conflict(world: World) {
    let id = world
        .services
        .branches
        .create(&world.actor, draft("Main", "MAIN", "Bengaluru"))
        .await
        .expect("branch")
        .branch
        .id;
    let mut configuration = BranchConfiguration::default();
    configuration.settings.enable_eod_locking = false;
    world
        .services
        .branches
        .save_configuration(&world.actor, &id, configuration)
        .await
        .expect("save configuration");

    let err = world
        .services
        .branches
        .transition_eod(&world.actor, &id, lock())
        .await
        .expect_err("locking disabled");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn search_filters_and_paginates(world: World) {
    for (name, code, city) in [
        ("Alpha", "ALPHA", "Bengaluru"),
        ("Beta", "BETA", "Mysuru"),
        ("Gamma", "GAMMA", "Bengaluru"),
    ] {
        world
            .services
            .branches
            .create(&world.actor, draft(name, code, city))
            .await
            .expect("branch");
    }

    let mut search = BranchSearch::default()
        .paginate(Some(1), Some(1))
        .expect("valid pagination");
    search.city = Some("bengaluru".to_owned());
    let page = world.services.branches.search(search).await.expect("search");

    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].branch.name, "Alpha");

    let mut search = BranchSearch::default();
    search.q = Some("gam".to_owned());
    let page = world.services.branches.search(search).await.expect("search");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].branch.code.as_str(), "GAMMA");
}

#[rstest]
#[tokio::test]
async fn missing_activity_degrades_to_unavailable(world: World) {
    let id = world
        .services
        .branches
        .create(&world.actor, draft("Main", "MAIN", "Bengaluru"))
        .await
        .expect("branch")
        .branch
        .id;
    world.store.set_active_staff(id, 4);
    world.store.set_appointment_totals(
        id,
        AppointmentTotals {
            total_patients: 9,
            ..AppointmentTotals::default()
        },
    );

    let detail = world.services.branches.get(&id).await.expect("detail");
    assert_eq!(detail.active_staff, Derived::Available(4));
    let stats = world.services.branches.stats(&id).await.expect("stats");
    assert_eq!(stats.appointments.or_default().total_patients, 9);

    world.store.make_payments_unavailable();
    let stats = world.services.branches.stats(&id).await.expect("stats");
    assert_eq!(stats.payments, Derived::Unavailable);
    assert_eq!(stats.appointments.or_default().total_patients, 9);

    world.store.make_activity_unavailable();
    let detail = world.services.branches.get(&id).await.expect("detail");
    assert_eq!(detail.active_staff, Derived::Unavailable);
    assert_eq!(detail.appointments_today, Derived::Unavailable);
    let stats = world.services.branches.stats(&id).await.expect("stats");
    assert_eq!(stats.appointments, Derived::Unavailable);
    assert_eq!(stats.payments, Derived::Unavailable);
}

#[rstest]
#[tokio::test]
async fn export_respects_inactive_flag(world: World) {
    let mut closed = draft("Closed", "CLOSED", "Mysuru");
    closed.is_active = false;
    world
        .services
        .branches
        .create(&world.actor, closed)
        .await
        .expect("inactive branch");
    world
        .services
        .branches
        .create(&world.actor, draft("Open", "OPEN", "Mysuru"))
        .await
        .expect("active branch");

    let active_only = world
        .services
        .branches
        .export(ExportRequest::new(None, false, false).expect("json"))
        .await
        .expect("export");
    assert_eq!(active_only.exported_at, opening_day());
    assert_eq!(active_only.branches.len(), 1);
    assert!(active_only.counters.is_none());

    let everything = world
        .services
        .branches
        .export(ExportRequest::new(Some("json"), true, true).expect("json"))
        .await
        .expect("export");
    assert_eq!(everything.branches.len(), 2);
    assert_eq!(everything.counters.map(|rows| rows.len()), Some(0));
}

#[rstest]
#[tokio::test]
async fn sync_reports_changes_after_the_cursor(world: World) {
    let first = world
        .services
        .branches
        .create(&world.actor, draft("First", "FIRST", "Bengaluru"))
        .await
        .expect("branch");
    let cursor = world.clock.utc();
    world.clock.advance(Duration::minutes(5));
    world
        .services
        .branches
        .create(&world.actor, draft("Second", "SECOND", "Bengaluru"))
        .await
        .expect("branch");
    world
        .services
        .branches
        .delete(&world.actor, &first.branch.id)
        .await
        .expect("delete");

    let request = SyncRequest::new(Some(cursor), None).expect("default include");
    let payload = world.services.sync.sync(request).await.expect("sync");
    let branches = payload.branches.expect("branches included");

    assert_eq!(branches.len(), 2);
    assert!(branches.iter().any(|branch| branch.deleted_at.is_some()));
    assert!(payload.counters.is_none());
    assert_eq!(payload.server_time, opening_day() + Duration::minutes(5));
}

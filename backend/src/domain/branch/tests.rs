//! Tests for branch validation rules.

use super::*;
use crate::domain::fixtures::{branch, branch_draft, fixture_timestamp, hm};
use rstest::rstest;

fn dec(raw: &str) -> Decimal {
    raw.parse().expect("decimal literal")
}

fn locked(mut branch: Branch) -> Branch {
    branch.eod_lock = Some(EodLock {
        locked_at: fixture_timestamp(),
        locked_by: Some(UserId::random()),
    });
    branch
}

#[rstest]
#[case(" br1 ", "BR1")]
#[case("north-02", "NORTH-02")]
fn code_is_trimmed_and_upper_cased(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(BranchCode::parse(raw).expect("valid").as_str(), expected);
}

#[rstest]
#[case("", BranchCodeError::Blank)]
#[case("   ", BranchCodeError::Blank)]
#[case("ABCDEFGHIJKLMNOPQRSTU", BranchCodeError::TooLong { max: BRANCH_CODE_MAX })]
fn code_rejects_invalid_input(#[case] raw: &str, #[case] expected: BranchCodeError) {
    assert_eq!(BranchCode::parse(raw), Err(expected));
}

#[rstest]
fn draft_returns_normalised_code() {
    let code = branch_draft("br1").validate().expect("valid draft");
    assert_eq!(code.as_str(), "BR1");
}

#[rstest]
#[case::equal(hm(9, 0), hm(9, 0))]
#[case::reversed(hm(18, 0), hm(9, 0))]
fn draft_rejects_unordered_hours_on_both_fields(
    #[case] opening: NaiveTime,
    #[case] closing: NaiveTime,
) {
    let mut draft = branch_draft("BR1");
    draft.opening_time = opening;
    draft.closing_time = closing;

    let errors = draft.validate().expect_err("hours must be ordered");
    assert_eq!(errors.messages_for("opening_time"), vec![HOURS_ORDER_MESSAGE]);
    assert_eq!(errors.messages_for("closing_time"), vec![HOURS_ORDER_MESSAGE]);
}

#[rstest]
fn draft_collects_every_field_violation() {
    let mut draft = branch_draft(" ");
    draft.name = String::new();
    draft.email = Some("clinic.test".to_owned());
    draft.latitude = Some(dec("91.0"));
    draft.longitude = Some(dec("-180.5"));

    let errors = draft.validate().expect_err("draft is invalid");
    for field in ["code", "name", "email", "latitude", "longitude"] {
        assert!(errors.has_field(field), "missing violation for {field}");
    }
}

#[rstest]
fn update_rejects_hours_that_cross_stored_opening() {
    let existing = branch("BR1");
    let changes = BranchChanges {
        closing_time: Some(hm(8, 0)),
        ..BranchChanges::default()
    };

    let errors = changes.validate_against(&existing).expect_err("closing before opening");
    assert!(errors.has_field("opening_time"));
    assert!(errors.has_field("closing_time"));
}

#[rstest]
fn update_returns_code_only_when_changed() {
    let existing = branch("BR1");
    let same = BranchChanges {
        code: Some("br1".to_owned()),
        ..BranchChanges::default()
    };
    let different = BranchChanges {
        code: Some("br2".to_owned()),
        ..BranchChanges::default()
    };

    assert_eq!(same.validate_against(&existing), Ok(None));
    assert_eq!(
        different
            .validate_against(&existing)
            .expect("valid change")
            .map(String::from),
        Some("BR2".to_owned())
    );
}

#[rstest]
fn locked_branch_rejects_each_restricted_field() {
    let existing = locked(branch("BR1"));
    let changes = BranchChanges {
        opening_time: Some(hm(8, 0)),
        closing_time: Some(hm(20, 0)),
        is_active: Some(false),
        ..BranchChanges::default()
    };

    let errors = changes.validate_against(&existing).expect_err("branch is locked");
    assert_eq!(errors.len(), 3);
    for field in ["opening_time", "closing_time", "is_active"] {
        assert_eq!(errors.messages_for(field).len(), 1, "{field}");
    }
}

#[rstest]
fn locked_branch_accepts_unrestricted_fields() {
    let existing = locked(branch("BR1"));
    let changes = BranchChanges {
        name: Some("Renamed".to_owned()),
        phone: Some("+91 80 5555 0199".to_owned()),
        ..BranchChanges::default()
    };

    assert_eq!(changes.validate_against(&existing), Ok(None));
}

#[rstest]
fn locked_branch_accepts_restricted_fields_echoing_stored_values() {
    let existing = locked(branch("BR1"));
    let changes = BranchChanges {
        is_active: Some(existing.is_active),
        opening_time: Some(existing.opening_time),
        ..BranchChanges::default()
    };

    assert!(check_eod_restrictions(&existing, &changes).is_empty());
}

#[rstest]
fn code_availability_excludes_the_branch_itself() {
    let id = BranchId::random();
    assert!(check_code_available(Some(id), Some(id)).is_empty());
    assert!(check_code_available(None, None).is_empty());
    assert_eq!(
        check_code_available(Some(id), None).messages_for("code"),
        vec![DUPLICATE_CODE_MESSAGE]
    );
}

#[rstest]
fn apply_overwrites_supplied_fields_only() {
    let mut existing = branch("BR1");
    let original_address = existing.address.clone();
    let changes = BranchChanges {
        name: Some("  East Wing ".to_owned()),
        closing_time: Some(hm(20, 0)),
        ..BranchChanges::default()
    };

    existing.apply(changes, Some(BranchCode::parse("EW1").expect("valid")));

    assert_eq!(existing.name, "East Wing");
    assert_eq!(existing.code.as_str(), "EW1");
    assert_eq!(existing.closing_time, hm(20, 0));
    assert_eq!(existing.address, original_address);
}

#[rstest]
#[case("")]
#[case("   ")]
fn blank_email_clears_the_stored_address(#[case] blank: &str) {
    let mut existing = branch("BR1");
    existing.email = Some("main@clinic.test".to_owned());
    let changes = BranchChanges {
        email: Some(blank.to_owned()),
        city: Some(String::new()),
        ..BranchChanges::default()
    };

    let code = changes.validate_against(&existing).expect("blank email is a clear");
    existing.apply(changes, code);
    assert_eq!(existing.email, None);
    assert_eq!(existing.city, None);
}

#[rstest]
fn email_update_is_trimmed() {
    let mut existing = branch("BR1");
    let changes = BranchChanges {
        email: Some(" desk@clinic.test ".to_owned()),
        ..BranchChanges::default()
    };

    let code = changes.validate_against(&existing).expect("valid email");
    existing.apply(changes, code);
    assert_eq!(existing.email.as_deref(), Some("desk@clinic.test"));
}

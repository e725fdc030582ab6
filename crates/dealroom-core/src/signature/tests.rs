//! Tests for signature tracking.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::*;
use crate::agreement::{TextTemplateRenderer, VersioningService};
use crate::model::{Deal, NegotiationScope, PropertyDetails, RequestStatus, SellerIdentity};
use crate::store::{EntityStore, MemoryStore};
use crate::terms::{Compensation, Terms};

fn terms() -> Terms {
    Terms {
        compensation: Compensation::PercentageOfSale { basis_points: 250 },
        agreement_length_months: 6,
        notes: None,
    }
}

fn signed_at() -> chrono::DateTime<Utc> {
    // A Tuesday, so review-hold math stays inside the week unless a test
    // wants otherwise.
    Utc.with_ymd_and_hms(2026, 3, 3, 15, 30, 0).unwrap()
}

struct Fixture {
    store: Arc<MemoryStore>,
    tracker: SignatureTracker,
    room_id: String,
    version_id: String,
}

/// Seeds a deal in `state` with one accepted room and a sent agreement.
async fn fixture(state: &str) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let deal = store
        .create_deal(Deal::new(
            "inv-1",
            PropertyDetails {
                street_address: "12 Chestnut St".to_string(),
                city: "Newark".to_string(),
                state: state.to_string(),
                postal_code: "07102".to_string(),
            },
            SellerIdentity {
                name: "Sam Seller".to_string(),
                email: None,
                phone: None,
            },
            terms(),
        ))
        .await
        .unwrap();
    let mut room = Room::new(&deal.id, "inv-1", "agent-a", terms());
    room.request_status = RequestStatus::Accepted;
    let room = store.create_room(room).await.unwrap();

    let versioning = VersioningService::new(
        Arc::clone(&store) as Arc<dyn EntityStore>,
        Arc::new(TextTemplateRenderer::new()),
    );
    let version = versioning
        .regenerate(&room.id, ParticipantRole::Investor, "inv-1")
        .await
        .unwrap();

    let tracker = SignatureTracker::new(
        Arc::clone(&store) as Arc<dyn EntityStore>,
        ReviewHoldPolicy::default(),
    );
    tracker
        .mark_sent(&version.id, Some("env-1"), ParticipantRole::Investor, "inv-1")
        .await
        .unwrap();

    Fixture {
        store,
        tracker,
        room_id: room.id,
        version_id: version.id,
    }
}

#[tokio::test]
async fn test_investor_cannot_sign_before_sent() {
    let f = fixture("TX").await;
    // Regenerate a fresh draft that was never sent.
    let versioning = VersioningService::new(
        Arc::clone(&f.store) as Arc<dyn EntityStore>,
        Arc::new(TextTemplateRenderer::new()),
    );
    let mut room = f.store.get_room(&f.room_id).await.unwrap();
    room.terms.agreement_length_months = 9;
    f.store.update_room(&room).await.unwrap();
    let draft = versioning
        .regenerate(&f.room_id, ParticipantRole::Investor, "inv-1")
        .await
        .unwrap();

    let result = f
        .tracker
        .record_signature(&draft.id, PartyRole::Investor, "inv-1", signed_at())
        .await;
    assert!(matches!(
        result,
        Err(SignatureError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_investor_signature_recorded_and_mirrored() {
    let f = fixture("TX").await;
    let outcome = f
        .tracker
        .record_signature(&f.version_id, PartyRole::Investor, "inv-1", signed_at())
        .await
        .unwrap();

    let SignatureOutcome::Recorded { version } = outcome else {
        panic!("expected Recorded outcome");
    };
    assert_eq!(version.status, AgreementStatus::InvestorSigned);
    assert!(version.investor_signature.is_some());

    let room = f.store.get_room(&f.room_id).await.unwrap();
    assert_eq!(room.agreement_status, AgreementStatus::InvestorSigned);
}

#[tokio::test]
async fn test_agent_cannot_sign_before_investor() {
    let f = fixture("TX").await;
    let result = f
        .tracker
        .record_signature(&f.version_id, PartyRole::Agent, "agent-a", signed_at())
        .await;
    assert!(matches!(
        result,
        Err(SignatureError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_agent_signature_completes_outside_review_states() {
    let f = fixture("TX").await;
    f.tracker
        .record_signature(&f.version_id, PartyRole::Investor, "inv-1", signed_at())
        .await
        .unwrap();
    let outcome = f
        .tracker
        .record_signature(&f.version_id, PartyRole::Agent, "agent-a", signed_at())
        .await
        .unwrap();

    let SignatureOutcome::FullyExecuted { version } = outcome else {
        panic!("expected FullyExecuted outcome");
    };
    assert_eq!(version.status, AgreementStatus::FullySigned);
    assert!(version.agent_signature.is_some());
    assert_eq!(version.review_ends_at, None);

    let room = f.store.get_room(&f.room_id).await.unwrap();
    assert!(room.is_fully_signed());
}

#[tokio::test]
async fn test_review_state_diverts_to_hold() {
    let f = fixture("NJ").await;
    f.tracker
        .record_signature(&f.version_id, PartyRole::Investor, "inv-1", signed_at())
        .await
        .unwrap();
    let outcome = f
        .tracker
        .record_signature(&f.version_id, PartyRole::Agent, "agent-a", signed_at())
        .await
        .unwrap();

    let SignatureOutcome::ReviewPending {
        version,
        review_ends_at,
    } = outcome
    else {
        panic!("expected ReviewPending outcome");
    };
    assert_eq!(version.status, AgreementStatus::AttorneyReviewPending);
    // Tuesday + 3 business days = Friday.
    assert_eq!(
        review_ends_at,
        Utc.with_ymd_and_hms(2026, 3, 6, 15, 30, 0).unwrap()
    );
}

#[tokio::test]
async fn test_release_respects_hold_end() {
    let f = fixture("NJ").await;
    f.tracker
        .record_signature(&f.version_id, PartyRole::Investor, "inv-1", signed_at())
        .await
        .unwrap();
    f.tracker
        .record_signature(&f.version_id, PartyRole::Agent, "agent-a", signed_at())
        .await
        .unwrap();

    // Thursday: still inside the hold.
    let early = Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
    assert!(f.tracker.release_review_holds(early).await.unwrap().is_empty());

    // The following Monday: hold elapsed.
    let late = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
    let released = f.tracker.release_review_holds(late).await.unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].status, AgreementStatus::FullySigned);

    let room = f.store.get_room(&f.room_id).await.unwrap();
    assert!(room.is_fully_signed());
}

#[tokio::test]
async fn test_resigning_same_role_is_rejected_without_new_audit() {
    let f = fixture("TX").await;
    f.tracker
        .record_signature(&f.version_id, PartyRole::Investor, "inv-1", signed_at())
        .await
        .unwrap();

    let before = f.store.activity_count().await;
    let result = f
        .tracker
        .record_signature(&f.version_id, PartyRole::Investor, "inv-1", signed_at())
        .await;
    assert!(matches!(result, Err(SignatureError::AlreadySigned { .. })));
    assert_eq!(f.store.activity_count().await, before);

    // The original signature block survives unchanged.
    let version = f.store.get_agreement(&f.version_id).await.unwrap();
    assert_eq!(version.investor_signature.unwrap().signer_id, "inv-1");
}

#[tokio::test]
async fn test_stale_version_signature_rejected() {
    let f = fixture("TX").await;
    f.tracker
        .record_signature(&f.version_id, PartyRole::Investor, "inv-1", signed_at())
        .await
        .unwrap();

    // Terms change regenerates the document while the agent's signature is
    // in flight.
    let versioning = VersioningService::new(
        Arc::clone(&f.store) as Arc<dyn EntityStore>,
        Arc::new(TextTemplateRenderer::new()),
    );
    let mut room = f.store.get_room(&f.room_id).await.unwrap();
    room.terms.agreement_length_months = 9;
    f.store.update_room(&room).await.unwrap();
    let v2 = versioning
        .regenerate(&f.room_id, ParticipantRole::Investor, "inv-1")
        .await
        .unwrap();

    let result = f
        .tracker
        .record_signature(&f.version_id, PartyRole::Agent, "agent-a", signed_at())
        .await;
    assert!(matches!(result, Err(SignatureError::StaleVersion { .. })));

    // The new version is untouched.
    let fresh = f.store.get_agreement(&v2.id).await.unwrap();
    assert_eq!(fresh.status, AgreementStatus::Draft);
    assert!(fresh.agent_signature.is_none());
}

#[tokio::test]
async fn test_mark_sent_twice_rejected() {
    let f = fixture("TX").await;
    let result = f
        .tracker
        .mark_sent(&f.version_id, Some("env-2"), ParticipantRole::Investor, "inv-1")
        .await;
    assert!(matches!(
        result,
        Err(SignatureError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_legacy_deal_scoped_version_rejected() {
    let f = fixture("TX").await;
    let room = f.store.get_room(&f.room_id).await.unwrap();
    let legacy = f
        .store
        .create_agreement(AgreementVersion::new(
            NegotiationScope::Deal(room.deal_id.clone()),
            &room.deal_id,
            1,
            SignerMode::DualSign,
            terms(),
            "hash",
            "doc://legacy",
            "TX",
        ))
        .await
        .unwrap();

    let result = f
        .tracker
        .record_signature(&legacy.id, PartyRole::Investor, "inv-1", signed_at())
        .await;
    assert!(matches!(result, Err(SignatureError::LegacyScope { .. })));
}

#[tokio::test]
async fn test_investor_only_document_executes_on_investor_signature() {
    let f = fixture("TX").await;
    let mut room = f.store.get_room(&f.room_id).await.unwrap();

    let base = f
        .store
        .create_agreement(AgreementVersion::new(
            NegotiationScope::Room(room.id.clone()),
            &room.deal_id,
            99,
            SignerMode::InvestorOnly,
            terms(),
            "hash",
            "doc://base-terms",
            "TX",
        ))
        .await
        .unwrap();
    room.current_agreement_id = Some(base.id.clone());
    f.store.update_room(&room).await.unwrap();

    f.tracker
        .mark_sent(&base.id, None, ParticipantRole::Investor, "inv-1")
        .await
        .unwrap();
    let outcome = f
        .tracker
        .record_signature(&base.id, PartyRole::Investor, "inv-1", signed_at())
        .await
        .unwrap();
    assert!(matches!(outcome, SignatureOutcome::FullyExecuted { .. }));

    let result = f
        .tracker
        .record_signature(&base.id, PartyRole::Agent, "agent-a", signed_at())
        .await;
    assert!(matches!(
        result,
        Err(SignatureError::InvalidTransition { .. })
    ));
}

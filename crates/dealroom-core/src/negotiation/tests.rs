//! Tests for the negotiation ledger.

use std::sync::Arc;

use super::*;
use crate::model::{Deal, PropertyDetails, RequestStatus, SellerIdentity};
use crate::store::{EntityStore, MemoryStore};
use crate::terms::{Compensation, Terms};

fn terms() -> Terms {
    Terms {
        compensation: Compensation::PercentageOfSale { basis_points: 250 },
        agreement_length_months: 6,
        notes: None,
    }
}

fn shorter_delta() -> TermsDelta {
    TermsDelta {
        agreement_length_months: Some(3),
        ..TermsDelta::default()
    }
}

async fn seed_deal(store: &MemoryStore, investor_id: &str) -> Deal {
    store
        .create_deal(Deal::new(
            investor_id,
            PropertyDetails {
                street_address: "12 Chestnut St".to_string(),
                city: "Newark".to_string(),
                state: "NJ".to_string(),
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
        .unwrap()
}

async fn seed_room(store: &MemoryStore, deal: &Deal, agent_id: &str) -> Room {
    let mut room = Room::new(&deal.id, &deal.investor_id, agent_id, terms());
    room.request_status = RequestStatus::Accepted;
    store.create_room(room).await.unwrap()
}

fn ledger(store: &Arc<MemoryStore>) -> NegotiationLedger {
    NegotiationLedger::new(Arc::clone(store) as Arc<dyn EntityStore>)
}

#[tokio::test]
async fn test_propose_creates_pending_targeting_counterparty() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let counter = ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-a",
            shorter_delta(),
        )
        .await
        .unwrap();

    assert_eq!(counter.status, CounterStatus::Pending);
    assert_eq!(counter.from_role, PartyRole::Agent);
    assert_eq!(counter.to_role, PartyRole::Investor);
    assert_eq!(counter.terms_snapshot, terms());
}

#[tokio::test]
async fn test_second_proposal_supersedes_first() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);
    let scope = NegotiationScope::Room(room.id.clone());

    let c1 = ledger
        .propose_counter(&scope, PartyRole::Agent, "agent-a", shorter_delta())
        .await
        .unwrap();
    let c2 = ledger
        .propose_counter(
            &scope,
            PartyRole::Investor,
            "inv-1",
            TermsDelta {
                agreement_length_months: Some(9),
                ..TermsDelta::default()
            },
        )
        .await
        .unwrap();

    let old = store.get_counter(&c1.id).await.unwrap();
    assert_eq!(old.status, CounterStatus::Superseded);
    assert!(old.resolved_at.is_some());

    let pending = store.pending_counter_for_scope(&scope).await.unwrap();
    assert_eq!(pending.map(|c| c.id), Some(c2.id));
}

#[tokio::test]
async fn test_wrong_actor_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let result = ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-b",
            shorter_delta(),
        )
        .await;
    assert!(matches!(result, Err(NegotiationError::NotParticipant { .. })));
}

#[tokio::test]
async fn test_closed_room_rejects_proposals() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let mut closed = store.get_room(&room.id).await.unwrap();
    closed.request_status = RequestStatus::Expired;
    store.update_room(&closed).await.unwrap();

    let result = ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-a",
            shorter_delta(),
        )
        .await;
    assert!(matches!(result, Err(NegotiationError::RoomClosed { .. })));
}

#[tokio::test]
async fn test_empty_delta_rejected() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let result = ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-a",
            TermsDelta::default(),
        )
        .await;
    assert!(matches!(result, Err(NegotiationError::EmptyDelta)));
}

#[tokio::test]
async fn test_accept_merges_into_room_terms_only() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room_a = seed_room(&store, &deal, "agent-a").await;
    let room_b = seed_room(&store, &deal, "agent-b").await;
    let ledger = ledger(&store);

    let counter = ledger
        .propose_counter(
            &NegotiationScope::Room(room_a.id.clone()),
            PartyRole::Agent,
            "agent-a",
            TermsDelta {
                compensation: Some(Compensation::FlatFee {
                    amount_cents: 750_000,
                }),
                ..TermsDelta::default()
            },
        )
        .await
        .unwrap();

    let accepted = ledger
        .accept_counter(&counter.id, PartyRole::Investor, "inv-1")
        .await
        .unwrap();
    assert_eq!(accepted.counter.status, CounterStatus::Accepted);
    assert_eq!(
        accepted.room.terms.compensation,
        Compensation::FlatFee {
            amount_cents: 750_000
        }
    );

    // The sibling room's terms are untouched.
    let sibling = store.get_room(&room_b.id).await.unwrap();
    assert_eq!(sibling.terms, terms());
}

#[tokio::test]
async fn test_only_recipient_can_accept() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let counter = ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-a",
            shorter_delta(),
        )
        .await
        .unwrap();

    // The proposer cannot accept their own offer.
    let result = ledger
        .accept_counter(&counter.id, PartyRole::Agent, "agent-a")
        .await;
    assert!(matches!(
        result,
        Err(NegotiationError::NotTheRecipient { .. })
    ));
}

#[tokio::test]
async fn test_accept_non_pending_rejected() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);
    let scope = NegotiationScope::Room(room.id.clone());

    let c1 = ledger
        .propose_counter(&scope, PartyRole::Agent, "agent-a", shorter_delta())
        .await
        .unwrap();
    // Superseded by a newer offer.
    ledger
        .propose_counter(
            &scope,
            PartyRole::Investor,
            "inv-1",
            TermsDelta {
                agreement_length_months: Some(9),
                ..TermsDelta::default()
            },
        )
        .await
        .unwrap();

    let result = ledger
        .accept_counter(&c1.id, PartyRole::Investor, "inv-1")
        .await;
    assert!(matches!(result, Err(NegotiationError::NotPending { .. })));
}

#[tokio::test]
async fn test_reject_leaves_terms_untouched() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let counter = ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-a",
            shorter_delta(),
        )
        .await
        .unwrap();
    let rejected = ledger
        .reject_counter(&counter.id, PartyRole::Investor, "inv-1")
        .await
        .unwrap();
    assert_eq!(rejected.status, CounterStatus::Rejected);

    let unchanged = store.get_room(&room.id).await.unwrap();
    assert_eq!(unchanged.terms, terms());
}

#[tokio::test]
async fn test_legacy_deal_scope_with_single_live_room() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let counter = ledger
        .propose_counter(
            &NegotiationScope::Deal(deal.id.clone()),
            PartyRole::Investor,
            "inv-1",
            shorter_delta(),
        )
        .await
        .unwrap();

    // Normalized to the resolved room's scope on write.
    assert_eq!(counter.scope, NegotiationScope::Room(room.id.clone()));
}

#[tokio::test]
async fn test_legacy_deal_scope_with_multiple_live_rooms_is_ambiguous() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    seed_room(&store, &deal, "agent-a").await;
    seed_room(&store, &deal, "agent-b").await;
    let ledger = ledger(&store);

    let result = ledger
        .propose_counter(
            &NegotiationScope::Deal(deal.id.clone()),
            PartyRole::Investor,
            "inv-1",
            shorter_delta(),
        )
        .await;
    assert!(matches!(
        result,
        Err(NegotiationError::AmbiguousLegacyScope { live_rooms: 2, .. })
    ));
}

#[tokio::test]
async fn test_legacy_pending_counter_superseded_by_room_scoped_proposal() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    // A migrated deal-scoped pending counter.
    let legacy = store
        .create_counter(CounterOffer::new(
            NegotiationScope::Deal(deal.id.clone()),
            &deal.id,
            PartyRole::Investor,
            shorter_delta(),
            terms(),
        ))
        .await
        .unwrap();

    ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-a",
            TermsDelta {
                agreement_length_months: Some(9),
                ..TermsDelta::default()
            },
        )
        .await
        .unwrap();

    let old = store.get_counter(&legacy.id).await.unwrap();
    assert_eq!(old.status, CounterStatus::Superseded);
}

#[tokio::test]
async fn test_audit_trail_for_propose_and_accept() {
    let store = Arc::new(MemoryStore::new());
    let deal = seed_deal(&store, "inv-1").await;
    let room = seed_room(&store, &deal, "agent-a").await;
    let ledger = ledger(&store);

    let counter = ledger
        .propose_counter(
            &NegotiationScope::Room(room.id.clone()),
            PartyRole::Agent,
            "agent-a",
            shorter_delta(),
        )
        .await
        .unwrap();
    ledger
        .accept_counter(&counter.id, PartyRole::Investor, "inv-1")
        .await
        .unwrap();

    let activities = store.activities_for_deal(&deal.id).await.unwrap();
    let actions: Vec<&str> = activities.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(actions, vec!["counter.proposed", "counter.accepted"]);
}

use chrono::{Duration, Utc};
use marea_catalog::CaptainRef;
use marea_core::DomainError;
use marea_dispatch::testing::{CaptainFixture, InMemoryDispatch};
use marea_dispatch::{
    CreateLiveRide, DispatchConfig, LiveRideDispatcher, LiveRideOfferStatus, LiveRideStatus,
};
use marea_shared::Route;
use marea_trip::TripStatus;
use std::sync::Arc;
use uuid::Uuid;

fn dispatcher_with(
    store: &Arc<InMemoryDispatch>,
    priority_captain_id: Option<Uuid>,
) -> LiveRideDispatcher {
    let config = DispatchConfig {
        priority_captain_id,
        ..DispatchConfig::default()
    };
    LiveRideDispatcher::new(store.clone(), store.clone(), config)
}

fn captain(store: &Arc<InMemoryDispatch>, seniority_days: i64) -> CaptainFixture {
    let fixture = CaptainFixture::new(
        6,
        vec![Route::Rumbo1, Route::Rumbo2],
        Utc::now() - Duration::days(seniority_days),
    );
    store.add_captain(fixture.clone());
    fixture
}

fn as_ref(fixture: &CaptainFixture) -> CaptainRef {
    CaptainRef {
        id: fixture.captain_id,
        user_id: fixture.user_id,
    }
}

fn ride(route: Route, passenger_count: i32, hours: i32) -> CreateLiveRide {
    CreateLiveRide {
        route,
        passenger_count,
        hours,
    }
}

#[tokio::test]
async fn test_create_offers_first_eligible_captain() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();

    assert_eq!(created.status, LiveRideStatus::Offered);
    assert_eq!(created.offered_to_captain_id, Some(c1.captain_id));
    assert_eq!(created.hourly_rate_cents, 6000);
    assert_eq!(created.subtotal_cents, 24000);
    assert_eq!(created.commission_cents, 4320);
    assert_eq!(created.total_cents, 28320);

    let offers = store.offers_for(created.id);
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].status, LiveRideOfferStatus::Offered);
    assert_eq!(offers[0].captain_id, c1.captain_id);
    assert_eq!(offers[0].boat_id, c1.boat_id);

    // notification inserted alongside the offer
    assert_eq!(store.notifications_for(c1.user_id).len(), 1);
}

#[tokio::test]
async fn test_create_validates_input() {
    let store = Arc::new(InMemoryDispatch::new());
    captain(&store, 1);
    let dispatcher = dispatcher_with(&store, None);

    let err = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 0, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_create_with_no_candidates_is_a_conflict() {
    let store = Arc::new(InMemoryDispatch::new());
    let dispatcher = dispatcher_with(&store, None);

    let err = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap_err();
    match err {
        DomainError::Conflict(msg) => assert!(msg.contains("No captains available")),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_capacity_and_route_filter_candidates() {
    let store = Arc::new(InMemoryDispatch::new());
    // only seats 2, and never serves Rumbo3
    let small = CaptainFixture::new(2, vec![Route::Rumbo1], Utc::now() - Duration::days(30));
    store.add_captain(small);
    let dispatcher = dispatcher_with(&store, None);

    let err = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 4, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let err = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo3, 2, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn test_reject_cascades_to_next_captain() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 20);
    let c2 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    assert_eq!(created.offered_to_captain_id, Some(c1.captain_id));

    dispatcher
        .reject_offer(created.id, &as_ref(&c1))
        .await
        .unwrap();

    let request = store.request(created.id).unwrap();
    assert_eq!(request.status, LiveRideStatus::Offered);
    assert_eq!(request.offered_to_captain_id, Some(c2.captain_id));

    let offers = store.offers_for(created.id);
    assert_eq!(offers.len(), 2);
    assert_eq!(offers[0].captain_id, c1.captain_id);
    assert_eq!(offers[0].status, LiveRideOfferStatus::Rejected);
    assert_eq!(offers[1].captain_id, c2.captain_id);
    assert_eq!(offers[1].status, LiveRideOfferStatus::Offered);

    assert_eq!(store.notifications_for(c2.user_id).len(), 1);
}

#[tokio::test]
async fn test_reject_with_no_candidates_reverts_to_requested() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 5);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    dispatcher
        .reject_offer(created.id, &as_ref(&c1))
        .await
        .unwrap();

    let request = store.request(created.id).unwrap();
    assert_eq!(request.status, LiveRideStatus::Requested);
    assert_eq!(request.offered_to_captain_id, None);
    assert_eq!(request.trip_id, None);
}

#[tokio::test]
async fn test_accept_materializes_an_active_trip() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 5);
    let dispatcher = dispatcher_with(&store, None);

    let requester = Uuid::new_v4();
    let created = dispatcher
        .create_request(requester, &ride(Route::Rumbo2, 3, 5))
        .await
        .unwrap();

    let trip = dispatcher
        .accept_offer(created.id, &as_ref(&c1))
        .await
        .unwrap();

    assert_eq!(trip.status, TripStatus::Active);
    assert_eq!(trip.boat_id, c1.boat_id);
    assert_eq!(trip.created_by_id, requester);
    assert_eq!(trip.end_at - trip.start_at, Duration::hours(5));
    assert_eq!(trip.pricing_snapshot.kind, "LIVE_RIDE_FIXED");
    assert_eq!(trip.pricing_snapshot.hourly_rate_cents, 8000);
    assert_eq!(trip.total_cents, created.total_cents);

    let request = store.request(created.id).unwrap();
    assert_eq!(request.status, LiveRideStatus::Accepted);
    assert_eq!(request.trip_id, Some(trip.id));

    let offers = store.offers_for(created.id);
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].status, LiveRideOfferStatus::Accepted);
}

#[tokio::test]
async fn test_accept_guards() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 10);
    let c2 = captain(&store, 5);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();

    // unknown request
    let err = dispatcher
        .accept_offer(Uuid::new_v4(), &as_ref(&c1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    // not the offered captain
    let err = dispatcher
        .accept_offer(created.id, &as_ref(&c2))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // double accept: request no longer offered
    dispatcher
        .accept_offer(created.id, &as_ref(&c1))
        .await
        .unwrap();
    let err = dispatcher
        .accept_offer(created.id, &as_ref(&c1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_priority_captain_is_selected_first() {
    let store = Arc::new(InMemoryDispatch::new());
    let _older = captain(&store, 30);
    let favored = captain(&store, 1);
    let dispatcher = dispatcher_with(&store, Some(favored.captain_id));

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    assert_eq!(created.offered_to_captain_id, Some(favored.captain_id));
}

#[tokio::test]
async fn test_exclusion_is_cumulative_across_the_request() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 20);
    let c2 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();

    dispatcher
        .reject_offer(created.id, &as_ref(&c1))
        .await
        .unwrap();
    // c1 is still eligible in the directory, but must never be re-offered
    dispatcher
        .reject_offer(created.id, &as_ref(&c2))
        .await
        .unwrap();

    let request = store.request(created.id).unwrap();
    assert_eq!(request.status, LiveRideStatus::Requested);
    assert_eq!(request.offered_to_captain_id, None);

    let offers = store.offers_for(created.id);
    assert_eq!(offers.len(), 2);
    assert!(offers
        .iter()
        .all(|o| o.status == LiveRideOfferStatus::Rejected));
}

#[tokio::test]
async fn test_at_most_one_open_offer_per_request() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 30);
    let c2 = captain(&store, 20);
    let _c3 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();

    for captain in [&c1, &c2] {
        let open: Vec<_> = store
            .offers_for(created.id)
            .into_iter()
            .filter(|o| o.status == LiveRideOfferStatus::Offered)
            .collect();
        assert_eq!(open.len(), 1);
        dispatcher
            .reject_offer(created.id, &as_ref(captain))
            .await
            .unwrap();
    }

    let open: Vec<_> = store
        .offers_for(created.id)
        .into_iter()
        .filter(|o| o.status == LiveRideOfferStatus::Offered)
        .collect();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn test_sweep_ignores_fresh_offers() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 5);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();

    let expired = dispatcher.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(expired, 0);

    let request = store.request(created.id).unwrap();
    assert_eq!(request.offered_to_captain_id, Some(c1.captain_id));
}

#[tokio::test]
async fn test_sweep_expires_stale_offer_and_cascades() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 20);
    let c2 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    let first_offer = store.offers_for(created.id).remove(0);
    store.backdate_offer(first_offer.id, Utc::now() - Duration::seconds(61));

    let expired = dispatcher.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(expired, 1);

    let request = store.request(created.id).unwrap();
    assert_eq!(request.status, LiveRideStatus::Offered);
    assert_eq!(request.offered_to_captain_id, Some(c2.captain_id));

    let offers = store.offers_for(created.id);
    assert_eq!(offers[0].captain_id, c1.captain_id);
    assert_eq!(offers[0].status, LiveRideOfferStatus::Rejected);
    assert_eq!(offers[1].captain_id, c2.captain_id);
    assert_eq!(offers[1].status, LiveRideOfferStatus::Offered);
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let store = Arc::new(InMemoryDispatch::new());
    let _c1 = captain(&store, 20);
    let _c2 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    let first_offer = store.offers_for(created.id).remove(0);
    store.backdate_offer(first_offer.id, Utc::now() - Duration::seconds(90));

    assert_eq!(dispatcher.sweep_expired(Utc::now()).await.unwrap(), 1);
    // the second pass finds nothing eligible
    assert_eq!(dispatcher.sweep_expired(Utc::now()).await.unwrap(), 0);

    let after = store.request(created.id).unwrap();
    assert_eq!(after.status, LiveRideStatus::Offered);
    assert_eq!(store.offers_for(created.id).len(), 2);
}

#[tokio::test]
async fn test_sweep_with_no_candidates_reverts_request() {
    let store = Arc::new(InMemoryDispatch::new());
    let _c1 = captain(&store, 5);
    let dispatcher = dispatcher_with(&store, None);

    let created = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    let offer = store.offers_for(created.id).remove(0);
    store.backdate_offer(offer.id, Utc::now() - Duration::seconds(120));

    assert_eq!(dispatcher.sweep_expired(Utc::now()).await.unwrap(), 1);

    let request = store.request(created.id).unwrap();
    assert_eq!(request.status, LiveRideStatus::Requested);
    assert_eq!(request.offered_to_captain_id, None);
}

#[tokio::test]
async fn test_busy_boat_is_not_eligible() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    // occupy c1's boat with an active trip covering the next hours
    let requester = Uuid::new_v4();
    let created = dispatcher
        .create_request(requester, &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    dispatcher
        .accept_offer(created.id, &as_ref(&c1))
        .await
        .unwrap();

    let err = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn test_expired_captain_can_serve_other_requests() {
    let store = Arc::new(InMemoryDispatch::new());
    let c1 = captain(&store, 10);
    let dispatcher = dispatcher_with(&store, None);

    // c1 times out on the first request
    let first = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    let offer = store.offers_for(first.id).remove(0);
    store.backdate_offer(offer.id, Utc::now() - Duration::seconds(90));
    dispatcher.sweep_expired(Utc::now()).await.unwrap();

    // exclusion is per-request: a fresh request still reaches c1
    let second = dispatcher
        .create_request(Uuid::new_v4(), &ride(Route::Rumbo1, 2, 4))
        .await
        .unwrap();
    assert_eq!(second.offered_to_captain_id, Some(c1.captain_id));
}

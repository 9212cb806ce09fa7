//! Integration tests for feed visibility flags and the reconciliation sweep

mod common;

use common::{database::*, fixtures::*};
use podium::visibility::Feed;

#[actix_rt::test]
async fn test_sweep_reveals_entry_once_round_starts() {
    let (service, clock) = setup_service(jan(5, 0, 0, 0)).await.unwrap();
    let db = service.db();
    let round = create_january_round(db, 1).await.unwrap();

    let entry = service
        .submit_entry(1, round.id, 100, &content(1), None)
        .await
        .unwrap();
    assert!(entry.visible_in_competition_feed);
    assert!(!entry.visible_in_normal_feed);

    // Nothing to do before the start
    assert_eq!(service.reconcile_visibility().await.unwrap(), 0);
    assert!(!get_entry(db, entry.id).await.unwrap().visible_in_normal_feed);

    // Time passes with no mutation; the flag stays stale until a sweep runs
    clock.set(jan(10, 0, 0, 0));
    assert!(!get_entry(db, entry.id).await.unwrap().visible_in_normal_feed);

    assert_eq!(service.reconcile_visibility().await.unwrap(), 1);
    let swept = get_entry(db, entry.id).await.unwrap();
    assert!(swept.visible_in_normal_feed);
    assert!(swept.visible_in_competition_feed);
    assert_eq!(swept.post_id, Some(1));

    // Running it again changes nothing
    assert_eq!(service.reconcile_visibility().await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_sweep_skips_withdrawn_entries() {
    let (service, clock) = setup_service(jan(5, 0, 0, 0)).await.unwrap();
    let db = service.db();
    let round = create_january_round(db, 1).await.unwrap();

    let kept = service
        .submit_entry(1, round.id, 100, &content(1), None)
        .await
        .unwrap();
    let withdrawn = service
        .submit_entry(1, round.id, 200, &content(2), None)
        .await
        .unwrap();
    service.delete_entry(withdrawn.id).await.unwrap();

    clock.set(jan(12, 0, 0, 0));
    assert_eq!(service.reconcile_visibility().await.unwrap(), 1);

    let withdrawn = get_entry(db, withdrawn.id).await.unwrap();
    assert!(!withdrawn.visible_in_normal_feed);
    assert!(!withdrawn.visible_in_competition_feed);

    let normal = service.visible_entries(round.id, Feed::Normal).await.unwrap();
    assert_eq!(normal.len(), 1);
    assert_eq!(normal[0].id, kept.id);
}

#[actix_rt::test]
async fn test_sweep_leaves_upcoming_rounds_alone() {
    let (service, clock) = setup_service(jan(5, 0, 0, 0)).await.unwrap();
    let db = service.db();
    let early = create_round(db, 1, jan(8, 0, 0, 0), jan(9, 0, 0, 0)).await.unwrap();
    let late = create_round(db, 1, jan(25, 0, 0, 0), jan(30, 0, 0, 0)).await.unwrap();

    service
        .submit_entry(1, early.id, 100, &content(1), None)
        .await
        .unwrap();
    let pending = service
        .submit_entry(1, late.id, 100, &content(2), None)
        .await
        .unwrap();

    clock.set(jan(8, 12, 0, 0));
    assert_eq!(service.reconcile_visibility().await.unwrap(), 1);
    assert!(!get_entry(db, pending.id).await.unwrap().visible_in_normal_feed);
}

#[actix_rt::test]
async fn test_competition_feed_shows_entries_before_start() {
    let (service, _clock) = setup_service(jan(5, 0, 0, 0)).await.unwrap();
    let round = create_january_round(service.db(), 1).await.unwrap();

    let a = service
        .submit_entry(1, round.id, 100, &content(1), None)
        .await
        .unwrap();
    let b = service
        .submit_entry(1, round.id, 200, &content(2), None)
        .await
        .unwrap();

    let competition = service
        .visible_entries(round.id, Feed::Competition)
        .await
        .unwrap();
    let ids: Vec<i32> = competition.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);

    assert!(service
        .visible_entries(round.id, Feed::Normal)
        .await
        .unwrap()
        .is_empty());
}

#[actix_rt::test]
async fn test_edit_recomputes_flags() {
    let (service, _clock) = setup_service(jan(5, 0, 0, 0)).await.unwrap();
    let round = create_january_round(service.db(), 1).await.unwrap();

    let entry = service
        .submit_entry(1, round.id, 100, &content(1), None)
        .await
        .unwrap();
    let edited = service
        .edit_entry(entry.id, &content(2), None)
        .await
        .unwrap();

    assert!(edited.visible_in_competition_feed);
    assert!(!edited.visible_in_normal_feed);
}

//! Entry lifecycle coordinator.
//!
//! Every mutation runs in exactly one transaction that covers the entry row,
//! its visibility flags and its sticker usages, so no reader can observe a
//! submission without matching sticker and visibility accounting. Lookups
//! needed only for validation happen before the transaction opens.
//!
//! Deleting an entry and withdrawing the content it points at converge on
//! the same end state: content cleared, hidden from both feeds, every sticker
//! usage on its media reclaimed.

use crate::allocator::{self, Capacity, StickerCatalog};
use crate::error::{EntryError, Resource};
use crate::orm::{entries, rounds};
use crate::registry::{self, ContentRef};
use crate::round_clock::{round_state, Clock, RoundState};
use crate::visibility::{self, Feed};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for the coordinator.
#[derive(Clone, Debug)]
pub struct LifecycleSettings {
    /// Attempts per operation when the database reports a serialization conflict
    pub max_attempts: u32,
    /// How long sticker metadata stays cached for pre-transaction validation
    pub sticker_cache_ttl: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            sticker_cache_ttl: Duration::from_secs(30),
        }
    }
}

/// Request-scoped entry point for every lifecycle operation.
///
/// Owns the connection pool, the clock and the sticker cache; handlers get it
/// through `web::Data`.
pub struct EntryService {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    stickers: StickerCatalog,
    settings: LifecycleSettings,
}

impl EntryService {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>, settings: LifecycleSettings) -> Self {
        Self {
            stickers: StickerCatalog::new(settings.sticker_cache_ttl),
            db,
            clock,
            settings,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Submits content as the user's entry for a round, optionally applying a sticker.
    pub async fn submit_entry(
        &self,
        competition_id: i32,
        round_id: i32,
        user_id: i32,
        content: &ContentRef,
        sticker_id: Option<i32>,
    ) -> Result<entries::Model, EntryError> {
        content.validate()?;

        let round = registry::find_round(&self.db, round_id).await?;
        if round.competition_id != competition_id {
            return Err(EntryError::NotFound(Resource::Round, round_id));
        }
        if let Some(sticker_id) = sticker_id {
            self.check_sticker_scope(sticker_id, round.competition_id)
                .await?;
        }

        let round = &round;
        let entry = self
            .retrying("submit_entry", move || async move {
                let txn = self.db.begin().await?;
                let result = self
                    .submit_in(&txn, round, user_id, content, sticker_id)
                    .await;
                finish(txn, result).await
            })
            .await?;

        log::info!(
            "User {} submitted post {} to round {} as entry {}",
            user_id,
            content.post_id,
            round_id,
            entry.id
        );
        Ok(entry)
    }

    async fn submit_in(
        &self,
        txn: &DatabaseTransaction,
        round: &rounds::Model,
        user_id: i32,
        content: &ContentRef,
        sticker_id: Option<i32>,
    ) -> Result<entries::Model, EntryError> {
        let now = self.clock.now();
        let entry = registry::submit(txn, round, user_id, content, now).await?;
        if let Some(sticker_id) = sticker_id {
            allocator::apply_sticker(txn, sticker_id, &content.media_url, now).await?;
        }
        Ok(entry)
    }

    /// Replaces the content of an entry whose round has not started.
    ///
    /// Stickers on the old media are reclaimed and the requested sticker is
    /// applied to the new media in the same transaction; if allocation fails
    /// the old usages stay as they were.
    pub async fn edit_entry(
        &self,
        entry_id: i32,
        content: &ContentRef,
        sticker_id: Option<i32>,
    ) -> Result<entries::Model, EntryError> {
        content.validate()?;

        let entry = registry::find_entry(&self.db, entry_id).await?;
        let round = registry::find_round(&self.db, entry.round_id).await?;
        if let Some(sticker_id) = sticker_id {
            self.check_sticker_scope(sticker_id, round.competition_id)
                .await?;
        }

        let round = &round;
        let entry = self
            .retrying("edit_entry", move || async move {
                let txn = self.db.begin().await?;
                let result = self
                    .edit_in(&txn, entry_id, round, content, sticker_id)
                    .await;
                finish(txn, result).await
            })
            .await?;

        log::info!("Entry {} now points at post {}", entry_id, content.post_id);
        Ok(entry)
    }

    async fn edit_in(
        &self,
        txn: &DatabaseTransaction,
        entry_id: i32,
        round: &rounds::Model,
        content: &ContentRef,
        sticker_id: Option<i32>,
    ) -> Result<entries::Model, EntryError> {
        let now = self.clock.now();
        registry::ensure_editable(round, now)?;

        let entry = registry::find_entry(txn, entry_id).await?;
        if !entry.is_submitted() {
            return Err(EntryError::NotFound(Resource::Entry, entry_id));
        }

        if let Some(old_media) = entry.media_url.as_deref() {
            allocator::reclaim_media(txn, old_media, now).await?;
        }
        let entry =
            registry::replace_content(txn, entry, content, RoundState::Upcoming, now).await?;
        if let Some(sticker_id) = sticker_id {
            allocator::apply_sticker(txn, sticker_id, &content.media_url, now).await?;
        }
        Ok(entry)
    }

    /// Withdraws an entry whose round has not started.
    ///
    /// Deleting an entry that holds no submission is acknowledged without
    /// change.
    pub async fn delete_entry(&self, entry_id: i32) -> Result<(), EntryError> {
        let entry = registry::find_entry(&self.db, entry_id).await?;
        let round = registry::find_round(&self.db, entry.round_id).await?;

        let round = &round;
        let withdrawn = self
            .retrying("delete_entry", move || async move {
                let txn = self.db.begin().await?;
                let result = self.delete_in(&txn, entry_id, round).await;
                finish(txn, result).await
            })
            .await?;

        if withdrawn {
            log::info!("Entry {} withdrawn from round {}", entry_id, entry.round_id);
        }
        Ok(())
    }

    async fn delete_in(
        &self,
        txn: &DatabaseTransaction,
        entry_id: i32,
        round: &rounds::Model,
    ) -> Result<bool, EntryError> {
        let now = self.clock.now();
        registry::ensure_editable(round, now)?;

        let entry = registry::find_entry(txn, entry_id).await?;
        if !entry.is_submitted() {
            return Ok(false);
        }
        withdraw(txn, entry, now).await?;
        Ok(true)
    }

    /// Cascades the removal of a content item into every entry pointing at it.
    ///
    /// Not gated by round state: the content is already gone upstream.
    /// Returns the ids of the entries that were emptied. Repeating the call
    /// is harmless.
    pub async fn withdraw_content(&self, content: &ContentRef) -> Result<Vec<i32>, EntryError> {
        content.validate()?;

        let unlinked = self
            .retrying("withdraw_content", move || async move {
                let txn = self.db.begin().await?;
                let result = self.withdraw_content_in(&txn, content).await;
                finish(txn, result).await
            })
            .await?;

        if !unlinked.is_empty() {
            log::info!(
                "Post {} removed; emptied entries {:?}",
                content.post_id,
                unlinked
            );
        }
        Ok(unlinked)
    }

    async fn withdraw_content_in(
        &self,
        txn: &DatabaseTransaction,
        content: &ContentRef,
    ) -> Result<Vec<i32>, EntryError> {
        let now = self.clock.now();
        let mut unlinked = Vec::new();

        for entry in registry::entries_for_post(txn, content.post_id).await? {
            unlinked.push(entry.id);
            withdraw(txn, entry, now).await?;
        }
        // Usages on the media may exist without any entry pointing at it
        allocator::reclaim_media(txn, &content.media_url, now).await?;

        Ok(unlinked)
    }

    /// Applies a sticker to content outside of a submission.
    ///
    /// Content that backs an entry may only be decorated while that entry's
    /// round has not started, and only with a sticker of the round's
    /// competition.
    pub async fn apply_sticker_to_content(
        &self,
        content: &ContentRef,
        sticker_id: i32,
    ) -> Result<i32, EntryError> {
        content.validate()?;
        let sticker = self.stickers.get(&self.db, sticker_id).await?;
        let competition_id = sticker.competition_id;

        let usage_id = self
            .retrying("apply_sticker_to_content", move || async move {
                let txn = self.db.begin().await?;
                let result = self
                    .apply_in(&txn, content, sticker_id, competition_id)
                    .await;
                finish(txn, result).await
            })
            .await?;

        log::info!(
            "Sticker {} applied to post {} as usage {}",
            sticker_id,
            content.post_id,
            usage_id
        );
        Ok(usage_id)
    }

    async fn apply_in(
        &self,
        txn: &DatabaseTransaction,
        content: &ContentRef,
        sticker_id: i32,
        competition_id: i32,
    ) -> Result<i32, EntryError> {
        let now = self.clock.now();

        for entry in registry::entries_for_post(txn, content.post_id).await? {
            let round = registry::find_round(txn, entry.round_id).await?;
            registry::ensure_editable(&round, now)?;
            if round.competition_id != competition_id {
                return Err(EntryError::StickerMismatch {
                    sticker_id,
                    competition_id: round.competition_id,
                });
            }
        }

        allocator::apply_sticker(txn, sticker_id, &content.media_url, now).await
    }

    /// Temporal state of a round right now.
    pub async fn round_state(&self, round_id: i32) -> Result<RoundState, EntryError> {
        let round = registry::find_round(&self.db, round_id).await?;
        Ok(round_state(&round, self.clock.now()))
    }

    pub async fn sticker_capacity(&self, sticker_id: i32) -> Result<Capacity, EntryError> {
        allocator::capacity(&self.db, sticker_id).await
    }

    /// The user's slot in a round, submitted or not.
    pub async fn find_entry(
        &self,
        round_id: i32,
        user_id: i32,
    ) -> Result<Option<entries::Model>, EntryError> {
        registry::find_slot(&self.db, round_id, user_id).await
    }

    pub async fn visible_entries(
        &self,
        round_id: i32,
        feed: Feed,
    ) -> Result<Vec<entries::Model>, EntryError> {
        registry::find_round(&self.db, round_id).await?;
        visibility::visible_entries(&self.db, round_id, feed).await
    }

    /// Runs one visibility sweep.
    pub async fn reconcile_visibility(&self) -> Result<u64, EntryError> {
        visibility::reconcile(&self.db, self.clock.now()).await
    }

    async fn check_sticker_scope(
        &self,
        sticker_id: i32,
        competition_id: i32,
    ) -> Result<(), EntryError> {
        let sticker = self.stickers.get(&self.db, sticker_id).await?;
        if sticker.competition_id != competition_id {
            return Err(EntryError::StickerMismatch {
                sticker_id,
                competition_id,
            });
        }
        Ok(())
    }

    /// Re-runs a whole transaction while it fails with a retryable conflict.
    async fn retrying<T, F, Fut>(&self, op: &str, mut attempt: F) -> Result<T, EntryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EntryError>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Err(e) if e.is_retryable() && tries < max_attempts => {
                    log::warn!(
                        "{} hit a conflict (attempt {} of {}), retrying",
                        op,
                        tries,
                        max_attempts
                    );
                }
                other => return other,
            }
        }
    }
}

/// Empties an entry and reclaims every sticker on its media.
async fn withdraw(
    txn: &DatabaseTransaction,
    entry: entries::Model,
    now: chrono::NaiveDateTime,
) -> Result<entries::Model, EntryError> {
    if let Some(media) = entry.media_url.as_deref() {
        allocator::reclaim_media(txn, media, now).await?;
    }
    registry::unlink(txn, entry, now).await
}

/// Commits on success, rolls back on failure.
async fn finish<T>(
    txn: DatabaseTransaction,
    result: Result<T, EntryError>,
) -> Result<T, EntryError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                log::warn!("Rollback failed after {}: {}", e, rollback_err);
            }
            Err(e)
        }
    }
}

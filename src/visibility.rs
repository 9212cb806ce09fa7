//! Feed visibility projection.
//!
//! Each entry carries two denormalized flags so feed reads never compare
//! clocks:
//! - `visible_in_competition_feed`: the entry holds a submission
//! - `visible_in_normal_feed`: the entry holds a submission and its round has started
//!
//! Flags are computed on every write. A periodic sweep (`reconcile`) flips
//! `visible_in_normal_feed` to true for entries whose round started since
//! they were last written. The sweep only ever sets false to true, so it
//! commutes with the mutation paths. Entries are at most one sweep interval
//! stale.

use crate::error::EntryError;
use crate::orm::{entries, rounds};
use crate::round_clock::RoundState;
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, sea_query::Expr, sea_query::Query, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Feed projections an entry may appear in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feed {
    Competition,
    Normal,
}

impl std::str::FromStr for Feed {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "competition" => Ok(Feed::Competition),
            "normal" => Ok(Feed::Normal),
            _ => Err(()),
        }
    }
}

/// The pair of visibility flags for one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Visibility {
    pub competition_feed: bool,
    pub normal_feed: bool,
}

impl Visibility {
    /// Hidden from every feed. Used on withdrawal.
    pub const HIDDEN: Visibility = Visibility {
        competition_feed: false,
        normal_feed: false,
    };

    /// Flags for an entry given whether it holds a submission and its round's state.
    pub fn project(submitted: bool, state: RoundState) -> Self {
        Self {
            competition_feed: submitted,
            normal_feed: submitted && state != RoundState::Upcoming,
        }
    }

    /// Writes the flags onto an active model.
    pub fn apply_to(self, entry: &mut entries::ActiveModel) {
        entry.visible_in_competition_feed = Set(self.competition_feed);
        entry.visible_in_normal_feed = Set(self.normal_feed);
    }
}

/// Reveals submitted entries of started rounds in the normal feed.
///
/// Safe to run at any time, any number of times. Returns the number of
/// entries that became visible.
pub async fn reconcile<C>(conn: &C, now: NaiveDateTime) -> Result<u64, EntryError>
where
    C: ConnectionTrait,
{
    let started_rounds = Query::select()
        .column(rounds::Column::Id)
        .from(rounds::Entity)
        .and_where(Expr::col(rounds::Column::StartDate).lte(now))
        .to_owned();

    let res = entries::Entity::update_many()
        .col_expr(entries::Column::VisibleInNormalFeed, Expr::value(true))
        .col_expr(entries::Column::UpdatedAt, Expr::value(now))
        .filter(entries::Column::PostId.is_not_null())
        .filter(entries::Column::VisibleInNormalFeed.eq(false))
        .filter(entries::Column::RoundId.in_subquery(started_rounds))
        .exec(conn)
        .await?;

    if res.rows_affected > 0 {
        log::info!(
            "Visibility sweep revealed {} entries in the normal feed",
            res.rows_affected
        );
    }
    Ok(res.rows_affected)
}

/// Entries of a round currently visible in the given feed, oldest first.
pub async fn visible_entries<C>(
    conn: &C,
    round_id: i32,
    feed: Feed,
) -> Result<Vec<entries::Model>, EntryError>
where
    C: ConnectionTrait,
{
    let flag = match feed {
        Feed::Competition => entries::Column::VisibleInCompetitionFeed,
        Feed::Normal => entries::Column::VisibleInNormalFeed,
    };

    Ok(entries::Entity::find()
        .filter(entries::Column::RoundId.eq(round_id))
        .filter(flag.eq(true))
        .order_by_asc(entries::Column::CreatedAt)
        .order_by_asc(entries::Column::Id)
        .all(conn)
        .await?)
}

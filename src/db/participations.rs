//! Contains the participation specific database structs and queries
use super::Result;
use crate::db::meetups::Meetup;
use crate::db::schema::{meetup_participations, meetups, users};
use crate::db::users::User;
use crate::db::DbInterface;
use crate::diesel::ExpressionMethods;
use crate::diesel::JoinOnDsl;
use crate::diesel::QueryDsl;
use chrono::{DateTime, Utc};
use diesel::backend::Backend;
use diesel::deserialize;
use diesel::pg::Pg;
use diesel::result::Error;
use diesel::serialize::{self, Output};
use diesel::types::{FromSql, IsNull, ToSql};
use diesel::{Identifiable, Queryable};
use diesel::{QueryResult, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::{from_utf8, FromStr};

/// The attendance status of a participation
///
/// Stored as plain text in the database. `Pending` participations await the
/// organizer's approval, every other status counts as resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromSqlRow, AsExpression, Serialize, Deserialize)]
#[sql_type = "diesel::sql_types::Text"]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    Pending,
    Going,
    Maybe,
    NotGoing,
}

impl ParticipationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Going => "going",
            Self::Maybe => "maybe",
            Self::NotGoing => "not_going",
        }
    }
}

impl FromStr for ParticipationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "going" => Ok(Self::Going),
            "maybe" => Ok(Self::Maybe),
            "not_going" => Ok(Self::NotGoing),
            _ => Err(format!("unknown participation status {:?}", s)),
        }
    }
}

impl ToSql<diesel::sql_types::Text, Pg> for ParticipationStatus {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        write!(out, "{}", self.as_str())?;
        Ok(IsNull::No)
    }
}

impl FromSql<diesel::sql_types::Text, Pg> for ParticipationStatus {
    fn from_sql(bytes: Option<&<Pg as Backend>::RawValue>) -> deserialize::Result<Self> {
        let bytes = bytes.ok_or("tried to deserialize participation status from None")?;
        let s = from_utf8(bytes)?;
        let status = Self::from_str(s)?;

        Ok(status)
    }
}

/// The status a fresh join request resolves to.
///
/// Open meetups accept attendees directly, closed ones queue the request for
/// the organizer.
pub fn join_status(meetup_is_open: bool) -> ParticipationStatus {
    if meetup_is_open {
        ParticipationStatus::Going
    } else {
        ParticipationStatus::Pending
    }
}

/// Diesel participation struct
///
/// Is used as a result in various queries. Represents a participation column
#[derive(Debug, Clone, Queryable, Identifiable)]
#[table_name = "meetup_participations"]
pub struct Participation {
    pub id: i64,
    pub user_id: i64,
    pub meetup_id: i64,
    pub status: ParticipationStatus,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Participation {
    /// A participation counts as handled once it left the pending state
    pub fn is_approved(&self) -> bool {
        self.status != ParticipationStatus::Pending
    }
}

/// Diesel insertable participation struct
///
/// Represents fields that have to be provided on participation insertion,
/// `requested_at` is filled in by the database.
#[derive(Debug, Insertable)]
#[table_name = "meetup_participations"]
pub struct NewParticipation {
    pub user_id: i64,
    pub meetup_id: i64,
    pub status: ParticipationStatus,
}

/// Diesel participation struct for updates
///
/// The status is always set, `approved_at` is left untouched when None.
#[derive(Debug, AsChangeset)]
#[table_name = "meetup_participations"]
pub struct UpdateParticipation {
    pub status: ParticipationStatus,
    pub approved_at: Option<DateTime<Utc>>,
}

impl UpdateParticipation {
    /// Changeset for an organizer approval, stamps `approved_at`
    pub fn approve(approved_at: DateTime<Utc>) -> Self {
        Self {
            status: ParticipationStatus::Going,
            approved_at: Some(approved_at),
        }
    }

    /// Changeset for an organizer rejection, `approved_at` keeps its prior value
    pub fn reject() -> Self {
        Self {
            status: ParticipationStatus::NotGoing,
            approved_at: None,
        }
    }

    /// Changeset for a user re-joining after a `maybe`/`not_going` status
    pub fn rejoin(meetup_is_open: bool) -> Self {
        Self {
            status: join_status(meetup_is_open),
            approved_at: None,
        }
    }
}

impl DbInterface {
    /// Returns the participation a user holds for a meetup, if any
    pub fn get_participation_for_user(
        &self,
        meetup_id: i64,
        user_id: i64,
    ) -> Result<Option<Participation>> {
        let con = self.get_con()?;

        let result: QueryResult<Participation> = meetup_participations::table
            .filter(meetup_participations::columns::meetup_id.eq(meetup_id))
            .filter(meetup_participations::columns::user_id.eq(user_id))
            .get_result(&con);

        match result {
            Ok(participation) => Ok(Some(participation)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => {
                log::error!("Query error getting participation for user, {}", e);
                Err(e.into())
            }
        }
    }

    /// Returns the participation together with its meetup and the requesting user
    pub fn get_participation_with_meetup(
        &self,
        participation_id: i64,
    ) -> Result<Option<(Participation, Meetup, User)>> {
        let con = self.get_con()?;

        let result: QueryResult<(Participation, Meetup, User)> = meetup_participations::table
            .inner_join(meetups::table)
            .inner_join(
                users::table.on(meetup_participations::columns::user_id.eq(users::columns::id)),
            )
            .select((
                meetup_participations::all_columns,
                meetups::all_columns,
                users::all_columns,
            ))
            .filter(meetup_participations::columns::id.eq(participation_id))
            .get_result(&con);

        match result {
            Ok(participation) => Ok(Some(participation)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => {
                log::error!("Query error getting participation with meetup, {}", e);
                Err(e.into())
            }
        }
    }

    /// Returns all participations of a meetup with their user, newest request first
    pub fn get_participations_for_meetup(
        &self,
        meetup_id: i64,
    ) -> Result<Vec<(Participation, User)>> {
        let con = self.get_con()?;

        let query = meetup_participations::table
            .inner_join(
                users::table.on(meetup_participations::columns::user_id.eq(users::columns::id)),
            )
            .filter(meetup_participations::columns::meetup_id.eq(meetup_id))
            .order_by(meetup_participations::columns::requested_at.desc());

        let query_result = query.load::<(Participation, User)>(&con);

        match query_result {
            Ok(participations) => Ok(participations),
            Err(e) => {
                log::error!("Query error getting participations for meetup, {}", e);
                Err(e.into())
            }
        }
    }

    /// Tries to insert the participation into the database
    ///
    /// When yielding a unique key violation, None is returned. The
    /// (user, meetup) uniqueness is enforced by the database, so concurrent
    /// join requests cannot create duplicate rows.
    pub fn try_create_participation(
        &self,
        participation: NewParticipation,
    ) -> Result<Option<Participation>> {
        let con = self.get_con()?;

        let result = diesel::insert_into(meetup_participations::table)
            .values(participation)
            .get_result(&con);

        match result {
            Ok(participation) => Ok(Some(participation)),
            Err(Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, ..)) => {
                Ok(None)
            }
            Err(e) => {
                log::error!("Query error creating new participation, {}", e);
                Err(e.into())
            }
        }
    }

    pub fn update_participation(
        &self,
        participation_id: i64,
        participation: UpdateParticipation,
    ) -> Result<Participation> {
        let con = self.get_con()?;

        let target = meetup_participations::table
            .filter(meetup_participations::columns::id.eq(participation_id));
        let result = diesel::update(target).set(participation).get_result(&con);

        match result {
            Ok(participation) => Ok(participation),
            Err(e) => {
                log::error!("Query error updating participation, {}", e);
                Err(e.into())
            }
        }
    }

    pub fn delete_participation(&self, participation_id: i64) -> Result<()> {
        let con = self.get_con()?;

        let target = meetup_participations::table
            .filter(meetup_participations::columns::id.eq(participation_id));

        let result = diesel::delete(target).execute(&con);

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("Query error deleting participation, {}", e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn participation_with_status(status: ParticipationStatus) -> Participation {
        Participation {
            id: 1,
            user_id: 2,
            meetup_id: 3,
            status,
            requested_at: Utc.ymd(2025, 1, 1).and_hms(9, 0, 0),
            approved_at: None,
        }
    }

    #[test]
    fn status_text_round_trip() {
        for status in [
            ParticipationStatus::Pending,
            ParticipationStatus::Going,
            ParticipationStatus::Maybe,
            ParticipationStatus::NotGoing,
        ] {
            assert_eq!(ParticipationStatus::from_str(status.as_str()), Ok(status));
        }
    }

    #[test]
    fn unknown_status_text_is_rejected() {
        assert!(ParticipationStatus::from_str("attending").is_err());
    }

    #[test]
    fn join_status_follows_openness() {
        assert_eq!(join_status(true), ParticipationStatus::Going);
        assert_eq!(join_status(false), ParticipationStatus::Pending);
    }

    #[test]
    fn pending_is_not_approved() {
        assert!(!participation_with_status(ParticipationStatus::Pending).is_approved());
    }

    #[test]
    fn every_resolved_status_is_approved() {
        for status in [
            ParticipationStatus::Going,
            ParticipationStatus::Maybe,
            ParticipationStatus::NotGoing,
        ] {
            assert!(participation_with_status(status).is_approved());
        }
    }

    #[test]
    fn approve_stamps_the_approval_time() {
        let now = Utc.ymd(2025, 6, 1).and_hms(12, 0, 0);

        let update = UpdateParticipation::approve(now);

        assert_eq!(update.status, ParticipationStatus::Going);
        assert_eq!(update.approved_at, Some(now));
    }

    #[test]
    fn reject_leaves_the_approval_time_untouched() {
        let update = UpdateParticipation::reject();

        assert_eq!(update.status, ParticipationStatus::NotGoing);
        // None means the column is skipped by the changeset
        assert_eq!(update.approved_at, None);
    }

    #[test]
    fn rejoin_matches_the_join_status() {
        assert_eq!(
            UpdateParticipation::rejoin(true).status,
            ParticipationStatus::Going
        );
        assert_eq!(
            UpdateParticipation::rejoin(false).status,
            ParticipationStatus::Pending
        );
        assert_eq!(UpdateParticipation::rejoin(true).approved_at, None);
    }
}

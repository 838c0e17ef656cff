//! Contains the meetup specific database structs and queries
use super::Result;
use crate::db::schema::meetups;
use crate::db::schema::users;
use crate::db::users::User;
use crate::db::DbInterface;
use crate::diesel::BoolExpressionMethods;
use crate::diesel::ExpressionMethods;
use crate::diesel::QueryDsl;
use chrono::{DateTime, Duration, Utc};
use diesel::result::Error;
use diesel::{Identifiable, Queryable};
use diesel::{QueryResult, RunQueryDsl};

/// Diesel meetup struct
///
/// Is used as a result in various queries. Represents a meetup column
#[derive(Debug, Clone, Queryable, Identifiable)]
pub struct Meetup {
    pub id: i64,
    pub organizer: i64,
    pub title: String,
    pub description: String,
    pub is_open: bool,
    pub max_participants: Option<i64>,
    pub start_datetime: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location_text: String,
    pub online_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meetup {
    /// The end of the meetup, derived from its start and duration
    pub fn end_datetime(&self) -> DateTime<Utc> {
        self.start_datetime + Duration::minutes(self.duration_minutes)
    }
}

/// Diesel insertable meetup struct
///
/// Represents fields that have to be provided on meetup insertion.
#[derive(Debug, Insertable)]
#[table_name = "meetups"]
pub struct NewMeetup {
    pub organizer: i64,
    pub title: String,
    pub description: String,
    pub is_open: bool,
    pub max_participants: Option<i64>,
    pub start_datetime: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location_text: String,
    pub online_link: Option<String>,
}

/// Diesel meetup struct for updates
///
/// Is used in update queries. None fields will be ignored on update queries.
/// The organizer, `is_open` and `max_participants` are fixed at creation time
/// and therefore have no counterpart here.
#[derive(Debug, AsChangeset)]
#[table_name = "meetups"]
pub struct ModifyMeetup {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_datetime: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub location_text: Option<String>,
    pub online_link: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DbInterface {
    /// Returns all meetups with their organizer, starting with the most recent start date
    pub fn get_meetups_with_organizer(&self) -> Result<Vec<(Meetup, User)>> {
        let con = self.get_con()?;

        let query = meetups::table
            .order_by(meetups::columns::start_datetime.desc())
            .inner_join(users::table);

        let query_result = query.load::<(Meetup, User)>(&con);

        match query_result {
            Ok(meetups) => Ok(meetups),
            Err(e) => {
                log::error!("Query error getting meetups, {}", e);
                Err(e.into())
            }
        }
    }

    pub fn get_meetup(&self, meetup_id: i64) -> Result<Option<Meetup>> {
        let con = self.get_con()?;

        let result: QueryResult<Meetup> = meetups::table
            .filter(meetups::columns::id.eq(meetup_id))
            .get_result(&con);

        match result {
            Ok(meetup) => Ok(Some(meetup)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => {
                log::error!("Query error getting meetup by id, {}", e);
                Err(e.into())
            }
        }
    }

    pub fn get_meetup_with_organizer(&self, meetup_id: i64) -> Result<Option<(Meetup, User)>> {
        let con = self.get_con()?;

        let result: QueryResult<(Meetup, User)> = meetups::table
            .inner_join(users::table)
            .filter(meetups::columns::id.eq(meetup_id))
            .get_result(&con);

        match result {
            Ok(meetup) => Ok(Some(meetup)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => {
                log::error!("Query error getting meetup by id, {}", e);
                Err(e.into())
            }
        }
    }

    pub fn new_meetup(&self, meetup: NewMeetup) -> Result<Meetup> {
        let con = self.get_con()?;

        let meetup_result: QueryResult<Meetup> = diesel::insert_into(meetups::table)
            .values(meetup)
            .get_result(&con);

        match meetup_result {
            Ok(meetup) => Ok(meetup),
            Err(e) => {
                log::error!("Query error creating new meetup, {}", e);
                Err(e.into())
            }
        }
    }

    pub fn modify_meetup(&self, meetup_id: i64, meetup: ModifyMeetup) -> Result<Meetup> {
        let con = self.get_con()?;

        let target = meetups::table.filter(meetups::columns::id.eq(meetup_id));
        let meetup_result = diesel::update(target).set(meetup).get_result(&con);

        match meetup_result {
            Ok(meetup) => Ok(meetup),
            Err(e) => {
                log::error!("Query error modifying meetup, {}", e);
                Err(e.into())
            }
        }
    }

    /// Deletes the meetup only when it is organized by `organizer`.
    ///
    /// Returns true if something was deleted. Participations are removed by the
    /// cascading foreign key.
    pub fn delete_meetup(&self, meetup_id: i64, organizer: i64) -> Result<bool> {
        let con = self.get_con()?;

        let target = meetups::table.filter(
            meetups::columns::id
                .eq(meetup_id)
                .and(meetups::columns::organizer.eq(organizer)),
        );

        let result = diesel::delete(target).execute(&con);

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(e) => {
                log::error!("Query error deleting meetup, {}", e);
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

    fn meetup_starting_at(start_datetime: DateTime<Utc>, duration_minutes: i64) -> Meetup {
        Meetup {
            id: 1,
            organizer: 1,
            title: "Test Meetup".into(),
            description: "Description".into(),
            is_open: true,
            max_participants: None,
            start_datetime,
            duration_minutes,
            location_text: "Remote".into(),
            online_link: None,
            created_at: start_datetime,
            updated_at: start_datetime,
        }
    }

    #[test]
    fn end_datetime_derived_from_duration() {
        let start = Utc.ymd(2025, 1, 1).and_hms(10, 0, 0);

        let meetup = meetup_starting_at(start, 90);

        assert_eq!(meetup.end_datetime(), Utc.ymd(2025, 1, 1).and_hms(11, 30, 0));
    }

    #[test]
    fn end_datetime_of_zero_length_meetup() {
        let start = Utc.ymd(2025, 1, 1).and_hms(10, 0, 0);

        let meetup = meetup_starting_at(start, 0);

        assert_eq!(meetup.end_datetime(), start);
    }
}

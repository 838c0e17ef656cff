//! Meetup related API structs and Endpoints
//!
//! The defined structs are exposed to the REST API and will be serialized/deserialized. Similar
//! structs are defined in the database module [`crate::db`] for database operations.
use super::middleware::token_auth;
use super::participations::ParticipationInfo;
use super::response::{validation_error_entries, ApiError, NoContent, ValidationErrorEntry};
use super::users::UserDetails;
use crate::auth::JwtContext;
use crate::db::meetups as db_meetups;
use crate::db::users::User;
use crate::db::DbInterface;
use actix_web::web::{self, Data, Json, Path, ReqData};
use actix_web::{delete, get, patch, post, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateArgs, ValidationError};

/// A meetup
///
/// Contains all meetup information together with the public details of its
/// organizer. The end is derived from start and duration, it is not stored.
#[derive(Debug, Serialize)]
pub struct Meetup {
    pub id: i64,
    pub organizer: UserDetails,
    pub title: String,
    pub description: String,
    pub is_open: bool,
    pub max_participants: Option<i64>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location_text: String,
    pub online_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meetup {
    fn from_parts(meetup: db_meetups::Meetup, organizer: User) -> Self {
        Self {
            id: meetup.id,
            organizer: UserDetails::from_user(organizer),
            end_datetime: meetup.end_datetime(),
            title: meetup.title,
            description: meetup.description,
            is_open: meetup.is_open,
            max_participants: meetup.max_participants,
            start_datetime: meetup.start_datetime,
            duration_minutes: meetup.duration_minutes,
            location_text: meetup.location_text,
            online_link: meetup.online_link,
            created_at: meetup.created_at,
            updated_at: meetup.updated_at,
        }
    }
}

/// Detail view of a single meetup
///
/// Additionally carries all participations and, for an authenticated
/// requester, their own participation.
#[derive(Debug, Serialize)]
pub struct MeetupDetails {
    #[serde(flatten)]
    pub meetup: Meetup,
    pub participants: Vec<ParticipationInfo>,
    pub user_participation: Option<ParticipationInfo>,
}

/// API request parameters to create a new meetup
#[derive(Debug, Deserialize, Validate)]
pub struct NewMeetupBody {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: String,
    #[serde(default = "default_is_open")]
    pub is_open: bool,
    #[validate(range(min = 1))]
    pub max_participants: Option<i64>,
    #[validate(custom(function = "validate_not_in_past", arg = "DateTime<Utc>"))]
    pub start_datetime: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub duration_minutes: i64,
    #[validate(length(max = 255))]
    pub location_text: String,
    #[validate(custom = "validate_online_link")]
    pub online_link: Option<String>,
}

fn default_is_open() -> bool {
    true
}

/// API request parameters to modify a meetup
///
/// `is_open` and `max_participants` are accepted here only to give the caller
/// an explicit rejection, both are fixed at creation time.
#[derive(Debug, Deserialize, Validate)]
pub struct PatchMeetupBody {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_open: Option<bool>,
    pub max_participants: Option<i64>,
    #[validate(custom(function = "validate_not_in_past", arg = "DateTime<Utc>"))]
    pub start_datetime: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i64>,
    #[validate(length(max = 255))]
    pub location_text: Option<String>,
    #[validate(custom = "validate_online_link")]
    pub online_link: Option<String>,
}

fn validate_not_in_past(
    value: &DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if *value < now {
        let mut error = ValidationError::new("in_the_past");
        error.message = Some("Meetup cannot be scheduled in the past.".into());
        return Err(error);
    }

    Ok(())
}

fn validate_online_link(link: &str) -> Result<(), ValidationError> {
    // an empty link counts as absent and is stored as such
    if link.is_empty() || link.starts_with("http://") || link.starts_with("https://") {
        return Ok(());
    }

    let mut error = ValidationError::new("invalid_scheme");
    error.message = Some("Online link must be a valid URL.".into());
    Err(error)
}

/// Moves the meetups organized by `user_id` to the front of the list
///
/// The relative order inside both partitions is preserved.
fn sort_owned_first(
    meetups: Vec<(db_meetups::Meetup, User)>,
    user_id: i64,
) -> Vec<(db_meetups::Meetup, User)> {
    let (mut owned, other): (Vec<_>, Vec<_>) = meetups
        .into_iter()
        .partition(|(meetup, _)| meetup.organizer == user_id);

    owned.extend(other);
    owned
}

/// API Endpoint *GET /meetups*
///
/// Returns a JSON array of all meetups as [`Meetup`], most recent start date
/// first. Authenticated requesters see the meetups they organize at the top
/// of the list.
#[get("/meetups")]
pub async fn all(
    db_ctx: Data<DbInterface>,
    jwt_ctx: Data<JwtContext>,
    request: HttpRequest,
) -> Result<Json<Vec<Meetup>>, ApiError> {
    let current_user = token_auth::optional_token_user(&request, db_ctx.clone(), jwt_ctx).await?;

    let meetups = web::block(move || -> Result<Vec<(db_meetups::Meetup, User)>, ApiError> {
        Ok(db_ctx.get_meetups_with_organizer()?)
    })
    .await
    .map_err(|e| {
        log::error!("BlockingError on GET /meetups - {}", e);
        ApiError::internal()
    })??;

    let meetups = match current_user {
        Some(user) => sort_owned_first(meetups, user.id),
        None => meetups,
    };

    let meetups = meetups
        .into_iter()
        .map(|(meetup, organizer)| Meetup::from_parts(meetup, organizer))
        .collect::<Vec<Meetup>>();

    Ok(Json(meetups))
}

/// API Endpoint *GET /meetups/{meetup_id}*
///
/// Returns the specified meetup as [`MeetupDetails`].
#[get("/meetups/{meetup_id}")]
pub async fn get(
    db_ctx: Data<DbInterface>,
    jwt_ctx: Data<JwtContext>,
    request: HttpRequest,
    meetup_id: Path<i64>,
) -> Result<Json<MeetupDetails>, ApiError> {
    let current_user = token_auth::optional_token_user(&request, db_ctx.clone(), jwt_ctx).await?;

    let meetup_id = meetup_id.into_inner();

    let details = web::block(move || -> Result<MeetupDetails, ApiError> {
        let (meetup, organizer) = db_ctx
            .get_meetup_with_organizer(meetup_id)?
            .ok_or_else(ApiError::not_found)?;

        let participations = db_ctx.get_participations_for_meetup(meetup_id)?;

        let user_participation = current_user.and_then(|user| {
            participations
                .iter()
                .find(|(participation, _)| participation.user_id == user.id)
                .map(|(participation, participant)| {
                    ParticipationInfo::from_parts(participation.clone(), participant.clone())
                })
        });

        let participants = participations
            .into_iter()
            .map(|(participation, participant)| {
                ParticipationInfo::from_parts(participation, participant)
            })
            .collect();

        Ok(MeetupDetails {
            meetup: Meetup::from_parts(meetup, organizer),
            participants,
            user_participation,
        })
    })
    .await
    .map_err(|e| {
        log::error!("BlockingError on GET /meetups/{{meetup_id}} - {}", e);
        ApiError::internal()
    })??;

    Ok(Json(details))
}

/// API Endpoint *POST /meetups*
///
/// Uses the provided [`NewMeetupBody`] to create a new meetup with the
/// requesting user as organizer. Returns the created [`Meetup`].
#[post("/meetups")]
pub async fn new(
    db_ctx: Data<DbInterface>,
    current_user: ReqData<User>,
    body: Json<NewMeetupBody>,
) -> Result<HttpResponse, ApiError> {
    let new_meetup = body.into_inner();

    new_meetup.validate_args(Utc::now())?;

    let current_user = current_user.into_inner();
    let organizer = current_user.clone();

    let db_meetup = web::block(move || -> Result<db_meetups::Meetup, ApiError> {
        let new_meetup = db_meetups::NewMeetup {
            organizer: current_user.id,
            title: new_meetup.title,
            description: new_meetup.description,
            is_open: new_meetup.is_open,
            max_participants: new_meetup.max_participants,
            start_datetime: new_meetup.start_datetime,
            duration_minutes: new_meetup.duration_minutes,
            location_text: new_meetup.location_text,
            online_link: new_meetup.online_link.filter(|link| !link.is_empty()),
        };

        Ok(db_ctx.new_meetup(new_meetup)?)
    })
    .await
    .map_err(|e| {
        log::error!("BlockingError on POST /meetups - {}", e);
        ApiError::internal()
    })??;

    Ok(HttpResponse::Created().json(Meetup::from_parts(db_meetup, organizer)))
}

/// API Endpoint *PATCH /meetups/{meetup_id}*
///
/// Uses the provided [`PatchMeetupBody`] to modify a specified meetup.
/// Only the organizer is allowed to edit, attempts to change the fields that
/// are fixed at creation time are rejected. Returns the modified [`Meetup`].
#[patch("/meetups/{meetup_id}")]
pub async fn patch(
    db_ctx: Data<DbInterface>,
    current_user: ReqData<User>,
    meetup_id: Path<i64>,
    body: Json<PatchMeetupBody>,
) -> Result<Json<Meetup>, ApiError> {
    let meetup_id = meetup_id.into_inner();
    let modify_meetup = body.into_inner();

    let mut entries = match modify_meetup.validate_args(Utc::now()) {
        Ok(()) => Vec::new(),
        Err(errors) => validation_error_entries(errors),
    };

    if modify_meetup.is_open.is_some() {
        entries.push(ValidationErrorEntry::new(
            "is_open",
            "immutable",
            Some("This field cannot be changed after creation"),
        ));
    }

    if modify_meetup.max_participants.is_some() {
        entries.push(ValidationErrorEntry::new(
            "max_participants",
            "immutable",
            Some("This field cannot be changed after creation"),
        ));
    }

    if !entries.is_empty() {
        return Err(ApiError::unprocessable_entities(entries));
    }

    let current_user = current_user.into_inner();
    let organizer = current_user.clone();

    let db_meetup = web::block(move || -> Result<db_meetups::Meetup, ApiError> {
        let meetup = db_ctx
            .get_meetup(meetup_id)?
            .ok_or_else(ApiError::not_found)?;

        if meetup.organizer != current_user.id {
            return Err(
                ApiError::forbidden().with_message("Only the organizer can edit this meetup")
            );
        }

        let change_meetup = db_meetups::ModifyMeetup {
            title: modify_meetup.title,
            description: modify_meetup.description,
            start_datetime: modify_meetup.start_datetime,
            duration_minutes: modify_meetup.duration_minutes,
            location_text: modify_meetup.location_text,
            online_link: modify_meetup.online_link.filter(|link| !link.is_empty()),
            updated_at: Some(Utc::now()),
        };

        Ok(db_ctx.modify_meetup(meetup_id, change_meetup)?)
    })
    .await
    .map_err(|e| {
        log::error!("BlockingError on PATCH /meetups/{{meetup_id}} - {}", e);
        ApiError::internal()
    })??;

    Ok(Json(Meetup::from_parts(db_meetup, organizer)))
}

/// API Endpoint *DELETE /meetups/{meetup_id}*
///
/// Deletes the specified meetup with all of its participations. The delete is
/// scoped to meetups organized by the requesting user, everything else
/// behaves as absent.
#[delete("/meetups/{meetup_id}")]
pub async fn delete(
    db_ctx: Data<DbInterface>,
    current_user: ReqData<User>,
    meetup_id: Path<i64>,
) -> Result<NoContent, ApiError> {
    let meetup_id = meetup_id.into_inner();
    let current_user = current_user.into_inner();

    let deleted = web::block(move || -> Result<bool, ApiError> {
        Ok(db_ctx.delete_meetup(meetup_id, current_user.id)?)
    })
    .await
    .map_err(|e| {
        log::error!("BlockingError on DELETE /meetups/{{meetup_id}} - {}", e);
        ApiError::internal()
    })??;

    if deleted {
        Ok(NoContent)
    } else {
        Err(ApiError::not_found())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed_now() -> DateTime<Utc> {
        Utc.ymd(2025, 1, 1).and_hms(12, 0, 0)
    }

    fn valid_body(start_datetime: DateTime<Utc>) -> NewMeetupBody {
        NewMeetupBody {
            title: "Test Meetup".into(),
            description: "Description".into(),
            is_open: true,
            max_participants: None,
            start_datetime,
            duration_minutes: 60,
            location_text: "Remote".into(),
            online_link: None,
        }
    }

    fn db_meetup(id: i64, organizer: i64) -> db_meetups::Meetup {
        db_meetups::Meetup {
            id,
            organizer,
            title: format!("Meetup {}", id),
            description: "Description".into(),
            is_open: true,
            max_participants: None,
            start_datetime: fixed_now(),
            duration_minutes: 60,
            location_text: "Remote".into(),
            online_link: None,
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    fn organizer(id: i64) -> User {
        User {
            id,
            sub: format!("user-{}", id),
            email: format!("user{}@example.org", id),
            display_name: format!("User {}", id),
            id_token_exp: 0,
        }
    }

    #[test]
    fn future_meetup_passes_validation() {
        let body = valid_body(fixed_now() + chrono::Duration::days(1));

        assert!(body.validate_args(fixed_now()).is_ok());
    }

    #[test]
    fn meetup_starting_right_now_passes_validation() {
        let body = valid_body(fixed_now());

        assert!(body.validate_args(fixed_now()).is_ok());
    }

    #[test]
    fn past_meetup_fails_validation() {
        let body = valid_body(fixed_now() - chrono::Duration::days(1));

        let errors = body.validate_args(fixed_now()).unwrap_err();

        assert!(errors.field_errors().contains_key("start_datetime"));
    }

    #[test]
    fn online_link_scheme_is_checked() {
        let mut body = valid_body(fixed_now() + chrono::Duration::days(1));

        body.online_link = Some("ftp://example.org".into());
        let errors = body.validate_args(fixed_now()).unwrap_err();
        assert!(errors.field_errors().contains_key("online_link"));

        body.online_link = Some("https://example.org".into());
        assert!(body.validate_args(fixed_now()).is_ok());

        body.online_link = Some("http://example.org".into());
        assert!(body.validate_args(fixed_now()).is_ok());

        // empty counts as absent
        body.online_link = Some(String::new());
        assert!(body.validate_args(fixed_now()).is_ok());

        body.online_link = None;
        assert!(body.validate_args(fixed_now()).is_ok());
    }

    #[test]
    fn max_participants_must_be_positive() {
        let mut body = valid_body(fixed_now() + chrono::Duration::days(1));

        body.max_participants = Some(0);
        let errors = body.validate_args(fixed_now()).unwrap_err();
        assert!(errors.field_errors().contains_key("max_participants"));

        body.max_participants = Some(1);
        assert!(body.validate_args(fixed_now()).is_ok());

        body.max_participants = None;
        assert!(body.validate_args(fixed_now()).is_ok());
    }

    #[test]
    fn all_violations_are_reported_at_once() {
        let mut body = valid_body(fixed_now() - chrono::Duration::days(1));
        body.online_link = Some("ftp://example.org".into());
        body.max_participants = Some(0);

        let errors = body.validate_args(fixed_now()).unwrap_err();
        let field_errors = errors.field_errors();

        assert!(field_errors.contains_key("start_datetime"));
        assert!(field_errors.contains_key("online_link"));
        assert!(field_errors.contains_key("max_participants"));
    }

    #[test]
    fn empty_patch_passes_validation() {
        let body = PatchMeetupBody {
            title: None,
            description: None,
            is_open: None,
            max_participants: None,
            start_datetime: None,
            duration_minutes: None,
            location_text: None,
            online_link: None,
        };

        assert!(body.validate_args(fixed_now()).is_ok());
    }

    #[test]
    fn patched_start_must_not_be_in_the_past() {
        let body = PatchMeetupBody {
            title: None,
            description: None,
            is_open: None,
            max_participants: None,
            start_datetime: Some(fixed_now() - chrono::Duration::hours(1)),
            duration_minutes: None,
            location_text: None,
            online_link: None,
        };

        let errors = body.validate_args(fixed_now()).unwrap_err();

        assert!(errors.field_errors().contains_key("start_datetime"));
    }

    #[test]
    fn own_meetups_are_listed_first() {
        // user 1 organizes A and C within the base ordering [A, B, C, D]
        let meetups = vec![
            (db_meetup(1, 1), organizer(1)),
            (db_meetup(2, 2), organizer(2)),
            (db_meetup(3, 1), organizer(1)),
            (db_meetup(4, 3), organizer(3)),
        ];

        let sorted = sort_owned_first(meetups, 1);

        let ids = sorted
            .iter()
            .map(|(meetup, _)| meetup.id)
            .collect::<Vec<i64>>();

        assert_eq!(ids, vec![1, 3, 2, 4]);
    }

    #[test]
    fn listing_without_owned_meetups_keeps_the_base_ordering() {
        let meetups = vec![
            (db_meetup(1, 1), organizer(1)),
            (db_meetup(2, 2), organizer(2)),
            (db_meetup(3, 1), organizer(1)),
            (db_meetup(4, 3), organizer(3)),
        ];

        let sorted = sort_owned_first(meetups, 9);

        let ids = sorted
            .iter()
            .map(|(meetup, _)| meetup.id)
            .collect::<Vec<i64>>();

        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}

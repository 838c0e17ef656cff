//! Participation related API structs and Endpoints
//!
//! Covers the join/leave toggle as well as the organizer's approve and
//! reject commands.
use super::response::ApiError;
use super::users::UserDetails;
use crate::db::participations::{
    join_status, NewParticipation, Participation, ParticipationStatus, UpdateParticipation,
};
use crate::db::users::User;
use crate::db::DbInterface;
use actix_web::post;
use actix_web::web::{self, Data, Json, Path, ReqData};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A user's attendance record for a meetup
#[derive(Debug, Serialize)]
pub struct ParticipationInfo {
    pub id: i64,
    pub user: UserDetails,
    pub status: ParticipationStatus,
    pub is_approved: bool,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl ParticipationInfo {
    pub fn from_parts(participation: Participation, user: User) -> Self {
        Self {
            id: participation.id,
            is_approved: participation.is_approved(),
            user: UserDetails::from_user(user),
            status: participation.status,
            requested_at: participation.requested_at,
            approved_at: participation.approved_at,
        }
    }
}

/// JSON Body of the response coming from the *POST* request on
/// `/meetups/{meetup_id}/participation`
///
/// `participation` is None when the toggle removed the attendance or when it
/// was a no-op for the organizer.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub message: String,
    pub participation: Option<ParticipationInfo>,
}

/// JSON Body of the response coming from the approve/reject endpoints
#[derive(Debug, Serialize)]
pub struct ParticipationCommandResponse {
    pub message: String,
    pub participation: ParticipationInfo,
}

/// The effect a toggle request has, given the current state
enum ToggleAction {
    /// Organizers never hold participations for their own meetups
    OrganizerNoop,
    /// First join request, resolves directly by the openness of the meetup
    Create(ParticipationStatus),
    /// An active (`going`/`pending`) participation is withdrawn
    Withdraw(Participation),
    /// A previously resolved (`maybe`/`not_going`) participation is re-activated
    Rejoin(Participation),
}

fn decide_toggle(
    is_organizer: bool,
    existing: Option<Participation>,
    meetup_is_open: bool,
) -> ToggleAction {
    if is_organizer {
        return ToggleAction::OrganizerNoop;
    }

    match existing {
        None => ToggleAction::Create(join_status(meetup_is_open)),
        Some(participation) => match participation.status {
            ParticipationStatus::Going | ParticipationStatus::Pending => {
                ToggleAction::Withdraw(participation)
            }
            ParticipationStatus::Maybe | ParticipationStatus::NotGoing => {
                ToggleAction::Rejoin(participation)
            }
        },
    }
}

/// API Endpoint *POST /meetups/{meetup_id}/participation*
///
/// Joins or leaves the specified meetup for the requesting user, depending on
/// their current participation. Organizers cannot participate in their own
/// meetups, for them the toggle is a guided no-op.
#[post("/meetups/{meetup_id}/participation")]
pub async fn toggle(
    db_ctx: Data<DbInterface>,
    current_user: ReqData<User>,
    meetup_id: Path<i64>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let meetup_id = meetup_id.into_inner();
    let current_user = current_user.into_inner();

    let response = web::block(move || -> Result<ToggleResponse, ApiError> {
        let meetup = db_ctx.get_meetup(meetup_id)?.ok_or_else(ApiError::not_found)?;

        let existing = db_ctx.get_participation_for_user(meetup_id, current_user.id)?;

        match decide_toggle(
            meetup.organizer == current_user.id,
            existing,
            meetup.is_open,
        ) {
            ToggleAction::OrganizerNoop => Ok(ToggleResponse {
                message: "You are the organizer.".into(),
                participation: None,
            }),
            ToggleAction::Withdraw(participation) => {
                db_ctx.delete_participation(participation.id)?;

                Ok(ToggleResponse {
                    message: "Your request or attendance has been cancelled.".into(),
                    participation: None,
                })
            }
            ToggleAction::Rejoin(participation) => {
                let updated = db_ctx.update_participation(
                    participation.id,
                    UpdateParticipation::rejoin(meetup.is_open),
                )?;

                Ok(ToggleResponse {
                    message: "Success! You've joined or requested to join.".into(),
                    participation: Some(ParticipationInfo::from_parts(updated, current_user)),
                })
            }
            ToggleAction::Create(status) => {
                let new_participation = NewParticipation {
                    user_id: current_user.id,
                    meetup_id,
                    status,
                };

                match db_ctx.try_create_participation(new_participation)? {
                    Some(participation) => Ok(ToggleResponse {
                        message: "Success! You've joined or requested to join.".into(),
                        participation: Some(ParticipationInfo::from_parts(
                            participation,
                            current_user,
                        )),
                    }),
                    None => {
                        // lost the insert race against a concurrent toggle, report the row that won
                        let participation = db_ctx
                            .get_participation_for_user(meetup_id, current_user.id)?
                            .ok_or_else(ApiError::conflict)?;

                        Ok(ToggleResponse {
                            message: "You have already joined or requested to join.".into(),
                            participation: Some(ParticipationInfo::from_parts(
                                participation,
                                current_user,
                            )),
                        })
                    }
                }
            }
        }
    })
    .await
    .map_err(|e| {
        log::error!(
            "BlockingError on POST /meetups/{{meetup_id}}/participation - {}",
            e
        );
        ApiError::internal()
    })??;

    Ok(Json(response))
}

/// API Endpoint *POST /participations/{participation_id}/approve*
///
/// Approves a participation request. Only the organizer of the related meetup
/// is allowed to do so, everyone else receives a denial.
#[post("/participations/{participation_id}/approve")]
pub async fn approve(
    db_ctx: Data<DbInterface>,
    current_user: ReqData<User>,
    participation_id: Path<i64>,
) -> Result<Json<ParticipationCommandResponse>, ApiError> {
    let participation_id = participation_id.into_inner();
    let current_user = current_user.into_inner();

    let response = web::block(move || -> Result<ParticipationCommandResponse, ApiError> {
        let (participation, meetup, participant) = db_ctx
            .get_participation_with_meetup(participation_id)?
            .ok_or_else(ApiError::not_found)?;

        if meetup.organizer != current_user.id {
            return Err(ApiError::forbidden()
                .with_message("You are not authorized to perform this action"));
        }

        let updated = db_ctx
            .update_participation(participation.id, UpdateParticipation::approve(Utc::now()))?;

        Ok(ParticipationCommandResponse {
            message: format!("Approved {}'s request.", participant.display_name),
            participation: ParticipationInfo::from_parts(updated, participant),
        })
    })
    .await
    .map_err(|e| {
        log::error!(
            "BlockingError on POST /participations/{{participation_id}}/approve - {}",
            e
        );
        ApiError::internal()
    })??;

    Ok(Json(response))
}

/// API Endpoint *POST /participations/{participation_id}/reject*
///
/// Rejects a participation request, organizer only. Works from any status, a
/// previously granted approval timestamp is kept.
#[post("/participations/{participation_id}/reject")]
pub async fn reject(
    db_ctx: Data<DbInterface>,
    current_user: ReqData<User>,
    participation_id: Path<i64>,
) -> Result<Json<ParticipationCommandResponse>, ApiError> {
    let participation_id = participation_id.into_inner();
    let current_user = current_user.into_inner();

    let response = web::block(move || -> Result<ParticipationCommandResponse, ApiError> {
        let (participation, meetup, participant) = db_ctx
            .get_participation_with_meetup(participation_id)?
            .ok_or_else(ApiError::not_found)?;

        if meetup.organizer != current_user.id {
            return Err(ApiError::forbidden()
                .with_message("You are not authorized to perform this action"));
        }

        let updated =
            db_ctx.update_participation(participation.id, UpdateParticipation::reject())?;

        Ok(ParticipationCommandResponse {
            message: format!("Rejected {}'s request.", participant.display_name),
            participation: ParticipationInfo::from_parts(updated, participant),
        })
    })
    .await
    .map_err(|e| {
        log::error!(
            "BlockingError on POST /participations/{{participation_id}}/reject - {}",
            e
        );
        ApiError::internal()
    })??;

    Ok(Json(response))
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn participation(status: ParticipationStatus) -> Participation {
        Participation {
            id: 7,
            user_id: 2,
            meetup_id: 3,
            status,
            requested_at: Utc.ymd(2025, 1, 1).and_hms(9, 0, 0),
            approved_at: None,
        }
    }

    #[test]
    fn organizers_always_get_a_noop() {
        let action = decide_toggle(true, None, true);
        assert!(matches!(action, ToggleAction::OrganizerNoop));

        let action = decide_toggle(
            true,
            Some(participation(ParticipationStatus::Going)),
            false,
        );
        assert!(matches!(action, ToggleAction::OrganizerNoop));
    }

    #[test]
    fn first_join_on_open_meetup_goes_directly() {
        let action = decide_toggle(false, None, true);

        assert!(matches!(
            action,
            ToggleAction::Create(ParticipationStatus::Going)
        ));
    }

    #[test]
    fn first_join_on_closed_meetup_becomes_pending() {
        let action = decide_toggle(false, None, false);

        assert!(matches!(
            action,
            ToggleAction::Create(ParticipationStatus::Pending)
        ));
    }

    #[test]
    fn active_participations_are_withdrawn() {
        for status in [ParticipationStatus::Going, ParticipationStatus::Pending] {
            let action = decide_toggle(false, Some(participation(status)), true);

            assert!(matches!(action, ToggleAction::Withdraw(_)));
        }
    }

    #[test]
    fn resolved_participations_are_reactivated() {
        for status in [ParticipationStatus::Maybe, ParticipationStatus::NotGoing] {
            let action = decide_toggle(false, Some(participation(status)), true);

            assert!(matches!(action, ToggleAction::Rejoin(_)));
        }
    }
}

//! Classroom lifecycle: creation, join-by-password, student registration, and
//! detach.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::services::content_service::{generate_password, validate_password};
use crate::session::{SessionEvent, SessionHub};
use crate::store::DocumentStore;
use crate::store::models::{ClassroomDoc, RosterDoc, Student};

/// Payload used to create a brand-new classroom session.
#[derive(Debug, Clone, Default)]
pub struct CreateClassroomRequest {
    /// Display name; defaults to "Debate Classroom" when empty.
    pub name: String,
    /// Display name of the teacher; defaults to "Teacher" when empty.
    pub admin_name: String,
    /// Join password. Generated from the configured list when `None`.
    pub password: Option<String>,
}

/// Create a classroom document and hand back the stored record.
pub async fn create_classroom(
    store: &dyn DocumentStore,
    config: &AppConfig,
    request: CreateClassroomRequest,
) -> Result<ClassroomDoc, ServiceError> {
    let password = match request.password {
        Some(password) => {
            if !validate_password(&password) {
                return Err(ServiceError::InvalidInput(
                    "password must be between 6 and 20 characters".into(),
                ));
            }
            password
        }
        None => generate_password(config),
    };

    let classroom = ClassroomDoc {
        id: Uuid::new_v4().simple().to_string(),
        name: non_empty_or(request.name, "Debate Classroom"),
        password,
        admin_name: non_empty_or(request.admin_name, "Teacher"),
        created_at: now_rfc3339(),
        is_active: true,
        active_game_id: None,
    };

    store.put_classroom(classroom.clone()).await?;
    info!(classroom_id = %classroom.id, "created classroom");
    Ok(classroom)
}

/// Find the classroom a spectator is joining by its password.
pub async fn join_classroom(
    store: &dyn DocumentStore,
    password: &str,
) -> Result<ClassroomDoc, ServiceError> {
    let Some(classroom) = store.find_classroom_by_password(password).await? else {
        return Err(ServiceError::NotFound(
            "no classroom matches that password".into(),
        ));
    };

    if !classroom.is_active {
        return Err(ServiceError::InvalidState(
            "classroom is no longer accepting joins".into(),
        ));
    }

    Ok(classroom)
}

/// Register a student, auto-assigning them to the smaller team.
///
/// A student identifier may appear in at most one of the two teams; repeat
/// registrations are rejected before anything is written.
pub async fn register_student(
    store: &dyn DocumentStore,
    classroom_id: &str,
    student: Student,
) -> Result<RosterDoc, ServiceError> {
    if student.id.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "student identifier must not be empty".into(),
        ));
    }
    if student.name.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "student name must not be empty".into(),
        ));
    }

    let mut roster = store
        .find_roster(classroom_id)
        .await?
        .unwrap_or_default();

    let already_registered = roster
        .team_a
        .iter()
        .chain(roster.team_b.iter())
        .any(|existing| existing.id == student.id);
    if already_registered {
        return Err(ServiceError::InvalidState(format!(
            "student `{}` is already registered",
            student.id
        )));
    }

    // Ties go to team A so the first student always lands there.
    if roster.team_a.len() <= roster.team_b.len() {
        roster.team_a.push(student);
    } else {
        roster.team_b.push(student);
    }

    store.put_roster(classroom_id, roster.clone()).await?;
    Ok(roster)
}

/// Detach this client from its classroom: restore the initial projection and
/// signal the sync controller to tear its subscriptions down.
pub fn logout(hub: &SessionHub, shutdown: &watch::Sender<bool>) {
    let _ = shutdown.send(true);
    hub.dispatch(SessionEvent::ResetState);
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

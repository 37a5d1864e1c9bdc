use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    auth::CurrentUser,
    error::ApiError,
    model::{Id, Project, ProjectChanges, ProjectMember, User},
    routes::user_brief,
    schemas::{
        AddMemberRequest, ProjectCreate, ProjectListResponse, ProjectMemberResponse,
        ProjectResponse, ProjectUpdate,
    },
    startup::AppState,
    store::StoreError,
    validate::{ValidJson, ValidPath},
};

/// Who may touch a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The owner or any member.
    Member,
    Owner,
}

/// A project the caller is allowed to see, with its members.
pub struct AccessibleProject {
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

impl AccessibleProject {
    /// True when `user_id` owns the project or is one of its members.
    pub fn includes(&self, user_id: Id) -> bool {
        self.project.owner_id == user_id || self.members.iter().any(|m| m.user_id == user_id)
    }
}

pub async fn project_with_access(
    state: &AppState,
    project_id: Id,
    user: &User,
    access: Access,
) -> Result<AccessibleProject, ApiError> {
    let project = state
        .store
        .project(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let members = state.store.members(project_id).await?;
    let found = AccessibleProject { project, members };

    match access {
        Access::Owner if found.project.owner_id != user.id => {
            Err(ApiError::forbidden("Only owner can perform this action"))
        }
        Access::Member if !found.includes(user.id) => Err(ApiError::forbidden("Access denied")),
        _ => Ok(found),
    }
}

async fn member_responses(
    state: &AppState,
    members: &[ProjectMember],
) -> Result<Vec<ProjectMemberResponse>, ApiError> {
    let mut responses = Vec::with_capacity(members.len());
    for member in members {
        let user = user_brief(state, member.user_id).await?;
        responses.push(ProjectMemberResponse::new(member, user));
    }
    Ok(responses)
}

async fn project_response(
    state: &AppState,
    project: Project,
    members: &[ProjectMember],
) -> Result<ProjectResponse, ApiError> {
    let owner = user_brief(state, project.owner_id).await?;
    let members = member_responses(state, members).await?;
    Ok(ProjectResponse::new(project, owner, members))
}

#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "projects",
    security(("bearer" = [])),
    request_body = ProjectCreate,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 422, description = "Invalid project data", body = ErrorBody),
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(input): ValidJson<ProjectCreate>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let project = state
        .store
        .create_project(user.id, &input.name, input.description.as_deref())
        .await?;

    tracing::info!(project_id = project.id, owner_id = user.id, "project created");
    let response = project_response(&state, project, &[]).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "projects",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Projects owned by or shared with the caller", body = [ProjectListResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    )
)]
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ProjectListResponse>>, ApiError> {
    let projects = state.store.projects_for_user(user.id).await?;

    let mut listing = Vec::with_capacity(projects.len());
    for project in projects {
        let owner = user_brief(&state, project.owner_id).await?;
        listing.push(ProjectListResponse::new(project, owner));
    }
    Ok(Json(listing))
}

#[utoipa::path(
    get,
    path = "/api/projects/{project_id}",
    tag = "projects",
    security(("bearer" = [])),
    params(("project_id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project with its members", body = ProjectResponse),
        (status = 403, description = "Caller is neither owner nor member", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(project_id): ValidPath<Id>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let found = project_with_access(&state, project_id, &user, Access::Member).await?;
    Ok(Json(
        project_response(&state, found.project, &found.members).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/projects/{project_id}",
    tag = "projects",
    security(("bearer" = [])),
    params(("project_id" = i64, Path, description = "Project id")),
    request_body = ProjectUpdate,
    responses(
        (status = 200, description = "Updated project", body = ProjectResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
        (status = 422, description = "Invalid project data", body = ErrorBody),
    )
)]
pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(project_id): ValidPath<Id>,
    ValidJson(input): ValidJson<ProjectUpdate>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let found = project_with_access(&state, project_id, &user, Access::Owner).await?;

    let changes = ProjectChanges {
        name: input.name,
        description: input.description,
    };
    let project = state
        .store
        .update_project(project_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    tracing::info!(project_id, "project updated");
    Ok(Json(
        project_response(&state, project, &found.members).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{project_id}",
    tag = "projects",
    security(("bearer" = [])),
    params(("project_id" = i64, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project, members and tasks deleted"),
        (status = 403, description = "Caller is not the owner", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(project_id): ValidPath<Id>,
) -> Result<StatusCode, ApiError> {
    project_with_access(&state, project_id, &user, Access::Owner).await?;

    if !state.store.delete_project(project_id).await? {
        return Err(ApiError::not_found("Project not found"));
    }

    tracing::info!(project_id, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/projects/{project_id}/members",
    tag = "projects",
    security(("bearer" = [])),
    params(("project_id" = i64, Path, description = "Project id")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = ProjectMemberResponse),
        (status = 400, description = "User is the owner or already a member", body = ErrorBody),
        (status = 403, description = "Caller is not the owner", body = ErrorBody),
        (status = 404, description = "Project or user not found", body = ErrorBody),
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(project_id): ValidPath<Id>,
    ValidJson(input): ValidJson<AddMemberRequest>,
) -> Result<(StatusCode, Json<ProjectMemberResponse>), ApiError> {
    let found = project_with_access(&state, project_id, &user, Access::Owner).await?;

    let new_member = state
        .store
        .user_by_id(input.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if found.members.iter().any(|m| m.user_id == new_member.id) {
        return Err(ApiError::bad_request("User is already a member"));
    }
    if found.project.owner_id == new_member.id {
        return Err(ApiError::bad_request("Owner cannot be added as member"));
    }

    let member = match state.store.add_member(project_id, new_member.id).await {
        Ok(member) => member,
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::bad_request("User is already a member"))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(project_id, user_id = new_member.id, "member added");
    Ok((
        StatusCode::CREATED,
        Json(ProjectMemberResponse::new(&member, (&new_member).into())),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{project_id}/members/{user_id}",
    tag = "projects",
    security(("bearer" = [])),
    params(
        ("project_id" = i64, Path, description = "Project id"),
        ("user_id" = i64, Path, description = "Id of the member to remove"),
    ),
    responses(
        (status = 204, description = "Member removed and unassigned from the project's tasks"),
        (status = 403, description = "Caller is not the owner", body = ErrorBody),
        (status = 404, description = "Project or member not found", body = ErrorBody),
    )
)]
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath((project_id, user_id)): ValidPath<(Id, Id)>,
) -> Result<StatusCode, ApiError> {
    project_with_access(&state, project_id, &user, Access::Owner).await?;

    if !state.store.remove_member(project_id, user_id).await? {
        return Err(ApiError::not_found("Member not found"));
    }

    tracing::info!(project_id, user_id, "member removed");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/members",
    tag = "projects",
    security(("bearer" = [])),
    params(("project_id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Members of the project", body = [ProjectMemberResponse]),
        (status = 403, description = "Caller is neither owner nor member", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(project_id): ValidPath<Id>,
) -> Result<Json<Vec<ProjectMemberResponse>>, ApiError> {
    let found = project_with_access(&state, project_id, &user, Access::Member).await?;
    Ok(Json(member_responses(&state, &found.members).await?))
}

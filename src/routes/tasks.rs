use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    auth::CurrentUser,
    error::ApiError,
    model::{Id, NewTask, Task, TaskChanges},
    routes::{
        projects::{project_with_access, Access, AccessibleProject},
        user_brief,
    },
    schemas::{TaskCreate, TaskResponse, TaskUpdate},
    startup::AppState,
    validate::{ValidJson, ValidPath},
};

fn check_assignee(project: &AccessibleProject, assignee_id: Id) -> Result<(), ApiError> {
    if project.includes(assignee_id) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "Assignee must be project owner or member",
        ))
    }
}

async fn task_response(state: &AppState, task: Task) -> Result<TaskResponse, ApiError> {
    let creator = user_brief(state, task.creator_id).await?;
    let assignee = match task.assignee_id {
        Some(id) => Some(user_brief(state, id).await?),
        None => None,
    };
    Ok(TaskResponse::new(task, creator, assignee))
}

#[utoipa::path(
    post,
    path = "/api/projects/{project_id}/tasks",
    tag = "tasks",
    security(("bearer" = [])),
    params(("project_id" = i64, Path, description = "Project id")),
    request_body = TaskCreate,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Assignee is not part of the project", body = ErrorBody),
        (status = 403, description = "Caller is neither owner nor member", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
        (status = 422, description = "Invalid task data", body = ErrorBody),
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(project_id): ValidPath<Id>,
    ValidJson(input): ValidJson<TaskCreate>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let project = project_with_access(&state, project_id, &user, Access::Member).await?;
    if let Some(assignee_id) = input.assignee_id {
        check_assignee(&project, assignee_id)?;
    }

    let task = state
        .store
        .create_task(NewTask {
            title: input.title,
            description: input.description,
            status: input.status,
            complexity: input.complexity,
            project_id,
            creator_id: user.id,
            assignee_id: input.assignee_id,
        })
        .await?;

    tracing::info!(project_id, task_id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task_response(&state, task).await?)))
}

#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/tasks",
    tag = "tasks",
    security(("bearer" = [])),
    params(("project_id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Tasks of the project, newest first", body = [TaskResponse]),
        (status = 403, description = "Caller is neither owner nor member", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath(project_id): ValidPath<Id>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    project_with_access(&state, project_id, &user, Access::Member).await?;

    let tasks = state.store.tasks(project_id).await?;
    let mut responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        responses.push(task_response(&state, task).await?);
    }
    Ok(Json(responses))
}

#[utoipa::path(
    get,
    path = "/api/projects/{project_id}/tasks/{task_id}",
    tag = "tasks",
    security(("bearer" = [])),
    params(
        ("project_id" = i64, Path, description = "Project id"),
        ("task_id" = i64, Path, description = "Task id"),
    ),
    responses(
        (status = 200, description = "The task", body = TaskResponse),
        (status = 403, description = "Caller is neither owner nor member", body = ErrorBody),
        (status = 404, description = "Project or task not found", body = ErrorBody),
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath((project_id, task_id)): ValidPath<(Id, Id)>,
) -> Result<Json<TaskResponse>, ApiError> {
    project_with_access(&state, project_id, &user, Access::Member).await?;

    let task = state
        .store
        .task(project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    Ok(Json(task_response(&state, task).await?))
}

#[utoipa::path(
    put,
    path = "/api/projects/{project_id}/tasks/{task_id}",
    tag = "tasks",
    security(("bearer" = [])),
    params(
        ("project_id" = i64, Path, description = "Project id"),
        ("task_id" = i64, Path, description = "Task id"),
    ),
    request_body = TaskUpdate,
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 400, description = "Assignee is not part of the project", body = ErrorBody),
        (status = 403, description = "Caller is neither owner nor member", body = ErrorBody),
        (status = 404, description = "Project or task not found", body = ErrorBody),
        (status = 422, description = "Invalid task data", body = ErrorBody),
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath((project_id, task_id)): ValidPath<(Id, Id)>,
    ValidJson(input): ValidJson<TaskUpdate>,
) -> Result<Json<TaskResponse>, ApiError> {
    let project = project_with_access(&state, project_id, &user, Access::Member).await?;

    if state.store.task(project_id, task_id).await?.is_none() {
        return Err(ApiError::not_found("Task not found"));
    }
    if let Some(Some(assignee_id)) = input.assignee_id {
        check_assignee(&project, assignee_id)?;
    }

    let changes = TaskChanges {
        title: input.title,
        description: input.description,
        status: input.status,
        complexity: input.complexity,
        assignee_id: input.assignee_id,
    };
    let task = state
        .store
        .update_task(project_id, task_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    tracing::info!(project_id, task_id, "task updated");
    Ok(Json(task_response(&state, task).await?))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{project_id}/tasks/{task_id}",
    tag = "tasks",
    security(("bearer" = [])),
    params(
        ("project_id" = i64, Path, description = "Project id"),
        ("task_id" = i64, Path, description = "Task id"),
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Caller is neither owner nor member", body = ErrorBody),
        (status = 404, description = "Project or task not found", body = ErrorBody),
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidPath((project_id, task_id)): ValidPath<(Id, Id)>,
) -> Result<StatusCode, ApiError> {
    project_with_access(&state, project_id, &user, Access::Member).await?;

    if !state.store.delete_task(project_id, task_id).await? {
        return Err(ApiError::not_found("Task not found"));
    }

    tracing::info!(project_id, task_id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

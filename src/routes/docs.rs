//! OpenAPI document and the pages that render it.

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ErrorBody,
    model::{TaskComplexity, TaskStatus},
    routes,
    schemas::{
        AddMemberRequest, HealthResponse, HealthStatus, LoginForm, ProjectCreate,
        ProjectListResponse, ProjectMemberResponse, ProjectResponse, ProjectUpdate, RootResponse,
        TaskCreate, TaskResponse, TaskUpdate, Token, UserBrief, UserCreate, UserResponse,
    },
};

pub const OPENAPI_PATH: &str = "/openapi.json";

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health_check::healthcheck,
        routes::health_check::root,
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::users::search_users,
        routes::projects::create_project,
        routes::projects::list_projects,
        routes::projects::get_project,
        routes::projects::update_project,
        routes::projects::delete_project,
        routes::projects::add_member,
        routes::projects::remove_member,
        routes::projects::list_members,
        routes::tasks::create_task,
        routes::tasks::list_tasks,
        routes::tasks::get_task,
        routes::tasks::update_task,
        routes::tasks::delete_task,
    ),
    components(schemas(
        HealthResponse,
        HealthStatus,
        RootResponse,
        UserCreate,
        LoginForm,
        Token,
        UserResponse,
        UserBrief,
        ProjectCreate,
        ProjectUpdate,
        ProjectResponse,
        ProjectListResponse,
        ProjectMemberResponse,
        AddMemberRequest,
        TaskCreate,
        TaskUpdate,
        TaskResponse,
        TaskStatus,
        TaskComplexity,
        ErrorBody,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness and service information"),
        (name = "auth", description = "Registration, login and the current user"),
        (name = "users", description = "User lookup"),
        (name = "projects", description = "Projects and their members"),
        (name = "tasks", description = "Tasks inside a project"),
    ),
    info(
        title = "TaskFlow API",
        version = "1.0.0",
        description = "Project management backend: projects, members and tasks"
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Swagger UI under `/docs`, ReDoc under `/redoc` and the raw document under
/// [`OPENAPI_PATH`]. All assets are bundled into the binary.
pub fn docs_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/docs").url(OPENAPI_PATH, ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
}

use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer, Responder};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel::Connection;
use log::{debug, error, info};
use serde_json::json;
use std::env;

use guardtrack::config::{AppConfig, DbPool, DB_INIT_SQL};
use guardtrack::errors::ApiError;
use guardtrack::logger::setup_logger;
use guardtrack::middleware::RequestLogger;
use guardtrack::models::{
    AssignEmployeesRequest, CreateCheckpointRequest, CreateClientRequest, CreateEmployeeRequest,
    CreateRoleRequest, CreateUserRequest, LoginMeta, LoginRequest, ResetPasswordRequest,
    ScanRequest, UpdateClientRequest, UpdateEmployeeRequest, UpdateUserRequest,
};
use guardtrack::qr::QrStore;
use guardtrack::services::{
    CheckpointService, ClientService, EmployeeService, LoginService, RoleService, UserService,
};

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// ---------- authentication ----------

#[post("/login")]
async fn login(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    meta: web::Query<LoginMeta>,
    login_data: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Login attempt for identifier: {}", login_data.username);
    let response =
        LoginService::login(login_data.into_inner(), meta.into_inner(), &config, &pool).await?;
    Ok(HttpResponse::Ok().json(response))
}

// ---------- user accounts ----------

#[get("/users")]
async fn list_users(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let users = UserService::list_users(&pool).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{id}")]
async fn get_user(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let user = UserService::get_user(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/users")]
async fn create_user(
    pool: web::Data<DbPool>,
    user_data: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Create user request received for username: {}", user_data.username);
    UserService::create_user(user_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User created successfully"
    })))
}

#[put("/users/{id}")]
async fn update_user(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    user_data: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    UserService::update_user(path.into_inner(), user_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User updated successfully"
    })))
}

#[delete("/users/{id}")]
async fn delete_user(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    UserService::delete_user(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted successfully"
    })))
}

#[post("/users/reset-password")]
async fn reset_password(
    pool: web::Data<DbPool>,
    reset_data: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    UserService::reset_password(reset_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password updated successfully"
    })))
}

// ---------- roles & permissions ----------

#[get("/roles")]
async fn list_roles(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let roles = RoleService::list_roles(&pool).await?;
    Ok(HttpResponse::Ok().json(roles))
}

#[post("/roles")]
async fn create_role(
    pool: web::Data<DbPool>,
    role_data: web::Json<CreateRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Create role request received for: {}", role_data.role_name);
    let role = RoleService::create_role(role_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(role))
}

#[put("/roles/{id}")]
async fn update_role(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    role_data: web::Json<CreateRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    RoleService::update_role(path.into_inner(), role_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Role updated successfully"
    })))
}

#[delete("/roles/{id}")]
async fn delete_role(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    RoleService::delete_role(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Role deleted successfully"
    })))
}

#[get("/roles/{id}/permissions")]
async fn get_role_permissions(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let permissions = RoleService::get_role_permissions(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(permissions))
}

// ---------- clients & assignments ----------

#[get("/clients")]
async fn list_clients(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let clients = ClientService::list_clients(&pool).await?;
    Ok(HttpResponse::Ok().json(clients))
}

#[get("/clients/{id}")]
async fn get_client(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let detail = ClientService::get_client(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[post("/clients")]
async fn add_client(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    client_data: web::Json<CreateClientRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Add client request received for: {}", client_data.name);
    let client = ClientService::add_client(client_data.into_inner(), &config, &pool).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Client added successfully.",
        "client": client
    })))
}

#[put("/clients/{id}")]
async fn update_client(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    client_data: web::Json<UpdateClientRequest>,
) -> Result<HttpResponse, ApiError> {
    let client =
        ClientService::update_client(path.into_inner(), client_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Client updated successfully.",
        "client": client
    })))
}

#[delete("/clients/{id}")]
async fn delete_client(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    ClientService::delete_client(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Client deleted successfully." })))
}

#[get("/clients/{id}/employees")]
async fn get_client_employees(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let employees = ClientService::get_client_employees(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(employees))
}

#[post("/clients/assignments")]
async fn assign_employees(
    pool: web::Data<DbPool>,
    assignment_data: web::Json<AssignEmployeesRequest>,
) -> Result<HttpResponse, ApiError> {
    let assignments = ClientService::assign_employees(assignment_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Employees assigned to client successfully.",
        "assignments": assignments
    })))
}

#[delete("/clients/assignments/{id}")]
async fn delete_assignment(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    ClientService::delete_assignment(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee assignment deleted successfully." })))
}

// ---------- employees ----------

#[get("/employees/unassigned")]
async fn get_unassigned_employees(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let employees = ClientService::get_unassigned_employees(&pool).await?;
    Ok(HttpResponse::Ok().json(employees))
}

#[get("/employees")]
async fn list_employees(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let employees = EmployeeService::list_employees(&pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "employees": employees })))
}

#[get("/employees/{employee_no}")]
async fn get_employee(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let employee = EmployeeService::get_employee(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "employee": employee })))
}

#[post("/employees")]
async fn add_employee(
    pool: web::Data<DbPool>,
    employee_data: web::Json<CreateEmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Add employee request received for: {}", employee_data.employee_no);
    EmployeeService::add_employee(employee_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Employee added successfully" })))
}

#[put("/employees/{employee_no}")]
async fn update_employee(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    employee_data: web::Json<UpdateEmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    EmployeeService::update_employee(path.into_inner(), employee_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee updated successfully" })))
}

// ---------- checkpoints & scans ----------

#[get("/checkpoints")]
async fn list_checkpoints(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let checkpoints = CheckpointService::list_checkpoints(&pool).await?;
    Ok(HttpResponse::Ok().json(checkpoints))
}

#[get("/checkpoints/client/{client_id}")]
async fn get_checkpoints_by_client(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let checkpoints = CheckpointService::get_checkpoints_by_client(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(checkpoints))
}

#[post("/checkpoints")]
async fn add_checkpoint(
    pool: web::Data<DbPool>,
    qr: web::Data<QrStore>,
    checkpoint_data: web::Json<CreateCheckpointRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Add checkpoint request received for: {}", checkpoint_data.name);
    let checkpoint =
        CheckpointService::add_checkpoint(checkpoint_data.into_inner(), &qr, &pool).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Checkpoint created successfully.",
        "checkpoint": checkpoint
    })))
}

#[get("/checkpoints/{id}/qr")]
async fn get_checkpoint_qr(
    qr: web::Data<QrStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let bytes = qr.load(path.into_inner())?;
    Ok(HttpResponse::Ok().content_type("image/png").body(bytes))
}

#[post("/scan")]
async fn scan(
    pool: web::Data<DbPool>,
    scan_data: web::Json<ScanRequest>,
) -> Result<HttpResponse, ApiError> {
    let detail = CheckpointService::scan(scan_data.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Scanned details saved successfully.",
        "scannedDetail": detail
    })))
}

#[get("/scans")]
async fn list_scans(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let scans = CheckpointService::list_scans(&pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "All scan details retrieved successfully.",
        "scanDetails": scans
    })))
}

#[get("/scans/client/{client_id}")]
async fn get_scans_by_client(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let scans = CheckpointService::get_scans_by_client(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Scan details retrieved successfully for the client.",
        "scanDetails": scans
    })))
}

#[get("/scans/employee/{employee_no}")]
async fn get_scans_by_employee(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let scans = CheckpointService::get_scans_by_employee(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Scan details retrieved successfully for the employee.",
        "scanDetails": scans
    })))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables and initialize logger
    dotenvy::dotenv().ok();
    setup_logger();

    // Get host and port from environment or use defaults
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a number");

    // Connecting to database
    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    info!("Connecting to database");

    // Initialize database schema
    let mut conn = PgConnection::establish(&db_url)
        .expect("Failed to establish connection for schema initialization");
    conn.batch_execute(DB_INIT_SQL)
        .expect("Failed to execute database initialization script");
    info!("Database initialization complete.");

    // Set up database connection pool
    let manager = ConnectionManager::<PgConnection>::new(db_url);
    let pool = r2d2::Pool::builder()
        .build(manager)
        .expect("Failed to create database connection pool");

    // Load and validate configuration
    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        error!("Configuration validation error: {}", e);
        panic!("Invalid configuration: {}", e);
    }

    let qr_store = QrStore::from_config(&config);

    info!("Starting HTTP server at http://{}:{}", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            // Enable request logger middleware
            .wrap(RequestLogger)
            // Register app data
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(qr_store.clone()))
            // API routes
            .service(
                web::scope("/api")
                    .service(health_check)
                    .service(login)
                    .service(list_users)
                    .service(create_user)
                    .service(reset_password)
                    .service(get_user)
                    .service(update_user)
                    .service(delete_user)
                    .service(list_roles)
                    .service(create_role)
                    .service(update_role)
                    .service(delete_role)
                    .service(get_role_permissions)
                    .service(list_clients)
                    .service(add_client)
                    .service(assign_employees)
                    .service(delete_assignment)
                    .service(get_client_employees)
                    .service(get_client)
                    .service(update_client)
                    .service(delete_client)
                    .service(get_unassigned_employees)
                    .service(list_employees)
                    .service(add_employee)
                    .service(get_employee)
                    .service(update_employee)
                    .service(list_checkpoints)
                    .service(add_checkpoint)
                    .service(get_checkpoints_by_client)
                    .service(get_checkpoint_qr)
                    .service(scan)
                    .service(list_scans)
                    .service(get_scans_by_client)
                    .service(get_scans_by_employee),
            )
    })
    .workers(2) // Specify number of workers
    .keep_alive(std::time::Duration::from_secs(75)) // Configure keep-alive
    .shutdown_timeout(30) // Graceful shutdown timeout in seconds
    .bind((host, port))?
    .run()
    .await
}

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// ---------- accounts ----------

#[derive(Queryable, Serialize, Debug)]
pub struct UserAccount {
    pub id: i32,
    pub employee_no: Option<String>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub employee_status: Option<String>,
    pub user_role: Option<i32>,
    pub user_type: String,
    pub employment: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::app_user)]
pub struct NewUser {
    pub employee_no: Option<String>,
    pub username: String,
    pub password: String,
    pub employee_status: Option<String>,
    pub user_role: Option<i32>,
    pub user_type: String,
    pub employment: String,
}

// Sparse patch for app_user: a None field is left untouched. The double
// Option on employee_no distinguishes "leave as is" from "set NULL".
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::app_user)]
pub struct UserPatch {
    pub employee_no: Option<Option<String>>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub employee_status: Option<String>,
    pub user_role: Option<i32>,
    pub user_type: Option<String>,
    pub employment: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.employee_no.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.employee_status.is_none()
            && self.user_role.is_none()
            && self.user_type.is_none()
            && self.employment.is_none()
    }
}

// Listing projection - never exposes the password hash.
#[derive(Queryable, Serialize, Debug)]
pub struct UserSummary {
    pub id: i32,
    pub employee_no: Option<String>,
    pub username: String,
    pub employee_status: Option<String>,
    pub user_role: Option<i32>,
    pub user_type: String,
}

// Account joined to its employee record (employee-backed accounts only).
#[derive(Queryable, Serialize, Debug)]
pub struct UserDetail {
    pub id: i32,
    pub employee_no: Option<String>,
    pub username: String,
    pub employee_status: Option<String>,
    pub user_role: Option<i32>,
    pub name: String,
}

// ---------- employees ----------

#[derive(Queryable, Serialize, Debug)]
pub struct Employee {
    pub employee_no: String,
    pub name: String,
    pub name_initial: Option<String>,
    pub calling_name: Option<String>,
    pub nic: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub employee_category: String,
    pub employee_type: Option<String>,
    pub department_designation_id: Option<i32>,
    pub work_location: Option<String>,
    pub active_status: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::employee)]
pub struct NewEmployee {
    pub employee_no: String,
    pub name: String,
    pub name_initial: Option<String>,
    pub calling_name: Option<String>,
    pub nic: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub employee_category: String,
    pub employee_type: Option<String>,
    pub department_designation_id: Option<i32>,
    pub work_location: Option<String>,
    pub active_status: String,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::employee)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub name_initial: Option<String>,
    pub calling_name: Option<String>,
    pub nic: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub employee_category: Option<String>,
    pub employee_type: Option<String>,
    pub department_designation_id: Option<i32>,
    pub work_location: Option<String>,
    pub active_status: Option<String>,
}

impl EmployeePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.name_initial.is_none()
            && self.calling_name.is_none()
            && self.nic.is_none()
            && self.date_of_birth.is_none()
            && self.contact_number.is_none()
            && self.address.is_none()
            && self.employee_category.is_none()
            && self.employee_type.is_none()
            && self.department_designation_id.is_none()
            && self.work_location.is_none()
            && self.active_status.is_none()
    }
}

// Employee projection used by assignment views, joined through the
// designation/department lookup.
#[derive(Queryable, Serialize, Debug)]
pub struct AssignedEmployee {
    pub employee_no: String,
    pub name: String,
    pub contact_number: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub work_location: Option<String>,
    pub active_status: String,
}

#[derive(Queryable, Serialize, Debug)]
pub struct DesignationDepartment {
    pub id: i32,
    pub designation: String,
    pub department: String,
}

// ---------- clients & assignments ----------

#[derive(Queryable, Serialize, Debug, Clone)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::client)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::client)]
pub struct ClientChanges {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Serialize, Debug)]
pub struct EmployeeClientAssignment {
    pub id: i32,
    pub client_id: i32,
    pub employee_no: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::employee_client_assignment)]
pub struct NewAssignment {
    pub client_id: i32,
    pub employee_no: String,
}

#[derive(Serialize, Debug)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub employees: Vec<AssignedEmployee>,
}

// ---------- roles & permissions ----------

#[derive(Queryable, Serialize, Debug)]
pub struct Role {
    pub id: i32,
    pub role_name: String,
    pub role_description: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::roles)]
pub struct NewRole {
    pub role_name: String,
    pub role_description: Option<String>,
}

#[derive(Queryable, Serialize, Debug)]
pub struct Permission {
    pub id: i32,
    pub permission_name: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::role_permissions)]
pub struct NewRolePermission {
    pub role_id: i32,
    pub permission_id: i32,
}

// ---------- checkpoints & scans ----------

#[derive(Queryable, Serialize, Debug)]
pub struct Checkpoint {
    pub id: i32,
    pub name: String,
    pub client_id: i32,
    pub employee_ids: Vec<String>,
    pub location_name: String,
    pub location_address: String,
    pub qr_code_url: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::checkpoint)]
pub struct NewCheckpoint {
    pub name: String,
    pub client_id: i32,
    pub employee_ids: Vec<String>,
    pub location_name: String,
    pub location_address: String,
    pub qr_code_url: String,
}

#[derive(Queryable, Serialize, Debug)]
pub struct ScannedDetail {
    pub id: i32,
    pub employee_no: String,
    pub checkpoint_id: i32,
    pub location_name: String,
    pub scan_date: NaiveDate,
    pub scan_time: NaiveTime,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::scanned_detail)]
pub struct NewScannedDetail {
    pub employee_no: String,
    pub checkpoint_id: i32,
    pub location_name: String,
    pub scan_date: NaiveDate,
    pub scan_time: NaiveTime,
}

// ---------- sessions, logs, attendance ----------

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::refresh_tokens)]
pub struct NewRefreshToken {
    pub employee_no: String,
    pub token: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::login_logs)]
pub struct NewLoginLog {
    pub username: String,
    pub login_status: String,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub mac: Option<String>,
    pub logged_time: NaiveDateTime,
}

#[derive(Queryable, Debug, Default, Clone)]
pub struct AttendanceSnapshot {
    pub check_in_time: Option<NaiveDateTime>,
    pub check_in_type: Option<String>,
    pub check_out_time: Option<NaiveDateTime>,
    pub check_out_type: Option<String>,
    pub status: Option<String>,
}

// ---------- request DTOs ----------

#[derive(Deserialize, Debug)]
pub struct CreateUserRequest {
    pub employee_no: Option<String>,
    pub username: String,
    pub password: String,
    pub user_role: Option<i32>,
    pub user_type: String,
    pub employment: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateUserRequest {
    pub employee_no: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub employee_status: Option<String>,
    pub user_role: Option<i32>,
    pub user_type: Option<String>,
    pub employment: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub employee_no: String,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize, Debug)]
pub struct CreateRoleRequest {
    pub role_name: String,
    pub role_description: Option<String>,
    pub permissions: Vec<i32>,
}

#[derive(Deserialize, Debug)]
pub struct CreateClientRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub employee_numbers: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateClientRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub employee_numbers: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct AssignEmployeesRequest {
    pub client_id: i32,
    pub employee_numbers: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateEmployeeRequest {
    pub employee_no: String,
    pub name: String,
    pub name_initial: Option<String>,
    pub calling_name: Option<String>,
    pub nic: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub employee_category: String,
    pub employee_type: Option<String>,
    pub department_designation_id: Option<i32>,
    pub work_location: Option<String>,
    pub active_status: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateEmployeeRequest {
    pub name: Option<String>,
    pub name_initial: Option<String>,
    pub calling_name: Option<String>,
    pub nic: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub employee_category: Option<String>,
    pub employee_type: Option<String>,
    pub department_designation_id: Option<i32>,
    pub work_location: Option<String>,
    pub active_status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateCheckpointRequest {
    pub name: String,
    pub client_id: i32,
    pub employee_ids: Vec<String>,
    pub location_name: String,
    pub location_address: String,
}

#[derive(Deserialize, Debug)]
pub struct ScanRequest {
    pub employee_no: String,
    pub checkpoint_id: i32,
    pub location_name: String,
    pub scan_date: NaiveDate,
    pub scan_time: NaiveTime,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// Client device metadata forwarded as query parameters, kept for the audit
// trail in login_logs.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct LoginMeta {
    pub os: Option<String>,
    pub browser: Option<String>,
    pub mac: Option<String>,
}

// ---------- token claims & login response ----------

#[derive(Serialize, Deserialize, Debug)]
pub struct AccessClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub permissions: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Serialize, Debug, Default, Clone)]
pub struct EmployeeLoginContext {
    pub employee_fullname: Option<String>,
    pub employee_name_initial: Option<String>,
    pub employee_calling_name: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_in_type: Option<String>,
    pub check_out_time: Option<NaiveDateTime>,
    pub check_out_type: Option<String>,
    pub attendance_status: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub employee_no: Option<String>,
    pub username: String,
    pub user_type: String,
    pub user_token: String,
    pub permissions: Vec<i32>,
    pub supervisor_id: Option<i32>,
    pub currency: String,
    pub symbol: String,
    // Present only for employee-backed accounts; flattened so the employee
    // fields sit at the top level of the JSON body.
    #[serde(flatten)]
    pub employee: Option<EmployeeLoginContext>,
}

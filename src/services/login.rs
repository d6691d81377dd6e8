use crate::config::{AppConfig, DbPool};
use crate::errors::ApiError;
use crate::models::{
    AttendanceSnapshot, Employee, EmployeeLoginContext, LoginMeta, LoginRequest, LoginResponse,
    NewLoginLog, NewRefreshToken, UserAccount,
};
use crate::services::CredentialService;
use actix_web::web;
use chrono::{Duration, Local, Utc};
use diesel::prelude::*;
use log::{debug, info};

// Employee-number-style identifiers share the login field with usernames.
fn is_employee_identifier(identifier: &str) -> bool {
    identifier.starts_with("EMP")
}

// Tokens and the refresh-token row are keyed by employee_no when the account
// has one, otherwise by username (derived client accounts included).
fn token_subject<'a>(employee_no: Option<&'a str>, username: &'a str) -> &'a str {
    employee_no.unwrap_or(username)
}

fn assemble_response(
    account: &UserAccount,
    user_token: String,
    permissions: Vec<i32>,
    supervisor_id: Option<i32>,
    currency_row: Option<(String, String)>,
    employee: Option<EmployeeLoginContext>,
) -> LoginResponse {
    let (currency, symbol) =
        currency_row.unwrap_or_else(|| ("USD".to_string(), "$".to_string()));
    LoginResponse {
        employee_no: account.employee_no.clone(),
        username: account.username.clone(),
        user_type: account.user_type.clone(),
        user_token,
        permissions,
        supervisor_id,
        currency,
        symbol,
        employee,
    }
}

fn find_account(
    identifier: &str,
    conn: &mut PgConnection,
) -> Result<Option<UserAccount>, diesel::result::Error> {
    use crate::schema::app_user::dsl::*;
    if is_employee_identifier(identifier) {
        app_user
            .filter(employee_no.eq(identifier))
            .first::<UserAccount>(conn)
            .optional()
    } else {
        app_user
            .filter(username.eq(identifier))
            .first::<UserAccount>(conn)
            .optional()
    }
}

// Audit trail, not telemetry: one row per attempt, pass or fail, unknown
// identifiers included.
fn log_attempt(
    attempted_username: &str,
    passed: bool,
    meta: &LoginMeta,
    conn: &mut PgConnection,
) -> Result<(), diesel::result::Error> {
    diesel::insert_into(crate::schema::login_logs::table)
        .values(&NewLoginLog {
            username: attempted_username.to_string(),
            login_status: (if passed { "Pass" } else { "Fail" }).to_string(),
            os: meta.os.clone(),
            browser: meta.browser.clone(),
            mac: meta.mac.clone(),
            logged_time: Utc::now().naive_utc(),
        })
        .execute(conn)?;
    Ok(())
}

// Employment context: active-status gate plus name, designation/department,
// the calling day's attendance row and the supervisor assignment.
fn gather_employee_context(
    number: &str,
    conn: &mut PgConnection,
) -> Result<(EmployeeLoginContext, Option<i32>), ApiError> {
    let record: Option<Employee> = {
        use crate::schema::employee::dsl::*;
        employee.find(number).first::<Employee>(conn).optional()?
    };
    let record = match record {
        Some(r) if r.active_status.eq_ignore_ascii_case("active") => r,
        _ => return Err(ApiError::Forbidden("User is not active".to_string())),
    };

    let lookup = match record.department_designation_id {
        Some(lookup_id) => {
            use crate::schema::designation_department::dsl::*;
            designation_department
                .find(lookup_id)
                .select((designation, department))
                .first::<(String, String)>(conn)
                .optional()?
        }
        None => None,
    };

    let today_start = Local::now().date_naive().and_time(chrono::NaiveTime::MIN);
    let tomorrow_start = today_start + Duration::days(1);
    let attendance: AttendanceSnapshot = {
        use crate::schema::attendance_daily::dsl::*;
        attendance_daily
            .filter(employee_no.eq(number))
            .filter(check_in_time.ge(today_start))
            .filter(check_in_time.lt(tomorrow_start))
            .select((check_in_time, check_in_type, check_out_time, check_out_type, status))
            .first::<AttendanceSnapshot>(conn)
            .optional()?
            .unwrap_or_default()
    };

    let supervisor_id: Option<i32> = {
        use crate::schema::supervisor;
        use crate::schema::supervisor_employee_assignment as sea;
        sea::table
            .inner_join(supervisor::table)
            .filter(sea::employee_no.eq(number))
            .select(supervisor::id)
            .first::<i32>(conn)
            .optional()?
    };

    let (designation, department) = match lookup {
        Some((d, dep)) => (Some(d), Some(dep)),
        None => (None, None),
    };

    Ok((
        EmployeeLoginContext {
            employee_fullname: Some(record.name),
            employee_name_initial: record.name_initial,
            employee_calling_name: record.calling_name,
            designation,
            department,
            check_in_time: attendance.check_in_time,
            check_in_type: attendance.check_in_type,
            check_out_time: attendance.check_out_time,
            check_out_type: attendance.check_out_type,
            attendance_status: attendance.status,
        },
        supervisor_id,
    ))
}

pub struct LoginService;

impl LoginService {
    pub async fn login(
        req: LoginRequest,
        meta: LoginMeta,
        config: &AppConfig,
        pool: &DbPool,
    ) -> Result<LoginResponse, ApiError> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(ApiError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let config = config.clone();
        let conn = pool.get()?;
        let response = web::block(move || {
            let mut conn = conn;

            let account = match find_account(&req.username, &mut conn)? {
                Some(account) => account,
                None => {
                    log_attempt(&req.username, false, &meta, &mut conn)?;
                    debug!("Login rejected, unknown identifier {}", req.username);
                    return Err(ApiError::NotFound(
                        "User not found or invalid username".to_string(),
                    ));
                }
            };

            let valid = CredentialService::verify_password(&req.password, &account.password)?;
            log_attempt(&account.username, valid, &meta, &mut conn)?;
            if !valid {
                debug!("Login rejected, bad password for {}", account.username);
                return Err(ApiError::Unauthorized("Invalid password".to_string()));
            }

            let (employee_ctx, supervisor_id) = if account.employment == "Yes" {
                let number = account
                    .employee_no
                    .clone()
                    .ok_or_else(|| ApiError::Forbidden("User is not active".to_string()))?;
                let (ctx, sup) = gather_employee_context(&number, &mut conn)?;
                (Some(ctx), sup)
            } else {
                (None, None)
            };

            let currency_row: Option<(String, String)> = {
                use crate::schema::currencies::dsl::*;
                currencies
                    .order(id.asc())
                    .select((currency, symbol))
                    .first::<(String, String)>(&mut conn)
                    .optional()?
            };

            let permission_ids: Vec<i32> = match account.user_role {
                Some(assigned_role) => {
                    use crate::schema::permissions;
                    use crate::schema::role_permissions;
                    permissions::table
                        .inner_join(role_permissions::table)
                        .filter(role_permissions::role_id.eq(assigned_role))
                        .select(permissions::id)
                        .order(permissions::id.asc())
                        .load::<i32>(&mut conn)?
                }
                None => Vec::new(),
            };

            let subject =
                token_subject(account.employee_no.as_deref(), &account.username).to_string();
            let access_token =
                CredentialService::generate_access_token(&subject, &permission_ids, &config)?;
            let refresh_token = CredentialService::generate_refresh_token(&subject, &config)?;

            // Latest login wins: one refresh token per subject.
            let refresh_expires_at =
                Utc::now().naive_utc() + Duration::days(config.refresh_expiry_days);
            {
                use crate::schema::refresh_tokens::dsl::*;
                diesel::insert_into(refresh_tokens)
                    .values(&NewRefreshToken {
                        employee_no: subject.clone(),
                        token: refresh_token.clone(),
                        expires_at: refresh_expires_at,
                    })
                    .on_conflict(employee_no)
                    .do_update()
                    .set((token.eq(&refresh_token), expires_at.eq(refresh_expires_at)))
                    .execute(&mut conn)?;
            }

            Ok::<LoginResponse, ApiError>(assemble_response(
                &account,
                access_token,
                permission_ids,
                supervisor_id,
                currency_row,
                employee_ctx,
            ))
        })
        .await??;

        info!("User {} logged in successfully", response.username);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(employment: &str, employee_no: Option<&str>) -> UserAccount {
        UserAccount {
            id: 1,
            employee_no: employee_no.map(|s| s.to_string()),
            username: "guard01".to_string(),
            password: "$2b$12$hash".to_string(),
            employee_status: Some("ACTIVE".to_string()),
            user_role: Some(2),
            user_type: "user".to_string(),
            employment: employment.to_string(),
        }
    }

    #[test]
    fn employee_style_identifiers_are_recognized() {
        assert!(is_employee_identifier("EMP0042"));
        assert!(!is_employee_identifier("amal@client.example"));
        assert!(!is_employee_identifier("emp0042"));
    }

    #[test]
    fn token_subject_prefers_the_employee_number() {
        assert_eq!(token_subject(Some("EMP0042"), "guard01"), "EMP0042");
        assert_eq!(token_subject(None, "guard01"), "guard01");
    }

    #[test]
    fn response_for_non_employee_omits_employee_fields_and_falls_back_to_usd() {
        let response = assemble_response(
            &account("No", None),
            "token".to_string(),
            vec![1, 2],
            None,
            None,
            None,
        );

        assert_eq!(response.currency, "USD");
        assert_eq!(response.symbol, "$");

        let body = serde_json::to_value(&response).unwrap();
        assert!(body.get("designation").is_none());
        assert!(body.get("employee_fullname").is_none());
        assert!(body.get("check_in_time").is_none());
        assert_eq!(body["permissions"], serde_json::json!([1, 2]));
    }

    #[test]
    fn response_for_employee_merges_the_employment_context() {
        let ctx = EmployeeLoginContext {
            employee_fullname: Some("A. B. Perera".to_string()),
            designation: Some("Security Officer".to_string()),
            department: Some("Operations".to_string()),
            ..Default::default()
        };
        let response = assemble_response(
            &account("Yes", Some("EMP0042")),
            "token".to_string(),
            vec![],
            Some(9),
            Some(("LKR".to_string(), "Rs".to_string())),
            Some(ctx),
        );

        assert_eq!(response.currency, "LKR");
        assert_eq!(response.supervisor_id, Some(9));

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["employee_fullname"], "A. B. Perera");
        assert_eq!(body["designation"], "Security Officer");
        assert_eq!(body["department"], "Operations");
        // Flattened context keeps identity fields at the top level too.
        assert_eq!(body["employee_no"], "EMP0042");
    }
}

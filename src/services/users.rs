use crate::config::DbPool;
use crate::errors::ApiError;
use crate::models::{
    CreateUserRequest, NewUser, ResetPasswordRequest, UpdateUserRequest, UserDetail, UserPatch,
    UserSummary,
};
use crate::services::CredentialService;
use actix_web::web;
use diesel::prelude::*;
use log::{debug, info};

// Account types creatable through this workflow. Client accounts are only
// ever derived by the client onboarding workflow.
const VALID_USER_TYPES: &[&str] = &["admin", "superadmin", "user"];

fn is_valid_user_type(user_type: &str) -> bool {
    VALID_USER_TYPES.contains(&user_type)
}

fn is_valid_employment(employment: &str) -> bool {
    employment == "Yes" || employment == "No"
}

// Policy for replacement passwords: must differ from the current one and
// meet the minimum length.
fn validate_new_password(new_password: &str, current_hash: &str) -> Result<(), ApiError> {
    if CredentialService::verify_password(new_password, current_hash)? {
        return Err(ApiError::Validation(
            "New password must be different from the old password".to_string(),
        ));
    }
    if new_password.len() < 8 {
        return Err(ApiError::Validation(
            "New password must be at least 8 characters long".to_string(),
        ));
    }
    Ok(())
}

fn ensure_role_exists(role_id_val: i32, conn: &mut PgConnection) -> Result<(), ApiError> {
    use crate::schema::roles::dsl::*;
    let exists = roles
        .find(role_id_val)
        .select(id)
        .first::<i32>(conn)
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::Validation(format!("Invalid role ID: {}", role_id_val)));
    }
    Ok(())
}

fn ensure_employee_exists(number: &str, conn: &mut PgConnection) -> Result<(), ApiError> {
    use crate::schema::employee::dsl::*;
    let exists = employee
        .find(number)
        .select(employee_no)
        .first::<String>(conn)
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::Validation(format!("Invalid employee number: {}", number)));
    }
    Ok(())
}

pub struct UserService;

impl UserService {
    pub async fn create_user(req: CreateUserRequest, pool: &DbPool) -> Result<(), ApiError> {
        if !is_valid_user_type(&req.user_type) {
            return Err(ApiError::Validation("Invalid user type".to_string()));
        }
        if !is_valid_employment(&req.employment) {
            return Err(ApiError::Validation("Invalid employment value".to_string()));
        }
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(ApiError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        // Fast-path uniqueness check; the unique constraint on username
        // backstops it against concurrent creates.
        let conn = pool.get()?;
        let candidate = req.username.clone();
        let taken = web::block(move || {
            use crate::schema::app_user::dsl::*;
            let mut conn = conn;
            app_user
                .filter(username.eq(candidate))
                .select(id)
                .first::<i32>(&mut conn)
                .optional()
        })
        .await?
        .map_err(ApiError::from)?;
        if taken.is_some() {
            debug!("Rejected create for existing username {}", req.username);
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }

        let hashed = CredentialService::hash_password(&req.password)?;

        let conn = pool.get()?;
        let username_for_log = req.username.clone();
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                if let Some(role_id_val) = req.user_role {
                    ensure_role_exists(role_id_val, conn)?;
                }
                if req.employment == "Yes" {
                    if let Some(ref number) = req.employee_no {
                        ensure_employee_exists(number, conn)?;
                    }
                }

                let new_user = NewUser {
                    // Non-employee accounts never carry an employee link.
                    employee_no: if req.employment == "Yes" {
                        req.employee_no.clone()
                    } else {
                        None
                    },
                    username: req.username.clone(),
                    password: hashed,
                    employee_status: Some("ACTIVE".to_string()),
                    user_role: req.user_role,
                    user_type: req.user_type.clone(),
                    employment: req.employment.clone(),
                };
                diesel::insert_into(crate::schema::app_user::table)
                    .values(&new_user)
                    .execute(conn)?;
                Ok(())
            })
        })
        .await??;

        info!("Created user account {}", username_for_log);
        Ok(())
    }

    pub async fn update_user(
        user_id: i32,
        req: UpdateUserRequest,
        pool: &DbPool,
    ) -> Result<(), ApiError> {
        if let Some(ref value) = req.user_type {
            if !is_valid_user_type(value) {
                return Err(ApiError::Validation("Invalid user type".to_string()));
            }
        }
        if let Some(ref value) = req.employment {
            if !is_valid_employment(value) {
                return Err(ApiError::Validation("Invalid employment value".to_string()));
            }
        }

        let conn = pool.get()?;
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                use crate::schema::app_user::dsl::*;

                if let Some(ref candidate) = req.username {
                    let conflict = app_user
                        .filter(username.eq(candidate))
                        .filter(id.ne(user_id))
                        .select(id)
                        .first::<i32>(conn)
                        .optional()?;
                    if conflict.is_some() {
                        return Err(ApiError::Conflict("Username is already taken".to_string()));
                    }
                }

                if let Some(role_id_val) = req.user_role {
                    ensure_role_exists(role_id_val, conn)?;
                }

                if req.employment.as_deref() == Some("Yes") {
                    if let Some(ref number) = req.employee_no {
                        if !number.is_empty() {
                            ensure_employee_exists(number, conn)?;
                        }
                    }
                }

                // Rehash only values that are not already stored hashes, so a
                // caller forwarding the prior value does not double-hash it.
                let new_password = match req.password {
                    None => None,
                    Some(p) if CredentialService::looks_hashed(&p) => Some(p),
                    Some(p) => Some(CredentialService::hash_password(&p)?),
                };

                let patch = UserPatch {
                    // An empty employee_no clears the link.
                    employee_no: req
                        .employee_no
                        .map(|e| if e.is_empty() { None } else { Some(e) }),
                    username: req.username,
                    password: new_password,
                    employee_status: req.employee_status,
                    user_role: req.user_role,
                    user_type: req.user_type,
                    employment: req.employment,
                };

                if patch.is_empty() {
                    return Err(ApiError::Validation(
                        "No fields provided to update".to_string(),
                    ));
                }

                let affected = diesel::update(app_user.find(user_id)).set(&patch).execute(conn)?;
                if affected == 0 {
                    return Err(ApiError::NotFound("User not found".to_string()));
                }
                Ok(())
            })
        })
        .await??;

        info!("Updated user {}", user_id);
        Ok(())
    }

    // Single-row update; no transaction needed.
    pub async fn reset_password(
        req: ResetPasswordRequest,
        pool: &DbPool,
    ) -> Result<(), ApiError> {
        if req.employee_no.trim().is_empty()
            || req.old_password.is_empty()
            || req.new_password.is_empty()
        {
            return Err(ApiError::Validation(
                "Employee number, old password, and new password are required".to_string(),
            ));
        }

        let conn = pool.get()?;
        let number_for_log = req.employee_no.clone();
        web::block(move || {
            use crate::schema::app_user::dsl::*;
            let mut conn = conn;

            let current_hash = app_user
                .filter(employee_no.eq(&req.employee_no))
                .select(password)
                .first::<String>(&mut conn)
                .optional()?
                .ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))?;

            if !CredentialService::verify_password(&req.old_password, &current_hash)? {
                return Err(ApiError::Validation("Old password is incorrect".to_string()));
            }

            validate_new_password(&req.new_password, &current_hash)?;

            let hashed = CredentialService::hash_password(&req.new_password)?;
            diesel::update(app_user.filter(employee_no.eq(&req.employee_no)))
                .set(password.eq(hashed))
                .execute(&mut conn)?;
            Ok::<(), ApiError>(())
        })
        .await??;

        info!("Password reset for employee {}", number_for_log);
        Ok(())
    }

    pub async fn delete_user(user_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()?;
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                use crate::schema::app_user::dsl::*;
                let affected = diesel::delete(app_user.find(user_id)).execute(conn)?;
                if affected == 0 {
                    return Err(ApiError::NotFound("User not found".to_string()));
                }
                Ok(())
            })
        })
        .await??;

        info!("Deleted user {}", user_id);
        Ok(())
    }

    pub async fn list_users(pool: &DbPool) -> Result<Vec<UserSummary>, ApiError> {
        let conn = pool.get()?;
        let users = web::block(move || {
            use crate::schema::app_user::dsl::*;
            let mut conn = conn;
            app_user
                .select((id, employee_no, username, employee_status, user_role, user_type))
                .order(id.asc())
                .load::<UserSummary>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        debug!("Listed {} users", users.len());
        Ok(users)
    }

    // Employee-backed accounts only: joins the employee record for the name.
    pub async fn get_user(user_id: i32, pool: &DbPool) -> Result<UserDetail, ApiError> {
        let conn = pool.get()?;
        let detail = web::block(move || {
            use crate::schema::{app_user, employee};
            let mut conn = conn;
            app_user::table
                .inner_join(
                    employee::table
                        .on(employee::employee_no.nullable().eq(app_user::employee_no)),
                )
                .filter(app_user::id.eq(user_id))
                .select((
                    app_user::id,
                    app_user::employee_no,
                    app_user::username,
                    app_user::employee_status,
                    app_user::user_role,
                    employee::name,
                ))
                .first::<UserDetail>(&mut conn)
                .optional()
        })
        .await?
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_type_validation_excludes_derived_client_accounts() {
        assert!(is_valid_user_type("admin"));
        assert!(is_valid_user_type("superadmin"));
        assert!(is_valid_user_type("user"));
        assert!(!is_valid_user_type("client"));
        assert!(!is_valid_user_type("root"));
    }

    #[test]
    fn employment_flag_is_yes_or_no() {
        assert!(is_valid_employment("Yes"));
        assert!(is_valid_employment("No"));
        assert!(!is_valid_employment("yes"));
        assert!(!is_valid_employment(""));
    }

    #[test]
    fn new_password_must_differ_from_current() {
        let current_hash = bcrypt::hash("oldpassword", 4).unwrap();
        let err = validate_new_password("oldpassword", &current_hash).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn new_password_must_be_at_least_eight_chars() {
        let current_hash = bcrypt::hash("oldpassword", 4).unwrap();
        let err = validate_new_password("seven77", &current_hash).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(validate_new_password("longenough1", &current_hash).is_ok());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            username: Some("guard01".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}

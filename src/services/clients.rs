use crate::config::{AppConfig, DbPool};
use crate::errors::ApiError;
use crate::models::{
    AssignEmployeesRequest, AssignedEmployee, Client, ClientChanges, ClientDetail,
    CreateClientRequest, EmployeeClientAssignment, NewAssignment, NewClient, NewUser,
    UpdateClientRequest,
};
use crate::services::CredentialService;
use actix_web::web;
use chrono::Utc;
use diesel::prelude::*;
use log::{debug, info};
use std::collections::HashSet;

// Login identity derived for a client record.
fn derived_employee_no(client_id: i32) -> String {
    format!("CL{}", client_id)
}

// Minimal insert/delete delta that turns the current assignment set into the
// target set. Re-running with an unchanged target yields two empty lists.
fn assignment_delta(current: &[String], target: &[String]) -> (Vec<String>, Vec<String>) {
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    let target_set: HashSet<&str> = target.iter().map(String::as_str).collect();

    let to_add = target
        .iter()
        .filter(|n| !current_set.contains(n.as_str()))
        .cloned()
        .collect();
    let to_remove = current
        .iter()
        .filter(|n| !target_set.contains(n.as_str()))
        .cloned()
        .collect();
    (to_add, to_remove)
}

// All-or-nothing employee validation: aborts enumerating every unknown
// number. Runs inside the caller's transaction.
fn ensure_employees_exist(numbers: &[String], conn: &mut PgConnection) -> Result<(), ApiError> {
    use crate::schema::employee::dsl::*;

    let existing: Vec<String> = employee
        .filter(employee_no.eq_any(numbers))
        .select(employee_no)
        .load::<String>(conn)?;
    let known: HashSet<&str> = existing.iter().map(String::as_str).collect();

    let missing: Vec<String> = numbers
        .iter()
        .filter(|n| !known.contains(n.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        debug!("Rejecting assignment, unknown employee numbers: {:?}", missing);
        return Err(ApiError::MissingIdentifiers {
            message: "Some employee numbers do not exist".to_string(),
            ids: missing,
        });
    }
    Ok(())
}

fn load_assigned_employees(
    for_client: i32,
    conn: &mut PgConnection,
) -> Result<Vec<AssignedEmployee>, diesel::result::Error> {
    use crate::schema::{designation_department, employee, employee_client_assignment};

    employee_client_assignment::table
        .inner_join(
            employee::table
                .on(employee::employee_no.eq(employee_client_assignment::employee_no)),
        )
        .left_join(
            designation_department::table
                .on(designation_department::id
                    .nullable()
                    .eq(employee::department_designation_id)),
        )
        .filter(employee_client_assignment::client_id.eq(for_client))
        .select((
            employee::employee_no,
            employee::name,
            employee::contact_number,
            designation_department::designation.nullable(),
            designation_department::department.nullable(),
            employee::work_location,
            employee::active_status,
        ))
        .load::<AssignedEmployee>(conn)
}

pub struct ClientService;

impl ClientService {
    // One atomic unit: client row, derived login account, employee
    // assignments. Any invalid employee number rolls the whole thing back.
    pub async fn add_client(
        req: CreateClientRequest,
        config: &AppConfig,
        pool: &DbPool,
    ) -> Result<Client, ApiError> {
        if req.name.trim().is_empty() || req.email.trim().is_empty() || req.phone.trim().is_empty()
        {
            return Err(ApiError::Validation(
                "Name, email, and phone are required".to_string(),
            ));
        }

        let default_password = config.client_default_password.clone();
        let conn = pool.get()?;
        let created = web::block(move || {
            let mut conn = conn;
            conn.transaction::<Client, ApiError, _>(|conn| {
                let client_row: Client = diesel::insert_into(crate::schema::client::table)
                    .values(&NewClient {
                        name: req.name.clone(),
                        email: req.email.clone(),
                        phone: req.phone.clone(),
                        address: req.address.clone(),
                    })
                    .get_result(conn)?;

                // Derived login account: identity tracks the client email.
                let hashed = CredentialService::hash_password(&default_password)?;
                diesel::insert_into(crate::schema::app_user::table)
                    .values(&NewUser {
                        employee_no: Some(derived_employee_no(client_row.id)),
                        username: client_row.email.clone(),
                        password: hashed,
                        employee_status: None,
                        user_role: None,
                        user_type: "client".to_string(),
                        employment: "No".to_string(),
                    })
                    .execute(conn)?;

                if let Some(ref numbers) = req.employee_numbers {
                    if !numbers.is_empty() {
                        ensure_employees_exist(numbers, conn)?;
                        let rows: Vec<NewAssignment> = numbers
                            .iter()
                            .map(|n| NewAssignment {
                                client_id: client_row.id,
                                employee_no: n.clone(),
                            })
                            .collect();
                        diesel::insert_into(
                            crate::schema::employee_client_assignment::table,
                        )
                        .values(&rows)
                        .execute(conn)?;
                    }
                }

                Ok(client_row)
            })
        })
        .await??;

        info!("Created client {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update_client(
        target_client_id: i32,
        req: UpdateClientRequest,
        pool: &DbPool,
    ) -> Result<Client, ApiError> {
        if req.name.trim().is_empty() || req.email.trim().is_empty() || req.phone.trim().is_empty()
        {
            return Err(ApiError::Validation(
                "Name, email, and phone are required".to_string(),
            ));
        }

        let conn = pool.get()?;
        let updated = web::block(move || {
            let mut conn = conn;
            conn.transaction::<Client, ApiError, _>(|conn| {
                let existing: Client = {
                    use crate::schema::client::dsl::*;
                    client
                        .find(target_client_id)
                        .first::<Client>(conn)
                        .optional()?
                        .ok_or_else(|| {
                            ApiError::NotFound(format!(
                                "Client with ID {} not found",
                                target_client_id
                            ))
                        })?
                };

                let updated: Client = {
                    use crate::schema::client::dsl::*;
                    diesel::update(client.find(target_client_id))
                        .set(&ClientChanges {
                            name: req.name.clone(),
                            email: req.email.clone(),
                            phone: req.phone.clone(),
                            address: req.address.clone(),
                            updated_at: Utc::now().naive_utc(),
                        })
                        .get_result(conn)?
                };

                // The derived account's username tracks the client email 1:1.
                if updated.email != existing.email {
                    use crate::schema::app_user::dsl::*;
                    diesel::update(
                        app_user
                            .filter(employee_no.eq(derived_employee_no(target_client_id)))
                            .filter(user_type.eq("client")),
                    )
                    .set(username.eq(&updated.email))
                    .execute(conn)?;
                }

                // Assignment set update expressed as a minimal delta.
                let current: Vec<String> = {
                    use crate::schema::employee_client_assignment::dsl::*;
                    employee_client_assignment
                        .filter(client_id.eq(target_client_id))
                        .select(employee_no)
                        .load::<String>(conn)?
                };
                let (to_add, to_remove) = assignment_delta(&current, &req.employee_numbers);

                if !to_add.is_empty() {
                    ensure_employees_exist(&to_add, conn)?;
                    let rows: Vec<NewAssignment> = to_add
                        .iter()
                        .map(|n| NewAssignment {
                            client_id: target_client_id,
                            employee_no: n.clone(),
                        })
                        .collect();
                    diesel::insert_into(crate::schema::employee_client_assignment::table)
                        .values(&rows)
                        .execute(conn)?;
                }
                if !to_remove.is_empty() {
                    use crate::schema::employee_client_assignment::dsl::*;
                    diesel::delete(
                        employee_client_assignment
                            .filter(client_id.eq(target_client_id))
                            .filter(employee_no.eq_any(&to_remove)),
                    )
                    .execute(conn)?;
                }

                Ok(updated)
            })
        })
        .await??;

        info!("Updated client {}", updated.id);
        Ok(updated)
    }

    // Cascade: assignments, derived account, then the client row.
    pub async fn delete_client(target_client_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()?;
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                let existing: Client = {
                    use crate::schema::client::dsl::*;
                    client
                        .find(target_client_id)
                        .first::<Client>(conn)
                        .optional()?
                        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?
                };

                {
                    use crate::schema::employee_client_assignment::dsl::*;
                    diesel::delete(
                        employee_client_assignment.filter(client_id.eq(target_client_id)),
                    )
                    .execute(conn)?;
                }

                {
                    use crate::schema::app_user::dsl::*;
                    diesel::delete(app_user.filter(username.eq(&existing.email)))
                        .execute(conn)?;
                }

                use crate::schema::client::dsl::*;
                diesel::delete(client.find(target_client_id)).execute(conn)?;
                Ok(())
            })
        })
        .await??;

        info!("Deleted client {} and its derived account", target_client_id);
        Ok(())
    }

    pub async fn list_clients(pool: &DbPool) -> Result<Vec<Client>, ApiError> {
        let conn = pool.get()?;
        let clients = web::block(move || {
            use crate::schema::client::dsl::*;
            let mut conn = conn;
            client.order(id.asc()).load::<Client>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        Ok(clients)
    }

    pub async fn get_client(target_client_id: i32, pool: &DbPool) -> Result<ClientDetail, ApiError> {
        let conn = pool.get()?;
        let detail = web::block(move || {
            let mut conn = conn;

            let client_row: Client = {
                use crate::schema::client::dsl::*;
                client
                    .find(target_client_id)
                    .first::<Client>(&mut conn)
                    .optional()?
                    .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?
            };

            let employees = load_assigned_employees(target_client_id, &mut conn)?;
            Ok::<ClientDetail, ApiError>(ClientDetail {
                client: client_row,
                employees,
            })
        })
        .await??;

        Ok(detail)
    }

    pub async fn get_client_employees(
        target_client_id: i32,
        pool: &DbPool,
    ) -> Result<Vec<AssignedEmployee>, ApiError> {
        let conn = pool.get()?;
        let employees = web::block(move || {
            let mut conn = conn;

            {
                use crate::schema::client::dsl::*;
                let exists = client
                    .find(target_client_id)
                    .select(id)
                    .first::<i32>(&mut conn)
                    .optional()?;
                if exists.is_none() {
                    return Err(ApiError::NotFound("Client not found".to_string()));
                }
            }

            load_assigned_employees(target_client_id, &mut conn).map_err(ApiError::from)
        })
        .await??;

        Ok(employees)
    }

    // Additive assignment: no diffing here; the unique constraint on
    // (client_id, employee_no) turns duplicate pairs into Conflict.
    pub async fn assign_employees(
        req: AssignEmployeesRequest,
        pool: &DbPool,
    ) -> Result<Vec<EmployeeClientAssignment>, ApiError> {
        if req.employee_numbers.is_empty() {
            return Err(ApiError::Validation(
                "Client ID and an array of Employee Numbers are required".to_string(),
            ));
        }

        let conn = pool.get()?;
        let created = web::block(move || {
            let mut conn = conn;
            conn.transaction::<Vec<EmployeeClientAssignment>, ApiError, _>(|conn| {
                {
                    use crate::schema::client::dsl::*;
                    let exists = client
                        .find(req.client_id)
                        .select(id)
                        .first::<i32>(conn)
                        .optional()?;
                    if exists.is_none() {
                        return Err(ApiError::NotFound("Client not found".to_string()));
                    }
                }

                ensure_employees_exist(&req.employee_numbers, conn)?;

                let rows: Vec<NewAssignment> = req
                    .employee_numbers
                    .iter()
                    .map(|n| NewAssignment {
                        client_id: req.client_id,
                        employee_no: n.clone(),
                    })
                    .collect();
                let created = diesel::insert_into(
                    crate::schema::employee_client_assignment::table,
                )
                .values(&rows)
                .get_results::<EmployeeClientAssignment>(conn)?;
                Ok(created)
            })
        })
        .await??;

        info!(
            "Assigned {} employees to client {}",
            created.len(),
            created.first().map(|a| a.client_id).unwrap_or_default()
        );
        Ok(created)
    }

    pub async fn delete_assignment(assignment_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()?;
        web::block(move || {
            use crate::schema::employee_client_assignment::dsl::*;
            let mut conn = conn;

            let affected =
                diesel::delete(employee_client_assignment.find(assignment_id)).execute(&mut conn)?;
            if affected == 0 {
                return Err(ApiError::NotFound("Assignment not found".to_string()));
            }
            Ok::<(), ApiError>(())
        })
        .await??;

        Ok(())
    }

    // Employees with no assignment row at all.
    pub async fn get_unassigned_employees(
        pool: &DbPool,
    ) -> Result<Vec<AssignedEmployee>, ApiError> {
        let conn = pool.get()?;
        let employees = web::block(move || {
            use crate::schema::{designation_department, employee, employee_client_assignment};
            let mut conn = conn;

            employee::table
                .left_join(
                    employee_client_assignment::table.on(
                        employee_client_assignment::employee_no.eq(employee::employee_no),
                    ),
                )
                .left_join(
                    designation_department::table
                        .on(designation_department::id
                            .nullable()
                            .eq(employee::department_designation_id)),
                )
                .filter(employee_client_assignment::id.nullable().is_null())
                .select((
                    employee::employee_no,
                    employee::name,
                    employee::contact_number,
                    designation_department::designation.nullable(),
                    designation_department::department.nullable(),
                    employee::work_location,
                    employee::active_status,
                ))
                .load::<AssignedEmployee>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        debug!("Found {} unassigned employees", employees.len());
        Ok(employees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn derived_employee_no_prefixes_the_client_id() {
        assert_eq!(derived_employee_no(7), "CL7");
        assert_eq!(derived_employee_no(1042), "CL1042");
    }

    #[test]
    fn assignment_delta_is_noop_for_unchanged_set() {
        let current = nums(&["EMP001", "EMP002"]);
        let target = nums(&["EMP002", "EMP001"]);
        let (to_add, to_remove) = assignment_delta(&current, &target);
        assert!(to_add.is_empty());
        assert!(to_remove.is_empty());
    }

    #[test]
    fn assignment_delta_computes_additions_and_removals() {
        let current = nums(&["EMP001", "EMP002", "EMP003"]);
        let target = nums(&["EMP002", "EMP004"]);
        let (to_add, to_remove) = assignment_delta(&current, &target);
        assert_eq!(to_add, nums(&["EMP004"]));
        assert_eq!(to_remove, nums(&["EMP001", "EMP003"]));
    }

    #[test]
    fn assignment_delta_empties_the_set_when_target_is_empty() {
        let current = nums(&["EMP001", "EMP002"]);
        let (to_add, to_remove) = assignment_delta(&current, &[]);
        assert!(to_add.is_empty());
        assert_eq!(to_remove, nums(&["EMP001", "EMP002"]));
    }
}

use crate::config::DbPool;
use crate::errors::ApiError;
use crate::models::{
    CreateEmployeeRequest, Employee, EmployeePatch, NewEmployee, UpdateEmployeeRequest,
};
use actix_web::web;
use diesel::prelude::*;
use log::{debug, info};

const VALID_CATEGORIES: &[&str] = &["Security", "Office"];

fn is_valid_category(category: &str) -> bool {
    VALID_CATEGORIES.contains(&category)
}

fn ensure_lookup_exists(lookup_id: i32, conn: &mut PgConnection) -> Result<(), ApiError> {
    use crate::schema::designation_department::dsl::*;
    let exists = designation_department
        .find(lookup_id)
        .select(id)
        .first::<i32>(conn)
        .optional()?;
    if exists.is_none() {
        return Err(ApiError::Validation(format!(
            "Invalid designation/department ID: {}",
            lookup_id
        )));
    }
    Ok(())
}

// Employees follow a soft lifecycle: records are created and updated, never
// hard-deleted; deactivation goes through active_status.
pub struct EmployeeService;

impl EmployeeService {
    pub async fn add_employee(req: CreateEmployeeRequest, pool: &DbPool) -> Result<(), ApiError> {
        if req.employee_no.trim().is_empty() {
            return Err(ApiError::Validation("Employee number is required".to_string()));
        }
        if !is_valid_category(&req.employee_category) {
            return Err(ApiError::Validation(
                "Employee category must be Security or Office".to_string(),
            ));
        }

        let conn = pool.get()?;
        let number_for_log = req.employee_no.clone();
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                if let Some(lookup_id) = req.department_designation_id {
                    ensure_lookup_exists(lookup_id, conn)?;
                }

                let new_employee = NewEmployee {
                    employee_no: req.employee_no.clone(),
                    name: req.name.clone(),
                    name_initial: req.name_initial.clone(),
                    calling_name: req.calling_name.clone(),
                    nic: req.nic.clone(),
                    date_of_birth: req.date_of_birth,
                    contact_number: req.contact_number.clone(),
                    address: req.address.clone(),
                    employee_category: req.employee_category.clone(),
                    employee_type: req.employee_type.clone(),
                    department_designation_id: req.department_designation_id,
                    work_location: req.work_location.clone(),
                    active_status: req
                        .active_status
                        .clone()
                        .unwrap_or_else(|| "Active".to_string()),
                };
                diesel::insert_into(crate::schema::employee::table)
                    .values(&new_employee)
                    .execute(conn)?;
                Ok(())
            })
        })
        .await??;

        info!("Added employee {}", number_for_log);
        Ok(())
    }

    pub async fn update_employee(
        number: String,
        req: UpdateEmployeeRequest,
        pool: &DbPool,
    ) -> Result<(), ApiError> {
        if let Some(ref category) = req.employee_category {
            if !is_valid_category(category) {
                return Err(ApiError::Validation(
                    "Employee category must be Security or Office".to_string(),
                ));
            }
        }

        let conn = pool.get()?;
        let number_for_log = number.clone();
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                if let Some(lookup_id) = req.department_designation_id {
                    ensure_lookup_exists(lookup_id, conn)?;
                }

                let patch = EmployeePatch {
                    name: req.name,
                    name_initial: req.name_initial,
                    calling_name: req.calling_name,
                    nic: req.nic,
                    date_of_birth: req.date_of_birth,
                    contact_number: req.contact_number,
                    address: req.address,
                    employee_category: req.employee_category,
                    employee_type: req.employee_type,
                    department_designation_id: req.department_designation_id,
                    work_location: req.work_location,
                    active_status: req.active_status,
                };
                if patch.is_empty() {
                    return Err(ApiError::Validation(
                        "No fields provided to update".to_string(),
                    ));
                }

                use crate::schema::employee::dsl::*;
                let affected = diesel::update(employee.find(&number))
                    .set(&patch)
                    .execute(conn)?;
                if affected == 0 {
                    return Err(ApiError::NotFound("Employee not found".to_string()));
                }
                Ok(())
            })
        })
        .await??;

        info!("Updated employee {}", number_for_log);
        Ok(())
    }

    pub async fn list_employees(pool: &DbPool) -> Result<Vec<Employee>, ApiError> {
        let conn = pool.get()?;
        let employees = web::block(move || {
            use crate::schema::employee::dsl::*;
            let mut conn = conn;
            employee.order(employee_no.asc()).load::<Employee>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        debug!("Listed {} employees", employees.len());
        Ok(employees)
    }

    pub async fn get_employee(number: String, pool: &DbPool) -> Result<Employee, ApiError> {
        let conn = pool.get()?;
        let found = web::block(move || {
            use crate::schema::employee::dsl::*;
            let mut conn = conn;
            employee.find(&number).first::<Employee>(&mut conn).optional()
        })
        .await?
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("Employee not found".to_string()))?;

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_must_be_security_or_office() {
        assert!(is_valid_category("Security"));
        assert!(is_valid_category("Office"));
        assert!(!is_valid_category("security"));
        assert!(!is_valid_category("Field"));
    }
}

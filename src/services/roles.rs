use crate::config::DbPool;
use crate::errors::ApiError;
use crate::models::{CreateRoleRequest, NewRole, NewRolePermission, Permission, Role};
use actix_web::web;
use diesel::prelude::*;
use log::{debug, info};
use std::collections::HashSet;

// Permission ids named in a request that are absent from the catalog.
// Order follows the request so the error report reads like the input.
fn missing_ids(requested: &[i32], existing: &[i32]) -> Vec<i32> {
    let known: HashSet<i32> = existing.iter().copied().collect();
    requested
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect()
}

// Symmetric difference between the stored permission set and the target set:
// inserts only additions, deletes only removals.
fn permission_delta(current: &[i32], target: &[i32]) -> (Vec<i32>, Vec<i32>) {
    let current_set: HashSet<i32> = current.iter().copied().collect();
    let target_set: HashSet<i32> = target.iter().copied().collect();

    let to_add = target
        .iter()
        .copied()
        .filter(|id| !current_set.contains(id))
        .collect();
    let to_remove = current
        .iter()
        .copied()
        .filter(|id| !target_set.contains(id))
        .collect();
    (to_add, to_remove)
}

// Loads the catalog subset for the requested ids and aborts with the missing
// subset if any are unknown. Runs inside the caller's transaction.
fn ensure_permissions_exist(
    requested: &[i32],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    use crate::schema::permissions::dsl::*;

    let existing: Vec<i32> = permissions
        .filter(id.eq_any(requested))
        .select(id)
        .load::<i32>(conn)?;

    let missing = missing_ids(requested, &existing);
    if !missing.is_empty() {
        debug!("Rejecting role write, unknown permission ids: {:?}", missing);
        return Err(ApiError::MissingIdentifiers {
            message: "Some permission IDs do not exist".to_string(),
            ids: missing.iter().map(|m| m.to_string()).collect(),
        });
    }
    Ok(())
}

pub struct RoleService;

impl RoleService {
    pub async fn create_role(req: CreateRoleRequest, pool: &DbPool) -> Result<Role, ApiError> {
        if req.role_name.trim().is_empty() {
            return Err(ApiError::Validation("Role name is required".to_string()));
        }

        let conn = pool.get()?;
        let role = web::block(move || {
            let mut conn = conn;
            conn.transaction::<Role, ApiError, _>(|conn| {
                ensure_permissions_exist(&req.permissions, conn)?;

                let role: Role = diesel::insert_into(crate::schema::roles::table)
                    .values(&NewRole {
                        role_name: req.role_name.clone(),
                        role_description: req.role_description.clone(),
                    })
                    .get_result(conn)?;

                let links: Vec<NewRolePermission> = req
                    .permissions
                    .iter()
                    .map(|&permission_id| NewRolePermission {
                        role_id: role.id,
                        permission_id,
                    })
                    .collect();
                if !links.is_empty() {
                    diesel::insert_into(crate::schema::role_permissions::table)
                        .values(&links)
                        .execute(conn)?;
                }

                Ok(role)
            })
        })
        .await??;

        info!("Created role {} ({})", role.id, role.role_name);
        Ok(role)
    }

    pub async fn update_role(
        target_role_id: i32,
        req: CreateRoleRequest,
        pool: &DbPool,
    ) -> Result<(), ApiError> {
        if req.role_name.trim().is_empty() {
            return Err(ApiError::Validation("Role name is required".to_string()));
        }

        let conn = pool.get()?;
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                {
                    use crate::schema::roles::dsl::*;
                    let exists = roles
                        .find(target_role_id)
                        .select(id)
                        .first::<i32>(conn)
                        .optional()?;
                    if exists.is_none() {
                        return Err(ApiError::NotFound("Role not found".to_string()));
                    }

                    ensure_permissions_exist(&req.permissions, conn)?;

                    diesel::update(roles.find(target_role_id))
                        .set((
                            role_name.eq(&req.role_name),
                            role_description.eq(&req.role_description),
                        ))
                        .execute(conn)?;
                }

                use crate::schema::role_permissions::dsl::*;
                let current: Vec<i32> = role_permissions
                    .filter(role_id.eq(target_role_id))
                    .select(permission_id)
                    .load::<i32>(conn)?;

                let (to_add, to_remove) = permission_delta(&current, &req.permissions);

                if !to_add.is_empty() {
                    let links: Vec<NewRolePermission> = to_add
                        .iter()
                        .map(|&pid| NewRolePermission {
                            role_id: target_role_id,
                            permission_id: pid,
                        })
                        .collect();
                    diesel::insert_into(role_permissions).values(&links).execute(conn)?;
                }

                if !to_remove.is_empty() {
                    diesel::delete(
                        role_permissions
                            .filter(role_id.eq(target_role_id))
                            .filter(permission_id.eq_any(&to_remove)),
                    )
                    .execute(conn)?;
                }

                Ok(())
            })
        })
        .await??;

        info!("Updated role {}", target_role_id);
        Ok(())
    }

    pub async fn delete_role(target_role_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        let conn = pool.get()?;
        web::block(move || {
            let mut conn = conn;
            conn.transaction::<(), ApiError, _>(|conn| {
                {
                    use crate::schema::roles::dsl::*;
                    let exists = roles
                        .find(target_role_id)
                        .select(id)
                        .first::<i32>(conn)
                        .optional()?;
                    if exists.is_none() {
                        return Err(ApiError::NotFound("Role not found".to_string()));
                    }
                }

                {
                    use crate::schema::role_permissions::dsl::*;
                    diesel::delete(role_permissions.filter(role_id.eq(target_role_id)))
                        .execute(conn)?;
                }

                use crate::schema::roles::dsl::*;
                diesel::delete(roles.find(target_role_id)).execute(conn)?;
                Ok(())
            })
        })
        .await??;

        info!("Deleted role {}", target_role_id);
        Ok(())
    }

    pub async fn list_roles(pool: &DbPool) -> Result<Vec<Role>, ApiError> {
        let conn = pool.get()?;
        let result = web::block(move || {
            use crate::schema::roles::dsl::*;
            let mut conn = conn;
            roles.order(id.asc()).load::<Role>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        debug!("Listed {} roles", result.len());
        Ok(result)
    }

    pub async fn get_role_permissions(
        target_role_id: i32,
        pool: &DbPool,
    ) -> Result<Vec<Permission>, ApiError> {
        let conn = pool.get()?;
        let result = web::block(move || {
            let mut conn = conn;

            {
                use crate::schema::roles::dsl::*;
                let exists = roles
                    .find(target_role_id)
                    .select(id)
                    .first::<i32>(&mut conn)
                    .optional()?;
                if exists.is_none() {
                    return Err(ApiError::NotFound("Role not found".to_string()));
                }
            }

            use crate::schema::permissions::dsl::{id as perm_id, permission_name, permissions};
            use crate::schema::role_permissions::dsl::{role_id, role_permissions};

            permissions
                .inner_join(role_permissions)
                .filter(role_id.eq(target_role_id))
                .select((perm_id, permission_name))
                .order(perm_id.asc())
                .load::<Permission>(&mut conn)
                .map_err(ApiError::from)
        })
        .await??;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ids_reports_unknown_subset_in_request_order() {
        let requested = vec![5, 1, 9, 3];
        let existing = vec![1, 3];
        assert_eq!(missing_ids(&requested, &existing), vec![5, 9]);
    }

    #[test]
    fn missing_ids_empty_when_catalog_covers_request() {
        let requested = vec![1, 2, 3];
        let existing = vec![3, 2, 1, 7];
        assert!(missing_ids(&requested, &existing).is_empty());
    }

    #[test]
    fn permission_delta_computes_minimal_sets() {
        let current = vec![1, 2, 3];
        let target = vec![2, 3, 4, 5];
        let (to_add, to_remove) = permission_delta(&current, &target);
        assert_eq!(to_add, vec![4, 5]);
        assert_eq!(to_remove, vec![1]);
    }

    #[test]
    fn permission_delta_is_empty_for_identical_sets() {
        let current = vec![1, 2, 3];
        let target = vec![3, 1, 2];
        let (to_add, to_remove) = permission_delta(&current, &target);
        assert!(to_add.is_empty());
        assert!(to_remove.is_empty());
    }
}

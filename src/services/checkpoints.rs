use crate::config::DbPool;
use crate::errors::ApiError;
use crate::models::{
    Checkpoint, CreateCheckpointRequest, NewCheckpoint, NewScannedDetail, ScanRequest,
    ScannedDetail,
};
use crate::qr::QrStore;
use actix_web::web;
use diesel::prelude::*;
use log::{debug, info};

pub struct CheckpointService;

impl CheckpointService {
    // Two-phase create: the QR payload must embed the generated row id, so
    // the row is inserted first with an empty URL, the artifact is rendered
    // keyed by that id, and the row is then pointed at it. A failure in the
    // later phases compensates by removing what the earlier phases produced.
    pub async fn add_checkpoint(
        req: CreateCheckpointRequest,
        qr: &QrStore,
        pool: &DbPool,
    ) -> Result<Checkpoint, ApiError> {
        if req.name.trim().is_empty()
            || req.location_name.trim().is_empty()
            || req.location_address.trim().is_empty()
        {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }

        let qr = qr.clone();
        let conn = pool.get()?;
        let checkpoint = web::block(move || {
            let mut conn = conn;

            // Phase one: row with a placeholder URL, client verified in the
            // same transaction as the insert.
            let created: Checkpoint = conn.transaction::<Checkpoint, ApiError, _>(|conn| {
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

                let row = diesel::insert_into(crate::schema::checkpoint::table)
                    .values(&NewCheckpoint {
                        name: req.name.clone(),
                        client_id: req.client_id,
                        employee_ids: req.employee_ids.clone(),
                        location_name: req.location_name.clone(),
                        location_address: req.location_address.clone(),
                        qr_code_url: String::new(),
                    })
                    .get_result(conn)?;
                Ok(row)
            })?;

            // Phase two: render the artifact keyed by the generated id.
            let url = match qr.save(created.id) {
                Ok(url) => url,
                Err(e) => {
                    use crate::schema::checkpoint::dsl::*;
                    let _ = diesel::delete(checkpoint.find(created.id)).execute(&mut conn);
                    return Err(e);
                }
            };

            // Phase three: persist the final URL.
            use crate::schema::checkpoint::dsl::*;
            match diesel::update(checkpoint.find(created.id))
                .set(qr_code_url.eq(&url))
                .get_result::<Checkpoint>(&mut conn)
            {
                Ok(row) => Ok(row),
                Err(e) => {
                    qr.remove(created.id);
                    let _ = diesel::delete(checkpoint.find(created.id)).execute(&mut conn);
                    Err(ApiError::from(e))
                }
            }
        })
        .await??;

        info!(
            "Created checkpoint {} for client {} with QR at {}",
            checkpoint.id, checkpoint.client_id, checkpoint.qr_code_url
        );
        Ok(checkpoint)
    }

    // Append-only scan log. Same employee/checkpoint/time may repeat; the
    // existence check and the insert share one transaction.
    pub async fn scan(req: ScanRequest, pool: &DbPool) -> Result<ScannedDetail, ApiError> {
        if req.employee_no.trim().is_empty() || req.location_name.trim().is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }

        let conn = pool.get()?;
        let detail = web::block(move || {
            let mut conn = conn;
            conn.transaction::<ScannedDetail, ApiError, _>(|conn| {
                {
                    use crate::schema::checkpoint::dsl::*;
                    let exists = checkpoint
                        .find(req.checkpoint_id)
                        .select(id)
                        .first::<i32>(conn)
                        .optional()?;
                    if exists.is_none() {
                        return Err(ApiError::NotFound("Checkpoint not found".to_string()));
                    }
                }

                let row = diesel::insert_into(crate::schema::scanned_detail::table)
                    .values(&NewScannedDetail {
                        employee_no: req.employee_no.clone(),
                        checkpoint_id: req.checkpoint_id,
                        location_name: req.location_name.clone(),
                        scan_date: req.scan_date,
                        scan_time: req.scan_time,
                    })
                    .get_result(conn)?;
                Ok(row)
            })
        })
        .await??;

        debug!(
            "Recorded scan by {} at checkpoint {}",
            detail.employee_no, detail.checkpoint_id
        );
        Ok(detail)
    }

    pub async fn list_checkpoints(pool: &DbPool) -> Result<Vec<Checkpoint>, ApiError> {
        let conn = pool.get()?;
        let rows = web::block(move || {
            use crate::schema::checkpoint::dsl::*;
            let mut conn = conn;
            checkpoint.order(id.asc()).load::<Checkpoint>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        Ok(rows)
    }

    pub async fn get_checkpoints_by_client(
        target_client_id: i32,
        pool: &DbPool,
    ) -> Result<Vec<Checkpoint>, ApiError> {
        let conn = pool.get()?;
        let rows = web::block(move || {
            use crate::schema::checkpoint::dsl::*;
            let mut conn = conn;
            checkpoint
                .filter(client_id.eq(target_client_id))
                .order(id.asc())
                .load::<Checkpoint>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        Ok(rows)
    }

    pub async fn list_scans(pool: &DbPool) -> Result<Vec<ScannedDetail>, ApiError> {
        let conn = pool.get()?;
        let rows = web::block(move || {
            use crate::schema::scanned_detail::dsl::*;
            let mut conn = conn;
            scanned_detail.order(id.asc()).load::<ScannedDetail>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        Ok(rows)
    }

    pub async fn get_scans_by_client(
        target_client_id: i32,
        pool: &DbPool,
    ) -> Result<Vec<ScannedDetail>, ApiError> {
        let conn = pool.get()?;
        let rows = web::block(move || {
            let mut conn = conn;

            let checkpoint_ids: Vec<i32> = {
                use crate::schema::checkpoint::dsl::*;
                checkpoint
                    .filter(client_id.eq(target_client_id))
                    .select(id)
                    .load::<i32>(&mut conn)?
            };
            if checkpoint_ids.is_empty() {
                return Err(ApiError::NotFound(
                    "No checkpoints found for this client".to_string(),
                ));
            }

            use crate::schema::scanned_detail::dsl::*;
            scanned_detail
                .filter(checkpoint_id.eq_any(&checkpoint_ids))
                .order(id.asc())
                .load::<ScannedDetail>(&mut conn)
                .map_err(ApiError::from)
        })
        .await??;

        Ok(rows)
    }

    pub async fn get_scans_by_employee(
        number: String,
        pool: &DbPool,
    ) -> Result<Vec<ScannedDetail>, ApiError> {
        let conn = pool.get()?;
        let rows = web::block(move || {
            use crate::schema::scanned_detail::dsl::*;
            let mut conn = conn;
            scanned_detail
                .filter(employee_no.eq(&number))
                .order(id.asc())
                .load::<ScannedDetail>(&mut conn)
        })
        .await?
        .map_err(ApiError::from)?;

        if rows.is_empty() {
            return Err(ApiError::NotFound(
                "No scan details found for this employee".to_string(),
            ));
        }
        Ok(rows)
    }
}

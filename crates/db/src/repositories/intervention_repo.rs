//! Repository for the `interventions` table.

use coldline_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::intervention::{Intervention, InterventionFilter, NewIntervention};

/// Column list for `interventions` queries.
const COLUMNS: &str = "\
    id, client_id, equipment_category, urgency, description, \
    temperature_reading, energy_source, haccp_compliant, photos, status, \
    technician_id, created_by, created_at, updated_at";

/// Provides CRUD operations for interventions.
pub struct InterventionRepo;

impl InterventionRepo {
    /// Insert a new intervention, returning the full row.
    ///
    /// Takes a connection so the insert can share a transaction with the
    /// outbox write.
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewIntervention,
    ) -> Result<Intervention, sqlx::Error> {
        let query = format!(
            "INSERT INTO interventions \
                (client_id, equipment_category, urgency, description, \
                 temperature_reading, energy_source, haccp_compliant, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Intervention>(&query)
            .bind(input.client_id)
            .bind(&input.equipment_category)
            .bind(&input.urgency)
            .bind(&input.description)
            .bind(input.temperature_reading)
            .bind(&input.energy_source)
            .bind(input.haccp_compliant)
            .bind(input.created_by)
            .fetch_one(conn)
            .await
    }

    /// Find an intervention by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Intervention>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM interventions WHERE id = $1");
        sqlx::query_as::<_, Intervention>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List interventions matching `filter`, newest first.
    pub async fn list_filtered(
        pool: &PgPool,
        filter: &InterventionFilter,
    ) -> Result<Vec<Intervention>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if filter.status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if filter.client_id.is_some() {
            conditions.push(format!("client_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.technician_id.is_some() {
            conditions.push(format!("technician_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.equipment_category.is_some() {
            conditions.push(format!("equipment_category = ${param_idx}"));
            param_idx += 1;
        }
        if filter.participant.is_some() {
            conditions.push(format!(
                "(created_by = ${param_idx} OR technician_id = ${param_idx})"
            ));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM interventions {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, Intervention>(&query);

        if let Some(s) = &filter.status {
            q = q.bind(s);
        }
        if let Some(c) = filter.client_id {
            q = q.bind(c);
        }
        if let Some(t) = filter.technician_id {
            q = q.bind(t);
        }
        if let Some(e) = &filter.equipment_category {
            q = q.bind(e);
        }
        if let Some(p) = filter.participant {
            q = q.bind(p);
        }
        q = q.bind(filter.limit).bind(filter.offset);

        q.fetch_all(pool).await
    }

    /// Overwrite the mutable columns of an intervention. Returns the updated
    /// row if found.
    pub async fn update(
        conn: &mut PgConnection,
        record: &Intervention,
    ) -> Result<Option<Intervention>, sqlx::Error> {
        let query = format!(
            "UPDATE interventions SET \
                client_id = $2, \
                equipment_category = $3, \
                urgency = $4, \
                description = $5, \
                temperature_reading = $6, \
                energy_source = $7, \
                haccp_compliant = $8, \
                photos = $9, \
                status = $10, \
                technician_id = $11, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Intervention>(&query)
            .bind(record.id)
            .bind(record.client_id)
            .bind(&record.equipment_category)
            .bind(&record.urgency)
            .bind(&record.description)
            .bind(record.temperature_reading)
            .bind(&record.energy_source)
            .bind(record.haccp_compliant)
            .bind(&record.photos)
            .bind(&record.status)
            .bind(record.technician_id)
            .fetch_optional(conn)
            .await
    }

    /// Permanently delete an intervention. Returns `true` if a row was removed.
    pub async fn hard_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM interventions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

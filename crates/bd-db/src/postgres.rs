//! PostgreSQL store
//!
//! Every multi-row mutation runs inside one explicit transaction; the schema
//! and its migrations belong to the surrounding platform.

use async_trait::async_trait;
use bd_core::{CrmError, CrmResult, Id};
use bd_models::{
    DeliverableTemplate, ItemStatus, Phase, PhaseNode, PhaseStatus, PhaseTemplate, UnitOfMeasure,
    WorkCollateral, WorkItem, WorkPackage, WorkPackageTree,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::store::{CrmStore, TemplateCatalog};

fn db_err(e: sqlx::Error) -> CrmError {
    CrmError::Database(e.to_string())
}

fn corrupt(what: &str, value: &str) -> CrmError {
    CrmError::Database(format!("corrupt {} value in store: {}", what, value))
}

#[derive(Debug, FromRow)]
struct WorkPackageRow {
    id: i64,
    contact_id: i64,
    company_id: Option<i64>,
    title: String,
    description: Option<String>,
    total_cost: Option<f64>,
    effective_start_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkPackageRow {
    fn into_model(self) -> WorkPackage {
        WorkPackage {
            id: Some(self.id),
            contact_id: self.contact_id,
            company_id: self.company_id,
            title: self.title,
            description: self.description,
            total_cost: self.total_cost,
            effective_start_date: self.effective_start_date,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

#[derive(Debug, FromRow)]
struct PhaseRow {
    id: i64,
    work_package_id: i64,
    name: String,
    position: i32,
    description: Option<String>,
    total_estimated_hours: f64,
    estimated_start_date: Option<NaiveDate>,
    estimated_end_date: Option<NaiveDate>,
    actual_start_date: Option<NaiveDate>,
    actual_end_date: Option<NaiveDate>,
    status: String,
}

impl PhaseRow {
    fn into_model(self) -> CrmResult<Phase> {
        let status: PhaseStatus = self
            .status
            .parse()
            .map_err(|_| corrupt("phase status", &self.status))?;
        Ok(Phase {
            id: Some(self.id),
            work_package_id: Some(self.work_package_id),
            name: self.name,
            position: self.position,
            description: self.description,
            total_estimated_hours: self.total_estimated_hours,
            estimated_start_date: self.estimated_start_date,
            estimated_end_date: self.estimated_end_date,
            actual_start_date: self.actual_start_date,
            actual_end_date: self.actual_end_date,
            status,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    work_package_id: i64,
    phase_id: i64,
    deliverable_type: String,
    deliverable_label: String,
    description: Option<String>,
    quantity: i64,
    unit_of_measure: String,
    estimated_hours_each: f64,
    status: String,
}

impl ItemRow {
    fn into_model(self) -> CrmResult<WorkItem> {
        let status: ItemStatus = self
            .status
            .parse()
            .map_err(|_| corrupt("item status", &self.status))?;
        Ok(WorkItem {
            id: Some(self.id),
            work_package_id: Some(self.work_package_id),
            phase_id: Some(self.phase_id),
            deliverable_type: self.deliverable_type,
            deliverable_label: self.deliverable_label,
            description: self.description,
            quantity: self.quantity,
            unit_of_measure: UnitOfMeasure::parse_or_default(Some(&self.unit_of_measure)),
            estimated_hours_each: self.estimated_hours_each,
            status,
        })
    }
}

#[derive(Debug, FromRow)]
struct CollateralRow {
    id: i64,
    item_id: i64,
    work_package_id: i64,
    title: String,
    status: String,
}

impl CollateralRow {
    fn into_model(self) -> CrmResult<WorkCollateral> {
        let status: ItemStatus = self
            .status
            .parse()
            .map_err(|_| corrupt("collateral status", &self.status))?;
        Ok(WorkCollateral {
            id: Some(self.id),
            item_id: self.item_id,
            work_package_id: self.work_package_id,
            title: self.title,
            status,
        })
    }
}

/// PostgreSQL implementation of `CrmStore`
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_work_package(
        tx: &mut Transaction<'_, Postgres>,
        wp: &WorkPackage,
    ) -> CrmResult<WorkPackage> {
        let row = match wp.id {
            Some(id) => sqlx::query_as::<_, WorkPackageRow>(
                r#"
                UPDATE work_packages
                SET contact_id = $1, company_id = $2, title = $3, description = $4,
                    total_cost = $5, effective_start_date = $6, updated_at = NOW()
                WHERE id = $7
                RETURNING id, contact_id, company_id, title, description, total_cost,
                          effective_start_date, created_at, updated_at
                "#,
            )
            .bind(wp.contact_id)
            .bind(wp.company_id)
            .bind(&wp.title)
            .bind(&wp.description)
            .bind(wp.total_cost)
            .bind(wp.effective_start_date)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| CrmError::not_found("WorkPackage", "id", id))?,
            None => sqlx::query_as::<_, WorkPackageRow>(
                r#"
                INSERT INTO work_packages (
                    contact_id, company_id, title, description, total_cost,
                    effective_start_date, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
                RETURNING id, contact_id, company_id, title, description, total_cost,
                          effective_start_date, created_at, updated_at
                "#,
            )
            .bind(wp.contact_id)
            .bind(wp.company_id)
            .bind(&wp.title)
            .bind(&wp.description)
            .bind(wp.total_cost)
            .bind(wp.effective_start_date)
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?,
        };
        Ok(row.into_model())
    }

    async fn upsert_phase(
        tx: &mut Transaction<'_, Postgres>,
        work_package_id: Id,
        phase: &Phase,
    ) -> CrmResult<Phase> {
        let row = match phase.id {
            Some(id) => sqlx::query_as::<_, PhaseRow>(
                r#"
                UPDATE phases
                SET name = $1, position = $2, description = $3, total_estimated_hours = $4,
                    estimated_start_date = $5, estimated_end_date = $6,
                    actual_start_date = $7, actual_end_date = $8, status = $9
                WHERE id = $10 AND work_package_id = $11
                RETURNING id, work_package_id, name, position, description,
                          total_estimated_hours, estimated_start_date, estimated_end_date,
                          actual_start_date, actual_end_date, status
                "#,
            )
            .bind(&phase.name)
            .bind(phase.position)
            .bind(&phase.description)
            .bind(phase.total_estimated_hours)
            .bind(phase.estimated_start_date)
            .bind(phase.estimated_end_date)
            .bind(phase.actual_start_date)
            .bind(phase.actual_end_date)
            .bind(phase.status.as_str())
            .bind(id)
            .bind(work_package_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| CrmError::not_found("Phase", "id", id))?,
            None => sqlx::query_as::<_, PhaseRow>(
                r#"
                INSERT INTO phases (
                    work_package_id, name, position, description, total_estimated_hours,
                    estimated_start_date, estimated_end_date, actual_start_date,
                    actual_end_date, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id, work_package_id, name, position, description,
                          total_estimated_hours, estimated_start_date, estimated_end_date,
                          actual_start_date, actual_end_date, status
                "#,
            )
            .bind(work_package_id)
            .bind(&phase.name)
            .bind(phase.position)
            .bind(&phase.description)
            .bind(phase.total_estimated_hours)
            .bind(phase.estimated_start_date)
            .bind(phase.estimated_end_date)
            .bind(phase.actual_start_date)
            .bind(phase.actual_end_date)
            .bind(phase.status.as_str())
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?,
        };
        row.into_model()
    }

    async fn upsert_item(
        tx: &mut Transaction<'_, Postgres>,
        work_package_id: Id,
        phase_id: Id,
        item: &WorkItem,
    ) -> CrmResult<WorkItem> {
        let row = match item.id {
            Some(id) => sqlx::query_as::<_, ItemRow>(
                r#"
                UPDATE work_items
                SET deliverable_type = $1, deliverable_label = $2, description = $3,
                    quantity = $4, unit_of_measure = $5, estimated_hours_each = $6,
                    status = $7
                WHERE id = $8 AND work_package_id = $9
                RETURNING id, work_package_id, phase_id, deliverable_type,
                          deliverable_label, description, quantity, unit_of_measure,
                          estimated_hours_each, status
                "#,
            )
            .bind(&item.deliverable_type)
            .bind(&item.deliverable_label)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_of_measure.as_str())
            .bind(item.estimated_hours_each)
            .bind(item.status.as_str())
            .bind(id)
            .bind(work_package_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| CrmError::not_found("WorkItem", "id", id))?,
            None => sqlx::query_as::<_, ItemRow>(
                r#"
                INSERT INTO work_items (
                    work_package_id, phase_id, deliverable_type, deliverable_label,
                    description, quantity, unit_of_measure, estimated_hours_each, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id, work_package_id, phase_id, deliverable_type,
                          deliverable_label, description, quantity, unit_of_measure,
                          estimated_hours_each, status
                "#,
            )
            .bind(work_package_id)
            .bind(phase_id)
            .bind(&item.deliverable_type)
            .bind(&item.deliverable_label)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_of_measure.as_str())
            .bind(item.estimated_hours_each)
            .bind(item.status.as_str())
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?,
        };
        row.into_model()
    }

    /// Write the full tree inside one transaction.
    async fn write_tree(&self, tree: WorkPackageTree) -> CrmResult<WorkPackageTree> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let work_package = Self::upsert_work_package(&mut tx, &tree.work_package).await?;
        let wp_id = work_package
            .id
            .ok_or_else(|| CrmError::Internal("work package id missing after write".into()))?;

        let mut phases = Vec::with_capacity(tree.phases.len());
        for node in tree.phases {
            let phase = Self::upsert_phase(&mut tx, wp_id, &node.phase).await?;
            let phase_id = phase
                .id
                .ok_or_else(|| CrmError::Internal("phase id missing after write".into()))?;

            let mut items = Vec::with_capacity(node.items.len());
            for item in &node.items {
                items.push(Self::upsert_item(&mut tx, wp_id, phase_id, item).await?);
            }
            phases.push(PhaseNode { phase, items });
        }

        tx.commit().await.map_err(db_err)?;

        let mut tree = WorkPackageTree {
            work_package,
            phases,
        };
        tree.sort_phases();
        Ok(tree)
    }
}

#[async_trait]
impl CrmStore for PgStore {
    async fn contact_exists(&self, contact_id: Id) -> CrmResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM contacts WHERE id = $1)")
            .bind(contact_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn load_tree(&self, work_package_id: Id) -> CrmResult<Option<WorkPackageTree>> {
        let wp = sqlx::query_as::<_, WorkPackageRow>(
            r#"
            SELECT id, contact_id, company_id, title, description, total_cost,
                   effective_start_date, created_at, updated_at
            FROM work_packages
            WHERE id = $1
            "#,
        )
        .bind(work_package_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(wp) = wp else {
            return Ok(None);
        };

        let phase_rows = sqlx::query_as::<_, PhaseRow>(
            r#"
            SELECT id, work_package_id, name, position, description,
                   total_estimated_hours, estimated_start_date, estimated_end_date,
                   actual_start_date, actual_end_date, status
            FROM phases
            WHERE work_package_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(work_package_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let item_rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, work_package_id, phase_id, deliverable_type, deliverable_label,
                   description, quantity, unit_of_measure, estimated_hours_each, status
            FROM work_items
            WHERE work_package_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(work_package_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut items = Vec::with_capacity(item_rows.len());
        for row in item_rows {
            items.push(row.into_model()?);
        }

        let mut phases = Vec::with_capacity(phase_rows.len());
        for row in phase_rows {
            let phase = row.into_model()?;
            let phase_items = items
                .iter()
                .filter(|item| item.phase_id == phase.id)
                .cloned()
                .collect();
            phases.push(PhaseNode {
                phase,
                items: phase_items,
            });
        }

        Ok(Some(WorkPackageTree {
            work_package: wp.into_model(),
            phases,
        }))
    }

    async fn insert_tree(&self, mut tree: WorkPackageTree) -> CrmResult<WorkPackageTree> {
        // A fresh tree carries no ids anywhere; write_tree assigns them.
        tree.work_package.id = None;
        for node in &mut tree.phases {
            node.phase.id = None;
            for item in &mut node.items {
                item.id = None;
            }
        }
        self.write_tree(tree).await
    }

    async fn save_tree(&self, tree: WorkPackageTree) -> CrmResult<WorkPackageTree> {
        self.write_tree(tree).await
    }

    async fn delete_work_package(&self, work_package_id: Id) -> CrmResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM work_collateral WHERE work_package_id = $1")
            .bind(work_package_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM work_items WHERE work_package_id = $1")
            .bind(work_package_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM phases WHERE work_package_id = $1")
            .bind(work_package_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let result = sqlx::query("DELETE FROM work_packages WHERE id = $1")
            .bind(work_package_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(CrmError::not_found("WorkPackage", "id", work_package_id));
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_item(&self, item_id: Id) -> CrmResult<Option<WorkItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, work_package_id, phase_id, deliverable_type, deliverable_label,
                   description, quantity, unit_of_measure, estimated_hours_each, status
            FROM work_items
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(ItemRow::into_model).transpose()
    }

    async fn find_collateral(&self, collateral_id: Id) -> CrmResult<Option<WorkCollateral>> {
        let row = sqlx::query_as::<_, CollateralRow>(
            r#"
            SELECT id, item_id, work_package_id, title, status
            FROM work_collateral
            WHERE id = $1
            "#,
        )
        .bind(collateral_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(CollateralRow::into_model).transpose()
    }

    async fn list_collateral_for_item(&self, item_id: Id) -> CrmResult<Vec<WorkCollateral>> {
        let rows = sqlx::query_as::<_, CollateralRow>(
            r#"
            SELECT id, item_id, work_package_id, title, status
            FROM work_collateral
            WHERE item_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(CollateralRow::into_model).collect()
    }

    async fn insert_collateral(&self, collateral: WorkCollateral) -> CrmResult<WorkCollateral> {
        let row = sqlx::query_as::<_, CollateralRow>(
            r#"
            INSERT INTO work_collateral (item_id, work_package_id, title, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, item_id, work_package_id, title, status
            "#,
        )
        .bind(collateral.item_id)
        .bind(collateral.work_package_id)
        .bind(&collateral.title)
        .bind(collateral.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.into_model()
    }

    async fn save_collateral_and_item_status(
        &self,
        collateral_id: Id,
        collateral_status: ItemStatus,
        item_id: Id,
        item_status: ItemStatus,
    ) -> CrmResult<WorkItem> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query("UPDATE work_collateral SET status = $1 WHERE id = $2")
            .bind(collateral_status.as_str())
            .bind(collateral_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Err(CrmError::not_found("WorkCollateral", "id", collateral_id));
        }

        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            UPDATE work_items
            SET status = $1
            WHERE id = $2
            RETURNING id, work_package_id, phase_id, deliverable_type, deliverable_label,
                      description, quantity, unit_of_measure, estimated_hours_each, status
            "#,
        )
        .bind(item_status.as_str())
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| CrmError::not_found("WorkItem", "id", item_id))?;

        tx.commit().await.map_err(db_err)?;
        row.into_model()
    }
}

/// PostgreSQL implementation of the read-only template catalog
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PhaseTemplateRow {
    id: i64,
    name: String,
    description: Option<String>,
    default_position: i32,
}

#[derive(Debug, FromRow)]
struct DeliverableTemplateRow {
    id: i64,
    deliverable_type: String,
    deliverable_label: String,
    description: Option<String>,
    default_quantity: i64,
    default_unit_of_measure: String,
    default_estimated_hours_each: f64,
}

#[async_trait]
impl TemplateCatalog for PgCatalog {
    async fn phase_template(&self, id: Id) -> CrmResult<Option<PhaseTemplate>> {
        let row = sqlx::query_as::<_, PhaseTemplateRow>(
            r#"
            SELECT id, name, description, default_position
            FROM phase_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|row| PhaseTemplate {
            id: Some(row.id),
            name: row.name,
            description: row.description,
            default_position: row.default_position,
        }))
    }

    async fn deliverable_template(&self, id: Id) -> CrmResult<Option<DeliverableTemplate>> {
        let row = sqlx::query_as::<_, DeliverableTemplateRow>(
            r#"
            SELECT id, deliverable_type, deliverable_label, description,
                   default_quantity, default_unit_of_measure, default_estimated_hours_each
            FROM deliverable_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|row| DeliverableTemplate {
            id: Some(row.id),
            deliverable_type: row.deliverable_type,
            deliverable_label: row.deliverable_label,
            description: row.description,
            default_quantity: row.default_quantity,
            default_unit_of_measure: UnitOfMeasure::parse_or_default(Some(
                &row.default_unit_of_measure,
            )),
            default_estimated_hours_each: row.default_estimated_hours_each,
        }))
    }
}

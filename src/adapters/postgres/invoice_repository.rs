//! PostgreSQL implementation of InvoiceRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::billing::{Invoice, InvoiceStatus, NewInvoice};
use crate::domain::foundation::{
    DomainError, ErrorCode, InvoiceId, ServiceId, TenantId, Timestamp,
};
use crate::domain::tenancy::TenantScope;
use crate::ports::InvoiceRepository;

use super::{scope_binds, storage_error};

/// PostgreSQL implementation of the InvoiceRepository port.
pub struct PostgresInvoiceRepository {
    pool: PgPool,
}

impl PostgresInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an invoice.
#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i64,
    service_id: i64,
    amount: Decimal,
    status: String,
    invoice_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    payment_link_url: Option<String>,
    tenant_id: Option<i64>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: InvoiceId::from_i64(row.id),
            service_id: ServiceId::from_i64(row.service_id),
            amount: row.amount,
            status: parse_status(&row.status)?,
            invoice_date: Timestamp::from_datetime(row.invoice_date),
            due_date: Timestamp::from_datetime(row.due_date),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            payment_link_url: row.payment_link_url,
            tenant: row
                .tenant_id
                .map(TenantId::new)
                .transpose()
                .map_err(DomainError::from)?,
        })
    }
}

fn parse_status(s: &str) -> Result<InvoiceStatus, DomainError> {
    match s {
        "unpaid" => Ok(InvoiceStatus::Unpaid),
        "paid" => Ok(InvoiceStatus::Paid),
        "overdue" => Ok(InvoiceStatus::Overdue),
        "cancelled" => Ok(InvoiceStatus::Cancelled),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid invoice status value: {}", s),
        )),
    }
}

fn render_status(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Unpaid => "unpaid",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Overdue => "overdue",
        InvoiceStatus::Cancelled => "cancelled",
    }
}

const SELECT_COLUMNS: &str = "id, service_id, amount, status, invoice_date, due_date, paid_at, payment_link_url, tenant_id";

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    async fn insert(&self, new: NewInvoice) -> Result<Invoice, DomainError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            INSERT INTO invoices
                (service_id, amount, status, invoice_date, due_date, tenant_id)
            VALUES ($1, $2, 'unpaid', $3, $4, $5)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(new.service_id.as_i64())
        .bind(new.amount)
        .bind(new.invoice_date.as_datetime())
        .bind(new.due_date.as_datetime())
        .bind(new.tenant.map(|t| t.as_i64()))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Invoice::try_from(row)
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE invoices
            SET status = $2, paid_at = $3, payment_link_url = $4
            WHERE id = $1
            "#,
        )
        .bind(invoice.id.as_i64())
        .bind(render_status(invoice.status))
        .bind(invoice.paid_at.map(|t| *t.as_datetime()))
        .bind(&invoice.payment_link_url)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM invoices
            WHERE id = $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            "#
        ))
        .bind(id.as_i64())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(Invoice::try_from).transpose()
    }

    async fn list_for_service(
        &self,
        scope: &TenantScope,
        service_id: ServiceId,
    ) -> Result<Vec<Invoice>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM invoices
            WHERE service_id = $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            ORDER BY id DESC
            "#
        ))
        .bind(service_id.as_i64())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn list_unpaid_due_before(
        &self,
        scope: &TenantScope,
        cutoff: &Timestamp,
    ) -> Result<Vec<Invoice>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM invoices
            WHERE status = 'unpaid'
              AND due_date < $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            "#
        ))
        .bind(cutoff.as_datetime())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn list_overdue(&self, scope: &TenantScope) -> Result<Vec<Invoice>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM invoices
            WHERE status = 'overdue'
              AND (CASE WHEN $1 THEN TRUE
                        WHEN $2::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $2 END)
            "#
        ))
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Invoice::try_from).collect()
    }
}

//! PostgreSQL implementation of PaymentRepository.
//!
//! The `payments.transaction_id` column carries a UNIQUE constraint; the
//! insert uses `ON CONFLICT DO NOTHING` and reports a lost race as
//! `SaveResult::AlreadyExists`, which is what serializes concurrent
//! webhook deliveries for one transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Payment, PaymentStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, InvoiceId, PaymentId, TenantId, Timestamp,
};
use crate::domain::tenancy::TenantScope;
use crate::ports::{PaymentRepository, SaveResult};

use super::{scope_binds, storage_error};

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    invoice_id: i64,
    gateway: String,
    transaction_id: String,
    amount: Decimal,
    status: String,
    metadata: String,
    tenant_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let metadata: HashMap<String, String> =
            serde_json::from_str(&row.metadata).map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid payment metadata: {}", e),
                )
            })?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            invoice_id: InvoiceId::from_i64(row.invoice_id),
            gateway: row.gateway,
            transaction_id: row.transaction_id,
            amount: row.amount,
            status: parse_status(&row.status)?,
            metadata,
            tenant: row
                .tenant_id
                .map(TenantId::new)
                .transpose()
                .map_err(DomainError::from)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "success" => Ok(PaymentStatus::Success),
        "failed" => Ok(PaymentStatus::Failed),
        "expired" => Ok(PaymentStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment status value: {}", s),
        )),
    }
}

fn render_status(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Success => "success",
        PaymentStatus::Failed => "failed",
        PaymentStatus::Expired => "expired",
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<SaveResult, DomainError> {
        let metadata = serde_json::to_string(&payment.metadata).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Unserializable payment metadata: {}", e),
            )
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO payments
                (id, invoice_id, gateway, transaction_id, amount, status, metadata, tenant_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.invoice_id.as_i64())
        .bind(&payment.gateway)
        .bind(&payment.transaction_id)
        .bind(payment.amount)
        .bind(render_status(payment.status))
        .bind(metadata)
        .bind(payment.tenant.map(|t| t.as_i64()))
        .bind(payment.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, invoice_id, gateway, transaction_id, amount, status, metadata, tenant_id, created_at
            FROM payments
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(Payment::try_from).transpose()
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2
            WHERE transaction_id = $1
            "#,
        )
        .bind(&payment.transaction_id)
        .bind(render_status(payment.status))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn list_for_invoice(
        &self,
        scope: &TenantScope,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, invoice_id, gateway, transaction_id, amount, status, metadata, tenant_id, created_at
            FROM payments
            WHERE invoice_id = $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            ORDER BY created_at DESC
            "#,
        )
        .bind(invoice_id.as_i64())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}

//! PostgreSQL implementation of TicketRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{NewTicket, Ticket, TicketStatus};
use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, TenantId, TicketId, Timestamp, UserId,
};
use crate::domain::tenancy::TenantScope;
use crate::ports::TicketRepository;

use super::{scope_binds, storage_error};

/// PostgreSQL implementation of the TicketRepository port.
pub struct PostgresTicketRepository {
    pool: PgPool,
}

impl PostgresTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a ticket.
#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i64,
    customer_id: i64,
    subject: String,
    body: String,
    status: String,
    assigned_to: Option<String>,
    tenant_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = DomainError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: TicketId::from_i64(row.id),
            customer_id: CustomerId::from_i64(row.customer_id),
            subject: row.subject,
            body: row.body,
            status: parse_status(&row.status)?,
            assigned_to: row
                .assigned_to
                .map(UserId::new)
                .transpose()
                .map_err(DomainError::from)?,
            tenant: row
                .tenant_id
                .map(TenantId::new)
                .transpose()
                .map_err(DomainError::from)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<TicketStatus, DomainError> {
    match s {
        "open" => Ok(TicketStatus::Open),
        "in_progress" => Ok(TicketStatus::InProgress),
        "resolved" => Ok(TicketStatus::Resolved),
        "closed" => Ok(TicketStatus::Closed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid ticket status value: {}", s),
        )),
    }
}

fn render_status(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Open => "open",
        TicketStatus::InProgress => "in_progress",
        TicketStatus::Resolved => "resolved",
        TicketStatus::Closed => "closed",
    }
}

const SELECT_COLUMNS: &str = "id, customer_id, subject, body, status, assigned_to, tenant_id, created_at";

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn insert(&self, new: NewTicket) -> Result<Ticket, DomainError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            INSERT INTO tickets (customer_id, subject, body, status, tenant_id, created_at)
            VALUES ($1, $2, $3, 'open', $4, NOW())
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(new.customer_id.as_i64())
        .bind(&new.subject)
        .bind(&new.body)
        .bind(new.tenant.map(|t| t.as_i64()))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ticket::try_from(row)
    }

    async fn update(&self, ticket: &Ticket) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE tickets
            SET status = $2, assigned_to = $3
            WHERE id = $1
            "#,
        )
        .bind(ticket.id.as_i64())
        .bind(render_status(ticket.status))
        .bind(ticket.assigned_to.as_ref().map(|u| u.as_str()))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: TicketId,
    ) -> Result<Option<Ticket>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM tickets
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

        row.map(Ticket::try_from).transpose()
    }

    async fn list_for_customer(
        &self,
        scope: &TenantScope,
        customer_id: CustomerId,
    ) -> Result<Vec<Ticket>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM tickets
            WHERE customer_id = $1
              AND (CASE WHEN $2 THEN TRUE
                        WHEN $3::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $3 END)
            ORDER BY id DESC
            "#
        ))
        .bind(customer_id.as_i64())
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Ticket::try_from).collect()
    }
}

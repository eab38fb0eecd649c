//! PostgreSQL implementation of CustomerRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{Customer, CustomerStatus, NewCustomer};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::tenancy::TenantScope;
use crate::ports::CustomerRepository;

use super::{scope_binds, storage_error};

/// PostgreSQL implementation of the CustomerRepository port.
pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a customer.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    name: String,
    email: String,
    phone: String,
    status: String,
    tenant_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DomainError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer {
            id: CustomerId::from_i64(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            status: parse_status(&row.status)?,
            tenant: row
                .tenant_id
                .map(TenantId::new)
                .transpose()
                .map_err(DomainError::from)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<CustomerStatus, DomainError> {
    match s {
        "pending_survey" => Ok(CustomerStatus::PendingSurvey),
        "survey_scheduled" => Ok(CustomerStatus::SurveyScheduled),
        "survey_complete" => Ok(CustomerStatus::SurveyComplete),
        "approved" => Ok(CustomerStatus::Approved),
        "active" => Ok(CustomerStatus::Active),
        "suspended" => Ok(CustomerStatus::Suspended),
        "terminated" => Ok(CustomerStatus::Terminated),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid customer status value: {}", s),
        )),
    }
}

fn render_status(status: CustomerStatus) -> &'static str {
    match status {
        CustomerStatus::PendingSurvey => "pending_survey",
        CustomerStatus::SurveyScheduled => "survey_scheduled",
        CustomerStatus::SurveyComplete => "survey_complete",
        CustomerStatus::Approved => "approved",
        CustomerStatus::Active => "active",
        CustomerStatus::Suspended => "suspended",
        CustomerStatus::Terminated => "terminated",
    }
}

const SELECT_COLUMNS: &str = "id, name, email, phone, status, tenant_id, created_at";

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn insert(&self, new: NewCustomer) -> Result<Customer, DomainError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            INSERT INTO customers (name, email, phone, status, tenant_id, created_at)
            VALUES ($1, $2, $3, 'pending_survey', $4, NOW())
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.tenant.map(|t| t.as_i64()))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Customer::try_from(row)
    }

    async fn update(&self, customer: &Customer) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE customers
            SET name = $2, email = $3, phone = $4, status = $5
            WHERE id = $1
            "#,
        )
        .bind(customer.id.as_i64())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(render_status(customer.status))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: CustomerId,
    ) -> Result<Option<Customer>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM customers
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

        row.map(Customer::try_from).transpose()
    }

    async fn list(&self, scope: &TenantScope) -> Result<Vec<Customer>, DomainError> {
        let (unrestricted, tenant) = scope_binds(scope);

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM customers
            WHERE (CASE WHEN $1 THEN TRUE
                        WHEN $2::BIGINT IS NULL THEN FALSE
                        ELSE tenant_id = $2 END)
            ORDER BY id DESC
            "#
        ))
        .bind(unrestricted)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Customer::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            CustomerStatus::PendingSurvey,
            CustomerStatus::SurveyScheduled,
            CustomerStatus::SurveyComplete,
            CustomerStatus::Approved,
            CustomerStatus::Active,
            CustomerStatus::Suspended,
            CustomerStatus::Terminated,
        ] {
            assert_eq!(parse_status(render_status(status)).unwrap(), status);
        }
    }
}

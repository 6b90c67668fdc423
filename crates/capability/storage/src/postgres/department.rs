//! Postgres 部门目录实现（只读）

use crate::error::StorageError;
use crate::models::DepartmentRecord;
use crate::traits::DepartmentDirectory;
use sqlx::{PgPool, Row};

pub struct PgDepartmentDirectory {
    pub pool: PgPool,
}

impl PgDepartmentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DepartmentDirectory for PgDepartmentDirectory {
    async fn find_by_token(&self, token: &str) -> Result<Option<DepartmentRecord>, StorageError> {
        let row = sqlx::query("select department_id, name, token from departments where token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(DepartmentRecord {
            department_id: row.try_get("department_id")?,
            name: row.try_get("name")?,
            token: row.try_get("token")?,
        }))
    }

    async fn find_department(
        &self,
        department_id: &str,
    ) -> Result<Option<DepartmentRecord>, StorageError> {
        let row = sqlx::query(
            "select department_id, name, token from departments where department_id = $1",
        )
        .bind(department_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(DepartmentRecord {
            department_id: row.try_get("department_id")?,
            name: row.try_get("name")?,
            token: row.try_get("token")?,
        }))
    }
}

use sqlx::Row;

use tripxl_core::domain::employee::{Employee, EmployeeId, EmployeeRole};

use super::{decode_err, EmployeeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const EMPLOYEE_COLUMNS: &str =
    "id, employee_code, name, email, region, department, unit, designation, role, is_active";

fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> Result<Employee, RepositoryError> {
    let role: String = row.try_get("role").map_err(decode_err)?;
    let role = EmployeeRole::parse(&role)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown employee role `{role}`")))?;

    Ok(Employee {
        id: EmployeeId(row.try_get("id").map_err(decode_err)?),
        employee_code: row.try_get("employee_code").map_err(decode_err)?,
        name: row.try_get("name").map_err(decode_err)?,
        email: row.try_get("email").map_err(decode_err)?,
        region: row.try_get("region").map_err(decode_err)?,
        department: row.try_get("department").map_err(decode_err)?,
        unit: row.try_get("unit").map_err(decode_err)?,
        designation: row.try_get("designation").map_err(decode_err)?,
        role,
        is_active: row.try_get("is_active").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_employee).transpose()
    }

    async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_employee).collect()
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employees (id, employee_code, name, email, region, department, unit,
                                    designation, role, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 employee_code = excluded.employee_code,
                 name = excluded.name,
                 email = excluded.email,
                 region = excluded.region,
                 department = excluded.department,
                 unit = excluded.unit,
                 designation = excluded.designation,
                 role = excluded.role,
                 is_active = excluded.is_active",
        )
        .bind(&employee.id.0)
        .bind(&employee.employee_code)
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.region)
        .bind(&employee.department)
        .bind(&employee.unit)
        .bind(&employee.designation)
        .bind(employee.role.as_str())
        .bind(employee.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::on_unique(error, || {
                format!("employee code `{}` is already in use", employee.employee_code)
            })
        })?;

        Ok(())
    }
}

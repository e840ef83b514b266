use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use tripxl_core::domain::fuel::{FuelPriceRecord, FuelType};

use super::{decode_err, parse_timestamp, FuelPriceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlFuelPriceRepository {
    pool: DbPool,
}

impl SqlFuelPriceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<FuelPriceRecord, RepositoryError> {
    let fuel_type: String = row.try_get("fuel_type").map_err(decode_err)?;
    let price: String = row.try_get("price_per_litre").map_err(decode_err)?;
    let effective_at: String = row.try_get("effective_at").map_err(decode_err)?;

    Ok(FuelPriceRecord {
        fuel_type: FuelType::parse(&fuel_type)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown fuel type `{fuel_type}`")))?,
        price_per_litre: Decimal::from_str(&price).map_err(decode_err)?,
        effective_at: parse_timestamp(&effective_at)?,
        source: row.try_get("source").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl FuelPriceRepository for SqlFuelPriceRepository {
    async fn record(&self, records: Vec<FuelPriceRecord>) -> Result<usize, RepositoryError> {
        let recorded_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for record in &records {
            sqlx::query(
                "INSERT INTO fuel_prices (fuel_type, price_per_litre, effective_at, source,
                                          recorded_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(record.fuel_type.as_str())
            .bind(record.price_per_litre.to_string())
            .bind(record.effective_at.to_rfc3339())
            .bind(&record.source)
            .bind(&recorded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    async fn latest(&self) -> Result<Vec<FuelPriceRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT fuel_type, price_per_litre, effective_at, source
             FROM fuel_prices AS current
             WHERE current.id = (
                 SELECT candidate.id FROM fuel_prices AS candidate
                 WHERE candidate.fuel_type = current.fuel_type
                 ORDER BY candidate.effective_at DESC, candidate.id DESC
                 LIMIT 1
             )",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()?;
        records.sort_by_key(|record| record.fuel_type);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use tripxl_core::domain::fuel::{FuelPriceRecord, FuelType};

    use super::SqlFuelPriceRepository;
    use crate::repositories::FuelPriceRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlFuelPriceRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlFuelPriceRepository::new(pool)
    }

    fn record(
        fuel_type: FuelType,
        cents: i64,
        effective_at: chrono::DateTime<Utc>,
    ) -> FuelPriceRecord {
        FuelPriceRecord {
            fuel_type,
            price_per_litre: Decimal::new(cents, 2),
            effective_at,
            source: "WAM (Emirates News Agency)".to_string(),
        }
    }

    #[tokio::test]
    async fn latest_returns_newest_price_per_fuel_type() {
        let repo = setup().await;
        let last_month = Utc::now() - Duration::days(30);
        let this_month = Utc::now();

        let stored = repo
            .record(vec![
                record(FuelType::Diesel, 275, last_month),
                record(FuelType::Petrol, 261, last_month),
                record(FuelType::Diesel, 268, this_month),
            ])
            .await
            .expect("record");
        assert_eq!(stored, 3);

        let latest = repo.latest().await.expect("latest");
        let summary: Vec<_> =
            latest.iter().map(|record| (record.fuel_type, record.price_per_litre)).collect();
        assert_eq!(
            summary,
            vec![(FuelType::Petrol, Decimal::new(261, 2)), (FuelType::Diesel, Decimal::new(268, 2))]
        );
    }

    #[tokio::test]
    async fn latest_is_empty_without_history() {
        let repo = setup().await;
        assert!(repo.latest().await.expect("latest").is_empty());
    }
}

//! Unit repository
//!
//! A unit is one row in `units` plus its ordered `unit_history` rows. Saves
//! replace the history wholesale inside one transaction, so the buckets and
//! the trail that explains them can never drift apart.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use core_kernel::{FinancialYear, VoucherNo, VoucherType};
use domain_ledger::{Buckets, HistoryEntry, ReceiptFor, Unit};

use crate::error::DatabaseError;

/// Row of the `units` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitRow {
    pub name_of_unit: String,
    pub ledger_page_number: Option<i32>,
    pub advance_amount: Decimal,
    pub current_financial_amount: Decimal,
    pub last_financial_year_amount: Decimal,
    pub unpaid_amount: Decimal,
}

/// Row of the `unit_history` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub name_of_unit: String,
    pub position: i32,
    pub financial_year: String,
    pub date_received: NaiveDate,
    pub voucher_type: String,
    pub voucher_no: i64,
    pub amount: Decimal,
    pub type_of_voucher: String,
    pub receipt_for: String,
}

impl HistoryRow {
    fn into_entry(self) -> Result<HistoryEntry, DatabaseError> {
        let corrupt = |e: String| DatabaseError::corrupt("unit_history", e);
        Ok(HistoryEntry {
            financial_year: self
                .financial_year
                .parse::<FinancialYear>()
                .map_err(|e| corrupt(e.to_string()))?,
            date_received: self.date_received,
            voucher_type: self
                .voucher_type
                .parse::<VoucherType>()
                .map_err(|e| corrupt(e.to_string()))?,
            voucher_no: VoucherNo::new(self.voucher_no),
            amount: self.amount,
            type_of_voucher: self.type_of_voucher,
            receipt_for: self.receipt_for.parse::<ReceiptFor>().map_err(corrupt)?,
        })
    }
}

fn assemble(row: UnitRow, history: Vec<HistoryRow>) -> Result<Unit, DatabaseError> {
    let history = history
        .into_iter()
        .map(HistoryRow::into_entry)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Unit::restore(
        row.name_of_unit,
        row.ledger_page_number,
        Buckets {
            advance_amount: row.advance_amount,
            current_financial_amount: row.current_financial_amount,
            last_financial_year_amount: row.last_financial_year_amount,
            unpaid_amount: row.unpaid_amount,
        },
        history,
    ))
}

const SELECT_UNIT: &str = r#"
    SELECT name_of_unit, ledger_page_number, advance_amount, current_financial_amount,
           last_financial_year_amount, unpaid_amount
    FROM units
"#;

const SELECT_HISTORY: &str = r#"
    SELECT name_of_unit, position, financial_year, date_received, voucher_type,
           voucher_no, amount, type_of_voucher, receipt_for
    FROM unit_history
"#;

/// Repository for units and their history trail
#[derive(Debug, Clone)]
pub struct UnitRepository {
    pool: PgPool,
}

impl UnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads a unit with its full history
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Unit>, DatabaseError> {
        let row = sqlx::query_as::<_, UnitRow>(&format!("{} WHERE name_of_unit = $1", SELECT_UNIT))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let history = sqlx::query_as::<_, HistoryRow>(&format!(
            "{} WHERE name_of_unit = $1 ORDER BY position",
            SELECT_HISTORY
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        assemble(row, history).map(Some)
    }

    /// Lists units by name, optionally filtered by a case-insensitive substring
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Unit>, DatabaseError> {
        let pattern = search.map(|s| format!("%{}%", escape_like(s.trim())));

        let rows = sqlx::query_as::<_, UnitRow>(&format!(
            "{} WHERE ($1::TEXT IS NULL OR name_of_unit ILIKE $1) ORDER BY name_of_unit",
            SELECT_UNIT
        ))
        .bind(pattern.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let names: Vec<String> = rows.iter().map(|r| r.name_of_unit.clone()).collect();
        let mut history = sqlx::query_as::<_, HistoryRow>(&format!(
            "{} WHERE name_of_unit = ANY($1) ORDER BY name_of_unit, position",
            SELECT_HISTORY
        ))
        .bind(&names)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .peekable();

        let mut units = Vec::with_capacity(rows.len());
        for row in rows {
            let mut own = Vec::new();
            while let Some(entry) = history.next_if(|h| h.name_of_unit == row.name_of_unit) {
                own.push(entry);
            }
            units.push(assemble(row, own)?);
        }
        Ok(units)
    }

    /// Registers a new unit; fails with `DuplicateEntry` if the name is taken
    pub async fn insert(&self, unit: &Unit) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let buckets = unit.buckets();
        sqlx::query(
            r#"
            INSERT INTO units (
                name_of_unit, ledger_page_number, advance_amount, current_financial_amount,
                last_financial_year_amount, unpaid_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(unit.name())
        .bind(unit.ledger_page_number())
        .bind(buckets.advance_amount)
        .bind(buckets.current_financial_amount)
        .bind(buckets.last_financial_year_amount)
        .bind(buckets.unpaid_amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::DuplicateEntry(_) => DatabaseError::duplicate("Unit", "name", unit.name()),
            other => other,
        })?;

        write_history(&mut tx, unit).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replaces the buckets and history of an existing unit
    pub async fn save(&self, unit: &Unit) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let buckets = unit.buckets();
        let updated = sqlx::query(
            r#"
            UPDATE units
            SET ledger_page_number = $2,
                advance_amount = $3,
                current_financial_amount = $4,
                last_financial_year_amount = $5,
                unpaid_amount = $6,
                updated_at = now()
            WHERE name_of_unit = $1
            "#,
        )
        .bind(unit.name())
        .bind(unit.ledger_page_number())
        .bind(buckets.advance_amount)
        .bind(buckets.current_financial_amount)
        .bind(buckets.last_financial_year_amount)
        .bind(buckets.unpaid_amount)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Unit", unit.name()));
        }

        sqlx::query("DELETE FROM unit_history WHERE name_of_unit = $1")
            .bind(unit.name())
            .execute(&mut *tx)
            .await?;
        write_history(&mut tx, unit).await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn write_history(tx: &mut Transaction<'_, Postgres>, unit: &Unit) -> Result<(), DatabaseError> {
    for (position, entry) in unit.history().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO unit_history (
                name_of_unit, position, financial_year, date_received, voucher_type,
                voucher_no, amount, type_of_voucher, receipt_for
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(unit.name())
        .bind(position as i32)
        .bind(entry.financial_year.to_string())
        .bind(entry.date_received)
        .bind(entry.voucher_type.as_str())
        .bind(entry.voucher_no.value())
        .bind(entry.amount)
        .bind(&entry.type_of_voucher)
        .bind(entry.receipt_for.as_str())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn history_row(receipt_for: &str) -> HistoryRow {
        HistoryRow {
            name_of_unit: "Alpha".to_string(),
            position: 0,
            financial_year: "FY2024-2025".to_string(),
            date_received: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            voucher_type: "RV".to_string(),
            voucher_no: 4,
            amount: dec!(25),
            type_of_voucher: "UCS Amount".to_string(),
            receipt_for: receipt_for.to_string(),
        }
    }

    #[test]
    fn test_history_row_maps_to_entry() {
        let entry = history_row("LastFinancialYearAmount").into_entry().unwrap();
        assert_eq!(entry.financial_year, FinancialYear::starting(2024));
        assert_eq!(entry.voucher_type, VoucherType::Rv);
        assert_eq!(entry.receipt_for, ReceiptFor::LastFinancialYearAmount);
    }

    #[test]
    fn test_unknown_receipt_for_is_corrupt() {
        let err = history_row("Bonus").into_entry().unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow { table: "unit_history", .. }));
    }

    #[test]
    fn test_like_pattern_is_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }

    proptest::proptest! {
        #[test]
        fn test_plain_names_are_not_escaped(name in "[A-Za-z0-9 ]{0,24}") {
            proptest::prop_assert_eq!(escape_like(&name), name);
        }
    }
}

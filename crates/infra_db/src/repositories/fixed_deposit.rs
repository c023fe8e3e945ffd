//! Fixed-deposit repository

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use domain_ledger::FixedDeposit;

use crate::error::DatabaseError;

/// Row of the `fixed_deposits` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FixedDepositRow {
    pub fdr_no: String,
    pub date_of_deposit: NaiveDate,
    pub amount: Decimal,
    pub maturity_value: Decimal,
    pub maturity_date: Option<NaiveDate>,
    pub duration: Option<String>,
    pub int_rate: Decimal,
    pub interest_amount: Decimal,
    pub bank: Option<String>,
    pub remarks: Option<String>,
}

impl From<FixedDepositRow> for FixedDeposit {
    fn from(row: FixedDepositRow) -> Self {
        FixedDeposit {
            fdr_no: row.fdr_no,
            date_of_deposit: row.date_of_deposit,
            amount: row.amount,
            maturity_value: row.maturity_value,
            maturity_date: row.maturity_date,
            duration: row.duration,
            int_rate: row.int_rate,
            interest_amount: row.interest_amount,
            bank: row.bank,
            remarks: row.remarks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixedDepositRepository {
    pool: PgPool,
}

impl FixedDepositRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_number(&self, fdr_no: &str) -> Result<Option<FixedDeposit>, DatabaseError> {
        let row = sqlx::query_as::<_, FixedDepositRow>(
            r#"
            SELECT fdr_no, date_of_deposit, amount, maturity_value, maturity_date, duration,
                   int_rate, interest_amount, bank, remarks
            FROM fixed_deposits
            WHERE fdr_no = $1
            "#,
        )
        .bind(fdr_no)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FixedDeposit::from))
    }

    /// Fails with `DuplicateEntry` if the number is taken
    pub async fn insert(&self, deposit: &FixedDeposit) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO fixed_deposits (
                fdr_no, date_of_deposit, amount, maturity_value, maturity_date, duration,
                int_rate, interest_amount, bank, remarks
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&deposit.fdr_no)
        .bind(deposit.date_of_deposit)
        .bind(deposit.amount)
        .bind(deposit.maturity_value)
        .bind(deposit.maturity_date)
        .bind(deposit.duration.as_deref())
        .bind(deposit.int_rate)
        .bind(deposit.interest_amount)
        .bind(deposit.bank.as_deref())
        .bind(deposit.remarks.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::DuplicateEntry(_) => {
                DatabaseError::duplicate("Fixed deposit", "number", &deposit.fdr_no)
            }
            other => other,
        })?;
        Ok(())
    }
}

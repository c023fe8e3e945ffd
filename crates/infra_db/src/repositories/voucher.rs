//! Voucher repository
//!
//! Vouchers of every financial year share the `vouchers` table; each query
//! is scoped by the `financial_year` column. The financial-year registry
//! lives alongside because the first write into a year registers it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use core_kernel::{FinancialYear, Ledger, VoucherKey, VoucherNo, VoucherType};
use domain_ledger::{
    BucketAmounts, Method, PaymentType, ReceiptType, Voucher, VoucherFilter, VoucherLabel,
};

use crate::error::DatabaseError;

/// Row of the `vouchers` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoucherRow {
    pub financial_year: String,
    pub voucher_type: String,
    pub voucher_no: i64,
    pub date: NaiveDate,
    pub particulars: String,
    pub custom: bool,
    pub label: String,
    pub method: String,
    pub description: Option<String>,
    pub cash: Decimal,
    pub bank: Decimal,
    pub fdr: Decimal,
    pub sydr: Decimal,
    pub sycr: Decimal,
    pub property: Decimal,
    pub eme_journal_fund: Decimal,
    pub counter_voucher_no: Option<i64>,
    pub fdr_no: Option<String>,
}

impl TryFrom<VoucherRow> for Voucher {
    type Error = DatabaseError;

    fn try_from(row: VoucherRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| DatabaseError::corrupt("vouchers", e);

        let voucher_type = row
            .voucher_type
            .parse::<VoucherType>()
            .map_err(|e| corrupt(&e))?;
        let label = match voucher_type.ledger() {
            Ledger::Receipt => VoucherLabel::Receipt(ReceiptType::from(row.label)),
            Ledger::Payment => VoucherLabel::Payment(PaymentType::from(row.label)),
        };

        Ok(Voucher {
            date: row.date,
            voucher_type,
            voucher_no: VoucherNo::new(row.voucher_no),
            particulars: row.particulars,
            custom: row.custom,
            label,
            method: row.method.parse::<Method>().map_err(|e| corrupt(&e))?,
            description: row.description,
            amounts: BucketAmounts {
                cash: row.cash,
                bank: row.bank,
                fdr: row.fdr,
                sydr: row.sydr,
                sycr: row.sycr,
                property: row.property,
                eme_journal_fund: row.eme_journal_fund,
            },
            financial_year: row
                .financial_year
                .parse::<FinancialYear>()
                .map_err(|e| corrupt(&e))?,
            counter_voucher_no: row.counter_voucher_no.map(VoucherNo::new),
            fdr_no: row.fdr_no,
        })
    }
}

const SELECT_VOUCHER: &str = r#"
    SELECT financial_year, voucher_type, voucher_no, date, particulars, custom, label, method,
           description, cash, bank, fdr, sydr, sycr, property, eme_journal_fund,
           counter_voucher_no, fdr_no
    FROM vouchers
"#;

const INSERT_VOUCHER: &str = r#"
    INSERT INTO vouchers (
        financial_year, voucher_type, voucher_no, date, particulars, custom, label, method,
        description, cash, bank, fdr, sydr, sycr, property, eme_journal_fund,
        counter_voucher_no, fdr_no
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
"#;

fn bind_voucher<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    voucher: &'q Voucher,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(voucher.financial_year.to_string())
        .bind(voucher.voucher_type.as_str())
        .bind(voucher.voucher_no.value())
        .bind(voucher.date)
        .bind(&voucher.particulars)
        .bind(voucher.custom)
        .bind(voucher.label.as_str())
        .bind(voucher.method.as_str())
        .bind(voucher.description.as_deref())
        .bind(voucher.amounts.cash)
        .bind(voucher.amounts.bank)
        .bind(voucher.amounts.fdr)
        .bind(voucher.amounts.sydr)
        .bind(voucher.amounts.sycr)
        .bind(voucher.amounts.property)
        .bind(voucher.amounts.eme_journal_fund)
        .bind(voucher.counter_voucher_no.map(|n| n.value()))
        .bind(voucher.fdr_no.as_deref())
}

fn types_of(ledger: Ledger) -> Vec<&'static str> {
    VoucherType::ALL
        .iter()
        .filter(|t| t.ledger() == ledger)
        .map(VoucherType::as_str)
        .collect()
}

/// Repository for vouchers and the financial-year registry
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: PgPool,
}

impl VoucherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Vouchers of `financial_year` matching `filter`, by type then number
    pub async fn find(
        &self,
        financial_year: FinancialYear,
        filter: &VoucherFilter,
    ) -> Result<Vec<Voucher>, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_VOUCHER);
        query
            .push(" WHERE financial_year = ")
            .push_bind(financial_year.to_string());

        if let Some(voucher_type) = filter.voucher_type {
            query.push(" AND voucher_type = ").push_bind(voucher_type.as_str());
        }
        if let Some(ledger) = filter.ledger {
            query.push(" AND voucher_type = ANY(").push_bind(types_of(ledger)).push(")");
        }
        if let Some(no) = filter.voucher_no {
            query.push(" AND voucher_no = ").push_bind(no.value());
        }
        if let Some(from) = filter.voucher_no_gte {
            query.push(" AND voucher_no >= ").push_bind(from.value());
        }
        if let Some(particulars) = &filter.particulars {
            query.push(" AND particulars = ").push_bind(particulars.clone());
        }
        if let Some(month) = filter.month {
            query
                .push(" AND EXTRACT(MONTH FROM date) = ")
                .push_bind(month as i32);
        }
        query.push(" ORDER BY voucher_type, voucher_no");

        query
            .build_query_as::<VoucherRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Voucher::try_from)
            .collect()
    }

    pub async fn find_one(
        &self,
        financial_year: FinancialYear,
        key: &VoucherKey,
    ) -> Result<Option<Voucher>, DatabaseError> {
        sqlx::query_as::<_, VoucherRow>(&format!(
            "{} WHERE financial_year = $1 AND voucher_type = $2 AND voucher_no = $3",
            SELECT_VOUCHER
        ))
        .bind(financial_year.to_string())
        .bind(key.voucher_type.as_str())
        .bind(key.voucher_no.value())
        .fetch_optional(&self.pool)
        .await?
        .map(Voucher::try_from)
        .transpose()
    }

    /// Highest-numbered voucher of a type
    pub async fn find_last(
        &self,
        financial_year: FinancialYear,
        voucher_type: VoucherType,
    ) -> Result<Option<Voucher>, DatabaseError> {
        sqlx::query_as::<_, VoucherRow>(&format!(
            "{} WHERE financial_year = $1 AND voucher_type = $2 ORDER BY voucher_no DESC LIMIT 1",
            SELECT_VOUCHER
        ))
        .bind(financial_year.to_string())
        .bind(voucher_type.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Voucher::try_from)
        .transpose()
    }

    /// Fails with `DuplicateEntry` if the key is taken
    pub async fn insert(&self, voucher: &Voucher) -> Result<(), DatabaseError> {
        bind_voucher(sqlx::query(INSERT_VOUCHER), voucher)
            .execute(&self.pool)
            .await
            .map_err(|e| match DatabaseError::from(e) {
                DatabaseError::DuplicateEntry(_) => {
                    DatabaseError::duplicate("Voucher", "key", voucher.key())
                }
                other => other,
            })?;
        Ok(())
    }

    /// Inserts or replaces by key
    pub async fn upsert(&self, voucher: &Voucher) -> Result<(), DatabaseError> {
        let sql = format!(
            r#"{}
            ON CONFLICT (financial_year, voucher_type, voucher_no) DO UPDATE SET
                date = EXCLUDED.date,
                particulars = EXCLUDED.particulars,
                custom = EXCLUDED.custom,
                label = EXCLUDED.label,
                method = EXCLUDED.method,
                description = EXCLUDED.description,
                cash = EXCLUDED.cash,
                bank = EXCLUDED.bank,
                fdr = EXCLUDED.fdr,
                sydr = EXCLUDED.sydr,
                sycr = EXCLUDED.sycr,
                property = EXCLUDED.property,
                eme_journal_fund = EXCLUDED.eme_journal_fund,
                counter_voucher_no = EXCLUDED.counter_voucher_no,
                fdr_no = EXCLUDED.fdr_no,
                updated_at = now()"#,
            INSERT_VOUCHER
        );
        bind_voucher(sqlx::query(&sql), voucher)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replaces the voucher stored under its key; fails with `NotFound`
    pub async fn update(&self, voucher: &Voucher) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE vouchers
            SET date = $4,
                particulars = $5,
                custom = $6,
                label = $7,
                method = $8,
                description = $9,
                cash = $10,
                bank = $11,
                fdr = $12,
                sydr = $13,
                sycr = $14,
                property = $15,
                eme_journal_fund = $16,
                counter_voucher_no = $17,
                fdr_no = $18,
                updated_at = now()
            WHERE financial_year = $1 AND voucher_type = $2 AND voucher_no = $3
            "#,
        );
        let result = bind_voucher(result, voucher).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Voucher", voucher.key()));
        }
        Ok(())
    }

    /// Fails with `NotFound` if absent
    pub async fn delete(
        &self,
        financial_year: FinancialYear,
        key: &VoucherKey,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM vouchers WHERE financial_year = $1 AND voucher_type = $2 AND voucher_no = $3",
        )
        .bind(financial_year.to_string())
        .bind(key.voucher_type.as_str())
        .bind(key.voucher_no.value())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Voucher", key));
        }
        Ok(())
    }

    /// Records a financial year; returns true if it was new
    pub async fn register_financial_year(&self, financial_year: FinancialYear) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO financial_years (financial_year, start_year)
            VALUES ($1, $2)
            ON CONFLICT (financial_year) DO NOTHING
            "#,
        )
        .bind(financial_year.to_string())
        .bind(financial_year.start_year())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Registered years, oldest first
    pub async fn financial_years(&self) -> Result<Vec<FinancialYear>, DatabaseError> {
        let starts = sqlx::query_scalar::<_, i32>(
            "SELECT start_year FROM financial_years ORDER BY start_year",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(starts.into_iter().map(FinancialYear::starting).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(voucher_type: &str, label: &str) -> VoucherRow {
        VoucherRow {
            financial_year: "FY2024-2025".to_string(),
            voucher_type: voucher_type.to_string(),
            voucher_no: 7,
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            particulars: "Alpha".to_string(),
            custom: false,
            label: label.to_string(),
            method: "cash".to_string(),
            description: None,
            cash: dec!(100),
            bank: dec!(0),
            fdr: dec!(0),
            sydr: dec!(0),
            sycr: dec!(0),
            property: dec!(0),
            eme_journal_fund: dec!(0),
            counter_voucher_no: Some(7),
            fdr_no: None,
        }
    }

    #[test]
    fn test_label_follows_ledger_of_type() {
        let voucher = Voucher::try_from(row("PV", "Wavier")).unwrap();
        assert_eq!(voucher.label, VoucherLabel::Payment(PaymentType::Waiver));

        let counter = Voucher::try_from(row("CE_PV", "Counter Entry")).unwrap();
        assert_eq!(counter.label, VoucherLabel::Receipt(ReceiptType::CounterEntry));
    }

    #[test]
    fn test_unknown_type_is_corrupt() {
        let err = Voucher::try_from(row("JV", "Other")).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow { table: "vouchers", .. }));
    }

    #[test]
    fn test_ledger_types() {
        assert_eq!(types_of(Ledger::Receipt), vec!["RV", "CE_PV"]);
        assert_eq!(types_of(Ledger::Payment), vec!["PV", "CE_RV"]);
    }
}

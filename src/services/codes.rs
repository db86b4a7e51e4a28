use crate::{
    entities::sequence::{self, Entity as Sequence},
    errors::ServiceError,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
};
use std::{fmt, str::FromStr};
use strum::{Display, EnumString, VariantNames};
use tracing::{debug, instrument};

/// Numbering scheme for a generated document code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeScheme {
    /// `SITE-0001`
    Site,
    /// `QTN-20250101-0001`, numbered per day
    Quotation(NaiveDate),
    /// `PO/2025/01`, numbered per year
    PurchaseOrder(i32),
    /// `DC/2025/01`, numbered per year
    DeliveryChallan(i32),
    /// `000001`
    Call,
}

/// Name a scheme is known by outside the code, e.g. on the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SchemeName {
    Site,
    #[strum(to_string = "quotation", serialize = "qtn")]
    Quotation,
    #[strum(to_string = "purchase-order", serialize = "po")]
    PurchaseOrder,
    #[strum(to_string = "delivery-challan", serialize = "dc")]
    DeliveryChallan,
    Call,
}

impl SchemeName {
    /// The scheme in effect on `today`.
    pub fn on(self, today: NaiveDate) -> CodeScheme {
        match self {
            SchemeName::Site => CodeScheme::Site,
            SchemeName::Quotation => CodeScheme::Quotation(today),
            SchemeName::PurchaseOrder => CodeScheme::PurchaseOrder(today.year()),
            SchemeName::DeliveryChallan => CodeScheme::DeliveryChallan(today.year()),
            SchemeName::Call => CodeScheme::Call,
        }
    }
}

impl CodeScheme {
    /// Resolves a scheme by its short name, dating it with `today` where needed.
    pub fn from_name(name: &str, today: NaiveDate) -> Option<Self> {
        SchemeName::from_str(name).ok().map(|n| n.on(today))
    }

    pub fn name(&self) -> SchemeName {
        match self {
            CodeScheme::Site => SchemeName::Site,
            CodeScheme::Quotation(_) => SchemeName::Quotation,
            CodeScheme::PurchaseOrder(_) => SchemeName::PurchaseOrder,
            CodeScheme::DeliveryChallan(_) => SchemeName::DeliveryChallan,
            CodeScheme::Call => SchemeName::Call,
        }
    }

    /// Key of the backing row in `sequences`
    pub fn sequence_key(&self) -> String {
        match self {
            CodeScheme::Site => "SITE".to_string(),
            CodeScheme::Quotation(date) => format!("QTN-{}", date.format("%Y%m%d")),
            CodeScheme::PurchaseOrder(year) => format!("PO/{}", year),
            CodeScheme::DeliveryChallan(year) => format!("DC/{}", year),
            CodeScheme::Call => "CALL".to_string(),
        }
    }

    /// Renders the `value`-th code of this scheme
    pub fn render(&self, value: i64) -> String {
        match self {
            CodeScheme::Site => format!("SITE-{:04}", value),
            CodeScheme::Quotation(date) => format!("QTN-{}-{:04}", date.format("%Y%m%d"), value),
            CodeScheme::PurchaseOrder(year) => format!("PO/{}/{:02}", year, value),
            CodeScheme::DeliveryChallan(year) => format!("DC/{}/{:02}", year, value),
            CodeScheme::Call => format!("{:06}", value),
        }
    }
}

impl fmt::Display for CodeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sequence_key())
    }
}

/// Hands out sequential codes from the `sequences` table.
///
/// `next` must run on the transaction that inserts the coded document, so a
/// rollback returns the number to the pool and concurrent creators serialize
/// on the counter row.
pub struct CodeGenerator;

impl CodeGenerator {
    #[instrument(skip(conn))]
    pub async fn next<C>(conn: &C, scheme: CodeScheme) -> Result<String, ServiceError>
    where
        C: ConnectionTrait,
    {
        let key = scheme.sequence_key();

        let seed = sequence::ActiveModel {
            key: Set(key.clone()),
            last_value: Set(0),
        };
        match Sequence::insert(seed)
            .on_conflict(
                OnConflict::column(sequence::Column::Key)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
        {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(ServiceError::db_error(e)),
        }

        Sequence::update_many()
            .col_expr(
                sequence::Column::LastValue,
                Expr::col(sequence::Column::LastValue).add(1),
            )
            .filter(sequence::Column::Key.eq(key.as_str()))
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;

        let value = Self::current(conn, &key).await?;
        let code = scheme.render(value);
        debug!(%key, value, %code, "allocated code");
        Ok(code)
    }

    /// The code `next` would hand out, without consuming it.
    pub async fn peek<C>(conn: &C, scheme: CodeScheme) -> Result<String, ServiceError>
    where
        C: ConnectionTrait,
    {
        let value = Self::current(conn, &scheme.sequence_key()).await?;
        Ok(scheme.render(value + 1))
    }

    async fn current<C>(conn: &C, key: &str) -> Result<i64, ServiceError>
    where
        C: ConnectionTrait,
    {
        Ok(Sequence::find_by_id(key.to_string())
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|row| row.last_value)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(CodeScheme::Site, 1, "SITE-0001")]
    #[case(CodeScheme::Site, 12345, "SITE-12345")]
    #[case(CodeScheme::Quotation(day(2025, 1, 1)), 7, "QTN-20250101-0007")]
    #[case(CodeScheme::PurchaseOrder(2025), 3, "PO/2025/03")]
    #[case(CodeScheme::PurchaseOrder(2025), 123, "PO/2025/123")]
    #[case(CodeScheme::DeliveryChallan(2024), 10, "DC/2024/10")]
    #[case(CodeScheme::Call, 42, "000042")]
    fn renders_codes(#[case] scheme: CodeScheme, #[case] value: i64, #[case] expected: &str) {
        assert_eq!(scheme.render(value), expected);
    }

    #[test]
    fn sequence_keys_scope_counters() {
        assert_eq!(CodeScheme::Quotation(day(2025, 3, 9)).sequence_key(), "QTN-20250309");
        assert_eq!(CodeScheme::PurchaseOrder(2025).sequence_key(), "PO/2025");
        assert_ne!(
            CodeScheme::PurchaseOrder(2025).sequence_key(),
            CodeScheme::PurchaseOrder(2026).sequence_key()
        );
    }

    #[test]
    fn schemes_resolve_by_name() {
        let today = day(2025, 6, 30);
        assert_eq!(CodeScheme::from_name("SITE", today), Some(CodeScheme::Site));
        assert_eq!(
            CodeScheme::from_name("po", today),
            Some(CodeScheme::PurchaseOrder(2025))
        );
        assert_eq!(
            CodeScheme::from_name("quotation", today),
            Some(CodeScheme::Quotation(today))
        );
        assert_eq!(CodeScheme::from_name("invoice", today), None);
    }

    #[test]
    fn scheme_names_are_kebab_case() {
        assert_eq!(SchemeName::PurchaseOrder.to_string(), "purchase-order");
        assert_eq!(CodeScheme::DeliveryChallan(2025).name().to_string(), "delivery-challan");
        assert_eq!("Delivery-Challan".parse::<SchemeName>().ok(), Some(SchemeName::DeliveryChallan));
        assert_eq!(
            SchemeName::VARIANTS,
            &["site", "quotation", "purchase-order", "delivery-challan", "call"]
        );
    }
}

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Books with more copies than this are shown in the public catalog.
pub const PUBLIC_STOCK_FLOOR: i32 = 5;

/// Prices are stored as integer para (1/100 dinar).
pub const PRICE_SCALE: u32 = 2;

pub const MAX_TITLE_LEN: usize = 512;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub edition_id: Option<i32>,
    #[sea_orm(default_value = 0)]
    pub quantity: i32,
    /// Minor units, see [`PRICE_SCALE`]. `None` means the price is not set yet.
    pub price: Option<i64>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::edition::Entity",
        from = "Column::EditionId",
        to = "super::edition::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Edition,
    #[sea_orm(has_many = "super::book_authors::Entity")]
    BookAuthors,
    #[sea_orm(has_many = "super::book_tags::Entity")]
    BookTags,
}

impl Related<super::edition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Edition.def()
    }
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_authors::Relation::Author.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_authors::Relation::Book.def().rev())
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_tags::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_tags::Relation::Book.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Exact decimal for a stored minor-unit amount.
pub fn price_from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, PRICE_SCALE)
}

/// Minor units for a decimal amount, or `None` when the amount is negative,
/// has more than two decimal places or does not fit.
pub fn price_to_minor(price: Decimal) -> Option<i64> {
    if price.is_sign_negative() && !price.is_zero() {
        return None;
    }
    let scaled = price.checked_mul(Decimal::ONE_HUNDRED)?;
    if !scaled.fract().is_zero() {
        return None;
    }
    scaled.to_i64()
}

// DTO for API responses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub edition_id: Option<i32>,
    pub quantity: i32,
    pub price: Option<Decimal>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Book {
    pub fn is_publicly_visible(&self) -> bool {
        self.quantity > PUBLIC_STOCK_FLOOR
    }
}

impl From<Model> for Book {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            subtitle: model.subtitle,
            edition_id: model.edition_id,
            quantity: model.quantity,
            price: model.price.map(price_from_minor),
            isbn: model.isbn,
            description: model.description,
            cover_image_url: model.cover_image_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn price_round_trips_through_minor_units() {
        let price = Decimal::from_str("450.50").unwrap();
        assert_eq!(price_to_minor(price), Some(45050));
        assert_eq!(price_from_minor(45050), price);
        assert_eq!(price_from_minor(45000).to_string(), "450.00");
    }

    #[test]
    fn price_rejects_sub_para_and_negative_amounts() {
        assert_eq!(price_to_minor(Decimal::from_str("1.005").unwrap()), None);
        assert_eq!(price_to_minor(Decimal::from_str("-3").unwrap()), None);
        assert_eq!(price_to_minor(Decimal::ZERO), Some(0));
    }
}

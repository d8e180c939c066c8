use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fare/service tier with its own price and seat allotment per flight.
///
/// The set is closed: a human-facing label maps to exactly one key and
/// unknown labels are rejected at the boundary instead of being normalized
/// heuristically.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cabin_class")]
#[serde(rename_all = "camelCase")]
pub enum CabinClass {
    #[sea_orm(string_value = "economy")]
    Economy,
    #[sea_orm(string_value = "premium_economy")]
    PremiumEconomy,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "first_class")]
    FirstClass,
}

impl CabinClass {
    pub const ALL: [CabinClass; 4] = [
        CabinClass::Economy,
        CabinClass::PremiumEconomy,
        CabinClass::Business,
        CabinClass::FirstClass,
    ];

    /// Human-facing label, as shown in search forms and booking requests
    pub fn label(self) -> &'static str {
        match self {
            CabinClass::Economy => "Economy",
            CabinClass::PremiumEconomy => "Premium Economy",
            CabinClass::Business => "Business",
            CabinClass::FirstClass => "First Class",
        }
    }

    /// Resolve a human-facing label to its cabin class key
    pub fn from_label(label: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|class| class.label() == label)
            .ok_or_else(|| {
                let valid = Self::ALL.map(|class| class.label()).join(", ");
                AppError::BadRequest(format!(
                    "Unknown cabin class '{}'; valid classes are: {}",
                    label, valid
                ))
            })
    }
}

/// Per-flight, per-cabin-class inventory row. Keeping one row per class is
/// what lets a reservation be a single-row conditional update.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flight_cabin")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub price: f64,
    pub seats_total: i32,
    pub seats_available: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::flight::Entity",
        from = "Column::FlightId",
        to = "super::flight::Column::Id"
    )]
    Flight,
}

impl Related<super::flight::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flight.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

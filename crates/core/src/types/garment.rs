//! Garment classification for catalog products.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown [`ProductType`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid product type: {0}")]
pub struct ProductTypeError(pub String);

/// The kind of garment a catalog product is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "catalog.product_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Top,
    Bottom,
    Dress,
    Outerwear,
    Footwear,
    Accessory,
}

impl ProductType {
    /// All product types, in the order a person gets dressed.
    ///
    /// Used to phrase stylist instructions; recommendations are not re-sorted
    /// against it.
    pub const DRESS_ORDER: [Self; 6] = [
        Self::Top,
        Self::Dress,
        Self::Bottom,
        Self::Outerwear,
        Self::Accessory,
        Self::Footwear,
    ];

    /// Returns the wire name of the product type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Dress => "dress",
            Self::Outerwear => "outerwear",
            Self::Footwear => "footwear",
            Self::Accessory => "accessory",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductType {
    type Err = ProductTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "dress" => Ok(Self::Dress),
            "outerwear" => Ok(Self::Outerwear),
            "footwear" => Ok(Self::Footwear),
            "accessory" => Ok(Self::Accessory),
            _ => Err(ProductTypeError(s.to_owned())),
        }
    }
}

//! Products and the closed category/size sets.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Catalog categories. Closed set; filter inputs are validated against it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Men,
    Women,
    Kids,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Men,
        Category::Women,
        Category::Kids,
        Category::Accessories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Men => "Men",
            Category::Women => "Women",
            Category::Kids => "Kids",
            Category::Accessories => "Accessories",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown category: {s}")))
    }
}

/// Garment sizes. Numeric variants are waist sizes, `OS` is one-size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    #[serde(rename = "XS")]
    Xs,
    S,
    M,
    L,
    #[serde(rename = "XL")]
    Xl,
    #[serde(rename = "XXL")]
    Xxl,
    #[serde(rename = "28")]
    W28,
    #[serde(rename = "30")]
    W30,
    #[serde(rename = "32")]
    W32,
    #[serde(rename = "34")]
    W34,
    #[serde(rename = "36")]
    W36,
    #[serde(rename = "OS")]
    Os,
}

impl Size {
    pub const ALL: [Size; 12] = [
        Size::Xs,
        Size::S,
        Size::M,
        Size::L,
        Size::Xl,
        Size::Xxl,
        Size::W28,
        Size::W30,
        Size::W32,
        Size::W34,
        Size::W36,
        Size::Os,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Xs => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Xxl => "XXL",
            Size::W28 => "28",
            Size::W30 => "30",
            Size::W32 => "32",
            Size::W34 => "34",
            Size::W36 => "36",
            Size::Os => "OS",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Size::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown size: {s}")))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: String,
    pub category: Category,
    pub sizes: Vec<Size>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn has_size(&self, size: Size) -> bool {
        self.sizes.contains(&size)
    }
}

/// Payload for catalog seeding.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: String,
    pub category: Category,
    pub sizes: Vec<Size>,
    pub stock: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_round_trips_through_str() {
        for size in Size::ALL {
            assert_eq!(size.as_str().parse::<Size>().unwrap(), size);
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!("Shoes".parse::<Category>().is_err());
    }

    #[test]
    fn numeric_sizes_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&Size::W32).unwrap(), "\"32\"");
        assert_eq!(serde_json::from_str::<Size>("\"XL\"").unwrap(), Size::Xl);
    }
}

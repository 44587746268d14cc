use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::User;

lazy_static! {
    // Decimal amount with at most two fractional digits, e.g. "5" or "49.99".
    static ref PRICE_REGEX: Regex = Regex::new(r"^\d{1,9}(\.\d{1,2})?$").unwrap();
}

/// The author of a listing: a reference to the user plus a denormalized copy of the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// A toy listing as stored and shown on the browse and detail pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toy {
    /// Unique identifier for the listing (UUID v4).
    pub id: Uuid,
    pub name: String,
    /// Rental price, kept as the decimal string the author entered.
    pub rent_price: String,
    /// Sale price, kept as the decimal string the author entered.
    pub sale_price: String,
    /// Image path relative to the public asset root, e.g. `uploads/1700000000000-ab12cd34.png`.
    pub image_src: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create a listing. Identity and timestamp are assigned by `Toy::new`.
#[derive(Debug, Clone)]
pub struct NewToy {
    pub name: String,
    pub rent_price: String,
    pub sale_price: String,
    pub image_src: String,
    pub author: Author,
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToyChanges {
    pub name: Option<String>,
    pub rent_price: Option<String>,
    pub sale_price: Option<String>,
    pub image_src: Option<String>,
}

impl Toy {
    pub fn new(input: NewToy) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            rent_price: input.rent_price,
            sale_price: input.sale_price,
            image_src: input.image_src,
            author: input.author,
            created_at: Utc::now(),
        }
    }

    /// Applies the supplied fields of `changes`, leaving the rest as they are.
    pub fn apply(&mut self, changes: ToyChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(rent_price) = changes.rent_price {
            self.rent_price = rent_price;
        }
        if let Some(sale_price) = changes.sale_price {
            self.sale_price = sale_price;
        }
        if let Some(image_src) = changes.image_src {
            self.image_src = image_src;
        }
    }
}

/// The text fields of the post and edit forms, named as the forms submit them.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ToyForm {
    /// Display name of the toy, 1 to 100 characters.
    #[validate(length(min = 1, max = 100, message = "Toy name must be 1 to 100 characters"))]
    pub toyname: Option<String>,
    #[validate(regex(path = "PRICE_REGEX", message = "Rent price must be an amount like 5 or 4.50"))]
    pub rentprice: Option<String>,
    #[validate(regex(path = "PRICE_REGEX", message = "Sale price must be an amount like 50 or 49.99"))]
    pub saleprice: Option<String>,
}

impl ToyForm {
    /// Sets a named text field. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: String) {
        let value = value.trim().to_string();
        match field {
            "toyname" => self.toyname = Some(value),
            "rentprice" => self.rentprice = Some(value),
            "saleprice" => self.saleprice = Some(value),
            _ => {}
        }
    }

    /// Takes the three fields posting requires, or names the first one missing.
    pub fn require_all(self) -> Result<ToyFields, AppError> {
        let required = |value: Option<String>, label: &str| {
            value.ok_or_else(|| AppError::ValidationFailure(format!("{} is required", label)))
        };
        Ok(ToyFields {
            name: required(self.toyname, "Toy name")?,
            rent_price: required(self.rentprice, "Rent price")?,
            sale_price: required(self.saleprice, "Sale price")?,
        })
    }

    pub fn into_changes(self) -> ToyChanges {
        ToyChanges {
            name: self.toyname,
            rent_price: self.rentprice,
            sale_price: self.saleprice,
            image_src: None,
        }
    }
}

/// A `ToyForm` with every field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToyFields {
    pub name: String,
    pub rent_price: String,
    pub sale_price: String,
}

impl ToyFields {
    pub fn into_new_toy(self, image_src: String, author: Author) -> NewToy {
        NewToy {
            name: self.name,
            rent_price: self.rent_price,
            sale_price: self.sale_price,
            image_src,
            author,
        }
    }
}

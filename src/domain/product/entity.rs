//! Product catalog records

use serde::{Deserialize, Serialize};

/// Product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: u32,
    pub name: String,
}

/// A single product in the catalog listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub price: f64,
    pub stock: u32,
    pub category: Category,
}

impl Product {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        price: f64,
        stock: u32,
        category: Category,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock,
            category,
        }
    }
}

impl Category {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The placeholder listing served as `productlist`
pub fn default_products() -> Vec<Product> {
    vec![
        Product::new(1, "Laptop", 1200.50, 25, Category::new(101, "Electronics")),
        Product::new(2, "Headphones", 50.00, 100, Category::new(102, "Accessories")),
    ]
}

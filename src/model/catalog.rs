use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A product category as shown in the store shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub product_count: u32,
}

/// A product as projected for the store screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    pub price_cents: u64,
    pub image_url: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub in_stock: bool,
    pub featured: bool,
}

/// A promotional banner at the top of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreBanner {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub link: Option<String>,
    pub position: i32,
}

/// Categories and banners: the slowly-changing frame of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreShell {
    pub categories: Vec<Category>,
    pub banners: Vec<StoreBanner>,
}

/// Product listing shown on the store landing screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOverview {
    pub featured: Vec<Product>,
    pub products: Vec<Product>,
}

impl StoreOverview {
    pub fn from_products(products: Vec<Product>) -> Self {
        let featured = products.iter().filter(|p| p.featured).cloned().collect_vec();
        Self { featured, products }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "_count")]
    pub count: Option<RawProductCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawProductCount {
    #[serde(default)]
    pub products: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawStoreBanner {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub image: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<RawCategory> for Category {
    fn from(raw: RawCategory) -> Self {
        let slug = raw
            .slug
            .unwrap_or_else(|| raw.name.to_lowercase().split_whitespace().join("-"));
        Category {
            id: raw.id,
            name: raw.name,
            slug,
            image_url: raw.image,
            product_count: raw.count.map(|c| c.products).unwrap_or_default(),
        }
    }
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        Product {
            id: raw.id,
            name: raw.name,
            category_id: raw.category_id,
            price_cents: (raw.price.max(0.0) * 100.0).round() as u64,
            image_url: raw.images.into_iter().next(),
            sizes: raw.sizes,
            colors: raw.colors,
            in_stock: raw.stock > 0,
            featured: raw.is_featured,
        }
    }
}

/// Keep active banners only, ordered by their display position.
pub(crate) fn project_banners(raw: Vec<RawStoreBanner>) -> Vec<StoreBanner> {
    raw.into_iter()
        .filter(|b| b.is_active)
        .map(|b| StoreBanner {
            id: b.id,
            title: b.title.unwrap_or_default(),
            image_url: b.image,
            link: b.link,
            position: b.order,
        })
        .sorted_by_key(|b| b.position)
        .collect_vec()
}

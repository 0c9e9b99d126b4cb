use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::BoxError;

/// Medicine category as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

/// Stock block nested inside a medicine record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineStock {
    pub quantity: u32,
    #[serde(default)]
    pub reorder_level: Option<u32>,
}

/// A catalog entry. The backend may omit the stock block for medicines
/// that have never been stocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: u64,
    pub name: String,
    pub unit_price: f64,
    #[serde(default)]
    pub stock: Option<MedicineStock>,
}

impl Medicine {
    /// Quantity available for reservation, zero when no stock block exists.
    pub fn available_quantity(&self) -> u32 {
        self.stock.as_ref().map(|s| s.quantity).unwrap_or(0)
    }
}

/// Filters accepted by the medicine listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category_id: Option<u64>,
}

/// The listing endpoint returns a paginated envelope normally, but a bare
/// array when a search keyword bypasses pagination.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MedicineListResponse {
    Paginated {
        #[serde(default)]
        count: Option<u64>,
        results: Vec<Medicine>,
    },
    Plain(Vec<Medicine>),
}

impl MedicineListResponse {
    pub fn into_results(self) -> Vec<Medicine> {
        match self {
            MedicineListResponse::Paginated { results, .. } => results,
            MedicineListResponse::Plain(results) => results,
        }
    }
}

/// Read access to the remote medicine catalog, the source of every
/// stock snapshot.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// List medicines, optionally filtered by search keyword or category.
    async fn list_medicines(&self, query: &CatalogQuery) -> Result<Vec<Medicine>, BoxError>;

    /// Fetch a single medicine by id.
    async fn get_medicine(&self, medicine_id: u64) -> Result<Medicine, BoxError>;
}

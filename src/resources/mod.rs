//! JSON resource groups mounted under `/api/v1`
//!
//! Every group is plain CRUD over the document store; orders additionally
//! validate the status field.

pub mod handlers;
pub mod store;

pub use handlers::handle;
pub use store::{DocumentStore, ListQuery};

/// The ten resource collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Users,
    Products,
    Categories,
    Brands,
    Reviews,
    Orders,
    Imports,
    Comments,
    Payments,
    Locations,
}

impl ResourceKind {
    /// Declaration order is routing order
    pub const ALL: [Self; 10] = [
        Self::Users,
        Self::Products,
        Self::Categories,
        Self::Brands,
        Self::Reviews,
        Self::Orders,
        Self::Imports,
        Self::Comments,
        Self::Payments,
        Self::Locations,
    ];

    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Users => "/api/v1/users",
            Self::Products => "/api/v1/products",
            Self::Categories => "/api/v1/categories",
            Self::Brands => "/api/v1/brands",
            Self::Reviews => "/api/v1/reviews",
            Self::Orders => "/api/v1/orders",
            Self::Imports => "/api/v1/imports",
            Self::Comments => "/api/v1/comments",
            Self::Payments => "/api/v1/payments",
            Self::Locations => "/api/v1/locations",
        }
    }

    /// Last path segment, also used as the collection name
    pub fn segment(self) -> &'static str {
        self.prefix().rsplit('/').next().unwrap_or_default()
    }
}

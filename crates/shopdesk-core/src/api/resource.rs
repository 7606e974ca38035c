use std::fmt;
use std::str::FromStr;

/// List resources exposed by the dashboard API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Sales,
    Users,
    Customers,
    Providers,
    Expenses,
    Purchases,
    Incomes,
    Discounts,
    Categories,
    Banners,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Products,
        Resource::Sales,
        Resource::Users,
        Resource::Customers,
        Resource::Providers,
        Resource::Expenses,
        Resource::Purchases,
        Resource::Incomes,
        Resource::Discounts,
        Resource::Categories,
        Resource::Banners,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Products => "products",
            Resource::Sales => "sales",
            Resource::Users => "users",
            Resource::Customers => "customers",
            Resource::Providers => "providers",
            Resource::Expenses => "expenses",
            Resource::Purchases => "purchases",
            Resource::Incomes => "incomes",
            Resource::Discounts => "discounts",
            Resource::Categories => "categories",
            Resource::Banners => "banners",
        }
    }

    /// API path of the collection, relative to the base URL.
    pub fn path(&self) -> String {
        format!("/{}", self.name())
    }

    /// Path of a single item.
    pub fn item_path(&self, id: &str) -> String {
        format!("/{}/{}", self.name(), id)
    }

    /// Storage key of the fallback copy of this list.
    pub fn cache_key(&self) -> String {
        format!("{}_cache", self.name())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.name() == lower)
            .ok_or_else(|| format!("Unknown resource: {}", s))
    }
}

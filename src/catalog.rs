//! Demo catalog of reusable main modules offered by `GET /api/main-modules`.

use once_cell::sync::Lazy;

use crate::builder::{Feature, MainModule, SubModule};

static CATALOG: Lazy<Vec<MainModule>> = Lazy::new(|| {
    vec![
        module(
            "Account",
            &[
                ("Authentication", &[("Login", 2.0), ("Logout", 0.5), ("Forgot password", 1.0)]),
                ("Profile", &[("View profile", 0.5), ("Edit profile", 1.0)]),
            ],
        ),
        module(
            "Dashboard",
            &[("Overview", &[("Summary widgets", 2.0), ("Activity feed", 1.5)])],
        ),
        module(
            "Product Catalog",
            &[
                ("Products", &[("Product list", 1.5), ("Product detail", 1.0), ("Search", 2.0)]),
                ("Categories", &[("Category tree", 1.5)]),
            ],
        ),
        module(
            "Orders",
            &[
                ("Checkout", &[("Cart", 2.0), ("Payment gateway", 3.0)]),
                ("History", &[("Order list", 1.0), ("Order detail", 1.0)]),
            ],
        ),
        module(
            "Reports",
            &[("Sales", &[("Daily sales report", 2.0), ("Export to Excel", 1.5)])],
        ),
        module(
            "Notifications",
            &[("Push", &[("Push notification", 2.0)]), ("Email", &[("Email templates", 1.5)])],
        ),
    ]
});

type SubModuleSpec<'a> = (&'a str, &'a [(&'a str, f64)]);

fn module(name: &str, sub_modules: &[SubModuleSpec<'_>]) -> MainModule {
    MainModule {
        name: name.to_string(),
        sub_modules: sub_modules
            .iter()
            .map(|(sub_name, features)| SubModule {
                name: sub_name.to_string(),
                features: features
                    .iter()
                    .map(|(feature, mandays)| Feature {
                        name: feature.to_string(),
                        mandays: *mandays,
                        conditions: Vec::new(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn all_modules() -> &'static [MainModule] {
    &CATALOG
}

/// Modules whose name contains `query`, ignoring case. A blank query returns
/// the whole catalog.
pub fn search_modules(query: Option<&str>) -> Vec<MainModule> {
    let needle = query.map(str::trim).unwrap_or_default().to_lowercase();
    CATALOG
        .iter()
        .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

use serde::{Deserialize, Serialize};

/// The fixed spending-category partition used across the dashboard.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    All,
    Food,
    Travel,
    Entertainment,
}

serde_plain::derive_display_from_serialize!(CategoryId);
serde_plain::derive_fromstr_from_deserialize!(CategoryId);

impl CategoryId {
    /// Every category, in display order.
    pub const ALL: [CategoryId; 4] = [
        CategoryId::All,
        CategoryId::Food,
        CategoryId::Travel,
        CategoryId::Entertainment,
    ];

    /// The categories that carry their own spending goal and actual-spending readouts.
    pub const BUDGETED: [CategoryId; 3] = [
        CategoryId::Food,
        CategoryId::Travel,
        CategoryId::Entertainment,
    ];

    /// The path of the cumulative spending series for this category, e.g. `graph_data_food`.
    pub fn series_path(self) -> String {
        match self {
            CategoryId::All => "graph_data".to_string(),
            other => format!("graph_data_{other}"),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            CategoryId::All => "Total Spending",
            CategoryId::Food => "Food Spending",
            CategoryId::Travel => "Travel Spending",
            CategoryId::Entertainment => "Entertainment Spending",
        }
    }
}

#[test]
fn category_series_paths() {
    let paths: Vec<String> = CategoryId::ALL.iter().map(|c| c.series_path()).collect();
    assert_eq!(
        paths,
        vec![
            "graph_data",
            "graph_data_food",
            "graph_data_travel",
            "graph_data_entertainment"
        ]
    );
}

#[test]
fn category_display_and_parse() {
    use std::str::FromStr;
    assert_eq!(CategoryId::Entertainment.to_string(), "entertainment");
    assert_eq!(CategoryId::from_str("food").unwrap(), CategoryId::Food);
    assert!(CategoryId::from_str("groceries").is_err());
}

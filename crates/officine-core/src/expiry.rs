//! # Expiry Risk Classification
//!
//! Buckets stock lots into severity tiers and assembles the expiry report.
//!
//! ## Severity Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  days_to_expiry = expiry_date - today   (whole calendar days)           │
//! │                                                                         │
//! │       < 0        0 ..= 14       15 ..= 30      31 ..= window            │
//! │   ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐             │
//! │   │ EXPIRED │  │ CRITICAL │  │  WARNING  │  │   WATCH    │   > window: │
//! │   └─────────┘  └──────────┘  └───────────┘  └────────────┘   excluded  │
//! │                                                                         │
//! │   window ∈ {30, 60, 90}, default 60. Tiers are not configurable.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Counts vs Items
//! `counts` reflect every in-window lot with stock. Product, category,
//! supplier and severity filters only narrow `items`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// Highest days-to-expiry still classified CRITICAL.
pub const CRITICAL_MAX_DAYS: i64 = 14;

/// Highest days-to-expiry still classified WARNING.
pub const WARNING_MAX_DAYS: i64 = 30;

// =============================================================================
// Window & Severity
// =============================================================================

/// Look-ahead window of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryWindow {
    Days30,
    #[default]
    Days60,
    Days90,
}

impl ExpiryWindow {
    pub const fn days(self) -> i64 {
        match self {
            ExpiryWindow::Days30 => 30,
            ExpiryWindow::Days60 => 60,
            ExpiryWindow::Days90 => 90,
        }
    }

    /// Parses an optional caller-supplied window, defaulting to 60 days.
    pub fn from_request(days: Option<i64>) -> ValidationResult<Self> {
        match days {
            None => Ok(ExpiryWindow::default()),
            Some(days) => ExpiryWindow::try_from(days),
        }
    }
}

impl TryFrom<i64> for ExpiryWindow {
    type Error = ValidationError;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        match days {
            30 => Ok(ExpiryWindow::Days30),
            60 => Ok(ExpiryWindow::Days60),
            90 => Ok(ExpiryWindow::Days90),
            _ => Err(ValidationError::NotAllowed {
                field: "window_days".to_string(),
                allowed: vec!["30".to_string(), "60".to_string(), "90".to_string()],
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ExpirySeverity {
    Expired,
    Critical,
    Warning,
    Watch,
}

impl ExpirySeverity {
    /// What the UI should suggest for a lot in this tier.
    pub fn recommended_action(self) -> &'static str {
        match self {
            ExpirySeverity::Expired => "Withdraw from sale and record the disposal",
            ExpirySeverity::Critical => "Sell first: prioritize this lot at the counter (FEFO)",
            ExpirySeverity::Warning => "Review the lot in inventory and plan its sale",
            ExpirySeverity::Watch => "Keep an eye on the lot in inventory",
        }
    }

    /// Screen the recommendation points to.
    ///
    /// EXPIRED / CRITICAL go to the sales screen, WARNING / WATCH to the
    /// lot's inventory detail.
    pub fn recommended_path(self, product_id: &str, lot_id: &str) -> String {
        match self {
            ExpirySeverity::Expired | ExpirySeverity::Critical => {
                format!("/sales?productId={}", product_id)
            }
            ExpirySeverity::Warning | ExpirySeverity::Watch => {
                format!("/inventory/{}/lots/{}", product_id, lot_id)
            }
        }
    }
}

/// Whole calendar days from `today` until `expiry` (negative once expired).
///
/// Day granularity: a lot whose expiry date is today has 0 days left and
/// stays CRITICAL for the whole day. It becomes EXPIRED the next day.
pub fn days_to_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

/// Severity of a lot, or `None` when it expires beyond the window.
pub fn classify(days_to_expiry: i64, window: ExpiryWindow) -> Option<ExpirySeverity> {
    match days_to_expiry {
        d if d < 0 => Some(ExpirySeverity::Expired),
        d if d <= CRITICAL_MAX_DAYS => Some(ExpirySeverity::Critical),
        d if d <= WARNING_MAX_DAYS => Some(ExpirySeverity::Warning),
        d if d <= window.days() => Some(ExpirySeverity::Watch),
        _ => None,
    }
}

// =============================================================================
// Report Types
// =============================================================================

/// Optional narrowing of the report. Empty lists mean "no filter".
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ExpiryFilters {
    pub product_ids: Vec<String>,
    pub categories: Vec<String>,
    pub supplier_ids: Vec<String>,
    pub severities: Vec<ExpirySeverity>,
}

/// One lot joined with its product and originating order, as loaded from
/// the store. `None` product name means the product could not be resolved.
#[derive(Debug, Clone)]
pub struct ExpiryCandidate {
    pub lot_id: String,
    pub lot_number: String,
    pub product_id: String,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    pub source_order_id: Option<String>,
    /// Whether `source_order_id` resolved to an order of this pharmacy.
    pub order_resolved: bool,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExpiryRiskItem {
    pub lot_id: String,
    pub lot_number: String,
    pub product_id: String,
    pub product_name: String,
    pub category: Option<String>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub quantity: i64,
    pub severity: ExpirySeverity,
    pub recommended_action: String,
    pub recommended_path_href: String,
}

/// Headline numbers. Bands are disjoint: expired, 0-30, 31-60, 61-90 days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExpiryCounts {
    pub total: i64,
    pub expired: i64,
    pub due_in_30_days: i64,
    pub due_in_60_days: i64,
    pub due_in_90_days: i64,
}

impl ExpiryCounts {
    fn record(&mut self, days_to_expiry: i64) {
        self.total += 1;
        match days_to_expiry {
            d if d < 0 => self.expired += 1,
            d if d <= 30 => self.due_in_30_days += 1,
            d if d <= 60 => self.due_in_60_days += 1,
            _ => self.due_in_90_days += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FilterOption {
    pub id: String,
    pub label: String,
}

/// Values present among in-window lots, to populate the UI filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FilterOptions {
    pub products: Vec<FilterOption>,
    pub categories: Vec<String>,
    pub suppliers: Vec<FilterOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExpiryRiskReport {
    pub window_days: i64,
    pub items: Vec<ExpiryRiskItem>,
    pub counts: ExpiryCounts,
    pub filter_options: FilterOptions,
}

impl ExpiryRiskReport {
    /// The report returned to callers without access to the pharmacy.
    pub fn empty(window: ExpiryWindow) -> Self {
        ExpiryRiskReport {
            window_days: window.days(),
            items: Vec::new(),
            counts: ExpiryCounts::default(),
            filter_options: FilterOptions::default(),
        }
    }
}

// =============================================================================
// Report Assembly
// =============================================================================

fn passes_filters(candidate: &ExpiryCandidate, filters: &ExpiryFilters) -> bool {
    if !filters.product_ids.is_empty() && !filters.product_ids.contains(&candidate.product_id) {
        return false;
    }

    if !filters.categories.is_empty() {
        match &candidate.category {
            Some(category) if filters.categories.contains(category) => {}
            _ => return false,
        }
    }

    if !filters.supplier_ids.is_empty() {
        if candidate.source_order_id.is_some() && !candidate.order_resolved {
            return false;
        }
        match &candidate.supplier_id {
            Some(supplier_id) if filters.supplier_ids.contains(supplier_id) => {}
            _ => return false,
        }
    }

    true
}

/// Builds the expiry report for lots evaluated on `today`.
///
/// Lots with no stock are skipped. Lots whose product cannot be resolved are
/// always dropped. When a supplier filter is active, lots whose originating
/// order cannot be resolved are dropped as well.
pub fn build_report(
    candidates: &[ExpiryCandidate],
    today: NaiveDate,
    window: ExpiryWindow,
    filters: &ExpiryFilters,
) -> ExpiryRiskReport {
    let mut report = ExpiryRiskReport::empty(window);
    let mut products = BTreeMap::new();
    let mut categories = BTreeSet::new();
    let mut suppliers = BTreeMap::new();

    for candidate in candidates {
        if candidate.quantity <= 0 {
            continue;
        }
        let Some(product_name) = candidate.product_name.as_ref() else {
            continue;
        };

        let days = days_to_expiry(candidate.expiry_date, today);
        let Some(severity) = classify(days, window) else {
            continue;
        };
        report.counts.record(days);

        products.insert(candidate.product_id.clone(), product_name.clone());
        if let Some(category) = &candidate.category {
            categories.insert(category.clone());
        }
        if let (Some(id), Some(name)) = (&candidate.supplier_id, &candidate.supplier_name) {
            suppliers.insert(id.clone(), name.clone());
        }

        if !passes_filters(candidate, filters) {
            continue;
        }

        if !filters.severities.is_empty() && !filters.severities.contains(&severity) {
            continue;
        }

        report.items.push(ExpiryRiskItem {
            lot_id: candidate.lot_id.clone(),
            lot_number: candidate.lot_number.clone(),
            product_id: candidate.product_id.clone(),
            product_name: product_name.clone(),
            category: candidate.category.clone(),
            supplier_id: candidate.supplier_id.clone(),
            supplier_name: candidate.supplier_name.clone(),
            expiry_date: candidate.expiry_date,
            days_to_expiry: days,
            quantity: candidate.quantity,
            severity,
            recommended_action: severity.recommended_action().to_string(),
            recommended_path_href: severity
                .recommended_path(&candidate.product_id, &candidate.lot_id),
        });
    }

    report.items.sort_by(|a, b| {
        a.days_to_expiry
            .cmp(&b.days_to_expiry)
            .then_with(|| a.product_name.cmp(&b.product_name))
            .then_with(|| a.lot_number.cmp(&b.lot_number))
    });

    let mut product_options: Vec<FilterOption> = products
        .into_iter()
        .map(|(id, label)| FilterOption { id, label })
        .collect();
    product_options.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));

    let mut supplier_options: Vec<FilterOption> = suppliers
        .into_iter()
        .map(|(id, label)| FilterOption { id, label })
        .collect();
    supplier_options.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));

    report.filter_options = FilterOptions {
        products: product_options,
        categories: categories.into_iter().collect(),
        suppliers: supplier_options,
    };

    report
}

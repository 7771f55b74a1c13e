/// Default vocabularies and tables used by the extraction stages.
/// Config can override the label and currency lists; the tables here are the fallbacks.

/// Currencies accepted on a record unless the config supplies its own allow-list
pub const DEFAULT_CURRENCIES: &[&str] = &["USD", "CHF", "EUR", "GBP", "JPY"];

pub const DEFAULT_CURRENCY: &str = "USD";

/// Currency symbols and the code each one stands for
pub const CURRENCY_SYMBOLS: &[(&str, &str)] = &[("$", "USD"), ("€", "EUR"), ("£", "GBP"), ("¥", "JPY")];

/// Labels that mark a nearby number as the holding's monetary value
pub const DEFAULT_VALUE_LABELS: &[&str] = &[
    "market value",
    "countervalue",
    "counter value",
    "valuation",
    "amount",
    "total",
    "value",
];

/// Labels whose numbers are never the holding's value (day counts, reference numbers, rates)
pub const DEFAULT_EXCLUSION_LABELS: &[&str] = &[
    "days", "day", "valor", "valoren", "ref", "reference", "nr", "no", "page", "coupon", "yield",
    "rate", "wkn", "cusip", "sedol", "maturity",
];

/// Tokens that label the identifier itself and never belong to a security name
pub const IDENTIFIER_LABELS: &[&str] = &["isin", "valor", "valoren", "wkn", "code"];

/// Labels preceding a portfolio-level total
pub const PORTFOLIO_TOTAL_LABELS: &[&str] = &[
    "total portfolio",
    "portfolio total",
    "total assets",
    "grand total",
];

/// Labels of intermediate sums; their lines never carry a single holding's value
pub const SUBTOTAL_LABELS: &[&str] = &["subtotal", "sub-total", "sub total"];

pub const CATEGORY_OTHER: &str = "Other";

/// Category keyword table, checked in order against the lowercased name.
/// Multi-word phrases come first so "money market fund" lands in Money Market.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Money Market", &["money market", "call account", "deposit", "fiduciary"]),
    (
        "Structured Products",
        &["structured", "certificate", "autocall", "barrier", "tracker", "reverse convertible"],
    ),
    ("Funds", &["fund", "etf", "sicav", "ucits", "fcp"]),
    ("Bonds", &["bond", "notes", "note", "debenture", "treasury", "frn", "emtn"]),
    ("Equities", &["shares", "share", "equity", "stock", "ordinary", "registered", " ag", " inc", " plc"]),
];

/// Divisor applied by the order-of-magnitude heuristic
pub const DEFAULT_SCALE_DIVISOR: i64 = 1000;

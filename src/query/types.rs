use crate::index::types::Item;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Query field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Tag,
    Type,
    Name,
    Content,
    Modified,
    Status,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Tag,
        Field::Type,
        Field::Name,
        Field::Content,
        Field::Modified,
        Field::Status,
    ];

    /// Case-insensitive lookup of a field name
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Tag => "tag",
            Field::Type => "type",
            Field::Name => "name",
            Field::Content => "content",
            Field::Modified => "modified",
            Field::Status => "status",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type aliases accepted by `type:`, mapped to index kind labels
const TYPE_ALIASES: &[(&str, &str)] = &[
    ("pipeline", "pipeline"),
    ("pipelines", "pipeline"),
    ("component", "component"),
    ("components", "component"),
    ("prompt", "prompts"),
    ("prompts", "prompts"),
    ("context", "contexts"),
    ("contexts", "contexts"),
    ("rule", "rules"),
    ("rules", "rules"),
];

/// Kind labels named by a `type:` value.
///
/// Singular and plural spellings are equivalent. With `prefix`, every alias
/// starting with the value counts, so `type:p` covers prompts and pipelines.
pub fn type_labels(value: &str, prefix: bool) -> Vec<&'static str> {
    let value = value.trim().to_lowercase();
    let mut labels: Vec<&'static str> = Vec::new();
    if value.is_empty() {
        return labels;
    }
    for &(alias, label) in TYPE_ALIASES {
        let hit = if prefix {
            alias.starts_with(&value)
        } else {
            alias == value
        };
        if hit && !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Logical joiner between adjacent filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Joiner {
    And,
    Or,
}

/// Direction of a `modified:` comparison.
///
/// The operators read inverted: `>7d` selects items modified within the last
/// 7 days (age below the threshold), `<30d` selects items older than 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeComparison {
    /// `>`: age < threshold
    Within,
    /// `<`: age > threshold
    Before,
}

/// Unit of a `modified:` threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl AgeUnit {
    pub fn from_suffix(c: char) -> Option<AgeUnit> {
        match c.to_ascii_lowercase() {
            'd' => Some(AgeUnit::Days),
            'w' => Some(AgeUnit::Weeks),
            'm' => Some(AgeUnit::Months),
            'y' => Some(AgeUnit::Years),
            _ => None,
        }
    }

    /// Calendar-free length: a month is 30 days, a year 365
    pub fn days(self) -> i64 {
        match self {
            AgeUnit::Days => 1,
            AgeUnit::Weeks => 7,
            AgeUnit::Months => 30,
            AgeUnit::Years => 365,
        }
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Parsed `modified:` value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeFilter {
    pub comparison: AgeComparison,
    pub amount: i64,
    pub unit: AgeUnit,
}

impl AgeFilter {
    /// Threshold in seconds, saturating at `i64::MAX`
    pub fn threshold_seconds(&self) -> i64 {
        self.amount
            .saturating_mul(self.unit.days())
            .saturating_mul(SECONDS_PER_DAY)
    }

    /// Whether an item of the given age (seconds, clamped at zero) matches.
    ///
    /// A saturated window is unbounded: `>` then matches every item and `<`
    /// none.
    pub fn matches_age(&self, age_seconds: i64) -> bool {
        let threshold = self.threshold_seconds();
        let age = age_seconds.max(0);
        match self.comparison {
            AgeComparison::Within => age < threshold,
            AgeComparison::Before => age > threshold,
        }
    }
}

/// Filter value; only `modified` has a structured one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Age(AgeFilter),
}

/// One `field:value` condition, possibly negated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub field: Field,
    pub value: FilterValue,
    pub negated: bool,
    /// Came from a bare word or phrase rather than `content:`
    pub free_text: bool,
}

impl Filter {
    pub fn new(field: Field, value: FilterValue) -> Self {
        Self {
            field,
            value,
            negated: false,
            free_text: false,
        }
    }

    pub fn text(field: Field, value: impl Into<String>) -> Self {
        Self::new(field, FilterValue::Text(value.into()))
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// String value, `None` for `modified`
    pub fn text_value(&self) -> Option<&str> {
        match &self.value {
            FilterValue::Text(s) => Some(s),
            FilterValue::Age(_) => None,
        }
    }

    /// `status:archived`, negated or not
    pub fn mentions_archived(&self) -> bool {
        self.field == Field::Status
            && self
                .text_value()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("archived"))
    }
}

/// Parsed query.
///
/// `joiners[i]` connects `filters[i]` and `filters[i + 1]`, so there is always
/// one fewer joiner than filters. An empty query selects everything the
/// archive gate allows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub joiners: Vec<Joiner>,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Append a filter joined to the previous one by `joiner`
    pub fn push(&mut self, joiner: Joiner, filter: Filter) {
        if !self.filters.is_empty() {
            self.joiners.push(joiner);
        }
        self.filters.push(filter);
    }

    /// Whether evaluation must see archived items
    pub fn requires_archived(&self) -> bool {
        self.filters.iter().any(Filter::mentions_archived)
    }

    /// Residual free-text terms
    pub fn free_text(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .filter(|f| f.free_text)
            .filter_map(Filter::text_value)
    }

    /// Non-negated filters on `field`, the ones that feed scoring
    pub fn positive(&self, field: Field) -> impl Iterator<Item = &Filter> {
        self.filters
            .iter()
            .filter(move |f| f.field == field && !f.negated)
    }
}

/// Advisory match context attached to a hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub field: Field,
    pub text: String,
}

/// One ranked result
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub item: Arc<Item>,
    pub score: f32,
    pub highlights: Vec<Highlight>,
}

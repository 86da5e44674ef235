//! In-memory search service.
//!
//! Runs the [`SearchService`] contract over a list of [`Restaurant`]
//! records: prefix matching on the searchable fields, conjunctive facet and
//! numeric filters, distance ordering around the geo bias, facet counting,
//! `<em>` highlighting and pagination.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use ahash::AHashMap;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::distance::GeoPoint;
use crate::error::{GeofacetError, Result};
use crate::service::{FacetCounts, Hit, ResultPage, SearchParameters, SearchService};

pub const DEFAULT_HITS_PER_PAGE: usize = 20;

/// A restaurant record as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(rename = "objectID", deserialize_with = "deserialize_object_id")]
    pub object_id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub food_type: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub stars_count: f64,
    #[serde(default)]
    pub reviews_count: u64,
    #[serde(default)]
    pub payment_options: Vec<String>,
    #[serde(rename = "_geoloc")]
    pub geoloc: GeoPoint,
}

fn deserialize_object_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ObjectId {
        Text(String),
        Number(u64),
    }

    Ok(match ObjectId::deserialize(deserializer)? {
        ObjectId::Text(id) => id,
        ObjectId::Number(id) => id.to_string(),
    })
}

/// Map a raw payment option onto the four accepted card networks.
///
/// Diners Club and Carte Blanche count as Discover; OpenTable, JCB and cash
/// are dropped. Anything else is rejected.
pub fn normalize_payment_option(option: &str) -> Result<Option<&'static str>> {
    match option {
        "AMEX" => Ok(Some("AMEX")),
        "Visa" => Ok(Some("Visa")),
        "Discover" | "Diners Club" | "Carte Blanche" => Ok(Some("Discover")),
        "MasterCard" => Ok(Some("MasterCard")),
        "Pay with OpenTable" | "JCB" | "Cash Only" => {
            log::debug!("skipping unknown payment option {option:?}");
            Ok(None)
        }
        other => Err(GeofacetError::invalid_argument(format!(
            "unknown payment option {other:?}"
        ))),
    }
}

impl Restaurant {
    /// Normalize payment options and check the location.
    pub fn normalize(mut self) -> Result<Self> {
        let mut options: Vec<String> = Vec::with_capacity(self.payment_options.len());
        for raw in &self.payment_options {
            if let Some(option) = normalize_payment_option(raw)? {
                if !options.iter().any(|o| o == option) {
                    options.push(option.to_string());
                }
            }
        }
        self.payment_options = options;

        if !self.geoloc.is_valid() {
            return Err(GeofacetError::invalid_argument(format!(
                "restaurant {} has an invalid location {}",
                self.object_id, self.geoloc
            )));
        }
        Ok(self)
    }

    fn facet_values(&self, field: &str) -> Vec<&str> {
        match field {
            "food_type" => vec![self.food_type.as_str()],
            "neighborhood" => vec![self.neighborhood.as_str()],
            "price_range" => vec![self.price_range.as_str()],
            "payment_options" => self.payment_options.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn numeric_value(&self, field: &str) -> Option<f64> {
        match field {
            "stars_count" => Some(self.stars_count),
            "reviews_count" => Some(self.reviews_count as f64),
            _ => None,
        }
    }

    fn searchable_text(&self) -> [&str; 4] {
        [
            self.name.as_str(),
            self.food_type.as_str(),
            self.neighborhood.as_str(),
            self.price_range.as_str(),
        ]
    }
}

/// Search service over records held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySearchService {
    records: Vec<Restaurant>,
    hits_per_page: usize,
}

impl InMemorySearchService {
    pub fn new(records: Vec<Restaurant>) -> Result<Self> {
        let records = records
            .into_iter()
            .map(Restaurant::normalize)
            .collect::<Result<Vec<_>>>()?;
        Ok(InMemorySearchService {
            records,
            hits_per_page: DEFAULT_HITS_PER_PAGE,
        })
    }

    /// Load records from a JSON array.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<Restaurant> = serde_json::from_str(json)?;
        Self::new(records)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Page size used when the request does not set one.
    pub fn with_hits_per_page(mut self, hits_per_page: usize) -> Self {
        self.hits_per_page = hits_per_page.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Run a search synchronously.
    pub fn execute(&self, params: &SearchParameters) -> Result<ResultPage> {
        let started = Instant::now();
        let terms = query_terms(&params.query);

        let mut matches: Vec<&Restaurant> = self
            .records
            .iter()
            .filter(|r| matches_terms(r, &terms))
            .filter(|r| {
                params
                    .facet_filters
                    .iter()
                    .all(|f| r.facet_values(&f.field).contains(&f.value.as_str()))
            })
            .filter(|r| {
                params.numeric_filters.iter().all(|f| {
                    r.numeric_value(&f.field)
                        .is_some_and(|value| f.accepts(value))
                })
            })
            .collect();

        if let Some(center) = params.around {
            matches.sort_by(|a, b| {
                center
                    .distance_to(&a.geoloc)
                    .partial_cmp(&center.distance_to(&b.geoloc))
                    .unwrap_or(Ordering::Equal)
            });
        }

        let facet_counts = count_facets(&matches, &params.facets, params.max_values_per_facet);

        let hits_per_page = params.hits_per_page.unwrap_or(self.hits_per_page).max(1);
        let nb_hits = matches.len();
        let nb_pages = nb_hits.div_ceil(hits_per_page);
        let offset = params.page as usize * hits_per_page;
        let highlighter = Highlighter::new(&terms)?;

        let hits = matches
            .iter()
            .skip(offset)
            .take(hits_per_page)
            .enumerate()
            .map(|(i, r)| to_hit(r, offset + i + 1, &highlighter))
            .collect();

        Ok(ResultPage {
            hits,
            nb_hits: nb_hits as u64,
            page: params.page,
            nb_pages: nb_pages as u32,
            server_time_ms: started.elapsed().as_millis() as u64,
            query: params.query.clone(),
            facet_counts,
        })
    }
}

#[async_trait]
impl SearchService for InMemorySearchService {
    async fn search(&self, params: &SearchParameters) -> Result<ResultPage> {
        self.execute(params)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn query_terms(query: &str) -> Vec<String> {
    query.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Every term must prefix-match a word of some searchable field.
fn matches_terms(record: &Restaurant, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let words: Vec<String> = record
        .searchable_text()
        .iter()
        .flat_map(|text| text.unicode_words())
        .map(|w| w.to_lowercase())
        .collect();
    terms
        .iter()
        .all(|term| words.iter().any(|word| word.starts_with(term.as_str())))
}

fn count_facets(matches: &[&Restaurant], fields: &[String], max_values: usize) -> FacetCounts {
    let mut facet_counts = FacetCounts::new();
    for field in fields {
        let mut counts: AHashMap<&str, u64> = AHashMap::new();
        for record in matches {
            for value in record.facet_values(field) {
                if !value.is_empty() {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }
        }
        if counts.is_empty() {
            continue;
        }

        let mut sorted: Vec<(&str, u64)> = counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        sorted.truncate(max_values);

        let values: BTreeMap<String, u64> = sorted
            .into_iter()
            .map(|(value, count)| (value.to_string(), count))
            .collect();
        facet_counts.insert(field.clone(), values);
    }
    facet_counts
}

/// Wraps word prefixes matching the query in `<em>` tags.
struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    fn new(terms: &[String]) -> Result<Self> {
        if terms.is_empty() {
            return Ok(Highlighter { pattern: None });
        }
        let alternatives: Vec<String> = terms.iter().map(|t| regex::escape(t)).collect();
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})", alternatives.join("|")))
            .map_err(|e| GeofacetError::search_failed(format!("bad highlight pattern: {e}")))?;
        Ok(Highlighter {
            pattern: Some(pattern),
        })
    }

    fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, "<em>$0</em>").into_owned(),
            None => text.to_string(),
        }
    }
}

fn to_hit(record: &Restaurant, rank_position: usize, highlighter: &Highlighter) -> Hit {
    Hit {
        id: record.object_id.clone(),
        image_url: record.image_url.clone(),
        name: record.name.clone(),
        highlighted_name: highlighter.apply(&record.name),
        food_type: record.food_type.clone(),
        highlighted_food_type: highlighter.apply(&record.food_type),
        neighborhood: record.neighborhood.clone(),
        highlighted_neighborhood: highlighter.apply(&record.neighborhood),
        price_range: record.price_range.clone(),
        highlighted_price_range: highlighter.apply(&record.price_range),
        stars_rating: record.stars_count,
        reviews_count: record.reviews_count,
        geoloc: record.geoloc,
        rank_position,
    }
}

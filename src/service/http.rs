//! Algolia-compatible REST search client.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ServiceConfig;
use crate::distance::GeoPoint;
use crate::error::{GeofacetError, Result};
use crate::service::{FacetCounts, Hit, ResultPage, SearchParameters, SearchService};

const APPLICATION_ID_HEADER: &str = "X-Algolia-Application-Id";
const API_KEY_HEADER: &str = "X-Algolia-API-Key";

/// Wire response of the `/1/indexes/{index}/query` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    hits: Vec<RawHit>,
    nb_hits: u64,
    page: u32,
    nb_pages: u32,
    hits_per_page: usize,
    #[serde(rename = "serverTimeMS", default)]
    server_time_ms: Option<u64>,
    #[serde(rename = "processingTimeMS", default)]
    processing_time_ms: u64,
    #[serde(default)]
    query: String,
    #[serde(default)]
    facets: FacetCounts,
}

#[derive(Debug, Deserialize)]
struct HighlightValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    food_type: String,
    #[serde(default)]
    neighborhood: String,
    #[serde(default)]
    price_range: String,
    stars_count: f64,
    #[serde(default)]
    reviews_count: u64,
    #[serde(rename = "_geoloc")]
    geoloc: GeoPoint,
    #[serde(rename = "_highlightResult", default)]
    highlight_result: HashMap<String, HighlightValue>,
}

impl RawHit {
    fn highlighted(&self, field: &str, fallback: &str) -> String {
        self.highlight_result
            .get(field)
            .map(|h| h.value.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn into_hit(self, rank_position: usize) -> Hit {
        Hit {
            highlighted_name: self.highlighted("name", &self.name),
            highlighted_food_type: self.highlighted("food_type", &self.food_type),
            highlighted_neighborhood: self.highlighted("neighborhood", &self.neighborhood),
            highlighted_price_range: self.highlighted("price_range", &self.price_range),
            id: self.object_id,
            image_url: self.image_url,
            name: self.name,
            food_type: self.food_type,
            neighborhood: self.neighborhood,
            price_range: self.price_range,
            stars_rating: self.stars_count,
            reviews_count: self.reviews_count,
            geoloc: self.geoloc,
            rank_position,
        }
    }
}

impl QueryResponse {
    fn into_result_page(self) -> ResultPage {
        let offset = self.page as usize * self.hits_per_page;
        let hits = self
            .hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| hit.into_hit(offset + i + 1))
            .collect();

        ResultPage {
            hits,
            nb_hits: self.nb_hits,
            page: self.page,
            nb_pages: self.nb_pages,
            server_time_ms: self.server_time_ms.unwrap_or(self.processing_time_ms),
            query: self.query,
            facet_counts: self.facets,
        }
    }
}

/// Build the JSON body of a query request.
pub fn request_body(params: &SearchParameters) -> Value {
    let mut body = json!({
        "query": params.query,
        "facets": params.facets,
        "page": params.page,
        "maxValuesPerFacet": params.max_values_per_facet,
    });

    if !params.facet_filters.is_empty() {
        let filters: Vec<String> = params.facet_filters.iter().map(|f| f.to_string()).collect();
        body["facetFilters"] = json!(filters);
    }
    if !params.numeric_filters.is_empty() {
        let filters: Vec<String> = params
            .numeric_filters
            .iter()
            .map(|f| f.to_string())
            .collect();
        body["numericFilters"] = json!(filters);
    }
    if let Some(around) = params.around {
        body["aroundLatLng"] = json!(around.to_string());
    }
    if let Some(hits_per_page) = params.hits_per_page {
        body["hitsPerPage"] = json!(hits_per_page);
    }

    body
}

/// Search client for an Algolia-compatible index.
pub struct HttpSearchService {
    client: Client,
    url: String,
    app_id: String,
    api_key: String,
}

impl std::fmt::Debug for HttpSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSearchService")
            .field("url", &self.url)
            .field("app_id", &self.app_id)
            .finish()
    }
}

impl HttpSearchService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        if config.app_id.is_empty() && config.host.is_none() {
            return Err(GeofacetError::invalid_config(
                "search service needs an app id or an explicit host",
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(HttpSearchService {
            client,
            url: format!(
                "{}/1/indexes/{}/query",
                config.base_url(),
                config.index_name
            ),
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SearchService for HttpSearchService {
    async fn search(&self, params: &SearchParameters) -> Result<ResultPage> {
        let response = self
            .client
            .post(&self.url)
            .header(APPLICATION_ID_HEADER, &self.app_id)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body(params))
            .send()
            .await
            .map_err(|e| GeofacetError::search_failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GeofacetError::search_failed(format!(
                "search service answered {status}: {text}"
            )));
        }

        let decoded: QueryResponse = response
            .json()
            .await
            .map_err(|e| GeofacetError::search_failed(format!("malformed response: {e}")))?;
        let page = decoded.into_result_page();
        page.validate()?;
        Ok(page)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{FacetFilter, NumericFilter};

    fn response_json() -> Value {
        json!({
            "hits": [
                {
                    "objectID": "116236",
                    "name": "Sushi Yasuda",
                    "image_url": "https://img.example/116236.jpg",
                    "food_type": "Sushi",
                    "neighborhood": "Midtown East",
                    "price_range": "$50 and over",
                    "stars_count": 4.6,
                    "reviews_count": 1580,
                    "payment_options": ["AMEX", "Visa"],
                    "_geoloc": { "lat": 40.7516, "lng": -73.9722 },
                    "_highlightResult": {
                        "name": { "value": "<em>Sushi</em> Yasuda", "matchLevel": "full" },
                        "food_type": { "value": "<em>Sushi</em>", "matchLevel": "full" }
                    }
                },
                {
                    "objectID": "116237",
                    "name": "Sushi Nakazawa",
                    "stars_count": 4.8,
                    "_geoloc": { "lat": 40.7317, "lng": -74.0045 }
                }
            ],
            "nbHits": 42,
            "page": 1,
            "nbPages": 3,
            "hitsPerPage": 20,
            "processingTimeMS": 2,
            "serverTimeMS": 5,
            "query": "sushi",
            "facets": {
                "food_type": { "Sushi": 42 },
                "payment_options": { "AMEX": 40, "Visa": 38 }
            }
        })
    }

    #[test]
    fn test_decode_response_into_page() {
        let decoded: QueryResponse = serde_json::from_value(response_json()).unwrap();
        let page = decoded.into_result_page();

        assert_eq!(page.nb_hits, 42);
        assert_eq!(page.page, 1);
        assert!(page.has_more());
        assert_eq!(page.server_time_ms, 5);
        assert_eq!(page.query, "sushi");
        assert_eq!(page.facet_counts["payment_options"]["AMEX"], 40);

        let first = &page.hits[0];
        assert_eq!(first.id, "116236");
        assert_eq!(first.rank_position, 21);
        assert_eq!(first.highlighted_name, "<em>Sushi</em> Yasuda");
        assert_eq!(first.highlighted_neighborhood, "Midtown East");

        let second = &page.hits[1];
        assert_eq!(second.rank_position, 22);
        assert_eq!(second.highlighted_name, "Sushi Nakazawa");
        assert!(page.validate().is_ok());
    }

    #[test]
    fn test_decode_rejects_missing_geoloc() {
        let mut value = response_json();
        value["hits"][1]
            .as_object_mut()
            .unwrap()
            .remove("_geoloc");
        assert!(serde_json::from_value::<QueryResponse>(value).is_err());
    }

    #[test]
    fn test_request_body() {
        let params = SearchParameters {
            query: "thai".into(),
            facets: vec!["food_type".into(), "stars_count".into()],
            facet_filters: vec![FacetFilter::new("food_type", "Thai")],
            numeric_filters: vec![NumericFilter::at_least("stars_count", 4.0)],
            around: Some(GeoPoint {
                lat: 40.5,
                lng: -73.5,
            }),
            page: 2,
            max_values_per_facet: 7,
            hits_per_page: None,
        };

        let body = request_body(&params);
        assert_eq!(body["query"], "thai");
        assert_eq!(body["facetFilters"], json!(["food_type:Thai"]));
        assert_eq!(body["numericFilters"], json!(["stars_count>=4"]));
        assert_eq!(body["aroundLatLng"], "40.5,-73.5");
        assert_eq!(body["page"], 2);
        assert_eq!(body["maxValuesPerFacet"], 7);
        assert!(body.get("hitsPerPage").is_none());
    }

    #[test]
    fn test_new_requires_app_id_or_host() {
        assert!(HttpSearchService::new(&ServiceConfig::default()).is_err());

        let config = ServiceConfig {
            app_id: "A4F5Q6U2GA".into(),
            ..Default::default()
        };
        let service = HttpSearchService::new(&config).unwrap();
        assert_eq!(
            service.url(),
            "https://a4f5q6u2ga-dsn.algolia.net/1/indexes/restaurants/query"
        );
    }
}

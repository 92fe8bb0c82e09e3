//! Yandex geocoder client.
//!
//! Implements [`GeocodeUpstream`] over the Yandex HTTP geocoding API. The engine's [`CachedGeocoder`] sits in front
//! of this client, so the upstream is only consulted on cache misses.
//!
//! [`CachedGeocoder`]: dispatch_engine::geocoder::CachedGeocoder

use std::time::Duration;

use dispatch_engine::geocoder::{GeocodeError, GeocodeUpstream, ResolvedLocation};
use htg_common::Secret;
use log::*;
use reqwest::Client;
use serde::Deserialize;

use crate::config::GeocoderConfig;

const GEOCODER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct YandexGeocoder {
    client: Client,
    base_url: String,
    api_key: Secret<String>,
}

impl YandexGeocoder {
    pub fn new(config: GeocoderConfig) -> Self {
        let client = Client::builder().timeout(GEOCODER_TIMEOUT).build().unwrap_or_default();
        Self { client, base_url: config.base_url, api_key: config.api_key }
    }
}

impl GeocodeUpstream for YandexGeocoder {
    async fn geocode(&self, address: &str) -> Result<ResolvedLocation, GeocodeError> {
        let upstream_err = |message: String| GeocodeError::Upstream { address: address.to_string(), message };
        debug!("🌍️ Asking the geocoder about '{address}'");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("apikey", self.api_key.reveal().as_str()),
                ("format", "json"),
                ("results", "1"),
                ("geocode", address),
            ])
            .send()
            .await
            .map_err(|e| upstream_err(format!("Request failed. {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(upstream_err(format!("Geocoder returned {status}")));
        }
        let envelope: GeocodeEnvelope =
            response.json().await.map_err(|e| upstream_err(format!("Invalid geocoder response. {e}")))?;
        let object = envelope
            .response
            .collection
            .members
            .into_iter()
            .next()
            .map(|m| m.geo_object)
            .ok_or_else(|| GeocodeError::NoMatch(address.to_string()))?;
        // Yandex returns the point as "lon lat".
        let mut pos = object.point.pos.split_whitespace();
        let lon = pos
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| upstream_err(format!("Unparseable point '{}'", object.point.pos)))?;
        let lat = pos
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| upstream_err(format!("Unparseable point '{}'", object.point.pos)))?;
        let label = object
            .meta_data_property
            .and_then(|m| m.geocoder_meta_data.map(|g| g.text))
            .unwrap_or_else(|| address.to_string());
        trace!("🌍️ '{address}' resolved to ({lat}, {lon}) '{label}'");
        Ok(ResolvedLocation { lat, lon, label })
    }
}

//--------------------------------------   Wire format    -------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeocodeEnvelope {
    response: GeocodeResponse,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(rename = "GeoObjectCollection")]
    collection: GeoObjectCollection,
}

#[derive(Debug, Deserialize)]
struct GeoObjectCollection {
    #[serde(rename = "featureMember", default)]
    members: Vec<FeatureMember>,
}

#[derive(Debug, Deserialize)]
struct FeatureMember {
    #[serde(rename = "GeoObject")]
    geo_object: GeoObject,
}

#[derive(Debug, Deserialize)]
struct GeoObject {
    #[serde(rename = "Point")]
    point: Point,
    #[serde(rename = "metaDataProperty")]
    meta_data_property: Option<MetaDataProperty>,
}

#[derive(Debug, Deserialize)]
struct Point {
    pos: String,
}

#[derive(Debug, Deserialize)]
struct MetaDataProperty {
    #[serde(rename = "GeocoderMetaData")]
    geocoder_meta_data: Option<GeocoderMetaData>,
}

#[derive(Debug, Deserialize)]
struct GeocoderMetaData {
    text: String,
}

#[cfg(test)]
mod test {
    use super::GeocodeEnvelope;

    #[test]
    fn parses_a_geocoder_response() {
        let body = r#"{
          "response": {
            "GeoObjectCollection": {
              "featureMember": [
                {
                  "GeoObject": {
                    "metaDataProperty": {
                      "GeocoderMetaData": { "text": "Петрозаводск, набережная Гюллинга, 2" }
                    },
                    "Point": { "pos": "34.372797 61.783871" }
                  }
                }
              ]
            }
          }
        }"#;
        let envelope: GeocodeEnvelope = serde_json::from_str(body).unwrap();
        let object = &envelope.response.collection.members[0].geo_object;
        assert_eq!(object.point.pos, "34.372797 61.783871");
        let text =
            object.meta_data_property.as_ref().unwrap().geocoder_meta_data.as_ref().map(|g| g.text.clone()).unwrap();
        assert_eq!(text, "Петрозаводск, набережная Гюллинга, 2");
    }

    #[test]
    fn empty_feature_list_deserializes() {
        let body = r#"{ "response": { "GeoObjectCollection": { "featureMember": [] } } }"#;
        let envelope: GeocodeEnvelope = serde_json::from_str(body).unwrap();
        assert!(envelope.response.collection.members.is_empty());
    }
}

//! `googlemaps` and `openlayers` formats.
//!
//! The server renders a hidden data element; the map itself is drawn
//! client-side from the JSON it holds:
//!
//! ```text
//! <div style="height: 400px; width: 700px" class="mapCanvas" id="mapCanvas1">
//!   <div class="cargoMapData" style="display: none" mappingService="OpenLayers">[...]</div>
//! </div>
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use quarry_common::constants::{FULL_SUFFIX, LAT_ALIAS_SUFFIX, LON_ALIAS_SUFFIX};
use quarry_common::{FormatError, RenderConfig};
use quarry_sql::executor::RowSet;
use quarry_sql::params::DisplayParams;
use quarry_sql::schema::{FieldDescriptions, FieldType};
use serde::Serialize;

use super::{cell, require_rows};
use crate::html;
use crate::registry::ImmediateFormat;

/// Map provider drawing the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapService {
    /// Google Maps.
    Google,
    /// OpenLayers.
    OpenLayers,
}

impl MapService {
    /// Format name selecting this service.
    pub fn format_name(self) -> &'static str {
        match self {
            MapService::Google => "googlemaps",
            MapService::OpenLayers => "openlayers",
        }
    }

    /// Value of the `mappingService` attribute.
    pub fn service_name(self) -> &'static str {
        match self {
            MapService::Google => "Google",
            MapService::OpenLayers => "OpenLayers",
        }
    }
}

/// One marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct MapPoint {
    /// Unformatted first value of the row.
    name: String,
    /// Formatted first displayed value.
    title: String,
    lat: f64,
    lon: f64,
    other_values: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
}

/// Plots every row that has both a latitude and a longitude.
#[derive(Debug)]
pub struct MapFormat {
    service: MapService,
    config: RenderConfig,
    counter: Arc<AtomicUsize>,
}

impl MapFormat {
    /// Creates a map format; `counter` numbers the canvases.
    pub fn new(service: MapService, config: RenderConfig, counter: Arc<AtomicUsize>) -> Self {
        Self {
            service,
            config,
            counter,
        }
    }

    fn points(
        &self,
        raw: &RowSet,
        formatted: &RowSet,
        fields: &FieldDescriptions,
        coordinates: &[&str],
        params: &DisplayParams,
    ) -> Vec<MapPoint> {
        let mut points = Vec::new();
        for (i, (raw_row, row)) in raw.iter().zip(formatted).enumerate() {
            let mut displayed = row.iter().filter(|(alias, value)| {
                fields.get(*alias).is_some_and(|d| {
                    !matches!(d.field_type, FieldType::Coordinates | FieldType::CoordinatesPart)
                }) && !value.is_empty()
            });
            let title = displayed.next().map(|(_, v)| v.clone()).unwrap_or_default();
            let other_values: IndexMap<String, String> = displayed
                .map(|(alias, value)| (alias.clone(), value.clone()))
                .collect();
            let name = raw_row.values().next().cloned().unwrap_or_default();
            let icon = params
                .for_row("icon", i)
                .filter(|icon| !icon.trim().is_empty())
                .map(|icon| html::page_url(&self.config.file_path, icon));

            for base in coordinates {
                let lat = cell(raw_row, &format!("{base}{LAT_ALIAS_SUFFIX}")).trim().parse::<f64>();
                let lon = cell(raw_row, &format!("{base}{LON_ALIAS_SUFFIX}")).trim().parse::<f64>();
                if let (Ok(lat), Ok(lon)) = (lat, lon) {
                    points.push(MapPoint {
                        name: name.clone(),
                        title: title.clone(),
                        lat,
                        lon,
                        other_values: other_values.clone(),
                        icon: icon.clone(),
                    });
                }
            }
        }
        points
    }
}

impl ImmediateFormat for MapFormat {
    fn name(&self) -> &str {
        self.service.format_name()
    }

    fn scalar_only_parameters(&self) -> &[&str] {
        &["height", "width", "zoom"]
    }

    fn render(
        &self,
        raw: &RowSet,
        formatted: &RowSet,
        fields: &FieldDescriptions,
        params: &DisplayParams,
    ) -> Result<String, FormatError> {
        let coordinates: Vec<&str> = fields
            .iter()
            .filter(|(_, d)| d.field_type == FieldType::Coordinates)
            .map(|(alias, _)| alias.strip_suffix(FULL_SUFFIX).unwrap_or(alias))
            .collect();
        if coordinates.is_empty() {
            return Err(FormatError::MissingField(
                "no fields of type \"Coordinates\" were specified in this query; cannot display in a map"
                    .to_string(),
            ));
        }
        require_rows(formatted)?;

        let points = self.points(raw, formatted, fields, &coordinates, params);
        if points.is_empty() {
            return Err(FormatError::no_results(
                "No results with coordinates found for this query; not displaying a map.",
            ));
        }

        // Angle brackets are escaped so the data cannot close its element.
        let json = serde_json::to_string(&points)
            .map_err(|e| FormatError::no_results(e.to_string()))?
            .replace('<', "\\u003C")
            .replace('>', "\\u003E");

        let height = params.scalar("height").unwrap_or(&self.config.map_height);
        let width = params.scalar("width").unwrap_or(&self.config.map_width);
        let id = format!("mapCanvas{}", self.counter.fetch_add(1, Ordering::Relaxed));

        let mut data_attrs = vec![
            ("class", "cargoMapData"),
            ("style", "display: none"),
            ("mappingService", self.service.service_name()),
        ];
        if let Some(zoom) = params.scalar("zoom") {
            data_attrs.push(("zoom", zoom));
        }
        let data = html::element("div", &data_attrs, &json);

        tracing::debug!(points = points.len(), canvas = %id, "rendering map");
        Ok(html::raw_element(
            "div",
            &[
                ("style", &format!("height: {height}; width: {width}")),
                ("class", "mapCanvas"),
                ("id", &id),
            ],
            &data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_sql::executor::Row;
    use quarry_sql::schema::FieldDescription;

    fn fields() -> FieldDescriptions {
        let mut fields = FieldDescriptions::new();
        fields.insert("_pageName".to_string(), FieldDescription::new(FieldType::Page));
        fields.insert("Rating".to_string(), FieldDescription::new(FieldType::Integer));
        fields.insert("Location lat".to_string(), FieldDescription::new(FieldType::CoordinatesPart));
        fields.insert("Location lon".to_string(), FieldDescription::new(FieldType::CoordinatesPart));
        fields.insert("Location__full".to_string(), FieldDescription::new(FieldType::Coordinates));
        fields
    }

    fn row(name: &str, rating: &str, lat: &str, lon: &str) -> Row {
        let mut row = Row::new();
        row.insert("_pageName".to_string(), name.to_string());
        row.insert("Rating".to_string(), rating.to_string());
        row.insert("Location lat".to_string(), lat.to_string());
        row.insert("Location lon".to_string(), lon.to_string());
        row.insert("Location__full".to_string(), format!("{lat}, {lon}"));
        row
    }

    fn map(service: MapService) -> MapFormat {
        MapFormat::new(service, RenderConfig::default(), Arc::new(AtomicUsize::new(1)))
    }

    #[test]
    fn test_renders_points() {
        let raw = vec![row("Cafe <A>", "4", "48.85", "2.35"), row("Nowhere", "1", "", "")];
        let mut formatted = raw.clone();
        formatted[0].insert("_pageName".to_string(), "[Cafe]".to_string());

        let params = DisplayParams::new().with("zoom", "12");
        let text = map(MapService::OpenLayers)
            .render(&raw, &formatted, &fields(), &params)
            .unwrap();

        let expected_json = r#"[{"name":"Cafe \u003CA\u003E","title":"[Cafe]","lat":48.85,"lon":2.35,"otherValues":{"Rating":"4"}}]"#;
        assert_eq!(
            text,
            format!(
                "<div style=\"height: 400px; width: 700px\" class=\"mapCanvas\" id=\"mapCanvas1\">\
                 <div class=\"cargoMapData\" style=\"display: none\" mappingService=\"OpenLayers\" zoom=\"12\">{expected_json}</div></div>"
            )
        );
    }

    #[test]
    fn test_canvas_ids_increase() {
        let raw = vec![row("Cafe", "4", "48.85", "2.35")];
        let format = map(MapService::Google);
        let first = format.render(&raw, &raw, &fields(), &DisplayParams::new()).unwrap();
        let second = format.render(&raw, &raw, &fields(), &DisplayParams::new()).unwrap();
        assert!(first.contains("id=\"mapCanvas1\""));
        assert!(second.contains("id=\"mapCanvas2\""));
        assert!(first.contains("mappingService=\"Google\""));
    }

    #[test]
    fn test_per_row_icons() {
        let raw = vec![row("Cafe", "4", "48.85", "2.35"), row("Park", "5", "48.86", "2.33")];
        let mut params = DisplayParams::new();
        params.set_rows("icon", 1..2, "Tree.png");
        let text = map(MapService::OpenLayers)
            .render(&raw, &raw, &fields(), &params)
            .unwrap();
        assert!(text.contains(r#""icon":"/wiki/Special:FilePath/Tree.png""#));
        assert_eq!(text.matches("\"icon\"").count(), 1);
    }

    #[test]
    fn test_requires_coordinates_field() {
        let mut fields = fields();
        fields.truncate(2);
        let raw = vec![row("Cafe", "4", "48.85", "2.35")];
        assert!(matches!(
            map(MapService::OpenLayers).render(&raw, &raw, &fields, &DisplayParams::new()),
            Err(FormatError::MissingField(_))
        ));
    }

    #[test]
    fn test_no_located_rows() {
        let format = map(MapService::OpenLayers);
        assert!(matches!(
            format.render(&vec![], &vec![], &fields(), &DisplayParams::new()),
            Err(FormatError::NoResults(_))
        ));

        let raw = vec![row("Nowhere", "1", "", "")];
        assert!(matches!(
            format.render(&raw, &raw, &fields(), &DisplayParams::new()),
            Err(FormatError::NoResults(_))
        ));
    }
}

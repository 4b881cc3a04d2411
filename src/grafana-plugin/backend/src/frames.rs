//! Conversion from transform series to Grafana frames.

use grafana_plugin_sdk::data;
use grafana_plugin_sdk::prelude::*;
use serde_json::json;
use transform::{FieldValues, Series, SeriesSink, TransformError};

/// Name of the single frame of an ungrouped result. Grouped frames are
/// unnamed, their fields carry the series label.
const UNGROUPED_FRAME_NAME: &str = "response";

/// Collects emitted series as Grafana frames.
#[derive(Debug, Default)]
pub struct FrameSink {
    frames: Vec<data::Frame>,
}

impl FrameSink {
    pub fn into_frames(self) -> Vec<data::Frame> {
        self.frames
    }
}

impl SeriesSink for FrameSink {
    fn emit(&mut self, series: Series) -> transform::Result<()> {
        let frame = series_to_frame(series).map_err(|e| TransformError::Sink(e.to_string()))?;
        self.frames.push(frame);
        Ok(())
    }
}

/// Build one frame from `series`. Non-empty series metadata becomes the
/// frame's custom metadata.
pub fn series_to_frame(series: Series) -> Result<data::Frame, serde_json::Error> {
    let name = if series.group.is_some() {
        ""
    } else {
        UNGROUPED_FRAME_NAME
    };
    let fields: Vec<data::Field> = series
        .fields
        .into_iter()
        .map(|field| match field.values {
            FieldValues::Time(values) => values.into_field(field.name.as_str()),
            FieldValues::NullableNumber(values) => values.into_opt_field(field.name.as_str()),
            FieldValues::Text(values) => values.into_field(field.name.as_str()),
        })
        .collect();

    let mut frame = data::Frame::new(name).with_fields(fields);
    if !series.meta.is_empty() {
        frame.meta = Some(serde_json::from_value(json!({ "custom": series.meta }))?);
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::{Map, Value};
    use transform::{FieldKind, SeriesField};

    fn series(meta: Map<String, Value>) -> Series {
        let mut time = SeriesField::new("time", FieldKind::Time);
        time.values = FieldValues::Time(vec![
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        ]);
        let mut metric = SeriesField::new("web-0", FieldKind::NullableNumber);
        metric.values = FieldValues::NullableNumber(vec![None]);
        let mut tag = SeriesField::new("pod", FieldKind::Text);
        tag.values = FieldValues::Text(vec!["web-0".to_string()]);
        Series::new(vec![time, metric, tag], meta)
    }

    #[test]
    fn test_frame_keeps_field_order() {
        let frame = series_to_frame(series(Map::new())).unwrap();
        let names: Vec<&str> = frame.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["time", "web-0", "pod"]);
        assert_eq!(frame.name, "response");
        assert!(frame.meta.is_none());
        assert!(frame.check().is_ok());
    }

    #[test]
    fn test_grouped_frames_are_unnamed() {
        let frame = series_to_frame(series(Map::new()).with_group("web-0")).unwrap();
        assert_eq!(frame.name, "");
        assert!(frame.check().is_ok());
    }

    #[test]
    fn test_meta_becomes_custom_metadata() {
        let meta = json!({"returnTags": [], "from": 1}).as_object().cloned().unwrap();
        let frame = series_to_frame(series(meta.clone())).unwrap();
        let encoded = serde_json::to_value(frame.meta.unwrap()).unwrap();
        assert_eq!(encoded["custom"], Value::Object(meta));
    }

    #[test]
    fn test_sink_collects_frames() {
        let mut sink = FrameSink::default();
        sink.emit(series(Map::new())).unwrap();
        sink.emit(series(Map::new())).unwrap();
        assert_eq!(sink.into_frames().len(), 2);
    }
}

//! MongoDB aggregation pipelines for the aggregation specs.

use super::aggregation::{AggregationOp, GroupAggregation, GroupSort, GroupStats, PeriodAggregation};
use crate::chart::{key_label, GroupedRow};
use crate::time::{DateRange, Interval, PeriodKey};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};

/// Temporary field holding the converted document timestamp.
const TS_FIELD: &str = "__ts";

/// Converts a stored timestamp to a BSON date. Strings like `2018-07-07 22:09:11` get
/// their space replaced so the server parses them; unparseable values become null.
fn date_expression(field: &str) -> Document {
    let path = format!("${field}");
    doc! {
        "$convert": {
            "input": {
                "$cond": [
                    { "$eq": [{ "$type": path.as_str() }, "string"] },
                    { "$replaceOne": { "input": path.as_str(), "find": " ", "replacement": "T" } },
                    path.as_str(),
                ]
            },
            "to": "date",
            "onError": Bson::Null,
            "onNull": Bson::Null,
        }
    }
}

/// Stages keeping documents whose `field` falls inside `range`.
fn window_stages(field: &str, range: &DateRange) -> [Document; 2] {
    [
        doc! { "$addFields": { TS_FIELD: date_expression(field) } },
        doc! {
            "$match": {
                TS_FIELD: {
                    "$gte": BsonDateTime::from_millis(range.start.timestamp_millis()),
                    "$lte": BsonDateTime::from_millis(range.end.timestamp_millis()),
                }
            }
        },
    ]
}

fn accumulator(op: AggregationOp, value_field: Option<&str>) -> Document {
    let Some(field) = value_field.filter(|_| op.needs_value_field()) else {
        return doc! { "$sum": 1 };
    };
    let path = format!("${field}");
    match op {
        AggregationOp::Count | AggregationOp::Sum => doc! { "$sum": path },
        AggregationOp::Avg => doc! { "$avg": path },
        AggregationOp::Min => doc! { "$min": path },
        AggregationOp::Max => doc! { "$max": path },
    }
}

fn date_part(operator: &str, zone: &str) -> Document {
    doc! { operator: { "date": format!("${TS_FIELD}"), "timezone": zone } }
}

fn period_id(spec: &PeriodAggregation) -> Document {
    let zone = spec.zone.name();
    let mut id = Document::new();
    if let Some(field) = &spec.group_field {
        id.insert("b", format!("${field}"));
    }
    match spec.interval {
        Interval::Day => {
            id.insert("y", date_part("$year", zone));
            id.insert("m", date_part("$month", zone));
            id.insert("d", date_part("$dayOfMonth", zone));
        }
        Interval::Week => {
            id.insert("y", date_part("$isoWeekYear", zone));
            id.insert("w", date_part("$isoWeek", zone));
        }
        Interval::Month => {
            id.insert("y", date_part("$year", zone));
            id.insert("m", date_part("$month", zone));
        }
    }
    id
}

/// Builds the pipeline for a [`PeriodAggregation`]. `filter` is the converted match
/// document.
pub(crate) fn period_pipeline(spec: &PeriodAggregation, filter: Document) -> Vec<Document> {
    let mut stages = Vec::new();
    if !filter.is_empty() {
        stages.push(doc! { "$match": filter });
    }
    stages.extend(window_stages(&spec.date_field, &spec.range));
    stages.push(doc! {
        "$group": {
            "_id": period_id(spec),
            "value": accumulator(spec.op, spec.value_field.as_deref()),
        }
    });
    stages.push(doc! { "$sort": { "_id.b": 1, "_id.y": 1, "_id.m": 1, "_id.w": 1, "_id.d": 1 } });
    stages
}

/// Builds the pipeline for a [`GroupAggregation`].
pub(crate) fn group_pipeline(spec: &GroupAggregation, filter: Document) -> Vec<Document> {
    let mut stages = Vec::new();
    if !filter.is_empty() {
        stages.push(doc! { "$match": filter });
    }
    if let Some(window) = &spec.window {
        stages.extend(window_stages(&window.field, &window.range));
    }

    let id = if spec.group_by.is_empty() {
        Bson::Null
    } else {
        let mut key = Document::new();
        for (index, field) in spec.group_by.iter().enumerate() {
            key.insert(format!("k{index}"), format!("${field}"));
        }
        Bson::Document(key)
    };
    stages.push(doc! {
        "$group": {
            "_id": id,
            "value": accumulator(spec.op, spec.value_field.as_deref()),
            "count": { "$sum": 1 },
        }
    });
    stages.push(match spec.sort {
        GroupSort::ValueDesc => doc! { "$sort": { "value": -1, "_id": 1 } },
        GroupSort::KeyAsc => doc! { "$sort": { "_id": 1 } },
    });
    if let Some(limit) = spec.limit {
        stages.push(doc! { "$limit": i64::try_from(limit).unwrap_or(i64::MAX) });
    }
    stages
}

#[allow(clippy::cast_precision_loss)]
fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

fn integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        _ => None,
    }
}

fn component(id: &Document, key: &str) -> Option<u32> {
    id.get(key)
        .and_then(integer)
        .and_then(|v| u32::try_from(v).ok())
}

/// Converts a BSON value to JSON the way the rest of the crate sees documents.
pub(crate) fn to_json(value: Bson) -> serde_json::Value {
    match value {
        Bson::ObjectId(id) => serde_json::Value::String(id.to_hex()),
        other => other.into_relaxed_extjson(),
    }
}

/// Reads one output row of [`period_pipeline`]. Rows without a numeric value or with
/// impossible date parts are skipped.
pub(crate) fn parse_period_row(row: &Document, grouped: bool) -> Option<GroupedRow> {
    let id = row.get_document("_id").ok()?;
    let year = i32::try_from(id.get("y").and_then(integer)?).ok()?;
    let period = PeriodKey {
        year,
        month: component(id, "m"),
        day: component(id, "d"),
        week: component(id, "w"),
    };
    let group = if grouped {
        id.get("b")
            .filter(|b| !matches!(b, Bson::Null))
            .map(|b| key_label(&to_json(b.clone())))
    } else {
        None
    };
    let value = row.get("value").and_then(number)?;
    Some(GroupedRow::new(group, period, value))
}

/// Reads one output row of [`group_pipeline`].
pub(crate) fn parse_group_row(row: &Document, key_len: usize) -> Option<GroupStats> {
    let id = row.get_document("_id").ok();
    let key = (0..key_len)
        .map(|index| {
            id.and_then(|id| id.get(format!("k{index}")))
                .cloned()
                .map_or(serde_json::Value::Null, to_json)
        })
        .collect();
    let value = row.get("value").and_then(number)?;
    let count = row
        .get("count")
        .and_then(integer)
        .and_then(|c| u64::try_from(c).ok())
        .unwrap_or(0);
    Some(GroupStats { key, value, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Collection;
    use crate::time::Calendar;
    use serde_json::json;

    fn range() -> DateRange {
        Calendar::new(chrono_tz::UTC)
            .normalize_range(Some("2023-01-01"), Some("2023-03-31"))
            .unwrap()
    }

    #[test]
    fn test_period_pipeline_week_grouped() {
        let spec = PeriodAggregation::new(
            Collection::Reviews,
            "date",
            range(),
            Interval::Week,
            chrono_tz::America::Bogota,
        )
        .with_group_field("business_id")
        .with_op(AggregationOp::Avg, Some("stars".into()));

        let stages = period_pipeline(&spec, Document::new());

        assert_eq!(stages.len(), 4);
        assert!(stages[0].contains_key("$addFields"));
        let group = stages[2].get_document("$group").unwrap();
        let id = group.get_document("_id").unwrap();
        assert_eq!(id.get_str("b").unwrap(), "$business_id");
        assert_eq!(
            id.get_document("w").unwrap(),
            &doc! { "$isoWeek": { "date": "$__ts", "timezone": "America/Bogota" } }
        );
        assert!(!id.contains_key("m"));
        assert_eq!(group.get_document("value").unwrap(), &doc! { "$avg": "$stars" });
    }

    #[test]
    fn test_period_pipeline_prepends_filter() {
        let spec = PeriodAggregation::new(
            Collection::Reviews,
            "date",
            range(),
            Interval::Day,
            chrono_tz::UTC,
        );

        let stages = period_pipeline(&spec, doc! { "business_id": "b1" });

        assert_eq!(stages[0], doc! { "$match": { "business_id": "b1" } });
        let group = stages[3].get_document("$group").unwrap();
        assert_eq!(group.get_document("value").unwrap(), &doc! { "$sum": 1 });
        let id = group.get_document("_id").unwrap();
        assert!(id.contains_key("d"));
        assert!(!id.contains_key("b"));
    }

    #[test]
    fn test_group_pipeline() {
        let spec = GroupAggregation::new(Collection::Businesses)
            .group_by("city")
            .group_by("state")
            .with_op(AggregationOp::Sum, Some("review_count".into()))
            .with_limit(5);

        let stages = group_pipeline(&spec, Document::new());

        assert_eq!(
            stages[0],
            doc! {
                "$group": {
                    "_id": { "k0": "$city", "k1": "$state" },
                    "value": { "$sum": "$review_count" },
                    "count": { "$sum": 1 },
                }
            }
        );
        assert_eq!(stages[1], doc! { "$sort": { "value": -1, "_id": 1 } });
        assert_eq!(stages[2], doc! { "$limit": 5_i64 });
    }

    #[test]
    fn test_group_pipeline_whole_collection_with_window() {
        let spec = GroupAggregation::new(Collection::Reviews)
            .with_window("date", range())
            .with_sort(GroupSort::KeyAsc);

        let stages = group_pipeline(&spec, Document::new());

        assert_eq!(stages.len(), 4);
        let group = stages[2].get_document("$group").unwrap();
        assert_eq!(group.get("_id"), Some(&Bson::Null));
        assert_eq!(stages[3], doc! { "$sort": { "_id": 1 } });
    }

    #[test]
    fn test_parse_period_row() {
        let row = doc! { "_id": { "b": "b1", "y": 2022, "w": 52 }, "value": 3.5 };
        assert_eq!(
            parse_period_row(&row, true),
            Some(GroupedRow::new(Some("b1".into()), PeriodKey::iso_week(2022, 52), 3.5))
        );

        let row = doc! { "_id": { "y": 2023, "m": 2 }, "value": 4_i64 };
        assert_eq!(
            parse_period_row(&row, false),
            Some(GroupedRow::new(None, PeriodKey::month(2023, 2), 4.0))
        );

        let row = doc! { "_id": { "y": 2023, "m": 2 }, "value": Bson::Null };
        assert_eq!(parse_period_row(&row, false), None);
    }

    #[test]
    fn test_parse_group_row() {
        let row = doc! { "_id": { "k0": "Tampa" }, "value": 12, "count": 3 };
        assert_eq!(
            parse_group_row(&row, 2),
            Some(GroupStats {
                key: vec![json!("Tampa"), json!(null)],
                value: 12.0,
                count: 3
            })
        );

        let row = doc! { "_id": Bson::Null, "value": 2.5, "count": 4 };
        let stats = parse_group_row(&row, 0).unwrap();
        assert!(stats.key.is_empty());
        assert_eq!(stats.count, 4);
    }
}

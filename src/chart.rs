use crate::aggregate::{AggregateRow, ShareRow};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Pie,
    Line,
    ScatterGeo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub label: String,
    pub value: f64,
}

/// Rows plus the axis names they bind to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub dimension_label: String,
    pub value_label: String,
    pub rows: Vec<ChartRow>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything the client-side renderer needs for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub series: ChartSeries,
}

impl Chart {
    pub fn new(kind: ChartKind, title: &str, series: ChartSeries) -> Self {
        Chart {
            kind,
            title: title.to_owned(),
            series,
        }
    }
}

pub fn to_chart_rows(
    rows: &[AggregateRow],
    dimension_label: &str,
    value_label: &str,
) -> ChartSeries {
    series(
        rows.iter().map(|r| (r.key.as_str(), r.value)),
        dimension_label,
        value_label,
    )
}

/// Charts the percentage column of country shares.
pub fn share_chart_rows(rows: &[ShareRow], dimension_label: &str, value_label: &str) -> ChartSeries {
    series(
        rows.iter().map(|r| (r.key.as_str(), r.percentage)),
        dimension_label,
        value_label,
    )
}

pub fn series<'a, I>(points: I, dimension_label: &str, value_label: &str) -> ChartSeries
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    ChartSeries {
        dimension_label: dimension_label.to_owned(),
        value_label: value_label.to_owned(),
        rows: points
            .into_iter()
            .map(|(label, value)| ChartRow {
                label: label.to_owned(),
                value,
            })
            .collect(),
    }
}

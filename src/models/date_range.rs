use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// 日期区间（含首尾）
///
/// 建立时保证 `start <= end`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawRange> for DateRange {
    type Error = PlanError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PlanError> {
        if start > end {
            return Err(PlanError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// 单日区间
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// 天数（含首尾）
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// 区间至少含一天，永远不为空
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 依日期递增列出每一天
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// 日期栏位的填写格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// 民国纪年 yyymmdd，例如 2024-05-01 -> 1130501
    #[default]
    Roc,
    /// YYYY-MM-DD
    Iso,
}

impl DateFormat {
    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            DateFormat::Roc => format!(
                "{:03}{:02}{:02}",
                date.year() - 1911,
                date.month(),
                date.day()
            ),
            DateFormat::Iso => date.format("%Y-%m-%d").to_string(),
        }
    }
}

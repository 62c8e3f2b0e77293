//! 원시 표 조각과 평탄화.
//!
//! 추출 어댑터가 돌려주는 표는 타입이 없는 문자열 셀과 헤더로 구성됩니다.
//! 렌더링된 HTML 표는 그룹 헤더 때문에 2단 헤더를 가질 수 있으며,
//! [`RawFragment::flatten`]이 이를 `상위_하위` 형태의 단일 이름으로 합칩니다.

use crate::error::{DataError, Result};

/// 평탄화 시 상/하위 헤더를 잇는 구분자.
pub const HEADER_SEPARATOR: &str = "_";

/// 표 헤더.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// 단일 헤더
    Single(Vec<String>),
    /// 2단 헤더 (상위, 하위)
    TwoLevel(Vec<(String, String)>),
}

impl Header {
    /// 열 개수.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(cols) => cols.len(),
            Self::TwoLevel(cols) => cols.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 평탄화된 열 이름 목록.
    pub fn flat_names(&self) -> Vec<String> {
        match self {
            Self::Single(cols) => cols.clone(),
            Self::TwoLevel(cols) => cols
                .iter()
                .map(|(upper, lower)| join_levels(upper, lower))
                .collect(),
        }
    }
}

fn join_levels(upper: &str, lower: &str) -> String {
    format!("{}{}{}", upper, HEADER_SEPARATOR, lower)
        .trim()
        .to_string()
}

/// 추출 어댑터가 만든 원시 표.
///
/// 모든 행의 길이는 헤더 열 개수와 같습니다. 짧은 행은 빈 셀로 채우고
/// 긴 행은 잘라냅니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFragment {
    header: Header,
    rows: Vec<Vec<String>>,
}

impl RawFragment {
    pub fn new(header: Header, rows: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { header, rows }
    }

    /// 단일 헤더 표를 생성합니다.
    pub fn single<S: Into<String>>(columns: impl IntoIterator<Item = S>, rows: Vec<Vec<String>>) -> Self {
        Self::new(
            Header::Single(columns.into_iter().map(Into::into).collect()),
            rows,
        )
    }

    /// 빈 표 (헤더만 있음).
    pub fn empty(header: Header) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.header, Header::Single(_))
    }

    /// 2단 헤더를 `상위_하위` 단일 헤더로 합칩니다.
    ///
    /// 열 순서는 유지되며, 이미 단일 헤더인 표는 그대로 반환합니다.
    pub fn flatten(self) -> Self {
        match self.header {
            Header::Single(_) => self,
            Header::TwoLevel(_) => Self {
                header: Header::Single(self.header.flat_names()),
                rows: self.rows,
            },
        }
    }

    /// 평탄화된 이름 기준 열 위치.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        match &self.header {
            Header::Single(cols) => cols.iter().position(|c| c.trim() == name),
            Header::TwoLevel(cols) => cols
                .iter()
                .position(|(upper, lower)| join_levels(upper, lower) == name),
        }
    }

    /// 열 위치를 찾고, 없으면 [`DataError::MissingColumn`]을 반환합니다.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// 조건을 만족하는 행만 남깁니다.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// 행을 추가합니다. 길이는 헤더에 맞춰집니다.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.header.len(), String::new());
        self.rows.push(row);
    }

    /// `(원본 열, 새 이름)` 쌍으로 열을 골라 이름을 바꾼 단일 헤더 표를 만듭니다.
    pub fn project(&self, mapping: &[(&str, &str)]) -> Result<Self> {
        let indices = mapping
            .iter()
            .map(|(source, _)| self.require_column(source))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Self {
            header: Header::Single(mapping.iter().map(|(_, target)| target.to_string()).collect()),
            rows,
        })
    }

    /// 같은 헤더를 가진 표들을 이어 붙입니다.
    ///
    /// 빈 입력이면 `None`을 반환합니다.
    pub fn concat(fragments: Vec<RawFragment>) -> Result<Option<Self>> {
        let mut iter = fragments.into_iter();
        let Some(mut merged) = iter.next() else {
            return Ok(None);
        };

        for fragment in iter {
            if fragment.header.flat_names() != merged.header.flat_names() {
                return Err(DataError::Markup(format!(
                    "헤더가 다른 표는 이어 붙일 수 없습니다: {:?} vs {:?}",
                    merged.header.flat_names(),
                    fragment.header.flat_names()
                )));
            }
            merged.rows.extend(fragment.rows);
        }

        Ok(Some(merged))
    }
}

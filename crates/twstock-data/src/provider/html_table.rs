//! 렌더링된 HTML `<table>` → [`RawFragment`] 변환.
//!
//! `colspan`/`rowspan`을 격자로 펼친 뒤, 헤더 행이 하나면 단일 헤더,
//! 둘이면 2단 헤더로 만듭니다. 헤더 행은 `<thead>` 안의 행이거나
//! 모든 셀이 `<th>`인 행입니다.

use crate::error::{DataError, Result};
use crate::fragment::{Header, RawFragment};
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DataError::Markup(format!("selector {}: {}", css, e)))
}

/// 셀 텍스트의 공백을 하나로 정리합니다.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn span(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

fn is_header_row(row: ElementRef<'_>, cells: &[ElementRef<'_>]) -> bool {
    let in_thead = row
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "thead");

    in_thead || (!cells.is_empty() && cells.iter().all(|c| c.value().name() == "th"))
}

/// rowspan으로 아래 행에 이어지는 셀.
#[derive(Clone)]
struct Carry {
    remaining: usize,
    text: String,
}

/// 현재 위치부터 위 행에서 이어지는 셀을 채웁니다.
fn take_carries(out: &mut Vec<String>, carries: &mut [Option<Carry>]) {
    while let Some(Some(carry)) = carries.get_mut(out.len()) {
        out.push(carry.text.clone());
        carry.remaining -= 1;
        if carry.remaining == 0 {
            carries[out.len() - 1] = None;
        }
    }
}

/// 행 하나를 격자 행으로 펼칩니다.
fn expand_row(cells: &[ElementRef<'_>], carries: &mut Vec<Option<Carry>>) -> Vec<String> {
    let mut out = Vec::new();

    for &cell in cells {
        take_carries(&mut out, carries);

        let text = cell_text(cell);
        let rowspan = span(cell, "rowspan");
        for _ in 0..span(cell, "colspan") {
            let col = out.len();
            if rowspan > 1 {
                if carries.len() <= col {
                    carries.resize(col + 1, None);
                }
                carries[col] = Some(Carry {
                    remaining: rowspan - 1,
                    text: text.clone(),
                });
            }
            out.push(text.clone());
        }
    }
    take_carries(&mut out, carries);

    out
}

/// 표 요소 하나를 변환합니다.
fn parse_table_element(table: ElementRef<'_>) -> Result<RawFragment> {
    let tr = selector("tr")?;
    let cell = selector("th, td")?;

    let mut carries: Vec<Option<Carry>> = Vec::new();
    let mut header_rows: Vec<Vec<String>> = Vec::new();
    let mut body_rows: Vec<Vec<String>> = Vec::new();

    for row in table.select(&tr) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell).collect();
        let expanded = expand_row(&cells, &mut carries);
        if expanded.is_empty() {
            continue;
        }

        if body_rows.is_empty() && is_header_row(row, &cells) {
            header_rows.push(expanded);
        } else {
            body_rows.push(expanded);
        }
    }

    let header = match header_rows.as_slice() {
        [] => return Err(DataError::Markup("표에 헤더 행이 없습니다".to_string())),
        [single] => Header::Single(single.clone()),
        [upper, lower] => {
            let width = upper.len().max(lower.len());
            let level = |row: &Vec<String>, i: usize| row.get(i).cloned().unwrap_or_default();
            Header::TwoLevel((0..width).map(|i| (level(upper, i), level(lower, i))).collect())
        }
        rows => {
            return Err(DataError::Markup(format!(
                "지원하지 않는 헤더 깊이: {}",
                rows.len()
            )))
        }
    };

    Ok(RawFragment::new(header, body_rows))
}

/// 문서의 첫 번째 `<table>`을 변환합니다.
pub fn parse_first_table(html: &str) -> Result<RawFragment> {
    let document = Html::parse_document(html);
    let table = selector("table")?;

    let element = document
        .select(&table)
        .next()
        .ok_or_else(|| DataError::Markup("문서에 <table>이 없습니다".to_string()))?;
    parse_table_element(element)
}

/// 문서의 모든 `<table>`을 변환합니다.
pub fn parse_tables(html: &str) -> Result<Vec<RawFragment>> {
    let document = Html::parse_document(html);
    let table = selector("table")?;

    document.select(&table).map(parse_table_element).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIVIDEND_HTML: &str = r#"
        <html><body>
        <table>
          <thead>
            <tr><th rowspan="2">除權息年度</th><th colspan="3">現金股利(元)</th></tr>
            <tr><th>股利</th><th>除息日</th><th>發放日</th></tr>
          </thead>
          <tbody>
            <tr><td>2025</td><td>4.5</td><td>2025/03/17</td><td>2025/04/10</td></tr>
            <tr><td>2024</td><td> 3.5 </td><td>2024/12/12</td><td>--</td></tr>
          </tbody>
        </table>
        <table><tr><th>other</th></tr></table>
        </body></html>
    "#;

    #[test]
    fn test_two_level_header() {
        let fragment = parse_first_table(DIVIDEND_HTML).unwrap();

        assert!(!fragment.is_flat());
        let flat = fragment.flatten();
        assert_eq!(
            flat.header().flat_names(),
            vec![
                "除權息年度_除權息年度",
                "現金股利(元)_股利",
                "現金股利(元)_除息日",
                "現金股利(元)_發放日",
            ]
        );
        assert_eq!(flat.len(), 2);
        assert_eq!(flat.rows()[1], vec!["2024", "3.5", "2024/12/12", "--"]);
    }

    #[test]
    fn test_single_header_without_thead() {
        let html = r#"
            <table>
              <tr><th>日期</th><th>總資產</th></tr>
              <tr><td>2025/Q2</td><td>1,000</td></tr>
              <tr><td rowspan="2">2025/Q1</td><td>900</td></tr>
              <tr><td>901</td></tr>
            </table>
        "#;
        let fragment = parse_first_table(html).unwrap();

        assert!(fragment.is_flat());
        assert_eq!(fragment.header().flat_names(), vec!["日期", "總資產"]);
        assert_eq!(fragment.rows()[2], vec!["2025/Q1", "901"]);
    }

    #[test]
    fn test_missing_table_or_header() {
        assert!(matches!(
            parse_first_table("<p>loading</p>"),
            Err(DataError::Markup(_))
        ));
        assert!(matches!(
            parse_first_table("<table><tr><td>1</td></tr></table>"),
            Err(DataError::Markup(_))
        ));
    }

    #[test]
    fn test_three_header_rows_rejected() {
        let html = "<table><tr><th>a</th></tr><tr><th>b</th></tr><tr><th>c</th></tr></table>";
        assert!(parse_first_table(html).is_err());
    }

    #[test]
    fn test_parse_tables() {
        assert_eq!(parse_tables(DIVIDEND_HTML).unwrap().len(), 2);
    }
}

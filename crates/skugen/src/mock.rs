// Mock generator — deterministic offline rows for demos and tests.

use skugen_types::{ColumnSet, Row, RowBatch};

const PERSONALITIES: [&str; 5] = ["开朗", "内向", "活泼", "稳重", "热情"];

/// Value for `column` in row `index` (zero-based). Depends on nothing else.
pub fn mock_value(column: &str, index: usize) -> String {
    match column {
        "身高" => format!("{}cm", 160 + 5 * index),
        "体重" => format!("{}kg", 50 + 3 * index),
        "年龄" => format!("{}岁", 18 + index),
        "性格" => PERSONALITIES[index % PERSONALITIES.len()].to_string(),
        "性别" => if index % 2 == 0 { "男" } else { "女" }.to_string(),
        other => format!("测试数据_{other}_{}", index + 1),
    }
}

/// Exactly `row_count` rows, each keyed by every column in order.
pub fn mock_rows(columns: &ColumnSet, row_count: usize) -> RowBatch {
    (0..row_count)
        .map(|index| {
            columns
                .iter()
                .map(|column| (column.as_str(), mock_value(column, index)))
                .collect::<Row>()
        })
        .collect::<Vec<_>>()
        .into()
}

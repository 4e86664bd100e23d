// Prompt text sent to the model.

use skugen_types::{ColumnSet, Row, RowBatch};

fn quoted_columns(columns: &ColumnSet) -> String {
    columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// System message: the exact row count, the column keys, JSON only.
pub fn system_prompt(columns: &ColumnSet, row_count: usize) -> String {
    format!(
        "你是一个SKU数据生成助手。请生成恰好{row_count}行数据，\
         以JSON数组返回，数组中每个对象都使用且只使用以下列名作为key：[{}]\n\
         要求：\n\
         1. 内容贴近真实商品，符合常识\n\
         2. 各行数据互不相同，避免重复\n\
         3. 每个值都必须是非空字符串\n\
         4. 只返回JSON数组本身，不要附带任何解释或Markdown标记",
        quoted_columns(columns)
    )
}

/// User message asking for `deficit` more rows after `existing`.
pub fn continuation_prompt(original: &str, existing: &RowBatch, deficit: usize) -> String {
    // String-keyed maps of strings always serialize.
    let existing_json = serde_json::to_string_pretty(existing).unwrap_or_default();
    format!(
        "{original}\n\n\
         上一次只生成了{}行数据，还差{deficit}行。请再生成{deficit}行新数据。\n\
         以下是已经生成的数据，不要重复其中任何一行，并保持相同的格式和风格：\n\
         {existing_json}",
        existing.len()
    )
}

/// User message for continuing an imported table from its last row.
pub fn seed_prompt(user_prompt: &str, last_row: &Row) -> String {
    let last_json = serde_json::to_string(last_row).unwrap_or_default();
    format!(
        "{user_prompt}\n\n\
         请接着已有表格继续生成新数据。已有表格的最后一行是：\n\
         {last_json}\n\
         新数据需要保持同样的格式和风格，但不要与它重复。"
    )
}

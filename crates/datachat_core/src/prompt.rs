use serde_json::Value;

use crate::context::DataContext;

/// Compose the outbound message for one question.
///
/// Pure: identical inputs always produce byte-identical output.
pub fn build_prompt(user_message: &str, context: &DataContext, file_name: &str) -> String {
    let samples = context.visible_samples();

    format!(
        "Here is the data from the CSV file \"{file_name}\" I am analyzing:\n\
         \n\
         Columns: {columns}\n\
         Total rows: {total}\n\
         Sample data (first {count} rows):\n\
         {rows}\n\
         \n\
         Based on the data above, please answer the following question:\n\
         {user_message}",
        columns = context.columns().join(", "),
        total = context.total_rows(),
        count = samples.len(),
        rows = format_sample_rows(samples, context.columns()),
    )
}

fn format_sample_rows(rows: &[Vec<Value>], columns: &[String]) -> String {
    if rows.is_empty() {
        return "No sample data".to_string();
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let pairs = columns
                .iter()
                .enumerate()
                .map(|(j, col)| format!("{col}=\"{}\"", cell_text(row.get(j))))
                .collect::<Vec<_>>()
                .join(" ");
            format!("Row {}: {pairs}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

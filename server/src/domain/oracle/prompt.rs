//! Prompt templates

use crate::domain::filters::RESULT_COLUMNS;

/// Natural-language question to a single read-only SELECT
pub fn ask_prompt(table: &str, max_items: u32, question: &str) -> String {
    let columns = RESULT_COLUMNS.join(", ");
    format!(
        r#"Based on the user's request, generate a SQL query for DuckDB.
The table is `{table}` with columns: {columns}.
Column meanings: napryamok is the direction (Імпорт or Експорт), data_deklaracii is the declaration date,
kraina_partner is the partner country, kod_uktzed is the 10-digit УКТЗЕД goods code, opis_tovaru is the goods
description, nazva_kompanii is the company name, kod_edrpou is the company ЄДРПОУ code, torgova_marka is the
trademark, mytnytsia is the customs office, mytna_vartist_hrn is the customs value in UAH and vaha_netto_kg is
the net weight in kilograms.
Use `regexp_matches(column, '(?i)term')` for case-insensitive text search.
Write one simple SELECT statement. Do not use CTEs, semicolons, or statements that modify data.
Limit the results to {max_items}.
Return ONLY a valid JSON object with a single key "sql_query" containing the full SQL string.

Example of a valid JSON response:
{{"sql_query": "SELECT opis_tovaru, nazva_kompanii, kraina_partner, data_deklaracii, mytna_vartist_hrn, vaha_netto_kg FROM {table} WHERE regexp_matches(opis_tovaru, '(?i)some search term') LIMIT {max_items}"}}

User request: {question}"#
    )
}

/// Goods description to a list of likely УКТЗЕД codes
pub fn codes_prompt(description: &str) -> String {
    format!(
        r#"You are an expert in the Ukrainian customs goods classification (УКТЗЕД).
List the most likely УКТЗЕД codes for the goods described below.
Each code must contain only digits and be 2 to 10 digits long.
Return ONLY a JSON array of code strings, for example ["8471", "847130"].

Goods description: {description}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_prompt_mentions_contract() {
        let prompt = ask_prompt("declarations", 100, "кава з Бразилії");
        assert!(prompt.contains("FROM declarations"));
        assert!(prompt.contains("LIMIT 100"));
        assert!(prompt.contains("\"sql_query\""));
        assert!(prompt.contains("(?i)"));
        assert!(prompt.ends_with("User request: кава з Бразилії"));
    }

    #[test]
    fn test_codes_prompt() {
        let prompt = codes_prompt("ноутбуки");
        assert!(prompt.contains("JSON array"));
        assert!(prompt.ends_with("ноутбуки"));
    }
}

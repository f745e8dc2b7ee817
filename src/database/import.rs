use crate::{error::TypeError, schema::NewIngredient};

/*
Ingredient catalogue CSV

name,measurement_unit
абрикосовое варенье,г
"salt, coarse",g
*/

fn is_header(record: &csv::StringRecord) -> bool {
    matches!((record.get(0), record.get(1), record.len()), (Some(name), Some(unit), 2)
        if name.eq_ignore_ascii_case("name") && unit.eq_ignore_ascii_case("measurement_unit"))
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

/// Parses `name,measurement_unit` rows. A leading header row is skipped.
pub fn parse_ingredient_csv(input: &str) -> Result<Vec<NewIngredient>, TypeError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let mut ingredients = vec![];
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or_default();
            TypeError::new(&format!("line {line}: {e}"))
        })?;

        if i == 0 && is_header(&record) {
            continue;
        }

        match (record.get(0), record.get(1), record.len()) {
            (Some(name), Some(unit), 2) if !name.is_empty() && !unit.is_empty() => {
                ingredients.push(NewIngredient {
                    name: name.to_string(),
                    measurement_unit: unit.to_string(),
                })
            }
            _ => {
                return Err(TypeError::new(&format!(
                    "line {}: expected name,measurement_unit",
                    line_of(&record)
                )))
            }
        }
    }

    Ok(ingredients)
}

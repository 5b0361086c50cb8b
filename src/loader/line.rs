use crate::core::error::{Error, Result};

/// Split one `a|b|c` record into exactly `n` fields. The last field keeps any
/// further pipes, so glosses may contain them.
pub fn split_fields(line: &str, n: usize, lineno: usize) -> Result<Vec<&str>> {
    let fields: Vec<&str> = line.trim().splitn(n, '|').collect();
    if fields.len() != n {
        return Err(Error::parse(format!(
            "line {}: expected {} '|'-separated fields, found {}",
            lineno + 1,
            n,
            fields.len()
        )));
    }
    Ok(fields)
}

/// Passage token `lemma_id` or `lemma_id.count`; count defaults to 1
pub fn parse_lemma_token(token: &str, lineno: usize) -> Result<(&str, u32)> {
    match token.split_once('.') {
        Some((id, count)) => {
            let count = count.parse::<u32>().map_err(|e| {
                Error::parse(format!("line {}: bad count in token '{}': {}", lineno + 1, token, e))
            })?;
            Ok((id, count))
        }
        None => Ok((token, 1)),
    }
}

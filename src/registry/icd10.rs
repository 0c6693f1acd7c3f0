//! ICD-10 range expansion.
//!
//! Ranges are pre-normalized at ingest: a range expands into its enumerated
//! children plus their shared three-character parent, and the result is
//! stored as a stable alias table built once rather than recomputed on
//! every lookup.
//!
//! Three range shapes are supported, matching the codes actually seen in the
//! source mapping tables:
//! - `A00-A09`  (three-character codes, no decimal point)
//! - `H01.021-H01.029` (shared prefix through the decimal point, range over the final digit(s))
//! - `H02.121-129` (range written without repeating the `H02.1` prefix)

/// Expand an ICD-10 range expression into its enumerated constituent codes.
///
/// Returns a single-element vector unchanged if `code` is not a range (no
/// `-` present, or malformed). The three-character parent code is included
/// as an implicit alias of the expansion but is exposed as a separate entry
/// point, [`parent_of`], since ingest needs to link every child to it.
pub fn expand_range(code: &str) -> Vec<String> {
    let Some((start, end)) = code.split_once('-') else {
        return vec![code.to_string()];
    };
    let start = start.trim();
    let end = end.trim();

    // Case 1: bare three-character codes, e.g. A00-A09.
    if let (Some(prefix), Some(start_num), Some(end_num)) =
        (letter_prefix(start), numeric_suffix(start), numeric_suffix(end))
    {
        if !start.contains('.') && !end.contains('.') && start_num <= end_num {
            return (start_num..=end_num)
                .map(|n| format!("{prefix}{n:02}"))
                .collect();
        }
    }

    // Case 2: full repeated prefix through the decimal point, e.g. H01.021-H01.029.
    if let Some((start_base, start_frac)) = start.split_once('.') {
        if let Some((end_base, end_frac)) = end.split_once('.') {
            if start_base == end_base {
                if let (Ok(start_n), Ok(end_n)) =
                    (start_frac.parse::<u32>(), end_frac.parse::<u32>())
                {
                    if start_n <= end_n {
                        let width = start_frac.len();
                        return (start_n..=end_n)
                            .map(|n| format!("{start_base}.{n:0width$}", width = width))
                            .collect();
                    }
                }
            }
        }
    }

    // Case 3: shortened end, e.g. H02.121-129 (end omits the "H02." prefix).
    if let Some((start_base, start_frac)) = start.split_once('.') {
        if !end.contains('.') {
            if let (Ok(start_n), Ok(end_n)) = (start_frac.parse::<u32>(), end.parse::<u32>()) {
                if start_n <= end_n {
                    let width = start_frac.len();
                    return (start_n..=end_n)
                        .map(|n| format!("{start_base}.{n:0width$}", width = width))
                        .collect();
                }
            }
        }
    }

    vec![code.to_string()]
}

/// The three-character parent of an (expanded) ICD-10 code, e.g. `"H01"` for `"H01.021"`.
pub fn parent_of(code: &str) -> String {
    code.split('.').next().unwrap_or(code).to_string()
}

fn letter_prefix(code: &str) -> Option<&str> {
    let split_at = code.find(|c: char| c.is_ascii_digit())?;
    Some(&code[..split_at])
}

fn numeric_suffix(code: &str) -> Option<u32> {
    let split_at = code.find(|c: char| c.is_ascii_digit())?;
    code[split_at..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_bare_three_character_range() {
        let expanded = expand_range("A00-A09");
        assert_eq!(expanded.len(), 10);
        assert_eq!(expanded.first(), Some(&"A00".to_string()));
        assert_eq!(expanded.last(), Some(&"A09".to_string()));
    }

    #[test]
    fn expands_full_repeated_prefix_range() {
        let expanded = expand_range("H01.021-H01.029");
        assert_eq!(expanded.len(), 9);
        assert_eq!(expanded[0], "H01.021");
        assert_eq!(expanded[8], "H01.029");
    }

    #[test]
    fn expands_shortened_end_range() {
        let expanded = expand_range("H02.121-129");
        assert_eq!(expanded.len(), 9);
        assert_eq!(expanded[0], "H02.121");
        assert_eq!(expanded[8], "H02.129");
    }

    #[test]
    fn non_range_code_is_passed_through() {
        assert_eq!(expand_range("A01"), vec!["A01".to_string()]);
    }

    #[test]
    fn parent_of_strips_decimal_suffix() {
        assert_eq!(parent_of("H01.021"), "H01");
        assert_eq!(parent_of("A01"), "A01");
    }
}

//! Fuzzy name matching on a 0–100 scale.
//!
//! Scores are normalized InDel similarity from `rapidfuzz`, scaled and rounded to whole
//! percentages. Comparisons are case-insensitive, and an empty string matches nothing.
use rapidfuzz::fuzz;

/// Records that can be scored against a target name.
pub trait NamedRecord {
    fn title(&self) -> &str;
    fn name_match(&self) -> Option<u8>;
    fn set_name_match(&mut self, score: u8);
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Similarity of the two whole strings.
pub fn name_ratio(a: &str, b: &str) -> u8 {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(fuzz::ratio(a.chars(), b.chars()))
}

/// Similarity of the shorter string to its best-matching same-length slice of the longer.
///
/// A short name contained in a long title scores 100.
pub fn partial_name_ratio(a: &str, b: &str) -> u8 {
    let a = a.to_lowercase().chars().collect::<Vec<_>>();
    let b = b.to_lowercase().chars().collect::<Vec<_>>();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut best = 0.0_f64;
    for window in longer.windows(shorter.len()) {
        let similarity = fuzz::ratio(shorter.iter().copied(), window.iter().copied());
        if similarity > best {
            best = similarity;
            if best >= 1.0 {
                break;
            }
        }
    }
    to_score(best)
}

/// Scores every record's title against `name` with [`partial_name_ratio`], sorts by score
/// (highest first, ties keep their order) and drops records scoring at or below
/// `min_score` when one is given.
pub fn rank_by_name<R: NamedRecord>(records: &mut Vec<R>, name: &str, min_score: Option<u8>) {
    for record in records.iter_mut() {
        let score = partial_name_ratio(name, record.title());
        record.set_name_match(score);
    }
    records.sort_by(|a, b| b.name_match().cmp(&a.name_match()));
    if let Some(min_score) = min_score {
        records.retain(|record| record.name_match().is_some_and(|score| score > min_score));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Named(&'static str, Option<u8>);

    impl NamedRecord for Named {
        fn title(&self) -> &str {
            self.0
        }

        fn name_match(&self) -> Option<u8> {
            self.1
        }

        fn set_name_match(&mut self, score: u8) {
            self.1 = Some(score);
        }
    }

    #[test]
    fn test_name_ratio() {
        assert_eq!(name_ratio("Staines Moor", "staines moor"), 100);
        assert_eq!(name_ratio("", "anything"), 0);
        assert_eq!(name_ratio("abc", "xyz"), 0);

        let close = name_ratio("Staines Moor", "Staines");
        assert!(close > 50 && close < 100, "got {close}");
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        assert_eq!(partial_name_ratio("Calton Hill", "File:Calton Hill from Princes St.jpg"), 100);
        assert_eq!(partial_name_ratio("File:Calton Hill.jpg", "calton hill"), 100);
        assert!(partial_name_ratio("Calton Hill", "File:Arthur's Seat.jpg") < 60);
        assert_eq!(partial_name_ratio("", "File:x.jpg"), 0);
    }

    #[test]
    fn test_partial_ratio_at_least_full_ratio() {
        let pairs = [("Staines", "Staines-upon-Thames"), ("moor", "Staines Moor")];
        for (a, b) in pairs {
            assert!(partial_name_ratio(a, b) >= name_ratio(a, b));
        }
    }

    #[test]
    fn test_rank_by_name_sorts_and_filters() {
        let mut records = vec![
            Named("File:Princes Street.jpg", None),
            Named("File:Calton Hill at dusk.jpg", None),
            Named("File:Calton Hill.jpg", None),
        ];
        rank_by_name(&mut records, "Calton Hill", None);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].1, Some(100));
        assert_eq!(records[1].1, Some(100));
        // Ties keep their original order
        assert_eq!(records[0].0, "File:Calton Hill at dusk.jpg");
        assert!(records[2].1 < records[1].1);

        let mut filtered = records.clone();
        rank_by_name(&mut filtered, "Calton Hill", Some(99));
        assert_eq!(filtered.len(), 2);

        // At the threshold is dropped, not kept
        let mut exact = records;
        rank_by_name(&mut exact, "Calton Hill", Some(100));
        assert!(exact.is_empty());
    }
}

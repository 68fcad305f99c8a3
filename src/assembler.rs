use crate::error::StageError;

/// Merge ordered per-chunk transcripts into one document.
///
/// Pure concatenation in chunk-index order, no separator: chunk boundaries
/// fall mid-sentence, so the transcript text itself carries the spacing.
/// An unfilled slot is a broken pipeline invariant, not an expected
/// runtime condition, and fails loudly.
pub fn merge(transcripts: &[Option<String>]) -> Result<String, StageError> {
    if transcripts.is_empty() {
        return Err(StageError::Invariant(
            "merge called with an empty transcript set".to_string(),
        ));
    }

    let mut merged = String::new();
    for (index, slot) in transcripts.iter().enumerate() {
        match slot {
            Some(text) => merged.push_str(text),
            None => {
                return Err(StageError::Invariant(format!(
                    "transcript slot {} unfilled at merge time",
                    index
                )))
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_preserves_index_order() {
        let transcripts = vec![
            Some("A ".to_string()),
            Some("B ".to_string()),
            Some("C ".to_string()),
        ];
        assert_eq!(merge(&transcripts).unwrap(), "A B C ");
    }

    #[test]
    fn test_merge_rejects_unfilled_slot() {
        let transcripts = vec![Some("A ".to_string()), None, Some("C ".to_string())];
        let err = merge(&transcripts).unwrap_err();
        assert!(matches!(err, StageError::Invariant(_)));
        assert!(err.to_string().contains("slot 1"));
    }

    #[test]
    fn test_merge_keeps_empty_string_results() {
        // A chunk of silence legitimately transcribes to "", which is not
        // the same as an unfilled slot.
        let transcripts = vec![Some("intro".to_string()), Some(String::new())];
        assert_eq!(merge(&transcripts).unwrap(), "intro");
    }

    #[test]
    fn test_merge_rejects_empty_set() {
        assert!(matches!(merge(&[]), Err(StageError::Invariant(_))));
    }
}

use crate::services::error::UploadError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// Indices still missing, ascending
    Incomplete { missing: Vec<u32> },
}

/// Decides whether `parts` covers every index in `1..=expected_total`.
///
/// Indices are counted once no matter how often they appear. An index outside
/// the expected range means the stored state disagrees with the request and is
/// reported instead of being ignored.
pub fn evaluate<I>(parts: I, expected_total: u32) -> Result<Completeness, UploadError>
where
    I: IntoIterator<Item = u32>,
{
    if expected_total == 0 {
        return Err(UploadError::invalid("totalParts must be a positive integer"));
    }

    let present: BTreeSet<u32> = parts.into_iter().collect();

    if let Some(&index) = present
        .iter()
        .find(|&&index| index == 0 || index > expected_total)
    {
        return Err(UploadError::invalid(format!(
            "stored part {} is outside 1..={}",
            index, expected_total
        )));
    }

    if present.len() == expected_total as usize {
        return Ok(Completeness::Complete);
    }

    let missing = (1..=expected_total)
        .filter(|index| !present.contains(index))
        .collect();
    Ok(Completeness::Incomplete { missing })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_is_invalid() {
        let err = evaluate([1], 0).unwrap_err();
        assert!(matches!(err, UploadError::InvalidRequest(_)));
    }

    #[test]
    fn test_empty_inventory_misses_everything() {
        assert_eq!(
            evaluate(Vec::<u32>::new(), 3).unwrap(),
            Completeness::Incomplete {
                missing: vec![1, 2, 3]
            }
        );
    }

    #[test]
    fn test_complete_in_any_arrival_order() {
        assert_eq!(evaluate([3, 1, 2], 3).unwrap(), Completeness::Complete);
        assert_eq!(evaluate([1], 1).unwrap(), Completeness::Complete);
        assert_eq!(
            evaluate((1..=50).rev(), 50).unwrap(),
            Completeness::Complete
        );
    }

    #[test]
    fn test_duplicates_do_not_double_count() {
        assert_eq!(
            evaluate([1, 1, 2, 2], 3).unwrap(),
            Completeness::Incomplete { missing: vec![3] }
        );
        assert_eq!(
            evaluate([2, 2, 2], 2).unwrap(),
            Completeness::Incomplete { missing: vec![1] }
        );
    }

    #[test]
    fn test_out_of_range_index_is_reported() {
        assert!(matches!(
            evaluate([1, 4], 3),
            Err(UploadError::InvalidRequest(_))
        ));
        assert!(matches!(
            evaluate([0, 1], 3),
            Err(UploadError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_every_proper_subset_reports_its_complement() {
        for total in 1..=7u32 {
            let full: u32 = (1 << total) - 1;
            for mask in 0..full {
                let present: Vec<u32> = (1..=total).filter(|i| mask & (1 << (i - 1)) != 0).collect();
                let expected: Vec<u32> = (1..=total).filter(|i| mask & (1 << (i - 1)) == 0).collect();

                assert_eq!(
                    evaluate(present.iter().rev().copied(), total).unwrap(),
                    Completeness::Incomplete { missing: expected },
                    "total={total} mask={mask:b}"
                );
            }
            let all: Vec<u32> = (1..=total).collect();
            assert_eq!(evaluate(all, total).unwrap(), Completeness::Complete);
        }
    }
}

use std::ops::Range;

use crate::error::ConfigError;

/// Columns `[start, end)` owned by one worker for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn columns(self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// Splits `width` columns among `workers`: every range is `width / workers`
/// wide and the last one also takes the remainder.
///
/// With fewer columns than workers the leading ranges are empty and the last
/// worker computes the whole grid.
pub fn plan_columns(width: usize, workers: usize) -> Result<Vec<ColumnRange>, ConfigError> {
    if workers == 0 {
        return Err(ConfigError::NoWorkers);
    }
    if width == 0 {
        return Err(ConfigError::EmptyGrid { width, height: 0 });
    }

    let per_worker = width / workers;
    let ranges = (0..workers)
        .map(|index| {
            let start = index * per_worker;
            let end = if index + 1 == workers {
                width
            } else {
                start + per_worker
            };
            ColumnRange { start, end }
        })
        .collect();
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_last_worker() {
        let ranges = plan_columns(10, 3).unwrap();
        assert_eq!(
            ranges,
            vec![
                ColumnRange { start: 0, end: 3 },
                ColumnRange { start: 3, end: 6 },
                ColumnRange { start: 6, end: 10 },
            ]
        );
    }

    #[test]
    fn ranges_cover_width_exactly() {
        for width in 1..=64 {
            for workers in 1..=16 {
                let ranges = plan_columns(width, workers).unwrap();
                assert_eq!(ranges.len(), workers);

                let mut expected_start = 0;
                for range in &ranges {
                    assert_eq!(range.start, expected_start, "gap or overlap at {width}/{workers}");
                    assert!(range.start <= range.end);
                    expected_start = range.end;
                }
                assert_eq!(expected_start, width);
                assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), width);
            }
        }
    }

    #[test]
    fn more_workers_than_columns() {
        let ranges = plan_columns(2, 4).unwrap();
        assert!(ranges[..3].iter().all(|range| range.is_empty()));
        assert_eq!(ranges[3], ColumnRange { start: 0, end: 2 });
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(plan_columns(10, 0), Err(ConfigError::NoWorkers));
        assert!(matches!(plan_columns(0, 2), Err(ConfigError::EmptyGrid { .. })));
    }
}

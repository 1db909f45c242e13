use std::num::NonZeroUsize;

use cities_core::City;

/// Split `cities` into contiguous chunks of `chunk_size` rows.
///
/// Input order is preserved and no row is dropped. Only the last chunk may be
/// shorter than `chunk_size`; an empty input yields no chunks.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use cities_core::City;
/// use cities_loader::partition;
///
/// let cities: Vec<_> = (1..=5).map(|id| City::new(id, "Town", "AR", 0.0, 0.0)).collect();
/// let size = NonZeroUsize::new(2).expect("non-zero");
/// let lengths: Vec<_> = partition(cities, size).iter().map(Vec::len).collect();
/// assert_eq!(lengths, [2, 2, 1]);
/// ```
#[must_use]
pub fn partition(cities: Vec<City>, chunk_size: NonZeroUsize) -> Vec<Vec<City>> {
    let size = chunk_size.get();
    let mut chunks = Vec::with_capacity(cities.len().div_ceil(size));
    let mut rows = cities.into_iter().peekable();
    while rows.peek().is_some() {
        chunks.push(rows.by_ref().take(size).collect());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn towns(count: i64) -> Vec<City> {
        (0..count)
            .map(|id| City::new(id, format!("Town {id}"), "AR", 0.0, 0.0))
            .collect()
    }

    #[rstest]
    #[case(0, 3, &[])]
    #[case(3, 3, &[3])]
    #[case(7, 3, &[3, 3, 1])]
    #[case(2, 5, &[2])]
    fn chunk_lengths(#[case] rows: i64, #[case] size: usize, #[case] expected: &[usize]) {
        let size = NonZeroUsize::new(size).expect("non-zero chunk size");
        let lengths: Vec<_> = partition(towns(rows), size).iter().map(Vec::len).collect();
        assert_eq!(lengths, expected);
    }
}

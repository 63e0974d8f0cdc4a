use serde::Serialize;

pub(crate) const fn default_limit() -> i64 {
    100
}

/// Clamps client paging input to `skip >= 0` and `1 <= limit <= 1000`.
pub(crate) fn clamp_page(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(1, 1000))
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[cfg(test)]
mod tests {
    use super::clamp_page;

    #[test]
    fn paging_is_clamped() {
        assert_eq!(clamp_page(-5, 0), (0, 1));
        assert_eq!(clamp_page(20, 5000), (20, 1000));
        assert_eq!(clamp_page(0, 50), (0, 50));
    }
}

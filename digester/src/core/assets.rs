//! Least-recently-used header image selection.

/// Pick the next header image from `pool`.
///
/// `pool` must already be in its deterministic (sorted) order and
/// `history_newest_first` lists the image each prior digest used, newest
/// digest first. Unused images win, in pool order. When every image has been
/// used, the one whose most recent use lies furthest in the past wins.
pub fn select_least_recently_used<'a>(
    pool: &'a [String],
    history_newest_first: &[String],
) -> Option<&'a str> {
    if let Some(unused) = pool
        .iter()
        .find(|image| !history_newest_first.contains(*image))
    {
        return Some(unused.as_str());
    }

    pool.iter()
        .filter_map(|image| {
            history_newest_first
                .iter()
                .position(|used| used == image)
                .map(|age| (age, image))
        })
        // Every pool entry has a distinct first position, so ties cannot occur.
        .max_by_key(|(age, _)| *age)
        .map(|(_, image)| image.as_str())
}

/// Base filename of a site-relative image reference (`/images/digests/a.svg` → `a.svg`).
pub fn image_file_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_pool_selects_nothing() {
        assert_eq!(select_least_recently_used(&[], &names(&["a.svg"])), None);
    }

    #[test]
    fn unused_image_wins() {
        let pool = names(&["a.svg", "b.svg", "c.svg"]);
        let history = names(&["a.svg", "b.svg"]);
        assert_eq!(select_least_recently_used(&pool, &history), Some("c.svg"));
    }

    #[test]
    fn first_unused_in_pool_order_wins() {
        let pool = names(&["a.svg", "b.svg", "c.svg"]);
        let history = names(&["b.svg"]);
        assert_eq!(select_least_recently_used(&pool, &history), Some("a.svg"));
    }

    #[test]
    fn all_used_picks_the_one_absent_longest() {
        let pool = names(&["a.svg", "b.svg"]);
        let history = names(&["b.svg", "a.svg", "b.svg"]);
        assert_eq!(select_least_recently_used(&pool, &history), Some("a.svg"));
    }

    #[test]
    fn all_used_ignores_older_repeats() {
        let pool = names(&["a.svg", "b.svg", "c.svg"]);
        let history = names(&["c.svg", "a.svg", "b.svg", "c.svg", "a.svg"]);
        assert_eq!(select_least_recently_used(&pool, &history), Some("b.svg"));
    }

    #[test]
    fn history_entries_outside_pool_are_ignored() {
        let pool = names(&["a.svg", "b.svg"]);
        let history = names(&["retired.png", "a.svg", "b.svg"]);
        assert_eq!(select_least_recently_used(&pool, &history), Some("b.svg"));
    }

    #[test]
    fn image_file_name_takes_last_segment() {
        assert_eq!(image_file_name("/images/digests/a.svg"), "a.svg");
        assert_eq!(image_file_name("a.svg"), "a.svg");
    }
}

/// Converts a free-text waste category into a severity weight.
///
/// | Category contains | Weight |
/// |-------------------|--------|
/// | `hazard`          | 3      |
/// | `wet`             | 2      |
/// | anything else     | 1      |
///
/// Matching is case-insensitive and `hazard` wins over `wet`. A missing
/// category weighs 1.
pub fn severity_weight(category: Option<&str>) -> u64 {
    let Some(category) = category else {
        return 1;
    };

    match category.to_lowercase() {
        c if c.contains("hazard") => 3,
        c if c.contains("wet") => 2,
        _ => 1,
    }
}

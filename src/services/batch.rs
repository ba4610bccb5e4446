/// Packs `texts` greedily into contiguous batches whose cost stays within `max_length`.
///
/// Each item costs its char count plus `overhead` (the separator it is joined with).
/// An item that alone exceeds `max_length` gets a batch of its own; items are never split.
pub fn create_smart_batches<T: AsRef<str>>(texts: &[T], max_length: usize, overhead: usize) -> Vec<&[T]> {
    let mut batches = Vec::new();
    let mut start = 0usize;
    let mut current = 0usize;

    for (i, text) in texts.iter().enumerate() {
        let cost = text.as_ref().chars().count() + overhead;

        if i > start && current + cost > max_length {
            batches.push(&texts[start..i]);
            start = i;
            current = 0;
        }
        current += cost;
    }

    if start < texts.len() {
        batches.push(&texts[start..]);
    }

    batches
}

use crate::model::*;

// ── Availability Algorithm ────────────────────────────────────────

/// Free time in `opening` on `date`: the opening window minus every active
/// calendar entry for that date, keeping gaps of at least `min_minutes`.
pub fn free_spans(calendar: &Calendar, date: chrono::NaiveDate, opening: Span, min_minutes: Minute) -> Vec<Span> {
    let mut taken: Vec<Span> = calendar
        .on_date(date)
        .filter(|e| e.slot.span.overlaps(&opening))
        .map(|e| {
            Span::new(
                e.slot.span.start.max(opening.start),
                e.slot.span.end.min(opening.end),
            )
        })
        .collect();
    taken.sort_by_key(|s| s.start);
    let taken = merge_overlapping(&taken);

    subtract_intervals(&[opening], &taken)
        .into_iter()
        .filter(|s| s.duration() >= min_minutes.max(1))
        .collect()
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}

pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Span::new(current_start, current_end));
        }
    }

    result
}

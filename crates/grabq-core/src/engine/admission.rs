//! Admission arithmetic: how many queued jobs may start, and which ones.

use std::time::Instant;

use crate::job::{JobId, JobRecord, JobStatus};

/// Slots available under `cap` while `in_use` jobs are being prepared, running or stopping.
/// Unlimited mode always has room.
pub(crate) fn free_slots(cap: Option<usize>, in_use: usize) -> usize {
    match cap {
        Some(max) => max.saturating_sub(in_use),
        None => usize::MAX,
    }
}

/// Whether a queued job may be admitted right now.
pub(crate) struct Eligibility<'a> {
    pub is_busy: &'a dyn Fn(&JobId) -> bool,
    pub not_before: &'a dyn Fn(&JobId) -> Option<Instant>,
    pub now: Instant,
}

/// Queued jobs waiting for a slot, oldest first, at most `limit` of them.
pub(crate) fn next_candidates(
    queued: &[JobRecord],
    eligibility: &Eligibility<'_>,
    limit: usize,
) -> Vec<JobId> {
    queued
        .iter()
        .filter(|r| r.status == JobStatus::Queued)
        .filter(|r| !(eligibility.is_busy)(&r.id))
        .filter(|r| (eligibility.not_before)(&r.id).map_or(true, |t| t <= eligibility.now))
        .take(limit)
        .map(|r| r.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn queued(n: usize) -> Vec<JobRecord> {
        (0..n)
            .map(|i| JobRecord::new(format!("https://q.example/{i}"), "", None, None, None, true))
            .collect()
    }

    #[test]
    fn free_slots_respects_cap() {
        assert_eq!(free_slots(Some(3), 0), 3);
        assert_eq!(free_slots(Some(3), 2), 1);
        assert_eq!(free_slots(Some(3), 3), 0);
        assert_eq!(free_slots(Some(3), 5), 0);
        assert_eq!(free_slots(None, 1000), usize::MAX);
    }

    #[test]
    fn candidates_are_fifo_and_bounded() {
        let list = queued(5);
        let now = Instant::now();
        let elig = Eligibility {
            is_busy: &|_| false,
            not_before: &|_| None,
            now,
        };
        let picked = next_candidates(&list, &elig, 2);
        assert_eq!(picked, vec![list[0].id.clone(), list[1].id.clone()]);
    }

    #[test]
    fn busy_downloading_and_backing_off_jobs_are_skipped() {
        let mut list = queued(4);
        list[1].status = JobStatus::Downloading;
        let busy = list[0].id.clone();
        let waiting = list[2].id.clone();
        let now = Instant::now();
        let is_busy = move |id: &JobId| *id == busy;
        let not_before = move |id: &JobId| (*id == waiting).then(|| now + Duration::from_secs(5));
        let elig = Eligibility {
            is_busy: &is_busy,
            not_before: &not_before,
            now,
        };
        assert_eq!(next_candidates(&list, &elig, usize::MAX), vec![list[3].id.clone()]);
    }
}

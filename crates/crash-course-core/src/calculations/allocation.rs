use crate::config::AllocationConfig;
use std::cmp::Ordering;

/// A topic entering allocation, already scored.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTopic {
    pub topic_id: i32,
    pub name: String,
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub topic_id: i32,
    /// Position in priority order (0 = most important).
    pub rank: usize,
    pub slots: u32,
    /// The topic hit `max_minutes_per_topic`.
    pub capped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    /// Kept topics in rank order.
    pub allocations: Vec<Allocation>,
    /// Topics that did not fit, in rank order.
    pub deferred: Vec<i32>,
    pub total_slots: u32,
    pub unallocated_slots: u32,
}

/// One contiguous block of a topic placed into a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSession {
    pub day_index: usize,
    pub topic_id: i32,
    pub slots: u32,
    /// 1-based part number when a topic spans several days.
    pub part: u32,
}

/// Distributes a slot budget across ranked topics.
pub struct TimeAllocator<'a> {
    config: &'a AllocationConfig,
}

impl<'a> TimeAllocator<'a> {
    pub fn new(config: &'a AllocationConfig) -> Self {
        Self { config }
    }

    /// Orders topics by priority desc, then name, then id.
    pub fn rank(topics: &mut [RankedTopic]) {
        topics.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
    }

    /// `ranked` must already be in rank order (see [`TimeAllocator::rank`]).
    pub fn allocate(&self, ranked: &[RankedTopic], total_slots: u32) -> AllocationOutcome {
        let min_slots = self.config.min_slots().max(1);
        let capacity_for = (total_slots / min_slots) as usize;
        let kept = ranked.len().min(capacity_for);

        let deferred = ranked[kept..].iter().map(|t| t.topic_id).collect();
        let priorities: Vec<f64> = ranked[..kept].iter().map(|t| t.priority.max(0.0)).collect();
        let (extra, capped) = self.distribute(
            &priorities,
            total_slots - (kept as u32) * min_slots,
        );

        let allocations: Vec<Allocation> = ranked[..kept]
            .iter()
            .enumerate()
            .map(|(rank, topic)| Allocation {
                topic_id: topic.topic_id,
                rank,
                slots: min_slots + extra[rank],
                capped: capped[rank],
            })
            .collect();

        let used: u32 = allocations.iter().map(|a| a.slots).sum();
        AllocationOutcome {
            allocations,
            deferred,
            total_slots,
            unallocated_slots: total_slots.saturating_sub(used),
        }
    }

    // Largest-remainder apportionment of `remaining` slots, water-filling against the cap.
    fn distribute(&self, priorities: &[f64], mut remaining: u32) -> (Vec<u32>, Vec<bool>) {
        let n = priorities.len();
        let mut extra = vec![0u32; n];
        let mut capped = vec![false; n];
        let cap_extra = self
            .config
            .max_slots()
            .map(|max| max.saturating_sub(self.config.min_slots().max(1)));
        if let Some(0) = cap_extra {
            capped.iter_mut().for_each(|c| *c = true);
            return (extra, capped);
        }

        let mut open: Vec<usize> = (0..n).collect();
        while remaining > 0 && !open.is_empty() {
            let weights = Self::weights(priorities, &open);
            let total_weight: f64 = weights.iter().sum();
            let shares: Vec<f64> = weights
                .iter()
                .map(|w| f64::from(remaining) * w / total_weight)
                .collect();

            if let Some(cap) = cap_extra {
                let over: Vec<usize> = open
                    .iter()
                    .zip(&shares)
                    .filter(|&(&i, share)| f64::from(extra[i]) + share >= f64::from(cap))
                    .map(|(&i, _)| i)
                    .collect();
                if !over.is_empty() {
                    for &i in &over {
                        let grant = (cap - extra[i]).min(remaining);
                        extra[i] += grant;
                        remaining -= grant;
                        capped[i] = true;
                    }
                    open.retain(|i| !over.contains(i));
                    continue;
                }
            }

            let mut given = 0u32;
            let mut fractions: Vec<(usize, f64)> = Vec::with_capacity(open.len());
            for (&i, share) in open.iter().zip(&shares) {
                let whole = share.floor() as u32;
                extra[i] += whole;
                given += whole;
                fractions.push((i, share - share.floor()));
            }
            let mut leftover = remaining.saturating_sub(given);
            fractions.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            for (i, _) in fractions {
                if leftover == 0 {
                    break;
                }
                if cap_extra.is_some_and(|cap| extra[i] >= cap) {
                    continue;
                }
                extra[i] += 1;
                leftover -= 1;
                if cap_extra == Some(extra[i]) {
                    capped[i] = true;
                }
            }
            remaining = leftover;
            if remaining > 0 {
                // Only topics sitting at the cap are left; whatever remains stays unallocated.
                open.retain(|&i| cap_extra.is_none_or(|cap| extra[i] < cap));
                if cap_extra.is_none() {
                    break;
                }
            }
        }
        (extra, capped)
    }

    fn weights(priorities: &[f64], open: &[usize]) -> Vec<f64> {
        let weights: Vec<f64> = open.iter().map(|&i| priorities[i]).collect();
        if weights.iter().sum::<f64>() > 0.0 {
            weights
        } else {
            vec![1.0; open.len()]
        }
    }

    /// Pours allocations, in study order, into consecutive days.
    pub fn pack(order: &[Allocation], day_slots: &[u32]) -> Vec<PackedSession> {
        let mut sessions = Vec::new();
        let mut free: Vec<u32> = day_slots.to_vec();
        let mut day = 0usize;
        for allocation in order {
            let mut left = allocation.slots;
            let mut part = 1u32;
            while left > 0 && day < free.len() {
                if free[day] == 0 {
                    day += 1;
                    continue;
                }
                let take = left.min(free[day]);
                sessions.push(PackedSession {
                    day_index: day,
                    topic_id: allocation.topic_id,
                    slots: take,
                    part,
                });
                free[day] -= take;
                left -= take;
                part += 1;
            }
        }
        sessions
    }
}

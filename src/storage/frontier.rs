use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

use crate::crawler::task::{CrawlTask, Priority};

/// Heap entry ordered by priority alone, so equal-priority tasks come out in
/// whatever order the heap yields them.
#[derive(Debug)]
struct Queued(CrawlTask);

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority == other.0.priority
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.priority.cmp(&other.0.priority)
    }
}

#[derive(Debug, Default)]
struct Queues {
    high: BinaryHeap<Queued>,
    medium: BinaryHeap<Queued>,
    low: BinaryHeap<Queued>,

    /// Every task ever added, grouped by domain. Pop never consults this.
    by_domain: HashMap<String, Vec<CrawlTask>>,
}

impl Queues {
    fn is_empty(&self) -> bool {
        self.high.is_empty() && self.medium.is_empty() && self.low.is_empty()
    }
}

/// Pending crawl work, split into three priority tiers
///
/// All operations take the same lock, so `add`, `next` and `is_empty` are atomic
/// with respect to each other. The frontier is unbounded.
#[derive(Debug, Default)]
pub struct Frontier {
    queues: Mutex<Queues>,
}

impl Frontier {
    /// Create an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task in the tier matching its priority
    pub async fn add(&self, task: CrawlTask) {
        let mut queues = self.queues.lock().await;

        queues
            .by_domain
            .entry(task.domain.clone())
            .or_default()
            .push(task.clone());

        debug!("Queued {} ({}, depth {})", task.url, task.priority, task.depth);

        match task.priority {
            Priority::High => queues.high.push(Queued(task)),
            Priority::Medium => queues.medium.push(Queued(task)),
            Priority::Low => queues.low.push(Queued(task)),
        }
    }

    /// Pop from the highest non-empty tier
    pub async fn next(&self) -> Option<CrawlTask> {
        let mut queues = self.queues.lock().await;

        queues
            .high
            .pop()
            .or_else(|| queues.medium.pop())
            .or_else(|| queues.low.pop())
            .map(|queued| queued.0)
    }

    pub async fn is_empty(&self) -> bool {
        self.queues.lock().await.is_empty()
    }

    /// Number of tasks waiting across all tiers
    pub async fn len(&self) -> usize {
        let queues = self.queues.lock().await;
        queues.high.len() + queues.medium.len() + queues.low.len()
    }

    /// How many tasks have ever been added for `domain`
    pub async fn domain_count(&self, domain: &str) -> usize {
        let queues = self.queues.lock().await;
        queues.by_domain.get(domain).map_or(0, Vec::len)
    }

    /// Domains that have had at least one task added, sorted
    pub async fn domains(&self) -> Vec<String> {
        let queues = self.queues.lock().await;
        let mut domains: Vec<String> = queues.by_domain.keys().cloned().collect();
        domains.sort();
        domains
    }
}
